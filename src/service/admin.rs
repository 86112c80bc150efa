//! Admin mutations over attendance history. Every path that changes a
//! completed pair hands the affected day to the rebuild side of the
//! aggregator; the incremental upsert is only trusted for real-time
//! closes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::engine;
use crate::error::ServiceError;
use crate::model::attendance::{AttendanceRecord, PunchOut};
use crate::model::user::{Schedule, User};
use crate::store::Store;

use super::punch::schedule_window;
use super::summary::SummaryService;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditPunch {
    #[schema(value_type = Option<String>, example = "2024-01-15T01:00:00Z")]
    pub punch_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, example = "2024-01-15T10:00:00Z")]
    pub punch_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignSchedule {
    pub schedule: Option<Schedule>,
    #[schema(example = "Asia/Manila")]
    pub timezone: Option<String>,
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    summaries: SummaryService,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, summaries: SummaryService) -> Self {
        Self {
            store,
            clock,
            summaries,
        }
    }

    /// Overrides either side of a punch pair. When the resulting pair is
    /// complete the metrics are recomputed against the owner's current
    /// schedule and the day's summary is rebuilt; a still-open pair just
    /// keeps its corrected punch-in.
    pub async fn edit_punch(
        &self,
        punch_id: &str,
        edit: EditPunch,
    ) -> Result<AttendanceRecord, ServiceError> {
        if edit.punch_in.is_none() && edit.punch_out.is_none() {
            return Err(ServiceError::BadRequest(
                "Provide punchIn and/or punchOut".into(),
            ));
        }

        let mut record = self
            .store
            .attendance()
            .get(punch_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Attendance record not found".into()))?;

        let now = self.clock.now();
        let punch_in = edit.punch_in.unwrap_or(record.punch_in);
        let punch_out = edit.punch_out.or_else(|| record.punch_out.closed_at());

        record.punch_in = punch_in;
        record.admin_edited = true;
        record.updated_at = Some(now);

        let Some(punch_out) = punch_out else {
            // Pair still open: no metrics to refresh, no rollup to touch.
            self.store.attendance().update(&record).await?;
            info!(punch_id, "punch-in corrected on open record");
            return Ok(record);
        };

        let user = self
            .store
            .users()
            .get(&record.uid)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User profile not found".into()))?;
        let shift = schedule_window(&user)?;

        let metrics = engine::compute(punch_in, punch_out, shift);
        let work_date = metrics.work_date;

        record.punch_out = PunchOut::At(punch_out);
        record.metrics = Some(metrics);
        self.store.attendance().update(&record).await?;

        self.summaries.rebuild(&record.uid, work_date).await?;

        info!(punch_id, uid = %record.uid, %work_date, "punch edited, day rebuilt");
        Ok(record)
    }

    /// Hard-deletes a record and rebuilds the day it counted toward.
    pub async fn delete_punch(&self, punch_id: &str) -> Result<(), ServiceError> {
        let record = self
            .store
            .attendance()
            .get(punch_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Attendance record not found".into()))?;

        // An open or voided record never produced metrics; fall back to
        // the punch-in's local date for the rebuild key.
        let work_date = record
            .metrics
            .as_ref()
            .map(|m| m.work_date)
            .unwrap_or_else(|| engine::local_date_of(record.punch_in));

        self.store.attendance().delete(punch_id).await?;
        self.summaries.rebuild(&record.uid, work_date).await?;

        info!(punch_id, uid = %record.uid, %work_date, "punch deleted, day rebuilt");
        Ok(())
    }

    /// Updates a user's schedule and/or timezone. Past records keep the
    /// metrics they were computed with.
    pub async fn assign_schedule(
        &self,
        uid: &str,
        patch: AssignSchedule,
    ) -> Result<User, ServiceError> {
        if patch.schedule.is_none() && patch.timezone.is_none() {
            return Err(ServiceError::BadRequest(
                "Provide schedule and/or timezone".into(),
            ));
        }

        if let Some(schedule) = &patch.schedule {
            if schedule.window().is_none() {
                return Err(ServiceError::BadRequest(
                    "Schedule start and end must be HH:MM times".into(),
                ));
            }
        }

        let mut user = self
            .store
            .users()
            .get(uid)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User profile not found".into()))?;

        if let Some(schedule) = patch.schedule {
            user.schedule = Some(schedule);
        }
        if let Some(timezone) = patch.timezone {
            user.timezone = Some(timezone);
        }
        user.updated_at = Some(self.clock.now());

        self.store.users().update(&user).await?;
        info!(uid, "schedule assigned");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::user::Schedule;
    use crate::service::punch::PunchService;
    use crate::store::memory::MemoryStore;
    use crate::store::UserStore;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, mi, 0).unwrap()
    }

    fn admin(store: Arc<MemoryStore>, now: DateTime<Utc>) -> AdminService {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let summaries = SummaryService::new(store.clone(), clock.clone());
        AdminService::new(store, clock, summaries)
    }

    fn puncher(store: Arc<MemoryStore>, now: DateTime<Utc>) -> PunchService {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let summaries = SummaryService::new(store.clone(), clock.clone());
        PunchService::new(store, clock, summaries)
    }

    async fn seed_user(store: &MemoryStore) {
        let user = User {
            uid: "u1".into(),
            email: "jane@example.com".into(),
            password_hash: "h".into(),
            role_id: 2,
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            department: None,
            position: None,
            schedule: Some(Schedule {
                start: "09:00".into(),
                end: "18:00".into(),
            }),
            timezone: None,
            created_at: utc(1, 0, 0),
            updated_at: None,
        };
        UserStore::create(store, &user).await.unwrap();
    }

    async fn closed_day(store: &Arc<MemoryStore>) -> String {
        puncher(store.clone(), utc(15, 1, 30))
            .punch_in("u1")
            .await
            .unwrap();
        puncher(store.clone(), utc(15, 10, 0))
            .punch_out("u1")
            .await
            .unwrap()
            .id
    }

    #[actix_web::test]
    async fn empty_edit_is_bad_request() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store).await;
        let svc = admin(store, utc(15, 12, 0));

        let err = svc
            .edit_punch(
                "whatever",
                EditPunch {
                    punch_in: None,
                    punch_out: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[actix_web::test]
    async fn edit_recomputes_metrics_and_rebuilds_day() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store).await;
        let id = closed_day(&store).await;

        // Forgive the late arrival: move punch-in back to 09:00 local.
        let svc = admin(store.clone(), utc(15, 12, 0));
        let record = svc
            .edit_punch(
                &id,
                EditPunch {
                    punch_in: Some(utc(15, 1, 0)),
                    punch_out: None,
                },
            )
            .await
            .unwrap();

        assert!(record.admin_edited);
        let m = record.metrics.unwrap();
        assert_eq!(m.late_minutes, 0);
        assert_eq!(m.regular_hours, 9.0);

        let summary = store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.late_minutes, 0);
        assert_eq!(summary.regular_hours, 9.0);
    }

    #[actix_web::test]
    async fn edit_of_open_record_skips_metrics() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store).await;
        let open = puncher(store.clone(), utc(15, 2, 0))
            .punch_in("u1")
            .await
            .unwrap();

        let svc = admin(store.clone(), utc(15, 3, 0));
        let record = svc
            .edit_punch(
                &open.id,
                EditPunch {
                    punch_in: Some(utc(15, 1, 0)),
                    punch_out: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(record.punch_in, utc(15, 1, 0));
        assert_eq!(record.punch_out, PunchOut::Open);
        assert!(record.metrics.is_none());
        assert!(store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .is_none());
    }

    #[actix_web::test]
    async fn delete_converges_to_no_summary() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store).await;
        let id = closed_day(&store).await;

        let svc = admin(store.clone(), utc(15, 12, 0));
        svc.delete_punch(&id).await.unwrap();

        assert!(store.attendance().get(&id).await.unwrap().is_none());
        assert!(store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .is_none());

        let err = svc.delete_punch(&id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[actix_web::test]
    async fn assign_schedule_validates_and_patches() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store).await;
        let svc = admin(store.clone(), utc(15, 12, 0));

        let err = svc
            .assign_schedule(
                "u1",
                AssignSchedule {
                    schedule: None,
                    timezone: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = svc
            .assign_schedule(
                "u1",
                AssignSchedule {
                    schedule: Some(Schedule {
                        start: "late".into(),
                        end: "18:00".into(),
                    }),
                    timezone: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let user = svc
            .assign_schedule(
                "u1",
                AssignSchedule {
                    schedule: Some(Schedule {
                        start: "10:00".into(),
                        end: "19:00".into(),
                    }),
                    timezone: Some("Asia/Singapore".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(user.schedule.as_ref().unwrap().start, "10:00");
        assert_eq!(user.timezone.as_deref(), Some("Asia/Singapore"));
        assert!(user.updated_at.is_some());
    }
}
