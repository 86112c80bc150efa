//! Employee-facing punch lifecycle: open, close, void.
//!
//! The single-open-punch rule is enforced by querying for an open record
//! before creating one. There is no store transaction behind that check;
//! two racing punch-ins can both pass it, which operations accepts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::engine::{self, ShiftWindow};
use crate::error::ServiceError;
use crate::model::attendance::{AttendanceRecord, Metrics, PunchOut};
use crate::model::summary::{summary_id, DailySummary, PunchEntry};
use crate::model::user::User;
use crate::store::{AttendanceQuery, Store};

use super::summary::SummaryService;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchStatus {
    pub punched_in: bool,
    pub open_punch: Option<AttendanceRecord>,
    pub today_summary: Option<DailySummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchOutResult {
    pub id: String,
    pub punch_out: DateTime<Utc>,
    pub metrics: Metrics,
}

#[derive(Clone)]
pub struct PunchService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    summaries: SummaryService,
}

impl PunchService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, summaries: SummaryService) -> Self {
        Self {
            store,
            clock,
            summaries,
        }
    }

    async fn find_open(&self, uid: &str) -> Result<Option<AttendanceRecord>, ServiceError> {
        let mut open = self
            .store
            .attendance()
            .query(AttendanceQuery {
                limit: Some(1),
                ..AttendanceQuery::open_for_uid(uid)
            })
            .await?;
        Ok(open.pop())
    }

    /// Current punch state plus the rollup under today's UTC date key.
    /// (Summaries are written under the punch's local work date, so near
    /// local midnight this lookup can legitimately come back empty.)
    pub async fn status(&self, uid: &str) -> Result<PunchStatus, ServiceError> {
        let open_punch = self.find_open(uid).await?;
        let today_utc = self.clock.now().date_naive();
        let today_summary = self
            .store
            .daily_summary()
            .get(&summary_id(uid, today_utc))
            .await?;

        Ok(PunchStatus {
            punched_in: open_punch.is_some(),
            open_punch,
            today_summary,
        })
    }

    pub async fn punch_in(&self, uid: &str) -> Result<AttendanceRecord, ServiceError> {
        if self.find_open(uid).await?.is_some() {
            return Err(ServiceError::Conflict(
                "You already have an open punch".into(),
            ));
        }

        let now = self.clock.now();
        let mut record = AttendanceRecord {
            id: String::new(),
            uid: uid.to_string(),
            punch_in: now,
            punch_out: PunchOut::Open,
            metrics: None,
            voided: false,
            voided_at: None,
            void_reason: None,
            admin_edited: false,
            created_at: now,
            updated_at: None,
        };
        record.id = self.store.attendance().create(&record).await?;

        info!(uid, id = %record.id, "punched in");
        Ok(record)
    }

    pub async fn punch_out(&self, uid: &str) -> Result<PunchOutResult, ServiceError> {
        let mut record = self
            .find_open(uid)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No open punch to close".into()))?;

        let user = self
            .store
            .users()
            .get(uid)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User profile not found".into()))?;
        let shift = schedule_window(&user)?;

        let now = self.clock.now();
        let metrics = engine::compute(record.punch_in, now, shift);

        record.punch_out = PunchOut::At(now);
        record.metrics = Some(metrics.clone());
        record.updated_at = Some(now);
        self.store.attendance().update(&record).await?;

        self.summaries
            .apply_close(
                uid,
                &metrics,
                PunchEntry {
                    attendance_id: record.id.clone(),
                    punch_in: record.punch_in,
                    punch_out: now,
                },
            )
            .await?;

        info!(uid, id = %record.id, work_date = %metrics.work_date, "punched out");
        Ok(PunchOutResult {
            id: record.id,
            punch_out: now,
            metrics,
        })
    }

    /// Cancels an open punch the caller owns. The record stays behind,
    /// marked voided, and never reaches aggregation.
    pub async fn cancel_open_punch(
        &self,
        uid: &str,
        attendance_id: &str,
    ) -> Result<(), ServiceError> {
        let mut record = self
            .store
            .attendance()
            .get(attendance_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Attendance record not found".into()))?;

        if record.uid != uid {
            return Err(ServiceError::Forbidden(
                "This punch does not belong to you".into(),
            ));
        }
        if !record.punch_out.is_open() {
            return Err(ServiceError::Conflict(
                "This punch is already completed".into(),
            ));
        }

        let now = self.clock.now();
        record.punch_out = PunchOut::Voided;
        record.voided = true;
        record.voided_at = Some(now);
        record.void_reason = Some("Cancelled by user".into());
        record.updated_at = Some(now);
        self.store.attendance().update(&record).await?;

        info!(uid, id = %attendance_id, "open punch cancelled");
        Ok(())
    }
}

pub(crate) fn schedule_window(user: &User) -> Result<ShiftWindow, ServiceError> {
    let schedule = user.schedule.as_ref().ok_or_else(|| {
        ServiceError::PreconditionFailed("No work schedule configured for this user".into())
    })?;
    let (start, end) = schedule.window().ok_or_else(|| {
        ServiceError::PreconditionFailed("No work schedule configured for this user".into())
    })?;
    Ok(ShiftWindow { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::user::Schedule;
    use crate::store::memory::MemoryStore;
    use crate::store::UserStore;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, mi, 0).unwrap()
    }

    fn services(store: Arc<MemoryStore>, now: DateTime<Utc>) -> PunchService {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let summaries = SummaryService::new(store.clone(), clock.clone());
        PunchService::new(store, clock, summaries)
    }

    async fn seed_user(store: &MemoryStore, schedule: Option<Schedule>) {
        let user = User {
            uid: "u1".into(),
            email: "jane@example.com".into(),
            password_hash: "h".into(),
            role_id: 2,
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            department: Some("Ops".into()),
            position: Some("Agent".into()),
            schedule,
            timezone: Some("Asia/Manila".into()),
            created_at: utc(1, 0, 0),
            updated_at: None,
        };
        UserStore::create(store, &user).await.unwrap();
    }

    fn nine_to_six() -> Option<Schedule> {
        Some(Schedule {
            start: "09:00".into(),
            end: "18:00".into(),
        })
    }

    #[actix_web::test]
    async fn second_punch_in_conflicts() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, nine_to_six()).await;
        let svc = services(store, utc(15, 1, 0));

        svc.punch_in("u1").await.unwrap();
        let err = svc.punch_in("u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[actix_web::test]
    async fn punch_out_without_open_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, nine_to_six()).await;
        let svc = services(store, utc(15, 10, 0));

        let err = svc.punch_out("u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[actix_web::test]
    async fn punch_out_without_schedule_is_precondition_failure() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, None).await;

        let svc = services(store.clone(), utc(15, 1, 0));
        svc.punch_in("u1").await.unwrap();

        let svc = services(store, utc(15, 10, 0));
        let err = svc.punch_out("u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed(_)));
    }

    #[actix_web::test]
    async fn full_day_close_writes_metrics_and_summary() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, nine_to_six()).await;

        services(store.clone(), utc(15, 1, 0))
            .punch_in("u1")
            .await
            .unwrap();
        let result = services(store.clone(), utc(15, 10, 0))
            .punch_out("u1")
            .await
            .unwrap();

        assert_eq!(result.metrics.regular_hours, 9.0);
        assert_eq!(result.metrics.late_minutes, 0);

        let record = store.attendance().get(&result.id).await.unwrap().unwrap();
        assert_eq!(record.punch_out, PunchOut::At(utc(15, 10, 0)));
        assert!(record.metrics.is_some());

        let summary = store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_worked_hours, 9.0);
        assert_eq!(summary.punches.len(), 1);
    }

    #[actix_web::test]
    async fn cancel_rules() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, nine_to_six()).await;
        let svc = services(store.clone(), utc(15, 1, 0));

        let record = svc.punch_in("u1").await.unwrap();

        let err = svc.cancel_open_punch("someone-else", &record.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = svc.cancel_open_punch("u1", "missing-id").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        svc.cancel_open_punch("u1", &record.id).await.unwrap();
        let stored = store.attendance().get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.punch_out, PunchOut::Voided);
        assert!(stored.voided);
        assert_eq!(stored.void_reason.as_deref(), Some("Cancelled by user"));

        // voided records no longer satisfy the open-punch lookup
        let err = svc.punch_out("u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = svc.cancel_open_punch("u1", &record.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[actix_web::test]
    async fn status_reports_open_punch_and_utc_today_summary() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, nine_to_six()).await;

        services(store.clone(), utc(15, 1, 0))
            .punch_in("u1")
            .await
            .unwrap();
        services(store.clone(), utc(15, 5, 0))
            .punch_out("u1")
            .await
            .unwrap();

        let svc = services(store.clone(), utc(15, 6, 0));
        let status = svc.status("u1").await.unwrap();
        assert!(!status.punched_in);
        assert!(status.open_punch.is_none());
        // summary key is today's UTC date, which here matches the work date
        assert!(status.today_summary.is_some());

        let open = svc.punch_in("u1").await.unwrap();
        let status = svc.status("u1").await.unwrap();
        assert!(status.punched_in);
        assert_eq!(status.open_punch.unwrap().id, open.id);
    }
}
