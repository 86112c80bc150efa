//! Daily rollup maintenance.
//!
//! Two modes. `apply_close` is the incremental path run on every
//! real-time punch-out; it assumes the new record is the latest of its
//! day. `rebuild` recomputes the document from the full record set and is
//! the authoritative form, used whenever history has been edited.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::model::attendance::Metrics;
use crate::model::summary::{round2, summary_id, DailySummary, PunchEntry};
use crate::store::{AttendanceQuery, Store};

#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Folds one freshly closed record into its day's summary, creating
    /// the document on the first close of the day.
    ///
    /// Hours add up (re-rounded after each addition). `late_minutes` stays
    /// as the first punch of the day left it; `undertime_minutes` is
    /// always replaced, so only the day's last punch-out determines it.
    pub async fn apply_close(
        &self,
        uid: &str,
        metrics: &Metrics,
        entry: PunchEntry,
    ) -> Result<(), ServiceError> {
        let now = self.clock.now();
        let id = summary_id(uid, metrics.work_date);

        let summary = match self.store.daily_summary().get(&id).await? {
            None => DailySummary::from_metrics(uid, metrics, entry, now),
            Some(mut s) => {
                s.regular_hours = round2(s.regular_hours + metrics.regular_hours);
                s.overtime_hours = round2(s.overtime_hours + metrics.overtime_hours);
                s.night_diff_hours = round2(s.night_diff_hours + metrics.night_diff_hours);
                s.total_worked_hours = round2(s.total_worked_hours + metrics.total_worked_hours);
                s.undertime_minutes = metrics.undertime_minutes;
                s.punches.push(entry);
                s.updated_at = now;
                s
            }
        };

        self.store.daily_summary().set(&summary).await?;
        Ok(())
    }

    /// Recomputes the `(uid, work_date)` summary from scratch: every
    /// completed, non-voided record whose metrics landed on that date.
    /// Deletes the document when no such record remains.
    pub async fn rebuild(&self, uid: &str, work_date: NaiveDate) -> Result<(), ServiceError> {
        let id = summary_id(uid, work_date);

        // Work-date filtering happens here rather than in the store; the
        // per-uid record set is small.
        let mut records: Vec<_> = self
            .store
            .attendance()
            .query(AttendanceQuery::for_uid(uid))
            .await?
            .into_iter()
            .filter(|r| {
                r.is_completed()
                    && r.metrics
                        .as_ref()
                        .is_some_and(|m| m.work_date == work_date)
            })
            .collect();

        if records.is_empty() {
            debug!(uid, %work_date, "no completed records left, dropping summary");
            self.store.daily_summary().delete(&id).await?;
            return Ok(());
        }

        records.sort_by_key(|r| r.punch_in);

        let mut summary = DailySummary {
            uid: uid.to_string(),
            work_date,
            regular_hours: 0.0,
            overtime_hours: 0.0,
            night_diff_hours: 0.0,
            total_worked_hours: 0.0,
            late_minutes: 0,
            undertime_minutes: 0,
            punches: Vec::with_capacity(records.len()),
            updated_at: self.clock.now(),
        };

        for r in &records {
            let m = r.metrics.as_ref().unwrap();
            summary.regular_hours = round2(summary.regular_hours + m.regular_hours);
            summary.overtime_hours = round2(summary.overtime_hours + m.overtime_hours);
            summary.night_diff_hours = round2(summary.night_diff_hours + m.night_diff_hours);
            summary.total_worked_hours = round2(summary.total_worked_hours + m.total_worked_hours);
            summary.punches.push(PunchEntry {
                attendance_id: r.id.clone(),
                punch_in: r.punch_in,
                punch_out: r.punch_out.closed_at().unwrap(),
            });
        }

        summary.late_minutes = records.first().unwrap().metrics.as_ref().unwrap().late_minutes;
        summary.undertime_minutes = records
            .last()
            .unwrap()
            .metrics
            .as_ref()
            .unwrap()
            .undertime_minutes;

        self.store.daily_summary().set(&summary).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::engine::{self, ShiftWindow};
    use crate::model::attendance::{AttendanceRecord, PunchOut};
    use crate::store::memory::MemoryStore;
    use crate::store::AttendanceStore;
    use chrono::{DateTime, NaiveTime, TimeZone, Utc};

    fn utc(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, mi, 0).unwrap()
    }

    fn shift() -> ShiftWindow {
        ShiftWindow {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        }
    }

    fn service(store: Arc<MemoryStore>) -> SummaryService {
        SummaryService::new(store, Arc::new(FixedClock(utc(15, 12, 0))))
    }

    async fn closed_record(
        store: &MemoryStore,
        pi: DateTime<Utc>,
        po: DateTime<Utc>,
    ) -> AttendanceRecord {
        let metrics = engine::compute(pi, po, shift());
        let mut record = AttendanceRecord {
            id: String::new(),
            uid: "u1".into(),
            punch_in: pi,
            punch_out: PunchOut::At(po),
            metrics: Some(metrics),
            voided: false,
            voided_at: None,
            void_reason: None,
            admin_edited: false,
            created_at: pi,
            updated_at: None,
        };
        record.id = AttendanceStore::create(store, &record).await.unwrap();
        record
    }

    fn entry(r: &AttendanceRecord) -> PunchEntry {
        PunchEntry {
            attendance_id: r.id.clone(),
            punch_in: r.punch_in,
            punch_out: r.punch_out.closed_at().unwrap(),
        }
    }

    #[actix_web::test]
    async fn break_day_upserts_merge() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());

        // Morning 09:00-13:00 local, afternoon 14:00-18:00 local.
        let first = closed_record(&store, utc(15, 1, 0), utc(15, 5, 0)).await;
        let second = closed_record(&store, utc(15, 6, 0), utc(15, 10, 0)).await;

        svc.apply_close("u1", first.metrics.as_ref().unwrap(), entry(&first))
            .await
            .unwrap();
        svc.apply_close("u1", second.metrics.as_ref().unwrap(), entry(&second))
            .await
            .unwrap();

        let s = store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.regular_hours, 8.0);
        assert_eq!(s.total_worked_hours, 8.0);
        // late kept from the first pair, undertime replaced by the second
        assert_eq!(s.late_minutes, 0);
        assert_eq!(s.undertime_minutes, 0);
        assert_eq!(s.punches.len(), 2);
        assert_eq!(s.punches[0].attendance_id, first.id);
        assert_eq!(s.punches[1].attendance_id, second.id);
    }

    #[actix_web::test]
    async fn rebuild_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        closed_record(&store, utc(15, 1, 30), utc(15, 5, 0)).await;
        closed_record(&store, utc(15, 6, 0), utc(15, 11, 0)).await;

        svc.rebuild("u1", day).await.unwrap();
        let first_pass = store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .unwrap();

        svc.rebuild("u1", day).await.unwrap();
        let second_pass = store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&first_pass).unwrap(),
            serde_json::to_value(&second_pass).unwrap()
        );
        // first record was 30 minutes late; last ran past schedule end
        assert_eq!(first_pass.late_minutes, 30);
        assert_eq!(first_pass.undertime_minutes, 0);
        assert_eq!(first_pass.overtime_hours, 1.0);
    }

    #[actix_web::test]
    async fn rebuild_skips_open_and_voided() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let kept = closed_record(&store, utc(15, 1, 0), utc(15, 10, 0)).await;

        let mut voided = closed_record(&store, utc(15, 1, 0), utc(15, 2, 0)).await;
        voided.punch_out = PunchOut::Voided;
        voided.metrics = None;
        voided.voided = true;
        store.attendance().update(&voided).await.unwrap();

        let mut open = closed_record(&store, utc(15, 11, 0), utc(15, 12, 0)).await;
        open.punch_out = PunchOut::Open;
        open.metrics = None;
        store.attendance().update(&open).await.unwrap();

        svc.rebuild("u1", day).await.unwrap();
        let s = store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.punches.len(), 1);
        assert_eq!(s.punches[0].attendance_id, kept.id);
        assert_eq!(s.regular_hours, 9.0);
    }

    #[actix_web::test]
    async fn rebuild_with_no_records_deletes_summary() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let record = closed_record(&store, utc(15, 1, 0), utc(15, 10, 0)).await;
        svc.rebuild("u1", day).await.unwrap();
        assert!(store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .is_some());

        store.attendance().delete(&record.id).await.unwrap();
        svc.rebuild("u1", day).await.unwrap();
        assert!(store
            .daily_summary()
            .get("u1_2024-01-15")
            .await
            .unwrap()
            .is_none());
    }
}
