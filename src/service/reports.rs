//! Read-side aggregations for employees and administrators.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::model::attendance::AttendanceRecord;
use crate::model::summary::{DailySummary, SummaryTotals};
use crate::model::user::User;
use crate::store::{AttendanceQuery, Store};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub totals: SummaryTotals,
    pub days: Vec<DailySummary>,
}

/// Display fields stitched onto admin report rows.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInfo {
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
}

impl EmployeeInfo {
    fn of(user: Option<&User>) -> Self {
        match user {
            Some(u) => Self {
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                department: u.department.clone(),
                position: u.position.clone(),
            },
            // summaries can outlive their user record
            None => Self {
                first_name: String::new(),
                last_name: String::new(),
                department: None,
                position: None,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyReportRow {
    pub uid: String,
    pub employee: EmployeeInfo,
    #[serde(flatten)]
    pub summary: DailySummaryFields,
}

/// The summary body without its uid (already lifted onto the row).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySummaryFields {
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub work_date: NaiveDate,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub night_diff_hours: f64,
    pub total_worked_hours: f64,
    pub late_minutes: i64,
    pub undertime_minutes: i64,
    pub punch_count: usize,
}

impl From<&DailySummary> for DailySummaryFields {
    fn from(s: &DailySummary) -> Self {
        Self {
            work_date: s.work_date,
            regular_hours: s.regular_hours,
            overtime_hours: s.overtime_hours,
            night_diff_hours: s.night_diff_hours,
            total_worked_hours: s.total_worked_hours,
            late_minutes: s.late_minutes,
            undertime_minutes: s.undertime_minutes,
            punch_count: s.punches.len(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportRow {
    pub uid: String,
    pub employee: EmployeeInfo,
    pub totals: SummaryTotals,
    pub days: Vec<DailySummary>,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn Store>,
}

impl ReportService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Punch history with `punch_in` inside `[start 00:00Z, end 23:59:59.999Z]`,
    /// newest first.
    pub async fn employee_punches(
        &self,
        uid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, ServiceError> {
        let range_start = start.and_time(NaiveTime::MIN).and_utc();
        let range_end = end
            .and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap())
            .and_utc();

        let mut records = self
            .store
            .attendance()
            .query(AttendanceQuery {
                uid: Some(uid.to_string()),
                punch_in_range: Some((range_start, range_end)),
                ..Default::default()
            })
            .await?;
        records.sort_by(|a, b| b.punch_in.cmp(&a.punch_in));
        Ok(records)
    }

    pub async fn daily_summary(
        &self,
        uid: &str,
        work_date: NaiveDate,
    ) -> Result<Option<DailySummary>, ServiceError> {
        let id = crate::model::summary::summary_id(uid, work_date);
        Ok(self.store.daily_summary().get(&id).await?)
    }

    pub async fn weekly_summary(
        &self,
        uid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WeeklySummary, ServiceError> {
        let mut days = self
            .store
            .daily_summary()
            .list_by_uid_and_range(uid, start, end)
            .await?;
        days.sort_by_key(|s| s.work_date);

        let mut totals = SummaryTotals::default();
        for day in &days {
            totals.add(day);
        }
        Ok(WeeklySummary { totals, days })
    }

    /// Every employee's rollup for one work date, with display fields.
    pub async fn all_daily_reports(
        &self,
        work_date: NaiveDate,
    ) -> Result<Vec<DailyReportRow>, ServiceError> {
        let summaries = self
            .store
            .daily_summary()
            .list_by_work_date(work_date)
            .await?;
        let users = self.users_for(summaries.iter().map(|s| s.uid.as_str())).await?;

        Ok(summaries
            .iter()
            .map(|s| DailyReportRow {
                uid: s.uid.clone(),
                employee: EmployeeInfo::of(users.get(s.uid.as_str())),
                summary: s.into(),
            })
            .collect())
    }

    /// Per-employee totals over a date range, each group's days ascending.
    pub async fn all_weekly_reports(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeeklyReportRow>, ServiceError> {
        let summaries = self
            .store
            .daily_summary()
            .list_by_work_date_range(start, end)
            .await?;
        let users = self.users_for(summaries.iter().map(|s| s.uid.as_str())).await?;

        let mut groups: HashMap<String, Vec<DailySummary>> = HashMap::new();
        for s in summaries {
            groups.entry(s.uid.clone()).or_default().push(s);
        }

        let mut rows: Vec<WeeklyReportRow> = groups
            .into_iter()
            .map(|(uid, mut days)| {
                days.sort_by_key(|s| s.work_date);
                let mut totals = SummaryTotals::default();
                for day in &days {
                    totals.add(day);
                }
                WeeklyReportRow {
                    employee: EmployeeInfo::of(users.get(uid.as_str())),
                    uid,
                    totals,
                    days,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(rows)
    }

    async fn users_for<'a>(
        &self,
        uids: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, User>, ServiceError> {
        let mut out = HashMap::new();
        for uid in uids {
            if out.contains_key(uid) {
                continue;
            }
            if let Some(user) = self.store.users().get(uid).await? {
                out.insert(uid.to_string(), user);
            }
        }
        Ok(out)
    }
}

/// Monday..Sunday window enclosing `today`, used when weekly endpoints get
/// no explicit range. Sunday counts as the seventh day of the prior week.
pub fn default_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    use chrono::Datelike;
    let day = today.weekday().num_days_from_sunday() as i64;
    let diff_to_mon = if day == 0 { -6 } else { 1 - day };
    let start = today + chrono::Duration::days(diff_to_mon);
    (start, start + chrono::Duration::days(6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::user::Schedule;
    use crate::service::punch::PunchService;
    use crate::service::summary::SummaryService;
    use crate::store::memory::MemoryStore;
    use crate::store::UserStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn utc(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, mi, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn puncher(store: Arc<MemoryStore>, now: DateTime<Utc>) -> PunchService {
        let clock: Arc<dyn crate::clock::Clock> = Arc::new(FixedClock(now));
        let summaries = SummaryService::new(store.clone(), clock.clone());
        PunchService::new(store, clock, summaries)
    }

    async fn seed_user(store: &MemoryStore, uid: &str, first_name: &str) {
        let user = User {
            uid: uid.into(),
            email: format!("{uid}@example.com"),
            password_hash: "h".into(),
            role_id: 2,
            first_name: first_name.into(),
            last_name: "Doe".into(),
            department: Some("Ops".into()),
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

    async fn work_day(store: &Arc<MemoryStore>, uid: &str, day: u32) {
        puncher(store.clone(), utc(day, 1, 0))
            .punch_in(uid)
            .await
            .unwrap();
        puncher(store.clone(), utc(day, 10, 0))
            .punch_out(uid)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn history_is_ranged_and_descending() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", "Jane").await;
        work_day(&store, "u1", 15).await;
        work_day(&store, "u1", 16).await;
        work_day(&store, "u1", 20).await;

        let svc = ReportService::new(store);
        let records = svc
            .employee_punches("u1", date(15), date(16))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].punch_in > records[1].punch_in);
    }

    #[actix_web::test]
    async fn weekly_summary_accumulates_in_order() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", "Jane").await;
        work_day(&store, "u1", 16).await;
        work_day(&store, "u1", 15).await;

        let svc = ReportService::new(store);
        let week = svc.weekly_summary("u1", date(15), date(21)).await.unwrap();
        assert_eq!(week.days.len(), 2);
        assert_eq!(week.days[0].work_date, date(15));
        assert_eq!(week.totals.regular_hours, 18.0);
        assert_eq!(week.totals.total_worked_hours, 18.0);
    }

    #[actix_web::test]
    async fn all_daily_reports_enrich_users() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", "Jane").await;
        seed_user(&store, "u2", "John").await;
        work_day(&store, "u1", 15).await;
        work_day(&store, "u2", 15).await;

        let svc = ReportService::new(store);
        let mut rows = svc.all_daily_reports(date(15)).await.unwrap();
        rows.sort_by(|a, b| a.uid.cmp(&b.uid));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].employee.first_name, "Jane");
        assert_eq!(rows[1].employee.first_name, "John");
        assert_eq!(rows[0].summary.total_worked_hours, 9.0);
    }

    #[actix_web::test]
    async fn all_weekly_reports_group_by_employee() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", "Jane").await;
        seed_user(&store, "u2", "John").await;
        work_day(&store, "u1", 15).await;
        work_day(&store, "u1", 16).await;
        work_day(&store, "u2", 16).await;

        let svc = ReportService::new(store);
        let rows = svc.all_weekly_reports(date(15), date(21)).await.unwrap();
        assert_eq!(rows.len(), 2);

        let jane = rows.iter().find(|r| r.uid == "u1").unwrap();
        assert_eq!(jane.days.len(), 2);
        assert_eq!(jane.totals.regular_hours, 18.0);

        let john = rows.iter().find(|r| r.uid == "u2").unwrap();
        assert_eq!(john.days.len(), 1);
        assert_eq!(john.totals.regular_hours, 9.0);
    }

    #[test]
    fn default_week_encloses_monday_to_sunday() {
        // 2024-01-17 is a Wednesday
        assert_eq!(default_week(date(17)), (date(15), date(21)));
        // Monday maps to itself
        assert_eq!(default_week(date(15)), (date(15), date(21)));
        // Sunday belongs to the week that started six days earlier
        assert_eq!(default_week(date(21)), (date(15), date(21)));
    }
}
