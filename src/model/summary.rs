use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::attendance::Metrics;

/// One entry of a summary's ordered punch list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchEntry {
    pub attendance_id: String,
    pub punch_in: DateTime<Utc>,
    pub punch_out: DateTime<Utc>,
}

/// Per-(uid, workDate) rollup. Exists only while the day has at least one
/// completed, non-voided record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub uid: String,

    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub work_date: NaiveDate,

    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub night_diff_hours: f64,
    pub total_worked_hours: f64,

    /// Set by the day's earliest punch-in; later punches never touch it.
    pub late_minutes: i64,
    /// Set by the day's latest punch-out; a return from break resets it.
    pub undertime_minutes: i64,

    pub punches: Vec<PunchEntry>,

    pub updated_at: DateTime<Utc>,
}

/// Deterministic document id, `uid_YYYY-MM-DD`.
pub fn summary_id(uid: &str, work_date: NaiveDate) -> String {
    format!("{}_{}", uid, work_date.format("%Y-%m-%d"))
}

impl DailySummary {
    pub fn id(&self) -> String {
        summary_id(&self.uid, self.work_date)
    }

    /// Seed a fresh summary from the first completed record of the day.
    pub fn from_metrics(
        uid: &str,
        metrics: &Metrics,
        entry: PunchEntry,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.to_string(),
            work_date: metrics.work_date,
            regular_hours: metrics.regular_hours,
            overtime_hours: metrics.overtime_hours,
            night_diff_hours: metrics.night_diff_hours,
            total_worked_hours: metrics.total_worked_hours,
            late_minutes: metrics.late_minutes,
            undertime_minutes: metrics.undertime_minutes,
            punches: vec![entry],
            updated_at: now,
        }
    }
}

/// Accumulated metric fields for weekly views. Hours re-round to 2
/// decimals after every addition; minute fields are exact integer sums.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub night_diff_hours: f64,
    pub total_worked_hours: f64,
    pub late_minutes: i64,
    pub undertime_minutes: i64,
}

impl SummaryTotals {
    pub fn add(&mut self, s: &DailySummary) {
        self.regular_hours = round2(self.regular_hours + s.regular_hours);
        self.overtime_hours = round2(self.overtime_hours + s.overtime_hours);
        self.night_diff_hours = round2(self.night_diff_hours + s.night_diff_hours);
        self.total_worked_hours = round2(self.total_worked_hours + s.total_worked_hours);
        self.late_minutes += s.late_minutes;
        self.undertime_minutes += s.undertime_minutes;
    }
}

pub fn round2(h: f64) -> f64 {
    (h * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_id_is_deterministic() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(summary_id("u1", d), "u1_2024-01-15");
    }

    #[test]
    fn totals_round_after_each_addition() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let day = |h: f64| DailySummary {
            uid: "u1".into(),
            work_date: d,
            regular_hours: h,
            overtime_hours: 0.0,
            night_diff_hours: 0.0,
            total_worked_hours: h,
            late_minutes: 1,
            undertime_minutes: 2,
            punches: vec![],
            updated_at: DateTime::UNIX_EPOCH,
        };

        let mut totals = SummaryTotals::default();
        totals.add(&day(8.33));
        totals.add(&day(8.33));
        totals.add(&day(8.34));
        assert_eq!(totals.regular_hours, 25.0);
        assert_eq!(totals.late_minutes, 3);
        assert_eq!(totals.undertime_minutes, 6);
    }
}
