//! Punch-pair labor metrics.
//!
//! Everything here is pure integer-millisecond arithmetic over UTC
//! instants. The organization runs in a single fixed-offset zone (UTC+8,
//! no DST); a punch is attributed entirely to the local calendar date of
//! its punch-in, with the worked interval capped at that date's local
//! midnight.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::model::attendance::Metrics;

/// Fixed local zone offset, milliseconds east of UTC.
const OFFSET_MS: i64 = 8 * 60 * 60 * 1000;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Night-differential window: local 22:00 through 06:00 the next day.
const NIGHT_START_MS: i64 = 22 * HOUR_MS;
const NIGHT_LEN_MS: i64 = 8 * HOUR_MS;

/// Parsed schedule window, local clock-face times on the work date.
#[derive(Debug, Clone, Copy)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Computes the metrics for one punch pair against a schedule window.
///
/// Total for any `punch_out >= punch_in`; no I/O, deterministic. The five
/// categories all derive from interval overlaps against three anchors
/// (schedule start, schedule end, local midnight) so they stay mutually
/// consistent: `totalWorkedHours == regularHours + overtimeHours`, and
/// minutes before schedule start are never credited.
pub fn compute(punch_in: DateTime<Utc>, punch_out: DateTime<Utc>, shift: ShiftWindow) -> Metrics {
    let pi = punch_in.timestamp_millis();

    // Local midnight of the punch-in's calendar date, still in local ms.
    let local_pi = pi + OFFSET_MS;
    let local_day_start = local_pi.div_euclid(DAY_MS) * DAY_MS;
    let work_date = date_of_local_ms(local_day_start);

    let sched_start = local_day_start + ms_of_time(shift.start) - OFFSET_MS;
    let sched_end = local_day_start + ms_of_time(shift.end) - OFFSET_MS;

    // Cap at 23:59:59.999 local; time past midnight is not attributed to
    // the next day.
    let end_of_work_day = local_day_start + DAY_MS - 1 - OFFSET_MS;
    let po = punch_out.timestamp_millis().min(end_of_work_day);

    let regular_ms = overlap(pi, po, sched_start, sched_end);
    let late_ms = (pi - sched_start).max(0);

    let undertime_ms = if po < sched_end {
        // Leaving before even arriving still owes the remaining schedule
        // from its start, not from the punch-in.
        (sched_end - po.max(sched_start)).max(0)
    } else {
        0
    };

    // OT starts at the punch-in when the whole pair sits after the
    // schedule end; otherwise at the schedule end.
    let overtime_ms = (po - pi.max(sched_end)).max(0);

    // Every local 22:00-06:00 window that can intersect the pair, starting
    // with the one anchored the evening before the work date.
    let mut night_diff_ms = 0;
    let mut win_start = local_day_start - DAY_MS + NIGHT_START_MS - OFFSET_MS;
    while win_start < po {
        night_diff_ms += overlap(pi, po, win_start, win_start + NIGHT_LEN_MS);
        win_start += DAY_MS;
    }

    Metrics {
        work_date,
        regular_hours: to_hours(regular_ms),
        overtime_hours: to_hours(overtime_ms),
        night_diff_hours: to_hours(night_diff_ms),
        total_worked_hours: to_hours(regular_ms + overtime_ms),
        late_minutes: to_minutes(late_ms),
        undertime_minutes: to_minutes(undertime_ms),
    }
}

/// Local calendar date of an instant, used when a record carries no
/// metrics to name its work date.
pub fn local_date_of(instant: DateTime<Utc>) -> NaiveDate {
    let local = instant.timestamp_millis() + OFFSET_MS;
    date_of_local_ms(local.div_euclid(DAY_MS) * DAY_MS)
}

fn date_of_local_ms(local_midnight_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(local_midnight_ms)
        .unwrap()
        .date_naive()
}

fn ms_of_time(t: NaiveTime) -> i64 {
    use chrono::Timelike;
    (t.num_seconds_from_midnight() as i64) * 1000
}

fn overlap(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> i64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0)
}

fn to_hours(ms: i64) -> f64 {
    ((ms as f64) / (HOUR_MS as f64) * 100.0).round() / 100.0
}

fn to_minutes(ms: i64) -> i64 {
    ((ms as f64) / (MINUTE_MS as f64)).round() as i64
}
