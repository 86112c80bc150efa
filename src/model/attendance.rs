use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

/// The punch-out slot of a record. On the wire and at rest this is
/// `null` while open, the string `"VOIDED"` for a cancelled open punch,
/// and an ISO-8601 UTC instant once closed. The cancelled state doubles
/// as the exclusion marker for every aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PunchOut {
    #[default]
    Open,
    Voided,
    At(DateTime<Utc>),
}

impl PunchOut {
    pub fn is_open(&self) -> bool {
        matches!(self, PunchOut::Open)
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PunchOut::At(t) => Some(*t),
            _ => None,
        }
    }
}

pub const VOIDED_SENTINEL: &str = "VOIDED";

impl Serialize for PunchOut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PunchOut::Open => serializer.serialize_none(),
            PunchOut::Voided => serializer.serialize_str(VOIDED_SENTINEL),
            PunchOut::At(t) => serializer
                .serialize_str(&t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        }
    }
}

impl<'de> Deserialize<'de> for PunchOut {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(PunchOut::Open),
            Some(s) if s == VOIDED_SENTINEL => Ok(PunchOut::Voided),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| PunchOut::At(t.with_timezone(&Utc)))
                .map_err(|e| D::Error::custom(format!("invalid punchOut instant {s:?}: {e}"))),
        }
    }
}

/// Per-pair labor metrics, computed once at close (or admin re-edit)
/// against the schedule in force at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Local calendar date of the punch-in; the daily aggregation key.
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub work_date: NaiveDate,

    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub night_diff_hours: f64,
    pub total_worked_hours: f64,

    pub late_minutes: i64,
    pub undertime_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub uid: String,

    pub punch_in: DateTime<Utc>,

    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2024-01-15T10:00:00.000Z")]
    pub punch_out: PunchOut,

    /// Present exactly when the record is closed.
    pub metrics: Option<Metrics>,

    #[serde(default)]
    pub voided: bool,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,

    #[serde(default)]
    pub admin_edited: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    /// Completed and countable: closed with a concrete instant. The only
    /// records the daily rollup ever sees.
    pub fn is_completed(&self) -> bool {
        self.punch_out.closed_at().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn punch_out_wire_states() {
        assert_eq!(
            serde_json::to_value(PunchOut::Open).unwrap(),
            serde_json::Value::Null
        );
        assert_eq!(
            serde_json::to_value(PunchOut::Voided).unwrap(),
            serde_json::json!("VOIDED")
        );

        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            serde_json::to_value(PunchOut::At(t)).unwrap(),
            serde_json::json!("2024-01-15T10:00:00.000Z")
        );
    }

    #[test]
    fn punch_out_parses_back() {
        let open: PunchOut = serde_json::from_str("null").unwrap();
        assert_eq!(open, PunchOut::Open);

        let voided: PunchOut = serde_json::from_str("\"VOIDED\"").unwrap();
        assert_eq!(voided, PunchOut::Voided);

        let closed: PunchOut = serde_json::from_str("\"2024-01-15T10:00:00.000Z\"").unwrap();
        assert_eq!(
            closed,
            PunchOut::At(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
        );

        assert!(serde_json::from_str::<PunchOut>("\"yesterday\"").is_err());
    }
}
