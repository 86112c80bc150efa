use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Local work schedule: two `HH:MM` clock-face times on the same calendar
/// day, `start < end`. Stored as the raw strings the admin assigned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Schedule {
    #[schema(example = "09:00")]
    pub start: String,

    #[schema(example = "18:00")]
    pub end: String,
}

impl Schedule {
    /// Parses both fields as `HH:MM`. `None` when either misses the
    /// format; callers decide what that means (bad request vs. missing
    /// precondition).
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = parse_hhmm(&self.start)?;
        let end = parse_hhmm(&self.end)?;
        Some((start, end))
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,

    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role_id: u8,

    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub position: Option<String>,

    pub schedule: Option<Schedule>,
    /// IANA zone name. Stored for the record; the metrics engine runs in
    /// the organization's fixed offset regardless.
    pub timezone: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Display fields exposed to clients and reports. Never carries the hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub schedule: Option<Schedule>,
    pub timezone: Option<String>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            uid: u.uid,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            department: u.department,
            position: u.position,
            schedule: u.schedule,
            timezone: u.timezone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_window_parses_hhmm() {
        let s = Schedule {
            start: "09:00".into(),
            end: "18:00".into(),
        };
        let (start, end) = s.window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn schedule_window_rejects_garbage() {
        let s = Schedule {
            start: "9am".into(),
            end: "18:00".into(),
        };
        assert!(s.window().is_none());

        let s = Schedule {
            start: "".into(),
            end: "18:00".into(),
        };
        assert!(s.window().is_none());
    }
}
