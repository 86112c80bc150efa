//! MySQL-backed store. All queries are runtime-bound; instants are stored
//! as fixed-width ISO-8601 UTC strings (so lexicographic range scans on
//! `punch_in` and `work_date` are chronological), metrics and punch lists
//! as JSON columns.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySqlPool, Row};

use crate::model::attendance::{AttendanceRecord, Metrics, PunchOut, VOIDED_SENTINEL};
use crate::model::summary::{DailySummary, PunchEntry};
use crate::model::user::{Schedule, User};

use super::{
    AttendanceQuery, AttendanceStore, Store, StoreError, StoreResult, SummaryStore, UserStore,
};

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Idempotent schema bootstrap, run once at startup.
    pub async fn migrate(&self) -> StoreResult<()> {
        for ddl in [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                uid VARCHAR(64) PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role_id TINYINT UNSIGNED NOT NULL,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                department VARCHAR(100) NULL,
                position VARCHAR(100) NULL,
                schedule_start VARCHAR(5) NULL,
                schedule_end VARCHAR(5) NULL,
                timezone VARCHAR(64) NULL,
                created_at VARCHAR(32) NOT NULL,
                updated_at VARCHAR(32) NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id CHAR(36) PRIMARY KEY,
                uid VARCHAR(64) NOT NULL,
                punch_in VARCHAR(32) NOT NULL,
                punch_out VARCHAR(32) NULL,
                metrics JSON NULL,
                voided TINYINT(1) NOT NULL DEFAULT 0,
                voided_at VARCHAR(32) NULL,
                void_reason VARCHAR(255) NULL,
                admin_edited TINYINT(1) NOT NULL DEFAULT 0,
                created_at VARCHAR(32) NOT NULL,
                updated_at VARCHAR(32) NULL,
                INDEX idx_attendance_uid (uid)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS daily_summary (
                id VARCHAR(80) PRIMARY KEY,
                uid VARCHAR(64) NOT NULL,
                work_date CHAR(10) NOT NULL,
                regular_hours DOUBLE NOT NULL,
                overtime_hours DOUBLE NOT NULL,
                night_diff_hours DOUBLE NOT NULL,
                total_worked_hours DOUBLE NOT NULL,
                late_minutes BIGINT NOT NULL,
                undertime_minutes BIGINT NOT NULL,
                punches JSON NOT NULL,
                updated_at VARCHAR(32) NOT NULL,
                INDEX idx_summary_work_date (work_date),
                INDEX idx_summary_uid_date (uid, work_date)
            )
            "#,
        ] {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl Store for MySqlStore {
    fn users(&self) -> &dyn UserStore {
        self
    }

    fn attendance(&self) -> &dyn AttendanceStore {
        self
    }

    fn daily_summary(&self) -> &dyn SummaryStore {
        self
    }
}

fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad stored instant {s:?}: {e}")))
}

fn opt_ts(s: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

fn fmt_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn user_from_row(row: &MySqlRow) -> StoreResult<User> {
    let schedule_start: Option<String> = row.try_get("schedule_start")?;
    let schedule_end: Option<String> = row.try_get("schedule_end")?;
    let schedule = match (schedule_start, schedule_end) {
        (Some(start), Some(end)) => Some(Schedule { start, end }),
        _ => None,
    };

    Ok(User {
        uid: row.try_get("uid")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role_id: row.try_get("role_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        department: row.try_get("department")?,
        position: row.try_get("position")?,
        schedule,
        timezone: row.try_get("timezone")?,
        created_at: parse_ts(row.try_get::<String, _>("created_at")?.as_str())?,
        updated_at: opt_ts(row.try_get("updated_at")?)?,
    })
}

fn attendance_from_row(row: &MySqlRow) -> StoreResult<AttendanceRecord> {
    let punch_out = match row.try_get::<Option<String>, _>("punch_out")? {
        None => PunchOut::Open,
        Some(s) if s == VOIDED_SENTINEL => PunchOut::Voided,
        Some(s) => PunchOut::At(parse_ts(&s)?),
    };

    let metrics: Option<Json<Metrics>> = row.try_get("metrics")?;

    Ok(AttendanceRecord {
        id: row.try_get("id")?,
        uid: row.try_get("uid")?,
        punch_in: parse_ts(row.try_get::<String, _>("punch_in")?.as_str())?,
        punch_out,
        metrics: metrics.map(|m| m.0),
        voided: row.try_get("voided")?,
        voided_at: opt_ts(row.try_get("voided_at")?)?,
        void_reason: row.try_get("void_reason")?,
        admin_edited: row.try_get("admin_edited")?,
        created_at: parse_ts(row.try_get::<String, _>("created_at")?.as_str())?,
        updated_at: opt_ts(row.try_get("updated_at")?)?,
    })
}

fn punch_out_column(p: PunchOut) -> Option<String> {
    match p {
        PunchOut::Open => None,
        PunchOut::Voided => Some(VOIDED_SENTINEL.to_string()),
        PunchOut::At(t) => Some(fmt_ts(t)),
    }
}

fn summary_from_row(row: &MySqlRow) -> StoreResult<DailySummary> {
    let work_date: String = row.try_get("work_date")?;
    let work_date = work_date
        .parse::<NaiveDate>()
        .map_err(|e| StoreError::Backend(format!("bad stored work_date: {e}")))?;
    let punches: Json<Vec<PunchEntry>> = row.try_get("punches")?;

    Ok(DailySummary {
        uid: row.try_get("uid")?,
        work_date,
        regular_hours: row.try_get("regular_hours")?,
        overtime_hours: row.try_get("overtime_hours")?,
        night_diff_hours: row.try_get("night_diff_hours")?,
        total_worked_hours: row.try_get("total_worked_hours")?,
        late_minutes: row.try_get("late_minutes")?,
        undertime_minutes: row.try_get("undertime_minutes")?,
        punches: punches.0,
        updated_at: parse_ts(row.try_get::<String, _>("updated_at")?.as_str())?,
    })
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn get(&self, uid: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users
            (uid, email, password_hash, role_id, first_name, last_name,
             department, position, schedule_start, schedule_end, timezone,
             created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.department)
        .bind(&user.position)
        .bind(user.schedule.as_ref().map(|s| s.start.clone()))
        .bind(user.schedule.as_ref().map(|s| s.end.clone()))
        .bind(&user.timezone)
        .bind(fmt_ts(user.created_at))
        .bind(user.updated_at.map(fmt_ts))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
                Err(StoreError::AlreadyExists("email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                email = ?, password_hash = ?, role_id = ?, first_name = ?,
                last_name = ?, department = ?, position = ?,
                schedule_start = ?, schedule_end = ?, timezone = ?, updated_at = ?
            WHERE uid = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.department)
        .bind(&user.position)
        .bind(user.schedule.as_ref().map(|s| s.start.clone()))
        .bind(user.schedule.as_ref().map(|s| s.end.clone()))
        .bind(&user.timezone)
        .bind(user.updated_at.map(fmt_ts))
        .bind(&user.uid)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn create(&self, record: &AttendanceRecord) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO attendance
            (id, uid, punch_in, punch_out, metrics, voided, voided_at,
             void_reason, admin_edited, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.uid)
        .bind(fmt_ts(record.punch_in))
        .bind(punch_out_column(record.punch_out))
        .bind(record.metrics.as_ref().map(Json))
        .bind(record.voided)
        .bind(record.voided_at.map(fmt_ts))
        .bind(&record.void_reason)
        .bind(record.admin_edited)
        .bind(fmt_ts(record.created_at))
        .bind(record.updated_at.map(fmt_ts))
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<AttendanceRecord>> {
        let row = sqlx::query("SELECT * FROM attendance WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(attendance_from_row).transpose()
    }

    async fn update(&self, record: &AttendanceRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE attendance SET
                uid = ?, punch_in = ?, punch_out = ?, metrics = ?, voided = ?,
                voided_at = ?, void_reason = ?, admin_edited = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.uid)
        .bind(fmt_ts(record.punch_in))
        .bind(punch_out_column(record.punch_out))
        .bind(record.metrics.as_ref().map(Json))
        .bind(record.voided)
        .bind(record.voided_at.map(fmt_ts))
        .bind(&record.void_reason)
        .bind(record.admin_edited)
        .bind(record.updated_at.map(fmt_ts))
        .bind(&record.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, q: AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>> {
        // Same dynamic WHERE building as the rest of the list endpoints;
        // every binding is a string thanks to the ISO column encoding.
        let mut conditions = Vec::new();
        let mut bindings: Vec<String> = Vec::new();

        if let Some(uid) = &q.uid {
            conditions.push("uid = ?");
            bindings.push(uid.clone());
        }
        if q.open_only {
            conditions.push("punch_out IS NULL");
        }
        if let Some((start, end)) = q.punch_in_range {
            conditions.push("punch_in >= ?");
            bindings.push(fmt_ts(start));
            conditions.push("punch_in <= ?");
            bindings.push(fmt_ts(end));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let mut sql = format!(
            "SELECT * FROM attendance {} ORDER BY punch_in ASC",
            where_clause
        );
        if let Some(limit) = q.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut query = sqlx::query(&sql);
        for b in &bindings {
            query = query.bind(b);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(attendance_from_row).collect()
    }
}

#[async_trait]
impl SummaryStore for MySqlStore {
    async fn get(&self, summary_id: &str) -> StoreResult<Option<DailySummary>> {
        let row = sqlx::query("SELECT * FROM daily_summary WHERE id = ?")
            .bind(summary_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(summary_from_row).transpose()
    }

    async fn set(&self, summary: &DailySummary) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_summary
            (id, uid, work_date, regular_hours, overtime_hours, night_diff_hours,
             total_worked_hours, late_minutes, undertime_minutes, punches, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                regular_hours = VALUES(regular_hours),
                overtime_hours = VALUES(overtime_hours),
                night_diff_hours = VALUES(night_diff_hours),
                total_worked_hours = VALUES(total_worked_hours),
                late_minutes = VALUES(late_minutes),
                undertime_minutes = VALUES(undertime_minutes),
                punches = VALUES(punches),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(summary.id())
        .bind(&summary.uid)
        .bind(fmt_date(summary.work_date))
        .bind(summary.regular_hours)
        .bind(summary.overtime_hours)
        .bind(summary.night_diff_hours)
        .bind(summary.total_worked_hours)
        .bind(summary.late_minutes)
        .bind(summary.undertime_minutes)
        .bind(Json(&summary.punches))
        .bind(fmt_ts(summary.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, summary_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM daily_summary WHERE id = ?")
            .bind(summary_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_work_date(&self, work_date: NaiveDate) -> StoreResult<Vec<DailySummary>> {
        let rows = sqlx::query("SELECT * FROM daily_summary WHERE work_date = ?")
            .bind(fmt_date(work_date))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn list_by_uid_and_range(
        &self,
        uid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailySummary>> {
        let rows = sqlx::query(
            "SELECT * FROM daily_summary WHERE uid = ? AND work_date >= ? AND work_date <= ?",
        )
        .bind(uid)
        .bind(fmt_date(start))
        .bind(fmt_date(end))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn list_by_work_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailySummary>> {
        let rows =
            sqlx::query("SELECT * FROM daily_summary WHERE work_date >= ? AND work_date <= ?")
                .bind(fmt_date(start))
                .bind(fmt_date(end))
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(summary_from_row).collect()
    }
}
