//! Persistence port: three logical collections (users, attendance,
//! dailySummary) with document-level operations. No transactions; the
//! services above this layer use read-modify-write and single-document
//! atomicity.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::attendance::AttendanceRecord;
use crate::model::summary::DailySummary;
use crate::model::user::User;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter for attendance queries. Unset fields do not constrain the
/// result; `open_only` matches records whose punch-out is still null.
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
    pub uid: Option<String>,
    pub open_only: bool,
    pub punch_in_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub limit: Option<usize>,
}

impl AttendanceQuery {
    pub fn for_uid(uid: &str) -> Self {
        Self {
            uid: Some(uid.to_string()),
            ..Default::default()
        }
    }

    pub fn open_for_uid(uid: &str) -> Self {
        Self {
            uid: Some(uid.to_string()),
            open_only: true,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, uid: &str) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Fails with `AlreadyExists` on a uid or email collision.
    async fn create(&self, user: &User) -> StoreResult<()>;
    /// Full-document write; the caller read the current version first.
    async fn update(&self, user: &User) -> StoreResult<()>;
    async fn all(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Persists the record under a store-assigned id and returns it.
    async fn create(&self, record: &AttendanceRecord) -> StoreResult<String>;
    async fn get(&self, id: &str) -> StoreResult<Option<AttendanceRecord>>;
    /// Full-document write keyed by `record.id`.
    async fn update(&self, record: &AttendanceRecord) -> StoreResult<()>;
    /// Hard delete; true when a record existed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
    async fn query(&self, q: AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn get(&self, summary_id: &str) -> StoreResult<Option<DailySummary>>;
    /// Create-or-replace under the summary's deterministic id.
    async fn set(&self, summary: &DailySummary) -> StoreResult<()>;
    /// Idempotent; deleting an absent summary is not an error.
    async fn delete(&self, summary_id: &str) -> StoreResult<()>;
    async fn list_by_work_date(&self, work_date: NaiveDate) -> StoreResult<Vec<DailySummary>>;
    async fn list_by_uid_and_range(
        &self,
        uid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailySummary>>;
    async fn list_by_work_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailySummary>>;
}

/// The bundle every service holds. One implementor owns all three
/// collections so a single `Arc<dyn Store>` travels through the app.
pub trait Store: Send + Sync {
    fn users(&self) -> &dyn UserStore;
    fn attendance(&self) -> &dyn AttendanceStore;
    fn daily_summary(&self) -> &dyn SummaryStore;
}
