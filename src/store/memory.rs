//! HashMap-backed store. Backs the test suites and `DATABASE_URL`-less
//! runs; state lives for the process only.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::attendance::AttendanceRecord;
use crate::model::summary::DailySummary;
use crate::model::user::User;

use super::{
    AttendanceQuery, AttendanceStore, Store, StoreError, StoreResult, SummaryStore, UserStore,
};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    attendance: RwLock<HashMap<String, AttendanceRecord>>,
    summaries: RwLock<HashMap<String, DailySummary>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
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

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, uid: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().unwrap().get(uid).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        if users.contains_key(&user.uid) {
            return Err(StoreError::AlreadyExists(format!(
                "user {} already exists",
                user.uid
            )));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::AlreadyExists("email already registered".into()));
        }
        users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        self.users
            .write()
            .unwrap()
            .insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn all(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().unwrap().values().cloned().collect())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn create(&self, record: &AttendanceRecord) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut stored = record.clone();
        stored.id = id.clone();
        self.attendance.write().unwrap().insert(id.clone(), stored);
        Ok(id)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.attendance.read().unwrap().get(id).cloned())
    }

    async fn update(&self, record: &AttendanceRecord) -> StoreResult<()> {
        self.attendance
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.attendance.write().unwrap().remove(id).is_some())
    }

    async fn query(&self, q: AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>> {
        let records = self.attendance.read().unwrap();
        let mut hits: Vec<AttendanceRecord> = records
            .values()
            .filter(|r| q.uid.as_deref().map_or(true, |uid| r.uid == uid))
            .filter(|r| !q.open_only || r.punch_out.is_open())
            .filter(|r| {
                q.punch_in_range
                    .map_or(true, |(start, end)| r.punch_in >= start && r.punch_in <= end)
            })
            .cloned()
            .collect();
        hits.sort_by_key(|r| r.punch_in);
        if let Some(limit) = q.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn get(&self, summary_id: &str) -> StoreResult<Option<DailySummary>> {
        Ok(self.summaries.read().unwrap().get(summary_id).cloned())
    }

    async fn set(&self, summary: &DailySummary) -> StoreResult<()> {
        self.summaries
            .write()
            .unwrap()
            .insert(summary.id(), summary.clone());
        Ok(())
    }

    async fn delete(&self, summary_id: &str) -> StoreResult<()> {
        self.summaries.write().unwrap().remove(summary_id);
        Ok(())
    }

    async fn list_by_work_date(&self, work_date: NaiveDate) -> StoreResult<Vec<DailySummary>> {
        Ok(self
            .summaries
            .read()
            .unwrap()
            .values()
            .filter(|s| s.work_date == work_date)
            .cloned()
            .collect())
    }

    async fn list_by_uid_and_range(
        &self,
        uid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailySummary>> {
        Ok(self
            .summaries
            .read()
            .unwrap()
            .values()
            .filter(|s| s.uid == uid && s.work_date >= start && s.work_date <= end)
            .cloned()
            .collect())
    }

    async fn list_by_work_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailySummary>> {
        Ok(self
            .summaries
            .read()
            .unwrap()
            .values()
            .filter(|s| s.work_date >= start && s.work_date <= end)
            .cloned()
            .collect())
    }
}
