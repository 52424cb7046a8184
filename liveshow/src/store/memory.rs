use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use api::session::{LiveSession, SessionStatus};
use async_trait::async_trait;
use uuid::Uuid;

use super::{SessionFilter, SessionPatch, SessionStore, StoreError, StoreResult};

/// In-process record store, keeps insertion order for equal start times
#[derive(Clone, Default)]
pub struct MemStore {
    list: Arc<RwLock<Vec<LiveSession>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable` until restored
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<LiveSession>> {
        self.list.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<LiveSession>> {
        self.list.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionStore for MemStore {
    async fn query(&self, filter: SessionFilter) -> StoreResult<Vec<LiveSession>> {
        self.check()?;
        let mut sessions: Vec<LiveSession> = self
            .read()
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.start_time);
        if let Some(limit) = filter.limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<LiveSession>> {
        self.check()?;
        Ok(self.read().iter().find(|s| s.id == id).cloned())
    }

    async fn insert(&self, mut session: LiveSession) -> StoreResult<LiveSession> {
        self.check()?;
        session.id = Uuid::new_v4().to_string();
        self.write().push(session.clone());
        Ok(session)
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> StoreResult<LiveSession> {
        self.check()?;
        let mut list = self.write();
        let session = list
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(session);
        Ok(session.clone())
    }

    async fn update_if(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: SessionPatch,
    ) -> StoreResult<LiveSession> {
        self.check()?;
        let mut list = self.write();
        let session = list
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if session.status != expected {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected,
                actual: session.status,
            });
        }
        if let Some(next) = patch.status {
            if !expected.can_transition_to(next) {
                return Err(StoreError::Rejected(format!("{} -> {}", expected, next)));
            }
        }
        patch.apply(session);
        Ok(session.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.check()?;
        let mut list = self.write();
        let len = list.len();
        list.retain(|s| s.id != id);
        if list.len() == len {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
