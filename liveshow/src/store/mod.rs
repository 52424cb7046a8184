use api::session::{LiveSession, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

mod memory;
mod rest;

pub use memory::MemStore;
pub use rest::RestStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session {id} is {actual}, expected {expected}")]
    Conflict {
        id: String,
        expected: SessionStatus,
        actual: SessionStatus,
    },

    #[error("record store rejected request: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    /// `start_time > after`
    pub after: Option<DateTime<Utc>>,
    /// `start_time <= until`
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl SessionFilter {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn after(mut self, t: DateTime<Utc>) -> Self {
        self.after = Some(t);
        self
    }

    pub fn until(mut self, t: DateTime<Utc>) -> Self {
        self.until = Some(t);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, session: &LiveSession) -> bool {
        if let Some(status) = self.status {
            if session.status != status {
                return false;
            }
        }
        if let Some(after) = self.after {
            match session.start_time {
                Some(start) if start > after => {}
                _ => return false,
            }
        }
        if let Some(until) = self.until {
            match session.start_time {
                Some(start) if start <= until => {}
                _ => return false,
            }
        }
        true
    }
}

/// Partial update, absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_count: Option<u32>,
}

impl SessionPatch {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn ended(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(SessionStatus::Ended),
            end_time: Some(at),
            ..Default::default()
        }
    }

    pub fn viewer_count(count: u32) -> Self {
        Self {
            viewer_count: Some(count),
            ..Default::default()
        }
    }

    pub fn apply(&self, session: &mut LiveSession) {
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(end_time) = self.end_time {
            session.end_time = Some(end_time);
        }
        if let Some(viewer_count) = self.viewer_count {
            session.viewer_count = viewer_count;
        }
    }
}

/// Persistence for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Matching records by ascending start time, ties in insertion order
    async fn query(&self, filter: SessionFilter) -> StoreResult<Vec<LiveSession>>;

    async fn get(&self, id: &str) -> StoreResult<Option<LiveSession>>;

    /// Persist a new record, the store assigns its id
    async fn insert(&self, session: LiveSession) -> StoreResult<LiveSession>;

    async fn update(&self, id: &str, patch: SessionPatch) -> StoreResult<LiveSession>;

    /// Apply `patch` only while the stored status still equals `expected`
    async fn update_if(
        &self,
        id: &str,
        expected: SessionStatus,
        patch: SessionPatch,
    ) -> StoreResult<LiveSession>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}
