//! Storage capability traits and the clock abstraction.
//!
//! The review engine reaches items, sessions and statistics only through
//! these async traits. `recall_core::memory` and `recall-store` provide the
//! in-memory and SQLite implementations.

use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{Item, ItemId, NewItem, OwnerId, Session, SessionId};
use crate::statistics::UserStats;

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Item store
// ---------------------------------------------------------------------------

/// Per-owner vocabulary items with scheduling state.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert a new item, assigning its id. The item is due at `now`.
    async fn insert(&self, item: NewItem, now: DateTime<Utc>) -> StoreResult<Item>;

    /// Items of `owner` due at `now`, most overdue first, at most `limit`.
    async fn get_due_items(
        &self,
        owner: OwnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Item>>;

    async fn get_by_id(&self, id: ItemId) -> StoreResult<Option<Item>>;

    /// Overwrite an existing item. Fails with `NotFound` if it is gone.
    async fn update(&self, item: &Item) -> StoreResult<()>;

    /// All items of `owner`, ordered by due time.
    async fn list_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Item>>;

    async fn delete(&self, id: ItemId) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

/// Durable review sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> StoreResult<()>;

    /// Overwrite an existing session. Fails with `NotFound` if it is gone.
    async fn update(&self, session: &Session) -> StoreResult<()>;

    async fn get_by_id(&self, id: SessionId) -> StoreResult<Option<Session>>;

    /// Sessions of `owner`, newest first.
    async fn get_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Session>>;

    async fn delete_by_id(&self, id: SessionId) -> StoreResult<()>;

    /// Delete sessions whose last activity is before `cutoff`. Returns the
    /// number of sessions removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    /// All sessions not yet completed, oldest first.
    async fn list_active(&self) -> StoreResult<Vec<Session>>;
}

// ---------------------------------------------------------------------------
// Answer commit
// ---------------------------------------------------------------------------

/// Durable record of one graded answer.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Overwrite the rescheduled item, if there is one, and create or
    /// overwrite the session, as a single unit. On error neither write is
    /// visible. Fails with `NotFound` if the item is gone.
    async fn commit_answer(&self, item: Option<&Item>, session: &Session) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Stats store
// ---------------------------------------------------------------------------

/// One graded answer, as recorded in the learner's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub is_correct: bool,
    /// Time the learner took to answer.
    pub elapsed: StdDuration,
    pub reviewed_at: DateTime<Utc>,
}

/// Per-owner review statistics.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn record_review(&self, owner: OwnerId, review: &ReviewRecord) -> StoreResult<()>;

    async fn get_stats(&self, owner: OwnerId) -> StoreResult<Option<UserStats>>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
