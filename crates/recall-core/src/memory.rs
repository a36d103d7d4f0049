//! In-memory store for tests and ephemeral runs.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{Item, ItemId, NewItem, OwnerId, Session, SessionId};
use crate::selection::pick_due;
use crate::statistics::UserStats;
use crate::traits::{
    AnswerStore, ItemStore, ReviewRecord, SessionStore, StatsStore, StoreResult,
};

#[derive(Default)]
struct Inner {
    next_item_id: ItemId,
    items: BTreeMap<ItemId, Item>,
    sessions: HashMap<SessionId, Session>,
    stats: HashMap<OwnerId, UserStats>,
}

/// Items, sessions and statistics held in process memory.
///
/// Writes can be made to fail on demand so callers can exercise their
/// persistence-failure paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_item_writes: AtomicBool,
    fail_session_writes: AtomicBool,
    fail_stats_writes: AtomicBool,
    item_writes: AtomicU32,
    session_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent item write fail until reset.
    pub fn fail_item_writes(&self, fail: bool) {
        self.fail_item_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent session write fail until reset.
    pub fn fail_session_writes(&self, fail: bool) {
        self.fail_session_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stats_writes(&self, fail: bool) {
        self.fail_stats_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful item inserts and updates.
    pub fn item_writes(&self) -> u32 {
        self.item_writes.load(Ordering::Relaxed)
    }

    /// Number of successful session creates and updates.
    pub fn session_writes(&self) -> u32 {
        self.session_writes.load(Ordering::Relaxed)
    }

    /// Number of sessions currently stored.
    pub fn session_count(&self) -> usize {
        self.lock().map(|inner| inner.sessions.len()).unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn check(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::backend(io::Error::other(format!(
                "injected {what} write failure"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert(&self, item: NewItem, now: DateTime<Utc>) -> StoreResult<Item> {
        Self::check(&self.fail_item_writes, "item")?;
        let mut inner = self.lock()?;
        inner.next_item_id += 1;
        let item = Item::from_new(inner.next_item_id, item, now);
        inner.items.insert(item.id, item.clone());
        self.item_writes.fetch_add(1, Ordering::Relaxed);
        Ok(item)
    }

    async fn get_due_items(
        &self,
        owner: OwnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Item>> {
        let inner = self.lock()?;
        Ok(pick_due(inner.items.values().cloned(), owner, now, limit))
    }

    async fn get_by_id(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.lock()?.items.get(&id).cloned())
    }

    async fn update(&self, item: &Item) -> StoreResult<()> {
        Self::check(&self.fail_item_writes, "item")?;
        let mut inner = self.lock()?;
        match inner.items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                self.item_writes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(StoreError::not_found("item", item.id)),
        }
    }

    async fn list_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Item>> {
        let inner = self.lock()?;
        let mut items: Vec<Item> = inner
            .items
            .values()
            .filter(|i| i.owner == owner)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.next_due_at.cmp(&b.next_due_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn delete(&self, id: ItemId) -> StoreResult<()> {
        Self::check(&self.fail_item_writes, "item")?;
        self.lock()?
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("item", id))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        Self::check(&self.fail_session_writes, "session")?;
        self.lock()?.sessions.insert(session.id, session.clone());
        self.session_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn update(&self, session: &Session) -> StoreResult<()> {
        Self::check(&self.fail_session_writes, "session")?;
        let mut inner = self.lock()?;
        match inner.sessions.get_mut(&session.id) {
            Some(existing) => {
                *existing = session.clone();
                self.session_writes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(StoreError::not_found("session", session.id)),
        }
    }

    async fn get_by_id(&self, id: SessionId) -> StoreResult<Option<Session>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn get_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Session>> {
        let inner = self.lock()?;
        let mut sessions: Vec<Session> = inner
            .sessions
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    async fn delete_by_id(&self, id: SessionId) -> StoreResult<()> {
        Self::check(&self.fail_session_writes, "session")?;
        self.lock()?
            .sessions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("session", id))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        Self::check(&self.fail_session_writes, "session")?;
        let mut inner = self.lock()?;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.last_activity_at >= cutoff);
        Ok(before - inner.sessions.len())
    }

    async fn list_active(&self) -> StoreResult<Vec<Session>> {
        let inner = self.lock()?;
        let mut sessions: Vec<Session> = inner
            .sessions
            .values()
            .filter(|s| !s.completed)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(sessions)
    }
}

#[async_trait]
impl AnswerStore for MemoryStore {
    async fn commit_answer(&self, item: Option<&Item>, session: &Session) -> StoreResult<()> {
        if item.is_some() {
            Self::check(&self.fail_item_writes, "item")?;
        }
        Self::check(&self.fail_session_writes, "session")?;
        let mut inner = self.lock()?;

        if let Some(item) = item {
            let existing = inner
                .items
                .get_mut(&item.id)
                .ok_or_else(|| StoreError::not_found("item", item.id))?;
            *existing = item.clone();
            self.item_writes.fetch_add(1, Ordering::Relaxed);
        }
        inner.sessions.insert(session.id, session.clone());
        self.session_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn record_review(&self, owner: OwnerId, review: &ReviewRecord) -> StoreResult<()> {
        Self::check(&self.fail_stats_writes, "stats")?;
        self.lock()?
            .stats
            .entry(owner)
            .or_insert_with(|| UserStats::new(owner))
            .record_review(review);
        Ok(())
    }

    async fn get_stats(&self, owner: OwnerId) -> StoreResult<Option<UserStats>> {
        Ok(self.lock()?.stats.get(&owner).cloned())
    }
}
