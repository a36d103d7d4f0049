//! Review session engine.
//!
//! Walks each learner through a fixed queue of due items and grades
//! answers. Each answer's rescheduled item and the advanced session are
//! committed together, so an interrupted session resumes where it stopped
//! and never replays an answer the item already counted.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{InvalidState, ReviewError};
use crate::model::{answers_match, AnswerResult, Item, OwnerId, Session};
use crate::scheduler::{compute_next_review, ReviewOutcome};
use crate::selection::select_due;
use crate::statistics::{SessionSummary, VocabularyProgress};
use crate::traits::{
    AnswerStore, Clock, ItemStore, ReviewRecord, SessionStore, StatsStore, SystemClock,
};

/// Configuration for the review engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Session size used when `start_session` is asked for zero items.
    pub default_limit: usize,
    /// Sessions idle for longer than this are reclaimed by a sweep.
    pub session_max_age: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            session_max_age: Duration::hours(24),
        }
    }
}

/// Per-owner registry entry. `loaded` is false until the owner's sessions
/// have been read from the session store.
#[derive(Debug, Default)]
struct OwnerSlot {
    loaded: bool,
    session: Option<Session>,
}

/// The central review engine.
pub struct ReviewEngine {
    items: Arc<dyn ItemStore>,
    sessions: Arc<dyn SessionStore>,
    answers: Arc<dyn AnswerStore>,
    stats: Arc<dyn StatsStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    registry: Mutex<HashMap<OwnerId, Arc<AsyncMutex<OwnerSlot>>>>,
}

impl ReviewEngine {
    pub fn new(
        items: Arc<dyn ItemStore>,
        sessions: Arc<dyn SessionStore>,
        answers: Arc<dyn AnswerStore>,
        stats: Arc<dyn StatsStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            items,
            sessions,
            answers,
            stats,
            clock: Arc::new(SystemClock),
            config,
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Build an engine over a single backend implementing every store.
    pub fn with_store<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: ItemStore + SessionStore + AnswerStore + StatsStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store, config)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a review session for `owner` with up to `limit` items, or
    /// the configured default when `limit` is zero.
    ///
    /// An unfinished session of the same owner is returned unchanged; a
    /// completed one that was never finalized is finalized first.
    pub async fn start_session(&self, owner: OwnerId, limit: usize) -> Result<Session, ReviewError> {
        let slot = self.slot(owner);
        let mut slot = slot.lock().await;
        self.ensure_loaded(owner, &mut slot).await?;

        if let Some(existing) = &slot.session {
            if !existing.completed {
                tracing::info!(
                    owner,
                    session = %existing.id,
                    position = existing.current_index,
                    "resuming unfinished review session"
                );
                return Ok(existing.clone());
            }
            self.finalize(&mut slot).await?;
        }

        let limit = if limit == 0 { self.config.default_limit } else { limit };
        let now = self.clock.now();
        let items = select_due(self.items.as_ref(), owner, limit, now).await?;
        let session = Session::new(owner, items, now);
        self.sessions.create(&session).await?;

        tracing::info!(
            owner,
            session = %session.id,
            items = session.total(),
            "started review session"
        );
        slot.session = Some(session.clone());
        Ok(session)
    }

    /// Grade `answer` against the owner's current question and advance.
    pub async fn process_answer(
        &self,
        owner: OwnerId,
        answer: &str,
    ) -> Result<AnswerResult, ReviewError> {
        let slot = self.slot(owner);
        let mut slot = slot.lock().await;
        self.ensure_loaded(owner, &mut slot).await?;

        let mut next = match &slot.session {
            None => return Err(ReviewError::InvalidSessionState(InvalidState::NoActiveSession)),
            Some(s) if s.completed => {
                return Err(ReviewError::InvalidSessionState(InvalidState::AlreadyCompleted))
            }
            Some(s) => s.clone(),
        };
        let asked = next
            .current_item()
            .cloned()
            .ok_or(ReviewError::InvalidSessionState(InvalidState::AlreadyCompleted))?;

        let is_correct = answers_match(answer, &asked.translation);
        let now = self.clock.now();

        let mut scheduled = self.reschedule(&asked, is_correct, now).await?;

        let elapsed = (now - next.last_activity_at).to_std().unwrap_or_default();
        next.record_answer(is_correct, now)
            .map_err(ReviewError::InvalidSessionState)?;

        let mut committed = self
            .answers
            .commit_answer(scheduled.as_ref().map(|(item, _)| item), &next)
            .await;
        if scheduled.is_some() && matches!(&committed, Err(err) if err.is_not_found()) {
            tracing::warn!(owner, item = asked.id, "item removed before commit, answer not scheduled");
            scheduled = None;
            committed = self.answers.commit_answer(None, &next).await;
        }
        if let Err(err) = committed {
            tracing::error!(owner, session = %next.id, "failed to persist answer: {err}");
            return Err(err.into());
        }

        let record = ReviewRecord {
            is_correct,
            elapsed,
            reviewed_at: now,
        };
        if let Err(err) = self.stats.record_review(owner, &record).await {
            tracing::warn!(owner, "failed to record review stats: {err}");
        }

        tracing::debug!(
            owner,
            item = asked.id,
            is_correct,
            quality = scheduled.as_ref().map(|(_, o)| o.quality),
            "answer recorded"
        );

        let progress = next.progress();
        slot.session = Some(next);

        Ok(AnswerResult {
            is_correct,
            correct_answer: asked.translation,
            original: asked.original,
            quality: scheduled.as_ref().map(|(_, o)| o.quality),
            next_interval: scheduled.as_ref().map(|(_, o)| o.next_interval()),
            progress,
        })
    }

    /// Finalize the owner's completed session: report it, delete it from
    /// the session store and drop it from memory.
    ///
    /// Returns `None` when there is nothing to finalize, so repeated calls
    /// are harmless.
    pub async fn complete_session(
        &self,
        owner: OwnerId,
    ) -> Result<Option<SessionSummary>, ReviewError> {
        let slot = self.slot(owner);
        let mut slot = slot.lock().await;
        self.ensure_loaded(owner, &mut slot).await?;

        let summary = match &slot.session {
            None => return Ok(None),
            Some(s) if !s.completed => {
                return Err(ReviewError::InvalidSessionState(InvalidState::NotFinished))
            }
            Some(s) => SessionSummary::from_session(s, self.clock.now()),
        };
        self.finalize(&mut slot).await?;

        tracing::info!(
            owner,
            session = %summary.session_id,
            correct = summary.correct,
            total = summary.total,
            "completed review session"
        );
        Ok(Some(summary))
    }

    /// Drop the owner's session whatever its state. Returns whether one
    /// existed.
    pub async fn abandon_session(&self, owner: OwnerId) -> Result<bool, ReviewError> {
        let slot = self.slot(owner);
        let mut slot = slot.lock().await;
        self.ensure_loaded(owner, &mut slot).await?;

        if slot.session.is_none() {
            return Ok(false);
        }
        self.finalize(&mut slot).await?;
        tracing::info!(owner, "abandoned review session");
        Ok(true)
    }

    /// The owner's current session, loading it from the store if needed.
    pub async fn active_session(&self, owner: OwnerId) -> Result<Option<Session>, ReviewError> {
        let slot = self.slot(owner);
        let mut slot = slot.lock().await;
        self.ensure_loaded(owner, &mut slot).await?;
        Ok(slot.session.clone())
    }

    /// Load every unfinished session from the store into memory. Returns
    /// the number of owners with a resumable session.
    pub async fn restore_active(&self) -> Result<usize, ReviewError> {
        let active = self.sessions.list_active().await?;
        let owners: BTreeSet<OwnerId> = active.iter().map(|s| s.owner).collect();

        let loads = owners.into_iter().map(|owner| async move {
            let slot = self.slot(owner);
            let mut slot = slot.lock().await;
            self.ensure_loaded(owner, &mut slot).await?;
            Ok::<bool, ReviewError>(slot.session.as_ref().is_some_and(|s| !s.completed))
        });
        let restored = futures::future::try_join_all(loads)
            .await?
            .into_iter()
            .filter(|resumable| *resumable)
            .count();

        tracing::info!(restored, "restored active review sessions");
        Ok(restored)
    }

    /// Number of unfinished sessions held in memory.
    pub async fn active_session_count(&self) -> usize {
        let mut count = 0;
        for slot in self.slots() {
            let slot = slot.lock().await;
            if slot.session.as_ref().is_some_and(|s| !s.completed) {
                count += 1;
            }
        }
        count
    }

    /// Vocabulary-wide progress for `owner`.
    pub async fn vocabulary_progress(
        &self,
        owner: OwnerId,
    ) -> Result<VocabularyProgress, ReviewError> {
        let items = self.items.list_by_owner(owner).await?;
        Ok(VocabularyProgress::compute(&items, self.clock.now()))
    }

    /// Reclaim sessions idle for longer than the configured maximum age.
    pub async fn sweep_expired(&self) -> Result<usize, ReviewError> {
        self.sweep_stale(self.config.session_max_age).await
    }

    /// Reclaim sessions whose last activity is older than `max_age`.
    ///
    /// Persisted sessions are deleted from the store; in-memory sessions
    /// are evicted only when their owner is not busy answering. Returns the
    /// number of sessions deleted from the store.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<usize, ReviewError> {
        let cutoff = self.clock.now() - max_age;
        let removed = self.sessions.delete_older_than(cutoff).await?;

        let mut evicted = 0usize;
        for slot in self.slots() {
            let Ok(mut slot) = slot.try_lock() else {
                continue;
            };
            if slot
                .session
                .as_ref()
                .is_some_and(|s| s.last_activity_at < cutoff)
            {
                slot.session = None;
                slot.loaded = false;
                evicted += 1;
            }
        }
        self.prune_idle();

        if removed > 0 || evicted > 0 {
            tracing::info!(removed, evicted, "swept stale review sessions");
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn slot(&self, owner: OwnerId) -> Arc<AsyncMutex<OwnerSlot>> {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(registry.entry(owner).or_default())
    }

    fn slots(&self) -> Vec<Arc<AsyncMutex<OwnerSlot>>> {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.values().cloned().collect()
    }

    /// Drop registry entries that hold no session and that no task is
    /// using.
    fn prune_idle(&self) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot
                    .try_lock()
                    .map(|slot| slot.session.is_some())
                    .unwrap_or(true)
        });
    }

    /// Read the owner's sessions from the store on first use.
    ///
    /// The newest valid session wins. Corrupt sessions and older unfinished
    /// duplicates are deleted.
    async fn ensure_loaded(&self, owner: OwnerId, slot: &mut OwnerSlot) -> Result<(), ReviewError> {
        if slot.loaded {
            return Ok(());
        }

        let stored = self.sessions.get_by_owner(owner).await?;
        let mut chosen: Option<Session> = None;
        for session in stored {
            let discard = match session.validate() {
                Err(reason) => {
                    tracing::warn!(owner, session = %session.id, "discarding corrupt session: {reason}");
                    true
                }
                Ok(()) if session.owner != owner => {
                    tracing::warn!(owner, session = %session.id, "discarding session of another owner");
                    true
                }
                Ok(()) if chosen.is_none() => {
                    chosen = Some(session);
                    continue;
                }
                Ok(()) if !session.completed => {
                    tracing::warn!(owner, session = %session.id, "discarding duplicate unfinished session");
                    true
                }
                Ok(()) => false,
            };
            if discard {
                self.delete_quietly(&session).await;
            }
        }

        if let Some(session) = &chosen {
            tracing::debug!(
                owner,
                session = %session.id,
                position = session.current_index,
                "loaded review session"
            );
        }
        slot.session = chosen;
        slot.loaded = true;
        Ok(())
    }

    /// Schedule the live copy of `asked` without storing it. Returns the
    /// rescheduled item together with the outcome, or `None` when the item
    /// no longer exists.
    async fn reschedule(
        &self,
        asked: &Item,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<(Item, ReviewOutcome)>, ReviewError> {
        let Some(live) = self.items.get_by_id(asked.id).await? else {
            tracing::warn!(
                owner = asked.owner,
                item = asked.id,
                "item removed during session, answer not scheduled"
            );
            return Ok(None);
        };

        let outcome = compute_next_review(&live, is_correct);
        let mut updated = live;
        updated.apply_review(&outcome, is_correct, now);
        Ok(Some((updated, outcome)))
    }

    async fn finalize(&self, slot: &mut OwnerSlot) -> Result<(), ReviewError> {
        if let Some(session) = &slot.session {
            match self.sessions.delete_by_id(session.id).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }
        slot.session = None;
        Ok(())
    }

    async fn delete_quietly(&self, session: &Session) {
        if let Err(err) = self.sessions.delete_by_id(session.id).await {
            if !err.is_not_found() {
                tracing::warn!(session = %session.id, "failed to delete discarded session: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::fixtures::at;
    use crate::model::NewItem;
    use crate::traits::ManualClock;

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        engine: ReviewEngine,
    }

    impl Harness {
        fn engine(&self) -> ReviewEngine {
            ReviewEngine::with_store(self.store.clone(), EngineConfig::default())
                .with_clock(self.clock.clone())
        }
    }

    /// Store with `n` items for owner 1 ("w{i}" -> "t{i}"), due in insertion
    /// order.
    async fn harness(n: i64) -> Harness {
        let store = Arc::new(MemoryStore::new());
        for i in 0..n {
            store
                .insert(NewItem::new(1, format!("w{i}"), format!("t{i}")), at(i))
                .await
                .unwrap();
        }
        let clock = Arc::new(ManualClock::new(at(1_000)));
        let engine = ReviewEngine::with_store(store.clone(), EngineConfig::default())
            .with_clock(clock.clone());
        Harness {
            store,
            clock,
            engine,
        }
    }

    async fn live(store: &MemoryStore, id: i64) -> Item {
        ItemStore::get_by_id(store, id).await.unwrap().unwrap()
    }

    fn check_invariants(s: &Session) {
        assert!(s.correct_count <= s.current_index);
        assert!(s.current_index <= s.total());
        assert_eq!(s.completed, s.current_index == s.total());
    }

    #[tokio::test]
    async fn nothing_due_yields_no_items_available() {
        let h = harness(0).await;
        let err = h.engine.start_session(1, 10).await.unwrap_err();
        assert!(matches!(err, ReviewError::NoItemsAvailable { owner: 1 }));
        assert_eq!(h.store.session_count(), 0);
    }

    #[tokio::test]
    async fn full_session_walkthrough() {
        let h = harness(3).await;
        let session = h.engine.start_session(1, 10).await.unwrap();
        assert_eq!(session.total(), 3);
        assert_eq!(session.items[0].original, "w0");
        assert_eq!(h.store.session_writes(), 1);

        let answers = ["  T0 ", "wrong", "t2"];
        let mut last_index = 0;
        for (step, answer) in answers.iter().enumerate() {
            h.clock.advance(Duration::seconds(5));
            let result = h.engine.process_answer(1, answer).await.unwrap();
            assert_eq!(result.correct_answer, format!("t{step}"));
            assert_eq!(result.progress.current, step + 1);

            let current = h.engine.active_session(1).await.unwrap().unwrap();
            check_invariants(&current);
            assert!(current.current_index > last_index);
            last_index = current.current_index;
        }

        let current = h.engine.active_session(1).await.unwrap().unwrap();
        assert!(current.completed);
        assert_eq!(current.correct_count, 2);
        assert_eq!(current.ended_at, Some(at(1_015)));

        let summary = h.engine.complete_session(1).await.unwrap().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.duration, Duration::seconds(15));
        assert_eq!(h.store.session_count(), 0);
        assert!(h.engine.complete_session(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn answer_reschedules_live_item_not_snapshot() {
        let h = harness(2).await;
        let session = h.engine.start_session(1, 10).await.unwrap();

        let result = h.engine.process_answer(1, "t0").await.unwrap();
        assert!(result.is_correct);
        assert_eq!(result.quality, Some(3));
        assert_eq!(result.next_interval, Some(Duration::days(1)));

        let item = live(&h.store, session.items[0].id).await;
        assert_eq!(item.review_count, 1);
        assert_eq!(item.consecutive_correct, 1);
        assert_eq!(item.next_due_at, at(1_000) + Duration::days(1));

        let current = h.engine.active_session(1).await.unwrap().unwrap();
        assert_eq!(current.items[0].review_count, 0);
    }

    #[tokio::test]
    async fn wrong_answer_resets_streak() {
        let h = harness(1).await;
        let mut it = live(&h.store, 1).await;
        it.consecutive_correct = 4;
        it.review_count = 6;
        ItemStore::update(h.store.as_ref(), &it).await.unwrap();

        h.engine.start_session(1, 10).await.unwrap();
        let result = h.engine.process_answer(1, "nope").await.unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.quality, Some(0));
        assert!(result.progress.is_complete);
        assert_eq!(result.progress.accuracy, 0.0);

        let it = live(&h.store, 1).await;
        assert_eq!(it.consecutive_correct, 0);
        assert_eq!(it.review_count, 7);
        assert!((it.difficulty - 2.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn completed_session_rejects_answers_without_side_effects() {
        let h = harness(1).await;
        h.engine.start_session(1, 10).await.unwrap();
        h.engine.process_answer(1, "t0").await.unwrap();

        let item_writes = h.store.item_writes();
        let session_writes = h.store.session_writes();
        let before = h.engine.active_session(1).await.unwrap();

        let err = h.engine.process_answer(1, "t0").await.unwrap_err();
        assert!(matches!(
            err,
            ReviewError::InvalidSessionState(InvalidState::AlreadyCompleted)
        ));
        assert_eq!(h.store.item_writes(), item_writes);
        assert_eq!(h.store.session_writes(), session_writes);
        assert_eq!(h.engine.active_session(1).await.unwrap(), before);
    }

    #[tokio::test]
    async fn answer_without_session_is_invalid() {
        let h = harness(1).await;
        let err = h.engine.process_answer(1, "t0").await.unwrap_err();
        assert!(matches!(
            err,
            ReviewError::InvalidSessionState(InvalidState::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn complete_before_finish_is_rejected() {
        let h = harness(2).await;
        h.engine.start_session(1, 10).await.unwrap();
        h.engine.process_answer(1, "t0").await.unwrap();
        let err = h.engine.complete_session(1).await.unwrap_err();
        assert!(matches!(
            err,
            ReviewError::InvalidSessionState(InvalidState::NotFinished)
        ));
        assert_eq!(h.store.session_count(), 1);
    }

    #[tokio::test]
    async fn zero_limit_uses_configured_default() {
        let h = harness(5).await;
        let config = EngineConfig {
            default_limit: 2,
            ..EngineConfig::default()
        };
        let engine = ReviewEngine::with_store(h.store.clone(), config).with_clock(h.clock.clone());

        let session = engine.start_session(1, 0).await.unwrap();
        assert_eq!(session.total(), 2);
        engine.abandon_session(1).await.unwrap();

        let session = engine.start_session(1, 4).await.unwrap();
        assert_eq!(session.total(), 4);
    }

    #[tokio::test]
    async fn starting_again_resumes_unfinished_session() {
        let h = harness(3).await;
        let first = h.engine.start_session(1, 10).await.unwrap();
        h.engine.process_answer(1, "t0").await.unwrap();

        let again = h.engine.start_session(1, 2).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.current_index, 1);
        assert_eq!(h.store.session_count(), 1);
    }

    #[tokio::test]
    async fn starting_after_unfinalized_completion_replaces_session() {
        let h = harness(2).await;
        let first = h.engine.start_session(1, 1).await.unwrap();
        h.engine.process_answer(1, "t0").await.unwrap();

        let second = h.engine.start_session(1, 10).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.items[0].original, "w1");
        assert_eq!(h.store.session_count(), 1);
    }

    #[tokio::test]
    async fn session_write_failure_leaves_state_untouched() {
        let h = harness(2).await;
        h.engine.start_session(1, 10).await.unwrap();
        let before_item = live(&h.store, 1).await;
        let before_session = h.engine.active_session(1).await.unwrap();

        h.store.fail_session_writes(true);
        let err = h.engine.process_answer(1, "t0").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(live(&h.store, 1).await, before_item);
        assert_eq!(h.engine.active_session(1).await.unwrap(), before_session);

        h.store.fail_session_writes(false);
        let result = h.engine.process_answer(1, "t0").await.unwrap();
        assert_eq!(result.progress.current, 1);
        assert_eq!(live(&h.store, 1).await.review_count, 1);
    }

    #[tokio::test]
    async fn failed_commit_is_replayed_exactly_once() {
        let h = harness(2).await;
        h.engine.start_session(1, 10).await.unwrap();
        let item_writes = h.store.item_writes();

        h.store.fail_session_writes(true);
        assert!(h.engine.process_answer(1, "t0").await.is_err());
        assert_eq!(h.store.item_writes(), item_writes);

        let restarted = h.engine();
        let resumed = restarted.active_session(1).await.unwrap().unwrap();
        assert_eq!(resumed.current_index, 0);
        assert_eq!(live(&h.store, 1).await.review_count, 0);

        h.store.fail_session_writes(false);
        let result = restarted.process_answer(1, "t0").await.unwrap();
        assert_eq!(result.progress.current, 1);
        let item = live(&h.store, 1).await;
        assert_eq!(item.review_count, 1);
        assert_eq!(item.consecutive_correct, 1);
    }

    #[tokio::test]
    async fn item_write_failure_leaves_state_untouched() {
        let h = harness(1).await;
        h.engine.start_session(1, 10).await.unwrap();
        let before = h.engine.active_session(1).await.unwrap();

        h.store.fail_item_writes(true);
        let err = h.engine.process_answer(1, "t0").await.unwrap_err();
        assert!(matches!(err, ReviewError::PersistenceFailure(_)));
        assert_eq!(h.engine.active_session(1).await.unwrap(), before);
        assert_eq!(live(&h.store, 1).await.review_count, 0);
    }

    #[tokio::test]
    async fn stats_failure_does_not_fail_the_answer() {
        let h = harness(1).await;
        h.engine.start_session(1, 10).await.unwrap();
        h.store.fail_stats_writes(true);
        assert!(h.engine.process_answer(1, "t0").await.is_ok());
        assert!(h.store.get_stats(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_record_time_since_previous_answer() {
        let h = harness(2).await;
        h.engine.start_session(1, 10).await.unwrap();
        h.clock.advance(Duration::seconds(4));
        h.engine.process_answer(1, "t0").await.unwrap();
        h.clock.advance(Duration::seconds(6));
        h.engine.process_answer(1, "bad").await.unwrap();

        let stats = h.store.get_stats(1).await.unwrap().unwrap();
        assert_eq!(stats.total_reviews, 2);
        assert_eq!(stats.total_correct, 1);
        assert_eq!(stats.total_time_secs, 10);
    }

    #[tokio::test]
    async fn removed_item_still_advances_session() {
        let h = harness(2).await;
        h.engine.start_session(1, 10).await.unwrap();
        h.store.delete(1).await.unwrap();

        let result = h.engine.process_answer(1, "t0").await.unwrap();
        assert!(result.is_correct);
        assert!(result.quality.is_none());
        assert!(result.next_interval.is_none());
        assert_eq!(result.progress.current, 1);
    }

    #[tokio::test]
    async fn new_engine_resumes_from_persisted_index() {
        let h = harness(4).await;
        let session = h.engine.start_session(1, 10).await.unwrap();
        h.engine.process_answer(1, "t0").await.unwrap();
        h.engine.process_answer(1, "x").await.unwrap();

        let restarted = h.engine();
        let resumed = restarted.active_session(1).await.unwrap().unwrap();
        assert_eq!(resumed.id, session.id);
        assert_eq!(resumed.current_index, 2);
        assert_eq!(resumed.correct_count, 1);

        let result = restarted.process_answer(1, "t2").await.unwrap();
        assert_eq!(result.correct_answer, "t2");
        assert_eq!(result.progress.current, 3);
    }

    #[tokio::test]
    async fn corrupt_persisted_session_is_discarded() {
        let h = harness(2).await;
        let mut broken = Session::new(1, vec![live(&h.store, 1).await], at(0));
        broken.correct_count = 3;
        h.store.create(&broken).await.unwrap();

        assert!(h.engine.active_session(1).await.unwrap().is_none());
        assert_eq!(h.store.session_count(), 0);
        assert!(h.engine.start_session(1, 10).await.is_ok());
    }

    #[tokio::test]
    async fn restore_active_loads_unfinished_sessions() {
        let h = harness(2).await;
        for owner in [7, 8] {
            h.store
                .insert(NewItem::new(owner, "hola", "hello"), at(0))
                .await
                .unwrap();
        }
        h.engine.start_session(7, 10).await.unwrap();
        h.engine.start_session(8, 10).await.unwrap();
        h.engine.process_answer(8, "hello").await.unwrap();

        let restarted = h.engine();
        assert_eq!(restarted.restore_active().await.unwrap(), 1);
        assert_eq!(restarted.active_session_count().await, 1);
    }

    #[tokio::test]
    async fn abandon_drops_session() {
        let h = harness(2).await;
        h.engine.start_session(1, 10).await.unwrap();
        assert!(h.engine.abandon_session(1).await.unwrap());
        assert!(!h.engine.abandon_session(1).await.unwrap());
        assert_eq!(h.store.session_count(), 0);
    }

    #[tokio::test]
    async fn sweep_reclaims_only_stale_sessions() {
        let h = harness(2).await;
        for owner in [2, 3] {
            h.store
                .insert(NewItem::new(owner, "hola", "hello"), at(0))
                .await
                .unwrap();
        }
        h.engine.start_session(2, 10).await.unwrap();
        h.clock.advance(Duration::hours(20));
        h.engine.start_session(3, 10).await.unwrap();
        h.clock.advance(Duration::hours(5));

        let removed = h.engine.sweep_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(h.engine.active_session(2).await.unwrap().is_none());
        assert!(h.engine.active_session(3).await.unwrap().is_some());
        assert_eq!(h.store.session_count(), 1);
    }

    #[tokio::test]
    async fn sweep_skips_busy_owner_and_prunes_idle_slots() {
        let h = harness(1).await;
        h.engine.start_session(1, 10).await.unwrap();
        assert!(h.engine.active_session(2).await.unwrap().is_none());
        h.clock.advance(Duration::hours(30));

        let held = h.engine.slot(1);
        let guard = held.lock().await;
        let swept = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            h.engine.sweep_expired(),
        )
        .await
        .expect("sweep waited on a busy owner");
        assert_eq!(swept.unwrap(), 1);
        assert!(guard.session.is_some());
        drop(guard);

        {
            let registry = h.engine.registry.lock().unwrap();
            assert!(registry.contains_key(&1));
            assert!(!registry.contains_key(&2));
        }
        drop(held);

        h.engine.sweep_expired().await.unwrap();
        assert!(h.engine.registry.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_answers_for_one_owner_are_serialized() {
        let h = harness(10).await;
        let engine = Arc::new(h.engine);
        engine.start_session(1, 10).await.unwrap();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.process_answer(1, "wrong").await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }

        let session = engine.active_session(1).await.unwrap().unwrap();
        assert!(session.completed);
        assert_eq!(session.current_index, 10);
        for id in 1..=10 {
            assert_eq!(live(&h.store, id).await.review_count, 1);
        }
    }

    #[tokio::test]
    async fn vocabulary_progress_reflects_answers() {
        let h = harness(2).await;
        let before = h.engine.vocabulary_progress(1).await.unwrap();
        assert_eq!(before.total, 2);
        assert_eq!(before.due, 2);

        h.engine.start_session(1, 10).await.unwrap();
        h.engine.process_answer(1, "t0").await.unwrap();
        let after = h.engine.vocabulary_progress(1).await.unwrap();
        assert_eq!(after.due, 1);
        assert_eq!(after.learned, 0);
    }
}
