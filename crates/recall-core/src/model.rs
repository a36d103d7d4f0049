//! Core data model types for recall.
//!
//! Vocabulary items carry their own scheduling state; review sessions hold
//! an immutable snapshot of the items chosen when the session started.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InvalidState, InvalidWord};
use crate::scheduler::{self, ReviewOutcome};

/// Identifier of the learner owning items and sessions.
pub type OwnerId = i64;

/// Store-assigned item identifier.
pub type ItemId = i64;

/// Review session identifier.
pub type SessionId = Uuid;

/// Maximum number of items in a single review session.
pub const MAX_SESSION_ITEMS: usize = 20;

/// Longest accepted original, translation or example, in characters.
pub const MAX_FIELD_CHARS: usize = 500;

/// A vocabulary item with its scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner: OwnerId,
    /// The word or phrase shown to the learner.
    pub original: String,
    /// The expected answer.
    pub translation: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    /// Ease factor, never below [`scheduler::MIN_EASE`].
    pub difficulty: f64,
    /// Number of times this item has been answered.
    pub review_count: u32,
    /// Successive correct answers; reset to 0 on a miss.
    pub consecutive_correct: u32,
    pub next_due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Build a fresh item from an insert payload. New items are due at once.
    pub fn from_new(id: ItemId, new: NewItem, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: new.owner,
            original: new.original,
            translation: new.translation,
            language: new.language,
            part_of_speech: new.part_of_speech,
            example: new.example,
            difficulty: scheduler::DEFAULT_EASE,
            review_count: 0,
            consecutive_correct: 0,
            next_due_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due_at <= now
    }

    pub fn is_learned(&self) -> bool {
        scheduler::is_learned(self.consecutive_correct)
    }

    /// Mastery progress in percent.
    pub fn progress(&self) -> f64 {
        scheduler::mastery_progress(self.consecutive_correct)
    }

    /// Apply a scheduler outcome for an answer given at `now`.
    pub fn apply_review(&mut self, outcome: &ReviewOutcome, is_correct: bool, now: DateTime<Utc>) {
        self.review_count += 1;
        if is_correct {
            self.consecutive_correct += 1;
        } else {
            self.consecutive_correct = 0;
        }
        self.difficulty = outcome.new_difficulty;
        self.next_due_at = now
            .checked_add_signed(outcome.next_interval())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.updated_at = now;
    }
}

/// Insert payload for a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub owner: OwnerId,
    pub original: String,
    pub translation: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

impl NewItem {
    pub fn new(owner: OwnerId, original: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            owner,
            original: original.into(),
            translation: translation.into(),
            language: None,
            part_of_speech: None,
            example: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_part_of_speech(mut self, pos: impl Into<String>) -> Self {
        self.part_of_speech = Some(pos.into());
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Check that both sides are present and no field exceeds
    /// [`MAX_FIELD_CHARS`].
    pub fn validate(&self) -> Result<(), InvalidWord> {
        if self.original.trim().is_empty() {
            return Err(InvalidWord::EmptyOriginal);
        }
        if self.translation.trim().is_empty() {
            return Err(InvalidWord::EmptyTranslation);
        }
        let fields = [
            ("original", Some(&self.original)),
            ("translation", Some(&self.translation)),
            ("example", self.example.as_ref()),
        ];
        for (field, value) in fields {
            if value.is_some_and(|v| v.chars().count() > MAX_FIELD_CHARS) {
                return Err(InvalidWord::TooLong {
                    field,
                    max: MAX_FIELD_CHARS,
                });
            }
        }
        Ok(())
    }
}

/// Lifecycle state of a review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Active,
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Created => write!(f, "created"),
            SessionState::Active => write!(f, "active"),
            SessionState::Completed => write!(f, "completed"),
        }
    }
}

/// A review session over a fixed snapshot of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub owner: OwnerId,
    /// Items chosen at creation, in question order. Never re-read for
    /// scheduling fields.
    pub items: Vec<Item>,
    /// Index of the next question; equals `items.len()` once completed.
    pub current_index: usize,
    pub correct_count: usize,
    pub started_at: DateTime<Utc>,
    /// Start time, then the time of the latest answer.
    pub last_activity_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl Session {
    /// Create a session over `items`, keeping at most [`MAX_SESSION_ITEMS`].
    pub fn new(owner: OwnerId, mut items: Vec<Item>, now: DateTime<Utc>) -> Self {
        items.truncate(MAX_SESSION_ITEMS);
        Self {
            id: Uuid::new_v4(),
            owner,
            items,
            current_index: 0,
            correct_count: 0,
            started_at: now,
            last_activity_at: now,
            ended_at: None,
            completed: false,
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn state(&self) -> SessionState {
        if self.completed {
            SessionState::Completed
        } else if self.current_index == 0 {
            SessionState::Created
        } else {
            SessionState::Active
        }
    }

    /// The item the learner is being asked about, if any remain.
    pub fn current_item(&self) -> Option<&Item> {
        if self.completed {
            return None;
        }
        self.items.get(self.current_index)
    }

    /// Record an answer to the current item and advance.
    pub fn record_answer(&mut self, is_correct: bool, now: DateTime<Utc>) -> Result<(), InvalidState> {
        if self.completed || self.current_index >= self.items.len() {
            return Err(InvalidState::AlreadyCompleted);
        }
        if is_correct {
            self.correct_count += 1;
        }
        self.current_index += 1;
        self.last_activity_at = now;
        if self.current_index == self.items.len() {
            self.completed = true;
            self.ended_at = Some(now);
        }
        Ok(())
    }

    /// Accuracy over the questions answered so far, in percent.
    pub fn accuracy(&self) -> f64 {
        if self.current_index == 0 {
            return 0.0;
        }
        self.correct_count as f64 / self.current_index as f64 * 100.0
    }

    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            current: self.current_index,
            total: self.total(),
            correct: self.correct_count,
            accuracy: self.accuracy(),
            is_complete: self.completed,
        }
    }

    /// Elapsed session time; open sessions are measured up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.unwrap_or(now) - self.started_at
    }

    /// Check the structural invariants of a (possibly reloaded) session.
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("session has no items".into());
        }
        if self.items.len() > MAX_SESSION_ITEMS {
            return Err(format!(
                "session has {} items, limit is {MAX_SESSION_ITEMS}",
                self.items.len()
            ));
        }
        if self.current_index > self.items.len() {
            return Err(format!(
                "current index {} past end of {} items",
                self.current_index,
                self.items.len()
            ));
        }
        if self.correct_count > self.current_index {
            return Err(format!(
                "correct count {} exceeds answered count {}",
                self.correct_count, self.current_index
            ));
        }
        if self.completed != (self.current_index == self.items.len()) {
            return Err("completed flag disagrees with current index".into());
        }
        if self.items.iter().any(|item| item.owner != self.owner) {
            return Err("snapshot contains items of another owner".into());
        }
        Ok(())
    }
}

/// Position and score of a session after an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    /// Questions answered so far.
    pub current: usize,
    pub total: usize,
    pub correct: usize,
    /// Percent correct of the answered questions.
    pub accuracy: f64,
    pub is_complete: bool,
}

/// Outcome of a single answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub is_correct: bool,
    pub correct_answer: String,
    pub original: String,
    /// Scheduler quality; `None` when the live item no longer exists.
    pub quality: Option<u8>,
    /// Time until the item is due again; `None` when the live item no
    /// longer exists.
    pub next_interval: Option<Duration>,
    pub progress: SessionProgress,
}

/// Case-insensitive, whitespace-trimmed answer comparison.
pub fn answers_match(given: &str, expected: &str) -> bool {
    let given = given.trim();
    let expected = expected.trim();
    given == expected || given.to_lowercase() == expected.to_lowercase()
}
