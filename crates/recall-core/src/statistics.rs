//! Learner statistics and session summaries.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Item, OwnerId, Session, SessionId};
use crate::traits::ReviewRecord;

/// Running review statistics for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub owner: OwnerId,
    pub total_reviews: u64,
    pub total_correct: u64,
    /// Consecutive calendar days (UTC) with at least one review.
    pub streak_days: u32,
    pub max_streak_days: u32,
    pub total_time_secs: u64,
    #[serde(default)]
    pub last_review_at: Option<DateTime<Utc>>,
}

impl UserStats {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            total_reviews: 0,
            total_correct: 0,
            streak_days: 0,
            max_streak_days: 0,
            total_time_secs: 0,
            last_review_at: None,
        }
    }

    /// Fold one graded answer into the statistics.
    pub fn record_review(&mut self, review: &ReviewRecord) {
        self.total_reviews += 1;
        if review.is_correct {
            self.total_correct += 1;
        }
        self.total_time_secs += review.elapsed.as_secs();
        self.update_streak(review.reviewed_at);
        self.last_review_at = Some(review.reviewed_at);
    }

    fn update_streak(&mut self, at: DateTime<Utc>) {
        let today = at.date_naive();
        self.streak_days = match self.last_review_at.map(|t| t.date_naive()) {
            Some(last) if last == today => self.streak_days.max(1),
            Some(last) if last.succ_opt() == Some(today) => self.streak_days + 1,
            _ => 1,
        };
        self.max_streak_days = self.max_streak_days.max(self.streak_days);
    }

    /// Percent of reviews answered correctly.
    pub fn accuracy(&self) -> f64 {
        if self.total_reviews == 0 {
            return 0.0;
        }
        self.total_correct as f64 / self.total_reviews as f64 * 100.0
    }

    /// Mean answer time in seconds.
    pub fn average_time_secs(&self) -> f64 {
        if self.total_reviews == 0 {
            return 0.0;
        }
        self.total_time_secs as f64 / self.total_reviews as f64
    }
}

/// How an owner's vocabulary stands overall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyProgress {
    pub total: usize,
    pub learned: usize,
    pub due: usize,
    /// Percent of items learned.
    pub progress: f64,
}

impl VocabularyProgress {
    pub fn compute(items: &[Item], now: DateTime<Utc>) -> Self {
        let total = items.len();
        let learned = items.iter().filter(|i| i.is_learned()).count();
        let due = items.iter().filter(|i| i.is_due(now)).count();
        let progress = if total == 0 {
            0.0
        } else {
            learned as f64 / total as f64 * 100.0
        };
        Self {
            total,
            learned,
            due,
            progress,
        }
    }
}

/// Advice attached to a finished session, by accuracy band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// 90% and above.
    Excellent,
    /// 70% and above.
    Good,
    /// 50% and above.
    Fair,
    NeedsPractice,
}

impl Recommendation {
    pub fn for_accuracy(accuracy: f64) -> Self {
        if accuracy >= 90.0 {
            Recommendation::Excellent
        } else if accuracy >= 70.0 {
            Recommendation::Good
        } else if accuracy >= 50.0 {
            Recommendation::Fair
        } else {
            Recommendation::NeedsPractice
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Recommendation::Excellent => "Excellent result! Your intervals can grow.",
            Recommendation::Good => "Good result, keep going.",
            Recommendation::Fair => "Not bad. Review a little more often.",
            Recommendation::NeedsPractice => {
                "Spend more time on these words. Adding usage examples helps."
            }
        };
        f.write_str(text)
    }
}

/// Final report of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub owner: OwnerId,
    pub total: usize,
    pub correct: usize,
    /// `correct / total` in percent.
    pub accuracy: f64,
    pub duration: Duration,
    pub recommendation: Recommendation,
}

impl SessionSummary {
    /// Summarize `session`; an open session is measured up to `now`.
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        let total = session.total();
        let accuracy = if total == 0 {
            0.0
        } else {
            session.correct_count as f64 / total as f64 * 100.0
        };
        Self {
            session_id: session.id,
            owner: session.owner,
            total,
            correct: session.correct_count,
            accuracy,
            duration: session.duration(now),
            recommendation: Recommendation::for_accuracy(accuracy),
        }
    }
}
