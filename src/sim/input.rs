//! Input resolver
//!
//! Matches submitted text against live words and keeps the player's score
//! and streak accumulators, which carry across levels.

use serde::{Deserialize, Serialize};

use super::pool::WordPool;
use super::word::WordId;

/// Trim and lowercase a raw submission
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Cross-level player performance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub score: i64,
    pub popped: u32,
    pub streak: u32,
    pub best_streak: u32,
}

impl Stats {
    pub fn record_pop(&mut self, gain: u32) {
        self.score += i64::from(gain);
        self.popped += 1;
        self.streak += 1;
        self.best_streak = self.best_streak.max(self.streak);
    }

    pub fn record_mismatch(&mut self, penalty: u32) {
        self.score -= i64::from(penalty);
        self.streak = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Match(WordId),
    /// No live word matched; the penalty is the input's length
    Miss { penalty: u32 },
}

/// Resolve an already-normalized, non-empty submission
pub fn resolve(pool: &WordPool, target: &str) -> Resolution {
    match pool.find_required(target) {
        Some(id) => Resolution::Match(id),
        None => Resolution::Miss {
            penalty: target.chars().count() as u32,
        },
    }
}

/// What a submission did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputOutcome {
    /// No level is being played
    Inactive,
    /// Blank after trimming
    Empty,
    /// Swallowed by Level 5's broken input
    Dropped,
    Popped { id: WordId, gain: u32 },
    Mismatch { penalty: u32 },
}
