//! Adaptive difficulty evaluator (Level 3)
//!
//! Watches how quickly the player pops words and how many escape, and picks
//! the single modifier rule Level 3 spawns under. Rule selection is a pure
//! function of the pop/miss history: replaying the same sequence yields the
//! same rules.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::tuning::AdaptiveTuning;

/// Modifier rule active during Level 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveRule {
    /// Fresh words arrive as two halves
    Split,
    /// Words fall fast with little sideways motion
    Heavy,
    /// Missed words come back fully corrupted
    Recur,
}

impl ActiveRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveRule::Split => "SPLIT",
            ActiveRule::Heavy => "HEAVY",
            ActiveRule::Recur => "RECUR",
        }
    }
}

/// How a single pop is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopPace {
    Fast,
    Neutral,
    Slow,
}

/// Rolling player-performance metrics and the rule they select
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveEvaluator {
    #[serde(skip)]
    tuning: AdaptiveTuning,
    /// Incremental mean of time-to-pop (seconds)
    pub average: f32,
    pub pops: u32,
    pub fast_streak: u32,
    pub slow_streak: u32,
    pub missed: u32,
    /// Original texts of words that reached the bottom, oldest first
    pub recycle: VecDeque<String>,
    pub active: Option<ActiveRule>,
}

impl AdaptiveEvaluator {
    pub fn new(tuning: AdaptiveTuning) -> Self {
        Self {
            tuning,
            average: 0.0,
            pops: 0,
            fast_streak: 0,
            slow_streak: 0,
            missed: 0,
            recycle: VecDeque::new(),
            active: None,
        }
    }

    pub fn classify(&self, time_to_pop: f32) -> PopPace {
        if time_to_pop < self.tuning.fast_secs {
            PopPace::Fast
        } else if time_to_pop > self.tuning.slow_secs {
            PopPace::Slow
        } else {
            PopPace::Neutral
        }
    }

    /// Fold one pop into the metrics and re-select the active rule
    pub fn record_pop(&mut self, time_to_pop: f32) -> Option<ActiveRule> {
        self.pops += 1;
        self.average += (time_to_pop - self.average) / self.pops as f32;

        match self.classify(time_to_pop) {
            PopPace::Fast => {
                self.fast_streak += 1;
                self.slow_streak = 0;
            }
            PopPace::Slow => {
                self.slow_streak += 1;
                self.fast_streak = 0;
            }
            PopPace::Neutral => {
                self.fast_streak = 0;
                self.slow_streak = 0;
            }
        }

        let previous = self.active;
        self.active = self.select();
        if self.active != previous {
            log::debug!(
                "Adaptive rule {} -> {} (avg {:.2}s, fast {}, slow {}, missed {})",
                previous.map_or("none", |r| r.as_str()),
                self.active.map_or("none", |r| r.as_str()),
                self.average,
                self.fast_streak,
                self.slow_streak,
                self.missed,
            );
        }
        self.active
    }

    /// Count an escaped word and queue its text for recycling
    pub fn record_miss(&mut self, original: &str) {
        self.missed += 1;
        if !original.is_empty() {
            self.recycle.push_back(original.to_string());
        }
    }

    /// Rule the current metrics call for, highest precedence first
    pub fn select(&self) -> Option<ActiveRule> {
        let t = &self.tuning;
        if self.missed > t.recur_after_missed {
            Some(ActiveRule::Recur)
        } else if self.fast_streak >= t.fast_streak || self.average < t.split_average_secs {
            Some(ActiveRule::Split)
        } else if self.slow_streak >= t.slow_streak || self.average > t.heavy_average_secs {
            Some(ActiveRule::Heavy)
        } else {
            None
        }
    }

    /// Oldest missed word still waiting to come back
    pub fn take_recycled(&mut self) -> Option<String> {
        self.recycle.pop_front()
    }
}
