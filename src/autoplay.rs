//! Attract-mode player
//!
//! Types for the headless runner and idle demos: after a reaction delay it
//! submits the word closest to the bottom, occasionally fumbling it.

use crate::sim::{RandomSource, Session, SimRng};

#[derive(Debug, Clone)]
pub struct AutoPlayer {
    rng: SimRng,
    /// Seconds between submissions
    reaction_secs: f32,
    /// Chance a submission carries a typo
    typo_rate: f32,
    waited: f32,
}

impl AutoPlayer {
    pub fn new(seed: u64, reaction_secs: f32, typo_rate: f32) -> Self {
        Self {
            rng: SimRng::new(seed),
            reaction_secs: reaction_secs.max(0.0),
            typo_rate: typo_rate.clamp(0.0, 1.0),
            waited: 0.0,
        }
    }

    /// Text to submit after `dt` more seconds of watching, if any
    pub fn think<R: RandomSource>(&mut self, session: &Session<R>, dt: f32) -> Option<String> {
        if !session.phase().is_playing() {
            self.waited = 0.0;
            return None;
        }
        self.waited += dt;
        if self.waited < self.reaction_secs {
            return None;
        }

        // Most dangerous word: the one nearest the bottom edge
        let target = session
            .words()
            .max_by(|a, b| (a.pos.y + a.size.y).total_cmp(&(b.pos.y + b.size.y)))?;
        self.waited = 0.0;

        let mut text = target.required_text.clone();
        if self.rng.chance(self.typo_rate) {
            text.push('q');
        }
        Some(text)
    }
}
