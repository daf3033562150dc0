//! Deferred action scheduler
//!
//! Every timer in the game (spawn cadence, countdown ticks, fragment
//! spawns, level transition delays) is a named one-shot entry here.
//! Repeating timers are re-armed by the session when they fire. Time is
//! simulation seconds, advanced only by the session's frame step.

use super::level::Level;
use super::pool::SpawnRequest;

/// What to do when a scheduled entry comes due
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredAction {
    Spawn,
    CountdownTick,
    /// Second half of a SPLIT word
    SpawnFragment(SpawnRequest),
    /// Start `Level` after a win
    Advance(Level),
    /// Level 5's unconditional collapse
    Collapse,
    /// Collapse message shown long enough, begin fading
    CollapseFade,
    /// Fade finished, reset to idle
    CollapseReset,
}

impl DeferredAction {
    /// Name used for cancellation; entries sharing a name cancel together
    pub fn name(&self) -> &'static str {
        match self {
            DeferredAction::Spawn => "spawn",
            DeferredAction::CountdownTick => "countdown",
            DeferredAction::SpawnFragment(_) => "fragment",
            DeferredAction::Advance(_) => "advance",
            DeferredAction::Collapse => "collapse",
            DeferredAction::CollapseFade => "collapse-fade",
            DeferredAction::CollapseReset => "collapse-reset",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    due: f64,
    seq: u64,
    action: DeferredAction,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: f64,
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time (seconds)
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn schedule_in(&mut self, delay_secs: f64, action: DeferredAction) -> f64 {
        let due = self.now + delay_secs.max(0.0);
        self.schedule_at(due, action);
        due
    }

    pub fn schedule_at(&mut self, due: f64, action: DeferredAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { due, seq, action });
    }

    /// Remove and return the earliest entry due at or before `until`,
    /// moving the clock to its due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, until: f64) -> Option<(f64, DeferredAction)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= until)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        let entry = self.entries.swap_remove(index);
        self.now = self.now.max(entry.due);
        Some((entry.due, entry.action))
    }

    /// Move the clock forward once every due entry has been popped
    pub fn advance_to(&mut self, t: f64) {
        self.now = self.now.max(t);
    }

    /// Cancel every entry named `name`; returns how many were dropped
    pub fn cancel(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.action.name() != name);
        before - self.entries.len()
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
