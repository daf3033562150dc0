//! Game session
//!
//! One explicit object owning the whole game: the word pool, the active
//! level's rules, the scheduler, the transition phase and the player's
//! stats. Hosts drive it with [`Session::frame`] plus the discrete
//! commands (`start`, `stop`, `submit_text`, ...) and read it back with
//! [`Session::view`] and [`Session::drain_events`].
//!
//! Frame order:
//! 1. Scheduled actions due within the frame fire, earliest first.
//! 2. Level `on_frame` effects, then every live word moves.
//! 3. Bottom-reached hooks run, then overlapping words merge (Level 4).
//! 4. Popped words are swept; fail is checked before win.

use std::collections::HashSet;

use serde::Serialize;

use super::input::{self, InputOutcome, Resolution, Stats};
use super::level::{FailReason, Level, LevelVariant, MergePolicy, Progress, SpawnShape};
use super::lexicon;
use super::pool::{SpawnContext, SpawnOrigin, SpawnRequest, WordPool};
use super::rng::{RandomSource, SimRng};
use super::scheduler::{DeferredAction, Scheduler};
use super::transition::{CollapseStage, Phase, Trigger, transition};
use super::view::{FrameView, Hud, HudRoll, Overlay, VisualDirective, WordView};
use super::word::{Bounds, Word, WordId};
use crate::consts::COUNTDOWN_PERIOD;
use crate::{Settings, Tuning, ms_to_secs};

/// Outbound notifications for the display and audio collaborators
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    LevelStarted { level: Level },
    LevelWon { level: Level },
    LevelFailed { level: Level, reason: FailReason },
    CollapseTriggered,
    GameReset,
    WordPopped { id: WordId, gain: u32 },
    InputMismatch { penalty: u32 },
    InputDropped,
    WordsMerged { merged: WordId },
}

/// How a level is being entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelEntry {
    NewGame,
    Advance,
    Retry,
}

#[derive(Debug)]
pub struct Session<R: RandomSource = SimRng> {
    tuning: Tuning,
    settings: Settings,
    rng: R,
    bounds: Bounds,
    pool: WordPool,
    level: LevelVariant,
    stats: Stats,
    time_remaining: Option<u32>,
    phase: Phase,
    overlay: Option<Overlay>,
    visual: VisualDirective,
    scheduler: Scheduler,
    events: Vec<GameEvent>,
}

impl Session<SimRng> {
    pub fn new(seed: u64, bounds: Bounds, tuning: Tuning, settings: Settings) -> Self {
        Self::with_rng(SimRng::new(seed), bounds, tuning, settings)
    }
}

impl<R: RandomSource> Session<R> {
    pub fn with_rng(rng: R, bounds: Bounds, tuning: Tuning, settings: Settings) -> Self {
        if let Err(err) = tuning.validate() {
            log::warn!("Running with invalid tuning: {err}");
        }
        let level = LevelVariant::new(Level::Stable, &tuning);
        Self {
            tuning,
            settings,
            rng,
            bounds,
            pool: WordPool::new(),
            level,
            stats: Stats::default(),
            time_remaining: None,
            phase: Phase::Idle,
            overlay: None,
            visual: VisualDirective::Clear,
            scheduler: Scheduler::new(),
            events: Vec::new(),
        }
    }

    // === Commands ===

    /// Begin a fresh playthrough at Level 0; ignored unless idle
    pub fn start(&mut self) -> bool {
        self.fire(Trigger::Start)
    }

    /// Abandon the playthrough and return to idle with everything zeroed
    pub fn stop(&mut self) -> bool {
        self.fire(Trigger::Stop)
    }

    /// Restart a failed level with its accumulators zeroed
    pub fn retry_current_level(&mut self) -> bool {
        self.fire(Trigger::Retry)
    }

    pub fn resize(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        self.pool.clamp_all(bounds);
    }

    pub fn set_rotation_enabled(&mut self, enabled: bool) {
        self.settings.rotation_enabled = enabled;
    }

    pub fn submit_text(&mut self, raw: &str) -> InputOutcome {
        if !self.phase.is_playing() {
            return InputOutcome::Inactive;
        }
        let target = input::normalize(raw);
        if target.is_empty() {
            return InputOutcome::Empty;
        }
        if self.level.rules().drops_input(&mut self.rng) {
            log::debug!("Input '{target}' dropped");
            self.events.push(GameEvent::InputDropped);
            return InputOutcome::Dropped;
        }

        match input::resolve(&self.pool, &target) {
            Resolution::Match(id) => {
                let gain = target.chars().count() as u32;
                self.pop_word(id);
                self.stats.record_pop(gain);
                self.events.push(GameEvent::WordPopped { id, gain });
                self.resolve_level();
                InputOutcome::Popped { id, gain }
            }
            Resolution::Miss { penalty } => {
                self.stats.record_mismatch(penalty);
                self.events.push(GameEvent::InputMismatch { penalty });
                InputOutcome::Mismatch { penalty }
            }
        }
    }

    /// Advance the simulation by `dt` seconds; hosts cap long frames
    /// through `FrameClock`
    pub fn frame(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let target = self.scheduler.now() + f64::from(dt);
        while let Some((due, action)) = self.scheduler.pop_due(target) {
            self.run_action(due, action);
        }
        self.scheduler.advance_to(target);

        if self.phase.is_playing() {
            self.step_words(dt);
            self.resolve_level();
        }
        self.update_visual();
    }

    // === Read model ===

    pub fn view(&self) -> FrameView {
        let rules = self.level.rules();
        FrameView {
            phase: self.phase,
            words: self.pool.iter_live().map(WordView::from).collect(),
            hud: Hud {
                level: self.level.level(),
                score: self.stats.score,
                popped: self.stats.popped,
                streak: self.stats.streak,
                best_streak: self.stats.best_streak,
                time_remaining: self.time_remaining,
                timer: rules.timer_label(self.time_remaining).to_string(),
                active_words: self.pool.live_count(),
                active_rule: match &self.level {
                    LevelVariant::AdaptiveDefense(l) => l.active_rule().map(|r| r.as_str()),
                    _ => None,
                },
            },
            visual: if self.settings.visual_effects {
                self.visual
            } else {
                VisualDirective::Clear
            },
            overlay: self.overlay.clone(),
        }
    }

    /// Roll whether the display redraws the score this frame
    pub fn hud_roll(&mut self) -> HudRoll {
        if self.phase.is_playing() {
            self.level.rules().hud_roll(&mut self.rng)
        } else {
            HudRoll::Show
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn level(&self) -> &LevelVariant {
        &self.level
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> + '_ {
        self.pool.iter_live()
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.time_remaining
    }

    /// Simulation time (seconds)
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    // === Transitions ===

    fn fire(&mut self, trigger: Trigger) -> bool {
        let Some(next) = transition(self.phase, trigger) else {
            log::debug!("Ignoring {trigger:?} in {:?}", self.phase);
            return false;
        };
        let previous = std::mem::replace(&mut self.phase, next);

        match (trigger, next) {
            (Trigger::Start, Phase::Playing(level)) => {
                self.reset_game();
                self.enter_level(level, LevelEntry::NewGame);
            }
            (Trigger::AdvanceElapsed, Phase::Playing(level)) => {
                self.enter_level(level, LevelEntry::Advance);
            }
            (Trigger::Retry, Phase::Playing(level)) => {
                self.enter_level(level, LevelEntry::Retry);
            }
            (Trigger::Won, Phase::Resolving { level, .. }) => {
                self.pause_level();
                log::info!("{level} won");
                self.overlay = Some(Overlay {
                    text: level.won_message(),
                    retry_label: None,
                });
                if let Some(next_level) = level.next() {
                    self.scheduler.schedule_in(
                        ms_to_secs(self.tuning.transitions.advance_ms),
                        DeferredAction::Advance(next_level),
                    );
                }
                self.events.push(GameEvent::LevelWon { level });
            }
            (Trigger::Failed(reason), Phase::Resolving { level, .. }) => {
                self.pause_level();
                log::info!("{level} failed: {reason:?}");
                self.overlay = Some(Overlay {
                    text: reason.message(),
                    retry_label: Some(format!("Retry Level {}", level.index())),
                });
                self.events.push(GameEvent::LevelFailed { level, reason });
            }
            (Trigger::Collapse, Phase::Collapsing(CollapseStage::Message)) => {
                self.pause_level();
                log::info!("System collapse");
                self.overlay = Some(Overlay {
                    text: Level::RuleBreakdown.won_message(),
                    retry_label: None,
                });
                self.visual = VisualDirective::frozen();
                self.scheduler.schedule_in(
                    ms_to_secs(self.tuning.transitions.collapse_message_ms),
                    DeferredAction::CollapseFade,
                );
                self.events.push(GameEvent::CollapseTriggered);
            }
            (Trigger::CollapseMessageElapsed, Phase::Collapsing(CollapseStage::Fade)) => {
                let fade = self.tuning.transitions.collapse_fade_ms;
                self.visual = VisualDirective::fade(ms_to_secs(fade) as f32);
                self.scheduler
                    .schedule_in(ms_to_secs(fade), DeferredAction::CollapseReset);
            }
            (Trigger::Stop | Trigger::CollapseFadeElapsed, Phase::Idle) => {
                self.reset_game();
                log::info!("Game reset from {previous:?}");
                self.events.push(GameEvent::GameReset);
            }
            _ => {}
        }
        true
    }

    /// Zero everything and cancel every pending action
    fn reset_game(&mut self) {
        self.scheduler.cancel_all();
        self.pool.clear();
        self.level = LevelVariant::new(Level::Stable, &self.tuning);
        self.stats = Stats::default();
        self.time_remaining = None;
        self.overlay = None;
        self.visual = VisualDirective::Clear;
    }

    /// Stop the level's own timers; transition delays stay armed
    fn pause_level(&mut self) {
        for name in ["spawn", "countdown", "fragment", "collapse"] {
            self.scheduler.cancel(name);
        }
    }

    fn enter_level(&mut self, level: Level, entry: LevelEntry) {
        self.pause_level();
        self.level = LevelVariant::new(level, &self.tuning);

        if entry != LevelEntry::Advance || self.level.rules().clears_field_on_entry() {
            self.pool.clear();
        }
        if entry == LevelEntry::Retry && self.tuning.retry_resets_score {
            self.stats = Stats::default();
        }
        self.overlay = None;
        self.visual = VisualDirective::Clear;

        self.time_remaining = self.level.rules().countdown_secs();
        if self.time_remaining.is_some() {
            self.scheduler
                .schedule_in(COUNTDOWN_PERIOD, DeferredAction::CountdownTick);
        }
        if self.level.rules().has_collapse_timer() {
            self.scheduler.schedule_in(
                ms_to_secs(self.tuning.transitions.collapse_ms),
                DeferredAction::Collapse,
            );
        }
        if entry == LevelEntry::NewGame {
            self.spawn_next();
        }
        self.scheduler
            .schedule_in(self.spawn_delay(), DeferredAction::Spawn);

        log::info!("{level} started ({entry:?})");
        self.events.push(GameEvent::LevelStarted { level });
    }

    /// Seconds until the next spawn, never zero
    fn spawn_delay(&self) -> f64 {
        ms_to_secs(self.level.rules().spawn_cadence().max(1))
    }

    fn run_action(&mut self, due: f64, action: DeferredAction) {
        match action {
            DeferredAction::Spawn => {
                if !self.phase.is_playing() {
                    return;
                }
                self.spawn_next();
                self.scheduler
                    .schedule_at(due + self.spawn_delay(), DeferredAction::Spawn);
                self.resolve_level();
            }
            DeferredAction::CountdownTick => {
                if !self.phase.is_playing() {
                    return;
                }
                if let Some(left) = self.time_remaining {
                    let left = left.saturating_sub(1);
                    self.time_remaining = Some(left);
                    if left > 0 {
                        self.scheduler
                            .schedule_at(due + COUNTDOWN_PERIOD, DeferredAction::CountdownTick);
                    }
                }
                self.resolve_level();
            }
            DeferredAction::SpawnFragment(request) => {
                if self.phase.is_playing() {
                    self.spawn_word(&request);
                }
            }
            DeferredAction::Advance(_) => {
                self.fire(Trigger::AdvanceElapsed);
            }
            DeferredAction::Collapse => {
                self.fire(Trigger::Collapse);
            }
            DeferredAction::CollapseFade => {
                self.fire(Trigger::CollapseMessageElapsed);
            }
            DeferredAction::CollapseReset => {
                self.fire(Trigger::CollapseFadeElapsed);
            }
        }
    }

    // === Spawning ===

    /// One spawn attempt at the current cadence
    fn spawn_next(&mut self) {
        let request = match self.level.rules_mut().recycled_source(&mut self.rng) {
            Some(text) => SpawnRequest::new(text, SpawnOrigin::Recycled),
            None => match lexicon::pick_available(&self.pool, &mut self.rng) {
                Some(word) => SpawnRequest::new(word, SpawnOrigin::Fresh),
                None => {
                    log::debug!("Every word is live, skipping spawn");
                    return;
                }
            },
        };

        let live = self.pool.live_count();
        match self.level.rules_mut().shape_spawn(request, live) {
            SpawnShape::Whole(request) => self.spawn_word(&request),
            SpawnShape::Split { first, second } => {
                self.spawn_word(&first);
                self.scheduler.schedule_in(
                    ms_to_secs(self.tuning.transitions.split_fragment_ms),
                    DeferredAction::SpawnFragment(second),
                );
            }
            SpawnShape::Rejected => log::debug!("Spawn rejected with {live} live words"),
        }
    }

    fn spawn_word(&mut self, request: &SpawnRequest) {
        let ctx = self.spawn_context();
        let id = self
            .pool
            .spawn(request, self.level.rules(), &ctx, &mut self.rng);
        log::debug!("Spawned word {id} '{}' ({:?})", request.text, request.origin);
    }

    fn spawn_context(&self) -> SpawnContext {
        SpawnContext {
            bounds: self.bounds,
            metrics: self.tuning.text,
            now: self.scheduler.now(),
        }
    }

    // === Per-frame ===

    fn step_words(&mut self, dt: f32) {
        let now = self.scheduler.now();
        let rotate = self.settings.rotation_enabled && self.level.level() != Level::Stable;
        let throttle = ms_to_secs(self.tuning.rotation_throttle_ms);

        self.level
            .rules_mut()
            .on_frame(dt, &mut self.pool, &mut self.rng);

        let rules = self.level.rules();
        let mut reached_bottom = Vec::new();
        for word in self.pool.iter_live_mut() {
            let step = rules.displacement(word, dt, &mut self.rng);
            let report = word.advance(step, self.bounds);
            if report.bounced && rotate {
                word.rotate_on_bounce(now, throttle);
            }
            if report.reached_bottom {
                reached_bottom.push(word.id);
            }
        }

        for id in reached_bottom {
            if let Some(word) = self.pool.get(id) {
                self.level.rules_mut().on_word_reached_bottom(word);
            }
        }

        if let Some(policy) = self.level.rules().merge_policy() {
            self.merge_overlapping(policy, now);
        }
        self.pool.sweep();
    }

    /// Pair up overlapping words past the grace period; each word merges
    /// at most once per frame and merge products never merge again
    fn merge_overlapping(&mut self, policy: MergePolicy, now: f64) {
        let candidates: Vec<&Word> = self
            .pool
            .iter_live()
            .filter(|w| !w.is_merged && w.age(now) >= policy.grace_secs)
            .collect();

        let mut paired = HashSet::new();
        let mut pairs = Vec::new();
        for (i, a) in candidates.iter().enumerate() {
            if paired.contains(&a.id) {
                continue;
            }
            let partner = candidates[i + 1..]
                .iter()
                .find(|b| !paired.contains(&b.id) && a.overlaps(b));
            if let Some(b) = partner {
                paired.insert(a.id);
                paired.insert(b.id);
                pairs.push((a.id, b.id));
            }
        }

        let ctx = self.spawn_context();
        for (a, b) in pairs {
            if let Some(merged) = self.pool.merge(a, b, policy.damping, &ctx) {
                log::debug!("Merged words {a} and {b} into {merged}");
                self.events.push(GameEvent::WordsMerged { merged });
            }
        }
    }

    fn pop_word(&mut self, id: WordId) {
        let now = self.scheduler.now();
        if let Some(word) = self.pool.mark_popped(id) {
            let time_to_pop = word.age(now);
            self.level.rules_mut().on_word_popped(word, time_to_pop);
        }
        self.pool.sweep();
    }

    /// Fail first, then win
    fn resolve_level(&mut self) {
        if !self.phase.is_playing() {
            return;
        }
        let rules = self.level.rules();
        if let Some(reason) = rules.check_fail() {
            self.fire(Trigger::Failed(reason));
            return;
        }
        let progress = Progress {
            popped: self.stats.popped,
            time_remaining: self.time_remaining,
        };
        if rules.check_win(&progress) {
            self.fire(Trigger::Won);
        }
    }

    fn update_visual(&mut self) {
        match self.phase {
            Phase::Playing(_) => {
                self.visual = self.level.rules().visual(self.visual, &mut self.rng);
            }
            Phase::Idle => self.visual = VisualDirective::Clear,
            Phase::Resolving { .. } | Phase::Collapsing(_) => {}
        }
    }
}
