//! Level rule engine
//!
//! Six levels share the [`LevelRules`] interface. Each level's accumulators
//! live only in its own struct; [`LevelVariant`] is the tagged union the
//! session holds for the one active level.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::adaptive::{ActiveRule, AdaptiveEvaluator};
use super::corruption::{Corrupted, corrupt, corruption_chance};
use super::pool::{SpawnOrigin, SpawnRequest, WordPool};
use super::rng::RandomSource;
use super::view::{HudRoll, OverlayText, TimerLabel, VisualDirective};
use super::word::{Word, WordMarks};
use crate::consts::LEVEL_COUNT;
use crate::tuning::{
    AdaptiveTuning, BreakdownTuning, EntropyTuning, FeedbackTuning, SpatialTuning, SpeedRange,
    StableTuning, Tuning,
};

/// Level identifier, in play order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Stable,
    FeedbackLoop,
    EntropyDecay,
    AdaptiveDefense,
    SpatialPressure,
    RuleBreakdown,
}

impl Level {
    pub const ALL: [Level; LEVEL_COUNT] = [
        Level::Stable,
        Level::FeedbackLoop,
        Level::EntropyDecay,
        Level::AdaptiveDefense,
        Level::SpatialPressure,
        Level::RuleBreakdown,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Level for an index; out-of-range indices are a caller bug
    pub fn from_index(index: usize) -> Level {
        debug_assert!(index < LEVEL_COUNT, "level index {index} out of range");
        if index >= LEVEL_COUNT {
            log::warn!("Clamping out-of-range level index {index}");
        }
        Self::ALL[index.min(LEVEL_COUNT - 1)]
    }

    /// Level a win advances to (Level 5 has no win)
    pub fn next(&self) -> Option<Level> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Level::Stable => "Stable System",
            Level::FeedbackLoop => "Feedback Loop",
            Level::EntropyDecay => "Entropy Decay",
            Level::AdaptiveDefense => "Adaptive Defense",
            Level::SpatialPressure => "Spatial Pressure",
            Level::RuleBreakdown => "Rule Breakdown",
        }
    }

    /// Overlay shown while a won level processes into the next one
    pub fn won_message(&self) -> OverlayText {
        let (title, detail) = match self {
            Level::Stable => ("SYSTEM STABLE", "BASELINE ESTABLISHED"),
            Level::FeedbackLoop => ("FEEDBACK LOOP CONFIRMED", "Processing feedback..."),
            Level::EntropyDecay => ("ENTROPY STABILIZED", "TEMPORARY RECOVERY ACHIEVED"),
            Level::AdaptiveDefense => ("RULES MUTATED", "SYSTEM LEARNING CONFIRMED"),
            Level::SpatialPressure => ("EMERGENT STRUCTURE DETECTED", "SYSTEM STATE UNSTABLE"),
            Level::RuleBreakdown => ("LANGUAGE INTEGRITY FAILED", "SYSTEM COLLAPSE COMPLETE"),
        };
        OverlayText { title, detail }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Level {} ({})", self.index(), self.name())
    }
}

/// Why a level failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    /// Level 1: too many words reached the bottom
    Overload,
    /// Level 2: entropy hit the critical threshold
    DecayCritical,
    /// Level 3: too many words escaped the adaptive defense
    Overrun,
    /// Level 4: a spawn was attempted over capacity
    Saturation,
}

impl FailReason {
    pub fn message(&self) -> OverlayText {
        let (title, detail) = match self {
            FailReason::Overload => ("SYSTEM OVERLOAD", "RETRY LEVEL 1"),
            FailReason::DecayCritical => ("SYSTEM DECAY CRITICAL", "STRUCTURAL INTEGRITY LOST"),
            FailReason::Overrun => ("ADAPTIVE DEFENSE FAILED", "SYSTEM OVERRUN"),
            FailReason::Saturation => ("SYSTEM SATURATION REACHED", "EMERGENT OVERLOAD"),
        };
        OverlayText { title, detail }
    }
}

/// Cross-level progress the win checks read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Total pops this playthrough
    pub popped: u32,
    /// Countdown seconds left, `None` for untimed levels
    pub time_remaining: Option<u32>,
}

impl Progress {
    fn timer_expired(&self) -> bool {
        self.time_remaining == Some(0)
    }
}

/// How a spawn attempt plays out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnShape {
    Whole(SpawnRequest),
    /// Spawn `first` now and `second` after the fragment delay
    Split {
        first: SpawnRequest,
        second: SpawnRequest,
    },
    /// Spawn refused; the level's fail check reports why
    Rejected,
}

/// Proximity merge behavior for levels that merge overlapping words
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergePolicy {
    pub damping: f32,
    /// Words younger than this (seconds) never merge
    pub grace_secs: f32,
}

/// Common interface of the six level variants
pub trait LevelRules {
    fn level(&self) -> Level;

    /// Delay until the next spawn (milliseconds)
    fn spawn_cadence(&self) -> u64;

    fn velocity_for(&self, origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Vec2;

    /// Required and display text for a word about to spawn
    fn corrupt(&self, text: &str, _origin: SpawnOrigin, _rng: &mut dyn RandomSource) -> Corrupted {
        Corrupted::clean(text)
    }

    fn marks_for(&self, _origin: SpawnOrigin) -> WordMarks {
        WordMarks::default()
    }

    /// Time-based effects, run before the physics pass
    fn on_frame(&mut self, _dt: f32, _pool: &mut WordPool, _rng: &mut dyn RandomSource) {}

    /// How far a word moves this frame, before bounds are applied
    fn displacement(&self, word: &Word, dt: f32, _rng: &mut dyn RandomSource) -> Vec2 {
        word.vel * dt
    }

    fn on_word_reached_bottom(&mut self, _word: &Word) {}

    fn on_word_popped(&mut self, _word: &Word, _time_to_pop: f32) {}

    fn check_win(&self, progress: &Progress) -> bool;

    fn check_fail(&self) -> Option<FailReason> {
        None
    }

    /// Survival countdown the level starts with
    fn countdown_secs(&self) -> Option<u32> {
        None
    }

    /// Text to reuse instead of a fresh lexicon pick
    fn recycled_source(&mut self, _rng: &mut dyn RandomSource) -> Option<String> {
        None
    }

    fn shape_spawn(&mut self, request: SpawnRequest, _live_count: usize) -> SpawnShape {
        SpawnShape::Whole(request)
    }

    fn merge_policy(&self) -> Option<MergePolicy> {
        None
    }

    /// Whether a submission is silently swallowed
    fn drops_input(&self, _rng: &mut dyn RandomSource) -> bool {
        false
    }

    fn visual(&self, _current: VisualDirective, _rng: &mut dyn RandomSource) -> VisualDirective {
        VisualDirective::Clear
    }

    fn hud_roll(&self, _rng: &mut dyn RandomSource) -> HudRoll {
        HudRoll::Show
    }

    fn timer_label(&self, time_remaining: Option<u32>) -> TimerLabel {
        time_remaining.map_or(TimerLabel::Untimed, TimerLabel::Countdown)
    }

    /// Remove leftover words when the level starts
    fn clears_field_on_entry(&self) -> bool {
        false
    }

    /// Level ends in the forced collapse instead of a win
    fn has_collapse_timer(&self) -> bool {
        false
    }
}

/// Random direction at a random speed within `range`
pub fn random_velocity(range: SpeedRange, rng: &mut dyn RandomSource) -> Vec2 {
    let angle = rng.range(0.0, std::f32::consts::TAU);
    let speed = rng.range(range.min, range.max);
    Vec2::from_angle(angle) * speed
}

/// Settings every non-stable level shares
#[derive(Debug, Clone, Copy, PartialEq)]
struct BaseRules {
    spawn_ms: u64,
    speed: SpeedRange,
}

impl BaseRules {
    fn new(tuning: &Tuning) -> Self {
        Self {
            spawn_ms: tuning.base_spawn_ms,
            speed: tuning.speed,
        }
    }
}

/// Level 0: constant speed, no corruption, no way to fail
#[derive(Debug, Clone, Serialize)]
pub struct Stable {
    #[serde(skip)]
    tuning: StableTuning,
    #[serde(skip)]
    spawn_ms: u64,
}

impl LevelRules for Stable {
    fn level(&self) -> Level {
        Level::Stable
    }

    fn spawn_cadence(&self) -> u64 {
        self.spawn_ms
    }

    fn velocity_for(&self, _origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Vec2 {
        let angle = rng.range(0.0, std::f32::consts::TAU);
        Vec2::from_angle(angle) * self.tuning.speed
    }

    fn check_win(&self, progress: &Progress) -> bool {
        progress.popped >= self.tuning.pops_to_win
    }
}

/// Level 1: fast pops destabilize the system
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackLoop {
    #[serde(skip)]
    tuning: FeedbackTuning,
    #[serde(skip)]
    base: BaseRules,
    pub instability: f32,
    pub missed: u32,
}

impl FeedbackLoop {
    pub fn speed_multiplier(&self) -> f32 {
        1.0 + self.instability * self.tuning.speed_gain
    }

    /// Instability a pop after `time_to_pop` seconds adds
    pub fn instability_gain(&self, time_to_pop: f32) -> f32 {
        (1.0 / time_to_pop.max(self.tuning.min_time_to_pop)).min(self.tuning.max_gain)
    }
}

impl LevelRules for FeedbackLoop {
    fn level(&self) -> Level {
        Level::FeedbackLoop
    }

    fn spawn_cadence(&self) -> u64 {
        let reduction = (self.instability * self.tuning.ms_per_instability)
            .min(self.tuning.max_reduction_ms);
        (self.base.spawn_ms as f32 - reduction).round() as u64
    }

    fn velocity_for(&self, _origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Vec2 {
        random_velocity(self.base.speed, rng)
    }

    fn displacement(&self, word: &Word, dt: f32, rng: &mut dyn RandomSource) -> Vec2 {
        let mut step = word.vel * dt * self.speed_multiplier();
        if self.instability > self.tuning.jitter_threshold {
            step.x += rng.spread(0.5) * self.instability * dt * self.tuning.jitter_scale;
        }
        step
    }

    fn on_word_reached_bottom(&mut self, _word: &Word) {
        self.missed += 1;
    }

    fn on_word_popped(&mut self, _word: &Word, time_to_pop: f32) {
        self.instability += self.instability_gain(time_to_pop);
    }

    fn check_win(&self, progress: &Progress) -> bool {
        progress.timer_expired()
    }

    fn check_fail(&self) -> Option<FailReason> {
        (self.missed >= self.tuning.missed_to_fail).then_some(FailReason::Overload)
    }

    fn countdown_secs(&self) -> Option<u32> {
        Some(self.tuning.survival_secs)
    }
}

/// Level 2: entropy rises no matter what the player does
#[derive(Debug, Clone, Serialize)]
pub struct EntropyDecay {
    #[serde(skip)]
    tuning: EntropyTuning,
    #[serde(skip)]
    base: BaseRules,
    pub entropy: f32,
    pub level_pops: u32,
}

impl EntropyDecay {
    pub fn corruption_chance(&self) -> f32 {
        corruption_chance(
            self.entropy,
            self.tuning.corruption_divisor,
            self.tuning.max_corruption,
        )
    }
}

impl LevelRules for EntropyDecay {
    fn level(&self) -> Level {
        Level::EntropyDecay
    }

    fn spawn_cadence(&self) -> u64 {
        self.base.spawn_ms
    }

    fn velocity_for(&self, _origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Vec2 {
        random_velocity(self.base.speed, rng)
    }

    fn corrupt(&self, text: &str, _origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Corrupted {
        corrupt(text, self.corruption_chance(), rng)
    }

    fn on_frame(&mut self, dt: f32, _pool: &mut WordPool, _rng: &mut dyn RandomSource) {
        self.entropy += dt.max(0.0) * self.tuning.rate;
    }

    fn on_word_popped(&mut self, _word: &Word, _time_to_pop: f32) {
        self.level_pops += 1;
    }

    fn check_win(&self, _progress: &Progress) -> bool {
        self.level_pops >= self.tuning.pops_to_win && self.entropy < self.tuning.critical
    }

    fn check_fail(&self) -> Option<FailReason> {
        (self.entropy >= self.tuning.critical).then_some(FailReason::DecayCritical)
    }

    fn visual(&self, _current: VisualDirective, _rng: &mut dyn RandomSource) -> VisualDirective {
        VisualDirective::decay(self.entropy)
    }

    fn timer_label(&self, _time_remaining: Option<u32>) -> TimerLabel {
        TimerLabel::Decay
    }
}

/// Level 3: the rules adapt to how the player performs
#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveDefense {
    #[serde(skip)]
    tuning: AdaptiveTuning,
    #[serde(skip)]
    base: BaseRules,
    #[serde(skip)]
    recycle_chance: f32,
    pub evaluator: AdaptiveEvaluator,
}

impl AdaptiveDefense {
    pub fn active_rule(&self) -> Option<ActiveRule> {
        self.evaluator.active
    }

    fn heavy_velocity(&self, rng: &mut dyn RandomSource) -> Vec2 {
        Vec2::new(
            rng.spread(self.tuning.heavy_vx_spread * 0.5),
            self.tuning.heavy_vy_min + rng.next_unit() * self.tuning.heavy_vy_span,
        )
    }
}

impl LevelRules for AdaptiveDefense {
    fn level(&self) -> Level {
        Level::AdaptiveDefense
    }

    fn spawn_cadence(&self) -> u64 {
        self.base.spawn_ms
    }

    fn velocity_for(&self, _origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Vec2 {
        match self.active_rule() {
            Some(ActiveRule::Heavy) => self.heavy_velocity(rng),
            _ => random_velocity(self.base.speed, rng),
        }
    }

    fn corrupt(&self, text: &str, origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Corrupted {
        if origin == SpawnOrigin::Recycled {
            corrupt(text, self.recycle_chance, rng)
        } else {
            Corrupted::clean(text)
        }
    }

    fn marks_for(&self, origin: SpawnOrigin) -> WordMarks {
        WordMarks {
            unstable: origin == SpawnOrigin::Recycled,
            heavy: self.active_rule() == Some(ActiveRule::Heavy),
            fragment: origin == SpawnOrigin::Fragment,
        }
    }

    fn on_word_reached_bottom(&mut self, word: &Word) {
        self.evaluator.record_miss(&word.original_word);
    }

    fn on_word_popped(&mut self, _word: &Word, time_to_pop: f32) {
        self.evaluator.record_pop(time_to_pop);
    }

    fn check_win(&self, progress: &Progress) -> bool {
        progress.timer_expired()
    }

    fn check_fail(&self) -> Option<FailReason> {
        (self.evaluator.missed >= self.tuning.missed_to_fail).then_some(FailReason::Overrun)
    }

    fn countdown_secs(&self) -> Option<u32> {
        Some(self.tuning.survival_secs)
    }

    fn recycled_source(&mut self, rng: &mut dyn RandomSource) -> Option<String> {
        if self.active_rule() != Some(ActiveRule::Recur) || self.evaluator.recycle.is_empty() {
            return None;
        }
        if rng.chance(self.tuning.recycle_chance) {
            self.evaluator.take_recycled()
        } else {
            None
        }
    }

    fn shape_spawn(&mut self, request: SpawnRequest, _live_count: usize) -> SpawnShape {
        let len = request.text.chars().count();
        if request.origin != SpawnOrigin::Fresh
            || self.active_rule() != Some(ActiveRule::Split)
            || len < self.tuning.split_min_len
        {
            return SpawnShape::Whole(request);
        }
        let first: String = request.text.chars().take(len / 2).collect();
        let second: String = request.text.chars().skip(len / 2).collect();
        SpawnShape::Split {
            first: SpawnRequest::new(first, SpawnOrigin::Fragment),
            second: SpawnRequest::new(second, SpawnOrigin::Fragment),
        }
    }
}

/// Level 4: overlapping words merge; pop one merged word to win
#[derive(Debug, Clone, Serialize)]
pub struct SpatialPressure {
    #[serde(skip)]
    tuning: SpatialTuning,
    #[serde(skip)]
    base: BaseRules,
    pub merged_popped: bool,
    pub saturated: bool,
}

impl LevelRules for SpatialPressure {
    fn level(&self) -> Level {
        Level::SpatialPressure
    }

    fn spawn_cadence(&self) -> u64 {
        self.base.spawn_ms
    }

    fn velocity_for(&self, _origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Vec2 {
        random_velocity(self.base.speed, rng)
    }

    fn on_word_popped(&mut self, word: &Word, _time_to_pop: f32) {
        if word.is_merged {
            self.merged_popped = true;
        }
    }

    fn check_win(&self, _progress: &Progress) -> bool {
        self.merged_popped
    }

    fn check_fail(&self) -> Option<FailReason> {
        self.saturated.then_some(FailReason::Saturation)
    }

    fn shape_spawn(&mut self, request: SpawnRequest, live_count: usize) -> SpawnShape {
        if request.origin == SpawnOrigin::Fresh && live_count > self.tuning.capacity {
            self.saturated = true;
            return SpawnShape::Rejected;
        }
        SpawnShape::Whole(request)
    }

    fn merge_policy(&self) -> Option<MergePolicy> {
        Some(MergePolicy {
            damping: self.tuning.merge_damping,
            grace_secs: self.tuning.merge_grace_ms as f32 / 1000.0,
        })
    }

    fn timer_label(&self, _time_remaining: Option<u32>) -> TimerLabel {
        TimerLabel::Unbounded
    }

    fn clears_field_on_entry(&self) -> bool {
        true
    }
}

/// Level 5: everything breaks until the system collapses
#[derive(Debug, Clone, Serialize)]
pub struct RuleBreakdown {
    #[serde(skip)]
    tuning: BreakdownTuning,
    #[serde(skip)]
    base: BaseRules,
}

impl LevelRules for RuleBreakdown {
    fn level(&self) -> Level {
        Level::RuleBreakdown
    }

    fn spawn_cadence(&self) -> u64 {
        self.base.spawn_ms
    }

    fn velocity_for(&self, _origin: SpawnOrigin, rng: &mut dyn RandomSource) -> Vec2 {
        random_velocity(self.base.speed, rng)
    }

    fn marks_for(&self, _origin: SpawnOrigin) -> WordMarks {
        WordMarks {
            unstable: true,
            ..WordMarks::default()
        }
    }

    fn on_frame(&mut self, _dt: f32, pool: &mut WordPool, rng: &mut dyn RandomSource) {
        let t = &self.tuning;
        for word in pool.iter_live_mut() {
            if rng.chance(t.perturb_chance) {
                let kick = Vec2::new(rng.spread(t.perturb_magnitude), rng.spread(t.perturb_magnitude));
                word.vel = (word.vel + kick).clamp_length_max(t.speed_cap);
            }
        }
    }

    fn check_win(&self, _progress: &Progress) -> bool {
        false
    }

    fn drops_input(&self, rng: &mut dyn RandomSource) -> bool {
        rng.chance(self.tuning.input_drop_chance)
    }

    fn visual(&self, current: VisualDirective, rng: &mut dyn RandomSource) -> VisualDirective {
        if !rng.chance(self.tuning.filter_chance) {
            return current;
        }
        let invert = if rng.chance(0.5) { 0.0 } else { 0.9 };
        VisualDirective::Chaos {
            invert,
            blur_px: rng.range(0.0, 2.0),
            hue_deg: rng.range(0.0, 360.0),
        }
    }

    fn hud_roll(&self, rng: &mut dyn RandomSource) -> HudRoll {
        if rng.chance(self.tuning.hud_skip_chance) {
            HudRoll::Skip
        } else if rng.chance(self.tuning.hud_error_chance) {
            HudRoll::ErrorToken
        } else {
            HudRoll::Show
        }
    }

    fn timer_label(&self, _time_remaining: Option<u32>) -> TimerLabel {
        TimerLabel::Error
    }

    fn clears_field_on_entry(&self) -> bool {
        true
    }

    fn has_collapse_timer(&self) -> bool {
        true
    }
}

/// The active level with its level-local state
#[derive(Debug, Clone, Serialize)]
pub enum LevelVariant {
    Stable(Stable),
    FeedbackLoop(FeedbackLoop),
    EntropyDecay(EntropyDecay),
    AdaptiveDefense(AdaptiveDefense),
    SpatialPressure(SpatialPressure),
    RuleBreakdown(RuleBreakdown),
}

impl LevelVariant {
    /// Fresh rules for `level` with zeroed accumulators
    pub fn new(level: Level, tuning: &Tuning) -> Self {
        let base = BaseRules::new(tuning);
        match level {
            Level::Stable => LevelVariant::Stable(Stable {
                tuning: tuning.stable,
                spawn_ms: tuning.base_spawn_ms,
            }),
            Level::FeedbackLoop => LevelVariant::FeedbackLoop(FeedbackLoop {
                tuning: tuning.feedback,
                base,
                instability: 0.0,
                missed: 0,
            }),
            Level::EntropyDecay => LevelVariant::EntropyDecay(EntropyDecay {
                tuning: tuning.entropy,
                base,
                entropy: 0.0,
                level_pops: 0,
            }),
            Level::AdaptiveDefense => LevelVariant::AdaptiveDefense(AdaptiveDefense {
                tuning: tuning.adaptive,
                base,
                recycle_chance: corruption_chance(
                    tuning.adaptive.recycle_entropy,
                    tuning.entropy.corruption_divisor,
                    tuning.entropy.max_corruption,
                ),
                evaluator: AdaptiveEvaluator::new(tuning.adaptive),
            }),
            Level::SpatialPressure => LevelVariant::SpatialPressure(SpatialPressure {
                tuning: tuning.spatial,
                base,
                merged_popped: false,
                saturated: false,
            }),
            Level::RuleBreakdown => LevelVariant::RuleBreakdown(RuleBreakdown {
                tuning: tuning.breakdown,
                base,
            }),
        }
    }

    pub fn rules(&self) -> &dyn LevelRules {
        match self {
            LevelVariant::Stable(l) => l,
            LevelVariant::FeedbackLoop(l) => l,
            LevelVariant::EntropyDecay(l) => l,
            LevelVariant::AdaptiveDefense(l) => l,
            LevelVariant::SpatialPressure(l) => l,
            LevelVariant::RuleBreakdown(l) => l,
        }
    }

    pub fn rules_mut(&mut self) -> &mut dyn LevelRules {
        match self {
            LevelVariant::Stable(l) => l,
            LevelVariant::FeedbackLoop(l) => l,
            LevelVariant::EntropyDecay(l) => l,
            LevelVariant::AdaptiveDefense(l) => l,
            LevelVariant::SpatialPressure(l) => l,
            LevelVariant::RuleBreakdown(l) => l,
        }
    }

    pub fn level(&self) -> Level {
        self.rules().level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::{ScriptedRng, SimRng};
    use crate::sim::word::test_word;
    use proptest::prelude::*;

    fn variant(level: Level) -> LevelVariant {
        LevelVariant::new(level, &Tuning::default())
    }

    #[test]
    fn test_level_order_and_clamp() {
        assert_eq!(Level::from_index(0), Level::Stable);
        assert_eq!(Level::from_index(5), Level::RuleBreakdown);
        assert_eq!(Level::Stable.next(), Some(Level::FeedbackLoop));
        assert_eq!(Level::RuleBreakdown.next(), None);
        for (i, level) in Level::ALL.iter().enumerate() {
            assert_eq!(level.index(), i);
            assert_eq!(variant(*level).level(), *level);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_out_of_range_index_clamps_in_release() {
        assert_eq!(Level::from_index(42), Level::RuleBreakdown);
    }

    #[test]
    fn test_stable_rules() {
        let level = variant(Level::Stable);
        let rules = level.rules();
        let mut rng = SimRng::new(1);
        assert_eq!(rules.spawn_cadence(), 1000);
        for _ in 0..20 {
            let v = rules.velocity_for(SpawnOrigin::Fresh, &mut rng);
            assert!((v.length() - 100.0).abs() < 1e-3);
        }
        assert_eq!(rules.corrupt("orbit", SpawnOrigin::Fresh, &mut rng), Corrupted::clean("orbit"));
        assert!(rules.check_fail().is_none());
        assert!(!rules.check_win(&Progress { popped: 19, time_remaining: None }));
        assert!(rules.check_win(&Progress { popped: 20, time_remaining: None }));
        assert_eq!(rules.countdown_secs(), None);
    }

    #[test]
    fn test_feedback_cadence_and_gain() {
        let LevelVariant::FeedbackLoop(mut level) = variant(Level::FeedbackLoop) else {
            unreachable!()
        };
        assert_eq!(level.spawn_cadence(), 1000);
        assert_eq!(level.instability_gain(0.05), 2.0);
        assert_eq!(level.instability_gain(2.0), 0.5);

        let word = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        level.on_word_popped(&word, 0.5);
        assert_eq!(level.instability, 2.0);
        assert_eq!(level.spawn_cadence(), 900);

        level.instability = 30.0;
        assert_eq!(level.spawn_cadence(), 400);
    }

    #[test]
    fn test_feedback_displacement_scales_with_instability() {
        let LevelVariant::FeedbackLoop(mut level) = variant(Level::FeedbackLoop) else {
            unreachable!()
        };
        let word = test_word(1, Vec2::ZERO, Vec2::new(100.0, 50.0), Vec2::ONE);
        let mut rng = ScriptedRng::constant(0.5);
        level.instability = 4.0;
        let step = level.displacement(&word, 0.1, &mut rng);
        assert!((step - Vec2::new(14.0, 7.0)).length() < 1e-4);

        // past the jitter threshold, x picks up drift
        level.instability = 10.0;
        let mut rng = ScriptedRng::constant(1.0);
        let step = level.displacement(&word, 0.1, &mut rng);
        assert!(step.x > 20.0);
        assert!((step.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_feedback_fails_on_fifth_miss() {
        let mut level = variant(Level::FeedbackLoop);
        let word = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        for _ in 0..4 {
            level.rules_mut().on_word_reached_bottom(&word);
        }
        assert!(level.rules().check_fail().is_none());
        level.rules_mut().on_word_reached_bottom(&word);
        assert_eq!(level.rules().check_fail(), Some(FailReason::Overload));
    }

    #[test]
    fn test_feedback_wins_when_timer_expires() {
        let level = variant(Level::FeedbackLoop);
        assert_eq!(level.rules().countdown_secs(), Some(45));
        assert!(!level.rules().check_win(&Progress { popped: 0, time_remaining: Some(1) }));
        assert!(level.rules().check_win(&Progress { popped: 0, time_remaining: Some(0) }));
    }

    #[test]
    fn test_entropy_fails_at_critical() {
        let LevelVariant::EntropyDecay(mut level) = variant(Level::EntropyDecay) else {
            unreachable!()
        };
        let mut pool = WordPool::new();
        let mut rng = ScriptedRng::constant(0.5);
        level.entropy = 99.9;
        assert!(level.check_fail().is_none());
        level.on_frame(1.0, &mut pool, &mut rng);
        assert!(level.entropy >= 100.0);
        assert_eq!(level.check_fail(), Some(FailReason::DecayCritical));
    }

    #[test]
    fn test_entropy_win_needs_thirty_pops_below_critical() {
        let LevelVariant::EntropyDecay(mut level) = variant(Level::EntropyDecay) else {
            unreachable!()
        };
        let word = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        for _ in 0..30 {
            level.on_word_popped(&word, 1.0);
        }
        assert!(level.check_win(&Progress::default()));
        level.entropy = 100.0;
        assert!(!level.check_win(&Progress::default()));
    }

    #[test]
    fn test_entropy_visual_decay() {
        let LevelVariant::EntropyDecay(mut level) = variant(Level::EntropyDecay) else {
            unreachable!()
        };
        let mut rng = ScriptedRng::constant(0.5);
        level.entropy = 50.0;
        assert_eq!(
            level.visual(VisualDirective::Clear, &mut rng),
            VisualDirective::Decay {
                brightness: 0.75,
                blur_px: 1.0,
                grayscale_pct: 50.0
            }
        );
    }

    #[test]
    fn test_adaptive_split_shape() {
        let LevelVariant::AdaptiveDefense(mut level) = variant(Level::AdaptiveDefense) else {
            unreachable!()
        };
        level.evaluator.record_pop(0.4);
        assert_eq!(level.active_rule(), Some(ActiveRule::Split));

        let shape = level.shape_spawn(SpawnRequest::new("matrix", SpawnOrigin::Fresh), 0);
        assert_eq!(
            shape,
            SpawnShape::Split {
                first: SpawnRequest::new("mat", SpawnOrigin::Fragment),
                second: SpawnRequest::new("rix", SpawnOrigin::Fragment),
            }
        );
        let shape = level.shape_spawn(SpawnRequest::new("orbit", SpawnOrigin::Fresh), 0);
        assert!(matches!(shape, SpawnShape::Split { ref first, .. } if first.text == "or"));

        // too short, or already a fragment: spawned whole
        let short = SpawnRequest::new("zip", SpawnOrigin::Fresh);
        assert_eq!(level.shape_spawn(short.clone(), 0), SpawnShape::Whole(short));
        let fragment = SpawnRequest::new("matr", SpawnOrigin::Fragment);
        assert_eq!(level.shape_spawn(fragment.clone(), 0), SpawnShape::Whole(fragment));
    }

    #[test]
    fn test_adaptive_heavy_velocity() {
        let LevelVariant::AdaptiveDefense(mut level) = variant(Level::AdaptiveDefense) else {
            unreachable!()
        };
        level.evaluator.record_pop(5.0);
        assert_eq!(level.active_rule(), Some(ActiveRule::Heavy));
        let mut rng = SimRng::new(9);
        for _ in 0..50 {
            let v = level.velocity_for(SpawnOrigin::Fresh, &mut rng);
            assert!(v.x.abs() <= 25.0);
            assert!((200.0..300.0).contains(&v.y));
        }
        assert!(level.marks_for(SpawnOrigin::Fresh).heavy);
    }

    #[test]
    fn test_adaptive_recur_recycles_corrupted() {
        let LevelVariant::AdaptiveDefense(mut level) = variant(Level::AdaptiveDefense) else {
            unreachable!()
        };
        let mut missed = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        for text in ["orbit", "pulse", "flash", "comet"] {
            missed.original_word = text.into();
            level.on_word_reached_bottom(&missed);
        }
        level.evaluator.record_pop(1.5);
        assert_eq!(level.active_rule(), Some(ActiveRule::Recur));

        // roll fails: fresh word instead
        let mut rng = ScriptedRng::constant(0.9);
        assert_eq!(level.recycled_source(&mut rng), None);
        let mut rng = ScriptedRng::constant(0.1);
        assert_eq!(level.recycled_source(&mut rng).as_deref(), Some("orbit"));

        // every letter rolls corrupt at full entropy; the first is restored
        let mut rng = ScriptedRng::constant(0.0);
        let out = level.corrupt("pulse", SpawnOrigin::Recycled, &mut rng);
        assert_eq!(out.required, "p");
        assert_eq!(level.corrupt("pulse", SpawnOrigin::Fresh, &mut rng), Corrupted::clean("pulse"));
        assert!(level.marks_for(SpawnOrigin::Recycled).unstable);
    }

    #[test]
    fn test_adaptive_fails_on_eighth_miss() {
        let mut level = variant(Level::AdaptiveDefense);
        let word = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        for _ in 0..7 {
            level.rules_mut().on_word_reached_bottom(&word);
        }
        assert!(level.rules().check_fail().is_none());
        level.rules_mut().on_word_reached_bottom(&word);
        assert_eq!(level.rules().check_fail(), Some(FailReason::Overrun));
    }

    #[test]
    fn test_spatial_capacity_and_win() {
        let LevelVariant::SpatialPressure(mut level) = variant(Level::SpatialPressure) else {
            unreachable!()
        };
        let request = SpawnRequest::new("orbit", SpawnOrigin::Fresh);
        assert!(matches!(level.shape_spawn(request.clone(), 15), SpawnShape::Whole(_)));
        assert!(level.check_fail().is_none());
        assert_eq!(level.shape_spawn(request, 16), SpawnShape::Rejected);
        assert_eq!(level.check_fail(), Some(FailReason::Saturation));

        let mut word = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        level.on_word_popped(&word, 1.0);
        assert!(!level.check_win(&Progress::default()));
        word.is_merged = true;
        level.on_word_popped(&word, 1.0);
        assert!(level.check_win(&Progress::default()));
    }

    #[test]
    fn test_breakdown_rolls() {
        let level = variant(Level::RuleBreakdown);
        let rules = level.rules();
        assert!(!rules.check_win(&Progress { popped: 1000, time_remaining: Some(0) }));
        assert!(rules.has_collapse_timer());
        assert!(rules.marks_for(SpawnOrigin::Fresh).unstable);

        assert!(rules.drops_input(&mut ScriptedRng::constant(0.1)));
        assert!(!rules.drops_input(&mut ScriptedRng::constant(0.3)));

        assert_eq!(rules.hud_roll(&mut ScriptedRng::constant(0.2)), HudRoll::Skip);
        assert_eq!(rules.hud_roll(&mut ScriptedRng::new([0.5, 0.05], 0.5)), HudRoll::ErrorToken);
        assert_eq!(rules.hud_roll(&mut ScriptedRng::constant(0.5)), HudRoll::Show);

        let kept = rules.visual(VisualDirective::Clear, &mut ScriptedRng::constant(0.9));
        assert_eq!(kept, VisualDirective::Clear);
        let chaos = rules.visual(VisualDirective::Clear, &mut ScriptedRng::constant(0.1));
        assert!(matches!(chaos, VisualDirective::Chaos { invert, .. } if invert == 0.0));
    }

    #[test]
    fn test_breakdown_perturbs_velocity() {
        let mut level = variant(Level::RuleBreakdown);
        let mut pool = WordPool::new();
        let id = pool.push_for_test(test_word(0, Vec2::ZERO, Vec2::new(10.0, 10.0), Vec2::ONE));
        // chance roll passes, both axes kick by +250 * 0.8
        let mut rng = ScriptedRng::new([0.05, 0.9, 0.9], 0.5);
        level.rules_mut().on_frame(0.016, &mut pool, &mut rng);
        let vel = pool.get(id).unwrap().vel;
        assert!((vel - Vec2::new(210.0, 210.0)).length() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_entropy_never_decreases(frames in prop::collection::vec(0.0f32..0.5, 1..100)) {
            let mut level = variant(Level::EntropyDecay);
            let mut pool = WordPool::new();
            let mut rng = SimRng::new(3);
            let word = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
            let mut last = 0.0;
            for dt in frames {
                level.rules_mut().on_frame(dt, &mut pool, &mut rng);
                level.rules_mut().on_word_popped(&word, 1.0);
                let LevelVariant::EntropyDecay(ref l) = level else { unreachable!() };
                prop_assert!(l.entropy >= last);
                last = l.entropy;
            }
        }

        #[test]
        fn prop_instability_never_decreases(
            events in prop::collection::vec(prop_oneof![(0.0f32..10.0).prop_map(Some), Just(None)], 1..100)
        ) {
            let mut level = variant(Level::FeedbackLoop);
            let mut pool = WordPool::new();
            let mut rng = SimRng::new(3);
            let word = test_word(1, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
            let mut last = 0.0;
            for event in events {
                match event {
                    Some(t) => level.rules_mut().on_word_popped(&word, t),
                    None => level.rules_mut().on_word_reached_bottom(&word),
                }
                level.rules_mut().on_frame(0.016, &mut pool, &mut rng);
                let LevelVariant::FeedbackLoop(ref l) = level else { unreachable!() };
                prop_assert!(l.instability >= last);
                last = l.instability;
            }
        }
    }
}
