//! Data-driven game balance
//!
//! Every threshold the level rules consult lives here so a host can
//! rebalance the game from a JSON file without touching the simulation.
//! Each section is `#[serde(default)]`, so partial files are fine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Random speed range for words with no level-specific velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedRange {
    pub min: f32,
    pub max: f32,
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self { min: 60.0, max: 200.0 }
    }
}

/// Stand-in for render measurement: words are sized from their display text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextMetrics {
    pub glyph_width: f32,
    pub glyph_height: f32,
    pub padding_x: f32,
    pub padding_y: f32,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            glyph_width: 11.0,
            glyph_height: 22.0,
            padding_x: 8.0,
            padding_y: 4.0,
        }
    }
}

/// Fixed delays used by the transition controller (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionTuning {
    /// "Processing" pause between a won level and the next level
    pub advance_ms: u64,
    /// Delay before the second half of a split word spawns
    pub split_fragment_ms: u64,
    /// Active play in Level 5 before the forced collapse
    pub collapse_ms: u64,
    /// How long the collapse message stays up
    pub collapse_message_ms: u64,
    /// Fade to black before the reset
    pub collapse_fade_ms: u64,
}

impl Default for TransitionTuning {
    fn default() -> Self {
        Self {
            advance_ms: 2000,
            split_fragment_ms: 200,
            collapse_ms: 15_000,
            collapse_message_ms: 4000,
            collapse_fade_ms: 2000,
        }
    }
}

/// Level 0: stable system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StableTuning {
    pub speed: f32,
    pub pops_to_win: u32,
}

impl Default for StableTuning {
    fn default() -> Self {
        Self { speed: 100.0, pops_to_win: 20 }
    }
}

/// Level 1: feedback loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackTuning {
    /// Spawn delay removed per point of instability
    pub ms_per_instability: f32,
    /// Cap on the spawn delay reduction
    pub max_reduction_ms: f32,
    /// Cap on instability gained from a single pop
    pub max_gain: f32,
    /// Floor applied to time-to-pop before inverting it
    pub min_time_to_pop: f32,
    /// Extra speed multiplier per point of instability
    pub speed_gain: f32,
    /// Instability above which horizontal jitter kicks in
    pub jitter_threshold: f32,
    pub jitter_scale: f32,
    pub missed_to_fail: u32,
    pub survival_secs: u32,
}

impl Default for FeedbackTuning {
    fn default() -> Self {
        Self {
            ms_per_instability: 50.0,
            max_reduction_ms: 600.0,
            max_gain: 2.0,
            min_time_to_pop: 0.2,
            speed_gain: 0.1,
            jitter_threshold: 5.0,
            jitter_scale: 10.0,
            missed_to_fail: 5,
            survival_secs: 45,
        }
    }
}

/// Level 2: entropy decay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyTuning {
    /// Entropy gained per second
    pub rate: f32,
    /// Entropy at which the level fails
    pub critical: f32,
    /// Letter corruption chance is `min(max_corruption, entropy / corruption_divisor)`
    pub max_corruption: f32,
    pub corruption_divisor: f32,
    pub pops_to_win: u32,
}

impl Default for EntropyTuning {
    fn default() -> Self {
        Self {
            rate: 1.5,
            critical: 100.0,
            max_corruption: 0.5,
            corruption_divisor: 200.0,
            pops_to_win: 30,
        }
    }
}

/// Level 3: adaptive defense
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveTuning {
    /// A pop faster than this is "fast"
    pub fast_secs: f32,
    /// A pop slower than this is "slow"
    pub slow_secs: f32,
    pub fast_streak: u32,
    pub slow_streak: u32,
    /// Running average below which SPLIT engages
    pub split_average_secs: f32,
    /// Running average above which HEAVY engages
    pub heavy_average_secs: f32,
    /// RECUR engages once misses exceed this
    pub recur_after_missed: u32,
    /// Chance a spawn reuses a missed word while RECUR is active
    pub recycle_chance: f32,
    /// Shortest word SPLIT will divide
    pub split_min_len: usize,
    /// HEAVY horizontal speed spread (total width, centered on zero)
    pub heavy_vx_spread: f32,
    pub heavy_vy_min: f32,
    pub heavy_vy_span: f32,
    /// Entropy used to corrupt recycled words
    pub recycle_entropy: f32,
    pub missed_to_fail: u32,
    pub survival_secs: u32,
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self {
            fast_secs: 1.0,
            slow_secs: 2.5,
            fast_streak: 3,
            slow_streak: 2,
            split_average_secs: 1.2,
            heavy_average_secs: 2.0,
            recur_after_missed: 3,
            recycle_chance: 0.5,
            split_min_len: 4,
            heavy_vx_spread: 50.0,
            heavy_vy_min: 200.0,
            heavy_vy_span: 100.0,
            recycle_entropy: 100.0,
            missed_to_fail: 8,
            survival_secs: 60,
        }
    }
}

/// Level 4: spatial pressure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialTuning {
    /// A spawn attempt with more live words than this fails the level
    pub capacity: usize,
    /// Velocity factor applied to merged words
    pub merge_damping: f32,
    /// Words younger than this never merge
    pub merge_grace_ms: u64,
}

impl Default for SpatialTuning {
    fn default() -> Self {
        Self {
            capacity: 15,
            merge_damping: 0.7,
            merge_grace_ms: 500,
        }
    }
}

/// Level 5: rule breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownTuning {
    /// Per-word, per-frame chance of a velocity kick
    pub perturb_chance: f32,
    /// Kick magnitude per axis (±)
    pub perturb_magnitude: f32,
    /// Speed ceiling applied after a kick
    pub speed_cap: f32,
    /// Per-frame chance of a new chaos filter
    pub filter_chance: f32,
    /// Chance a submission is silently ignored
    pub input_drop_chance: f32,
    /// Chance a HUD redraw is skipped
    pub hud_skip_chance: f32,
    /// Chance a HUD redraw shows an error token
    pub hud_error_chance: f32,
}

impl Default for BreakdownTuning {
    fn default() -> Self {
        Self {
            perturb_chance: 0.1,
            perturb_magnitude: 250.0,
            speed_cap: 900.0,
            filter_chance: 0.2,
            input_drop_chance: 0.2,
            hud_skip_chance: 0.3,
            hud_error_chance: 0.1,
        }
    }
}

/// Complete balance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Spawn cadence for levels without their own
    pub base_spawn_ms: u64,
    pub speed: SpeedRange,
    pub text: TextMetrics,
    /// Minimum gap between two bounce rotations of one word
    pub rotation_throttle_ms: u64,
    /// Largest frame delta the clock hands to the simulation (seconds)
    pub max_frame_secs: f32,
    /// When true a retry also zeroes score, pops and streaks
    pub retry_resets_score: bool,
    pub transitions: TransitionTuning,
    pub stable: StableTuning,
    pub feedback: FeedbackTuning,
    pub entropy: EntropyTuning,
    pub adaptive: AdaptiveTuning,
    pub spatial: SpatialTuning,
    pub breakdown: BreakdownTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            base_spawn_ms: 1000,
            speed: SpeedRange::default(),
            text: TextMetrics::default(),
            rotation_throttle_ms: 40,
            max_frame_secs: 0.25,
            retry_resets_score: false,
            transitions: TransitionTuning::default(),
            stable: StableTuning::default(),
            feedback: FeedbackTuning::default(),
            entropy: EntropyTuning::default(),
            adaptive: AdaptiveTuning::default(),
            spatial: SpatialTuning::default(),
            breakdown: BreakdownTuning::default(),
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from a JSON document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        positive_ms("base_spawn_ms", self.base_spawn_ms)?;
        positive_ms("transitions.advance_ms", self.transitions.advance_ms)?;
        positive_ms("transitions.collapse_ms", self.transitions.collapse_ms)?;

        if self.speed.min < 0.0 || self.speed.min > self.speed.max {
            return Err(invalid(
                "speed",
                format!("expected 0 <= min <= max, got {}..{}", self.speed.min, self.speed.max),
            ));
        }
        if self.text.glyph_width <= 0.0 || self.text.glyph_height <= 0.0 {
            return Err(invalid("text", "glyph dimensions must be positive".into()));
        }
        if self.max_frame_secs <= 0.0 {
            return Err(invalid("max_frame_secs", "must be positive".into()));
        }
        if self.feedback.min_time_to_pop <= 0.0 {
            return Err(invalid("feedback.min_time_to_pop", "must be positive".into()));
        }
        if self.feedback.max_reduction_ms >= self.base_spawn_ms as f32 {
            return Err(invalid(
                "feedback.max_reduction_ms",
                "must leave a positive spawn delay".into(),
            ));
        }
        if self.entropy.corruption_divisor <= 0.0 {
            return Err(invalid("entropy.corruption_divisor", "must be positive".into()));
        }
        if self.adaptive.fast_secs > self.adaptive.slow_secs {
            return Err(invalid(
                "adaptive.fast_secs",
                "fast threshold must not exceed slow threshold".into(),
            ));
        }

        probability("entropy.max_corruption", self.entropy.max_corruption)?;
        probability("adaptive.recycle_chance", self.adaptive.recycle_chance)?;
        probability("breakdown.perturb_chance", self.breakdown.perturb_chance)?;
        probability("breakdown.filter_chance", self.breakdown.filter_chance)?;
        probability("breakdown.input_drop_chance", self.breakdown.input_drop_chance)?;
        probability("breakdown.hud_skip_chance", self.breakdown.hud_skip_chance)?;
        probability("breakdown.hud_error_chance", self.breakdown.hud_error_chance)?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> TuningError {
    TuningError::Invalid { field, reason }
}

fn positive_ms(field: &'static str, ms: u64) -> Result<(), TuningError> {
    if ms == 0 {
        return Err(invalid(field, "must be greater than zero".into()));
    }
    Ok(())
}

fn probability(field: &'static str, p: f32) -> Result<(), TuningError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(invalid(field, format!("probability {p} outside [0, 1]")));
    }
    Ok(())
}
