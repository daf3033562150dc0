//! Typefall - a typing arcade game whose rules decay level by level
//!
//! Core modules:
//! - `sim`: Deterministic simulation (words, physics, level rules, transitions)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences handed in by the host
//! - `autoplay`: Attract-mode player for headless runs and demos

pub mod autoplay;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use autoplay::AutoPlayer;
pub use settings::Settings;
pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Number of levels in one playthrough (Level 0 through Level 5)
    pub const LEVEL_COUNT: usize = 6;

    /// Glyph shown in place of a corrupted letter
    pub const CORRUPTED_GLYPH: char = '_';

    /// Default play area used by the headless runner
    pub const DEFAULT_PLAYFIELD_WIDTH: f32 = 960.0;
    pub const DEFAULT_PLAYFIELD_HEIGHT: f32 = 640.0;

    /// Rotation step applied on a bounce (degrees)
    pub const BOUNCE_ROTATION_STEP: f32 = 90.0;

    /// Countdown ticker period (seconds)
    pub const COUNTDOWN_PERIOD: f64 = 1.0;
}

/// Wrap an angle in degrees to [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    if wrapped < 0.0 { wrapped + 360.0 } else { wrapped }
}

/// Convert a millisecond count from tuning into simulation seconds
#[inline]
pub fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}
