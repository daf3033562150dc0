//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only advances through `Session::frame`
//! - Seeded RNG only, injected through `RandomSource`
//! - Stable iteration order (word insertion order)
//! - No rendering or platform dependencies

pub mod adaptive;
pub mod clock;
pub mod corruption;
pub mod input;
pub mod level;
pub mod lexicon;
pub mod pool;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod transition;
pub mod view;
pub mod word;

pub use adaptive::{ActiveRule, AdaptiveEvaluator};
pub use clock::FrameClock;
pub use input::{InputOutcome, Stats};
pub use level::{FailReason, Level, LevelRules, LevelVariant};
pub use pool::{SpawnOrigin, WordPool};
pub use rng::{RandomSource, ScriptedRng, SimRng};
pub use session::{GameEvent, Session};
pub use transition::{CollapseStage, Outcome, Phase};
pub use view::{FrameView, HudRoll, TimerLabel, VisualDirective};
pub use word::{Bounds, Word, WordId};
