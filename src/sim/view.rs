//! Read model handed to the display collaborator each frame

use glam::Vec2;
use serde::Serialize;

use super::level::Level;
use super::transition::Phase;
use super::word::{Word, WordId, WordMarks};

/// Title/detail pair for the outcome overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayText {
    pub title: &'static str,
    pub detail: &'static str,
}

/// Overlay currently shown, with the retry label when retry is offered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlay {
    pub text: OverlayText,
    pub retry_label: Option<String>,
}

/// Global visual corruption the display should apply
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualDirective {
    #[default]
    Clear,
    /// Entropy-driven decay (Level 2)
    Decay {
        brightness: f32,
        blur_px: f32,
        grayscale_pct: f32,
    },
    /// Randomized glitch filter (Level 5)
    Chaos {
        invert: f32,
        blur_px: f32,
        hue_deg: f32,
    },
    /// Collapse message stage
    Frozen {
        invert: f32,
        contrast: f32,
        blur_px: f32,
    },
    /// Collapse fade-out
    Fade { opacity: f32, duration_secs: f32 },
}

impl VisualDirective {
    pub fn decay(entropy: f32) -> Self {
        VisualDirective::Decay {
            brightness: (1.0 - entropy / 200.0).max(0.5),
            blur_px: (entropy / 50.0).min(2.0),
            grayscale_pct: entropy.min(100.0),
        }
    }

    pub fn frozen() -> Self {
        VisualDirective::Frozen {
            invert: 1.0,
            contrast: 2.0,
            blur_px: 4.0,
        }
    }

    pub fn fade(duration_secs: f32) -> Self {
        VisualDirective::Fade {
            opacity: 0.0,
            duration_secs,
        }
    }
}

/// Whether the display should redraw the score this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HudRoll {
    Show,
    /// Keep the previous values on screen
    Skip,
    /// Replace the score with an error token
    ErrorToken,
}

/// What the timer slot shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerLabel {
    Countdown(u32),
    Untimed,
    Decay,
    Unbounded,
    Error,
}

impl std::fmt::Display for TimerLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerLabel::Countdown(secs) => write!(f, "{secs}s"),
            TimerLabel::Untimed => f.write_str("--"),
            TimerLabel::Decay => f.write_str("Decay"),
            TimerLabel::Unbounded => f.write_str("∞"),
            TimerLabel::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordView {
    pub id: WordId,
    pub text: String,
    pub pos: Vec2,
    pub size: Vec2,
    pub rotation: f32,
    pub marks: WordMarks,
    pub merged: bool,
}

impl From<&Word> for WordView {
    fn from(word: &Word) -> Self {
        Self {
            id: word.id,
            text: word.display_text.clone(),
            pos: word.pos,
            size: word.size,
            rotation: word.rotation,
            marks: word.marks,
            merged: word.is_merged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hud {
    pub level: Level,
    pub score: i64,
    pub popped: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub time_remaining: Option<u32>,
    pub timer: String,
    pub active_words: usize,
    /// Level 3 modifier, when one is active
    pub active_rule: Option<&'static str>,
}

/// Snapshot of everything the display needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameView {
    pub phase: Phase,
    pub words: Vec<WordView>,
    pub hud: Hud,
    pub visual: VisualDirective,
    pub overlay: Option<Overlay>,
}
