//! Word entities and play-area physics
//!
//! Words move with constant velocity and bounce elastically off the four
//! edges of the play area. Positions are the top-left corner of the word's
//! bounding box, in pixels, with y growing downward.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::BOUNCE_ROTATION_STEP;
use crate::tuning::TextMetrics;
use crate::wrap_degrees;

/// Unique, monotonically assigned word identifier
pub type WordId = u32;

/// Play-area extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Largest top-left position at which a box of `size` still fits
    ///
    /// Collapses to zero on an axis where the box is larger than the area.
    #[inline]
    pub fn max_origin(&self, size: Vec2) -> Vec2 {
        Vec2::new(
            (self.width - size.x).max(0.0),
            (self.height - size.y).max(0.0),
        )
    }

    /// Clamp a top-left position so a box of `size` lies inside the area
    #[inline]
    pub fn clamp(&self, pos: Vec2, size: Vec2) -> Vec2 {
        pos.clamp(Vec2::ZERO, self.max_origin(size))
    }
}

impl TextMetrics {
    /// Bounding box of a single line of text
    pub fn measure(&self, text: &str) -> Vec2 {
        let glyphs = text.chars().count() as f32;
        Vec2::new(
            glyphs * self.glyph_width + 2.0 * self.padding_x,
            self.glyph_height + 2.0 * self.padding_y,
        )
    }
}

/// Cosmetic marks the display uses to style a word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordMarks {
    /// Permanent glitch styling (Level 5 text, recycled Level 3 words)
    pub unstable: bool,
    /// Spawned under the HEAVY adaptive rule
    pub heavy: bool,
    /// Half of a word divided by the SPLIT adaptive rule
    pub fragment: bool,
}

/// What a physics step did to a word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BounceReport {
    /// Any bound was hit
    pub bounced: bool,
    /// The bottom bound was crossed while moving down
    pub reached_bottom: bool,
}

/// A live, poppable word
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    /// Text shown to the player (may contain corrupted-letter glyphs)
    pub display_text: String,
    /// Exact text the player must submit to pop this word
    pub required_text: String,
    /// Uncorrupted source word
    pub original_word: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    /// Simulation time (seconds) the word appeared
    pub spawn_time: f64,
    pub popped: bool,
    pub is_merged: bool,
    pub marks: WordMarks,
    /// Cosmetic rotation (degrees), advanced only on bounces
    pub rotation: f32,
    pub last_bounce_time: Option<f64>,
}

impl Word {
    /// Seconds between spawn and `now`
    #[inline]
    pub fn age(&self, now: f64) -> f32 {
        (now - self.spawn_time).max(0.0) as f32
    }

    /// Constant-velocity integration step
    pub fn integrate(&mut self, dt: f32, bounds: Bounds) -> BounceReport {
        self.advance(self.vel * dt, bounds)
    }

    /// Move by `displacement`, then clamp to the bounds and reflect the
    /// velocity component orthogonal to any bound that was crossed
    pub fn advance(&mut self, displacement: Vec2, bounds: Bounds) -> BounceReport {
        let max = bounds.max_origin(self.size);
        let mut report = BounceReport::default();
        self.pos += displacement;

        if self.pos.x <= 0.0 {
            self.pos.x = 0.0;
            self.vel.x = self.vel.x.abs();
            report.bounced = true;
        } else if self.pos.x >= max.x {
            self.pos.x = max.x;
            self.vel.x = -self.vel.x.abs();
            report.bounced = true;
        }

        if self.pos.y <= 0.0 {
            self.pos.y = 0.0;
            self.vel.y = self.vel.y.abs();
            report.bounced = true;
        } else if self.pos.y >= max.y {
            report.reached_bottom = self.vel.y > 0.0;
            self.pos.y = max.y;
            self.vel.y = -self.vel.y.abs();
            report.bounced = true;
        }

        report
    }

    /// Advance the bounce rotation, at most once per `throttle` seconds
    pub fn rotate_on_bounce(&mut self, now: f64, throttle: f64) {
        let due = self
            .last_bounce_time
            .is_none_or(|last| now - last > throttle);
        if due {
            self.rotation = wrap_degrees(self.rotation + BOUNCE_ROTATION_STEP);
            self.last_bounce_time = Some(now);
        }
    }

    /// Re-clamp into (possibly smaller) bounds without touching velocity
    pub fn clamp_into(&mut self, bounds: Bounds) {
        self.pos = bounds.clamp(self.pos, self.size);
    }

    /// Axis-aligned bounding-box overlap
    pub fn overlaps(&self, other: &Word) -> bool {
        self.pos.x < other.pos.x + other.size.x
            && other.pos.x < self.pos.x + self.size.x
            && self.pos.y < other.pos.y + other.size.y
            && other.pos.y < self.pos.y + self.size.y
    }
}

#[cfg(test)]
pub(crate) fn test_word(id: WordId, pos: Vec2, vel: Vec2, size: Vec2) -> Word {
    Word {
        id,
        display_text: "word".into(),
        required_text: "word".into(),
        original_word: "word".into(),
        pos,
        vel,
        size,
        spawn_time: 0.0,
        popped: false,
        is_merged: false,
        marks: WordMarks::default(),
        rotation: 0.0,
        last_bounce_time: None,
    }
}
