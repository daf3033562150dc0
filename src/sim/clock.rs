//! Frame clock
//!
//! Turns host frame timestamps (milliseconds, e.g. from
//! `requestAnimationFrame` or a native loop) into the elapsed-seconds deltas
//! the session consumes.

/// Converts monotonic frame timestamps into clamped deltas
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
    max_delta: f32,
}

impl FrameClock {
    /// `max_delta` caps a single step so a stalled tab can't teleport words
    pub fn new(max_delta: f32) -> Self {
        Self {
            last_ms: None,
            max_delta,
        }
    }

    /// Delta in seconds since the previous frame; the first frame yields 0
    pub fn delta(&mut self, now_ms: f64) -> f32 {
        let delta = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        if !delta.is_finite() || delta < 0.0 {
            return 0.0;
        }
        delta.min(self.max_delta)
    }
}
