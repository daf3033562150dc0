//! Letter corruption
//!
//! A corrupted letter is hidden behind [`CORRUPTED_GLYPH`] and dropped from
//! the text the player has to type. A word never loses every letter: if all
//! of them are corrupted the first one is restored.

use crate::consts::CORRUPTED_GLYPH;

use super::rng::RandomSource;

/// Result of corrupting a source word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corrupted {
    /// What the player must type
    pub required: String,
    /// What the player sees
    pub display: String,
}

impl Corrupted {
    /// No corruption: display and required text are the source word
    pub fn clean(word: &str) -> Self {
        Self {
            required: word.to_string(),
            display: word.to_string(),
        }
    }
}

/// Per-letter corruption chance for a given entropy
#[inline]
pub fn corruption_chance(entropy: f32, divisor: f32, max_chance: f32) -> f32 {
    (entropy / divisor).clamp(0.0, max_chance)
}

/// Corrupt each letter of `word` independently with probability `chance`
pub fn corrupt(word: &str, chance: f32, rng: &mut dyn RandomSource) -> Corrupted {
    let mut required = String::with_capacity(word.len());
    let mut display = String::with_capacity(word.len());

    for ch in word.chars() {
        if rng.chance(chance) {
            display.push(CORRUPTED_GLYPH);
        } else {
            required.push(ch);
            display.push(ch);
        }
    }

    if required.is_empty() {
        if let Some(first) = word.chars().next() {
            required.push(first);
            display = std::iter::once(first).chain(display.chars().skip(1)).collect();
        }
    }

    Corrupted { required, display }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::{ScriptedRng, SimRng};

    #[test]
    fn test_chance_curve() {
        assert_eq!(corruption_chance(0.0, 200.0, 0.5), 0.0);
        assert_eq!(corruption_chance(50.0, 200.0, 0.5), 0.25);
        assert_eq!(corruption_chance(100.0, 200.0, 0.5), 0.5);
        assert_eq!(corruption_chance(400.0, 200.0, 0.5), 0.5);
    }

    #[test]
    fn test_zero_chance_is_clean() {
        let mut rng = SimRng::new(3);
        assert_eq!(corrupt("orbit", 0.0, &mut rng), Corrupted::clean("orbit"));
    }

    #[test]
    fn test_selected_letters_are_hidden() {
        // o kept, r hidden, b kept, i hidden, t kept
        let mut rng = ScriptedRng::new([0.9, 0.1, 0.9, 0.1, 0.9], 0.9);
        let out = corrupt("orbit", 0.5, &mut rng);
        assert_eq!(out.required, "obt");
        assert_eq!(out.display, "o_b_t");
    }

    #[test]
    fn test_fully_corrupted_keeps_first_letter() {
        let mut rng = ScriptedRng::constant(0.0);
        let out = corrupt("pulse", 0.5, &mut rng);
        assert_eq!(out.required, "p");
        assert_eq!(out.display, "p____");
    }

    #[test]
    fn test_required_is_subsequence_of_source() {
        let mut rng = SimRng::new(11);
        for _ in 0..200 {
            let out = corrupt("sparkle", 0.5, &mut rng);
            assert!(!out.required.is_empty());
            assert_eq!(out.display.chars().count(), 7);
            let mut source = "sparkle".chars();
            assert!(out.required.chars().all(|c| source.any(|s| s == c)));
        }
    }
}
