//! Player preferences
//!
//! Handed in by the host at session creation. The game never persists them.

use serde::{Deserialize, Serialize};

/// Player-facing toggles that change presentation, not balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Words rotate a quarter turn when they bounce (never on Level 0)
    pub rotation_enabled: bool,
    /// Emit visual corruption directives (decay, chaos, collapse filters)
    pub visual_effects: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rotation_enabled: false,
            visual_effects: true,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document (missing fields use defaults)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Toggle bounce rotation, returning the new state
    pub fn toggle_rotation(&mut self) -> bool {
        self.rotation_enabled = !self.rotation_enabled;
        self.rotation_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(!settings.rotation_enabled);
        assert!(settings.visual_effects);
    }

    #[test]
    fn test_settings_partial_json() {
        let settings = Settings::from_json(r#"{ "rotation_enabled": true }"#).unwrap();
        assert!(settings.rotation_enabled);
        assert!(settings.visual_effects);
    }

    #[test]
    fn test_toggle_rotation() {
        let mut settings = Settings::default();
        assert!(settings.toggle_rotation());
        assert!(!settings.toggle_rotation());
    }
}
