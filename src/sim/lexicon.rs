//! Word list for fresh spawns

use super::pool::WordPool;
use super::rng::RandomSource;

/// Every word the game can spawn
pub const WORDS: [&str; 90] = [
    "orbit", "pulse", "flash", "matrix", "echo", "slide", "glow", "spark", "trace", "drift",
    "storm", "wave", "pixel", "shift", "flare", "bounce", "swift", "nova", "comet", "aura",
    "nexus", "quark", "vivid", "sonic", "lumen", "prism", "glyph", "rally", "sprint", "prime",
    "chase", "fleet", "clear", "bold", "rapid", "punch", "blaze", "ripple", "bright", "shine",
    "racer", "quick", "laser", "hatch", "tempo", "rush", "dodge", "sparkle", "tumble", "sketch",
    "vector", "cinder", "ember", "flick", "rider", "streak", "swirl", "hustle", "snap", "scale",
    "craft", "thrive", "climb", "float", "pilot", "atlas", "rover", "drone", "pioneer", "zenith",
    "flashy", "ready", "punchy", "burst", "dart", "fling", "hover", "jolt", "leap", "loom",
    "loop", "nudge", "quiver", "scout", "swoop", "twist", "vault", "vortex", "whirl", "zip",
];

/// Pick a word that is not already live, or `None` if all of them are
pub fn pick_available(pool: &WordPool, rng: &mut dyn RandomSource) -> Option<&'static str> {
    let available: Vec<&'static str> = WORDS
        .iter()
        .copied()
        .filter(|candidate| !pool.contains_original(candidate))
        .collect();
    if available.is_empty() {
        return None;
    }
    Some(available[rng.index(available.len())])
}
