//! Word entity pool
//!
//! Owns every live word. Popping only flags a word; the flagged words are
//! swept out in one pass once the caller has finished applying side
//! effects, so nothing is removed while the pool is being iterated.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::level::LevelRules;
use super::rng::RandomSource;
use super::word::{Bounds, Word, WordId, WordMarks};
use crate::tuning::TextMetrics;

/// Where a spawned word's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnOrigin {
    /// Picked from the lexicon
    Fresh,
    /// Reused from the Level 3 missed-word queue
    Recycled,
    /// Half of a word divided by the SPLIT rule
    Fragment,
}

/// Text and provenance of a word about to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub text: String,
    pub origin: SpawnOrigin,
}

impl SpawnRequest {
    pub fn new(text: impl Into<String>, origin: SpawnOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }
}

/// Environment a spawn or merge places words into
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext {
    pub bounds: Bounds,
    pub metrics: TextMetrics,
    pub now: f64,
}

/// The set of live words, in insertion order
#[derive(Debug, Clone)]
pub struct WordPool {
    words: Vec<Word>,
    next_id: WordId,
}

impl Default for WordPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WordPool {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new word ID (never reused, even across clears)
    fn next_word_id(&mut self) -> WordId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, word: Word) -> WordId {
        debug_assert!(
            self.words.iter().all(|w| w.id != word.id),
            "duplicate word id {}",
            word.id
        );
        let id = word.id;
        self.words.push(word);
        id
    }

    /// Create a word from `request`, letting the active rules decide its
    /// corruption, velocity and marks, at a random position that fits the
    /// play area
    pub fn spawn(
        &mut self,
        request: &SpawnRequest,
        rules: &dyn LevelRules,
        ctx: &SpawnContext,
        rng: &mut dyn RandomSource,
    ) -> WordId {
        let text = rules.corrupt(&request.text, request.origin, rng);
        let vel = rules.velocity_for(request.origin, rng);
        let size = ctx.metrics.measure(&text.display);
        let max = ctx.bounds.max_origin(size);
        let pos = Vec2::new(rng.next_unit() * max.x, rng.next_unit() * max.y);

        let id = self.next_word_id();
        self.insert(Word {
            id,
            display_text: text.display,
            required_text: text.required,
            original_word: request.text.clone(),
            pos,
            vel,
            size,
            spawn_time: ctx.now,
            popped: false,
            is_merged: false,
            marks: rules.marks_for(request.origin),
            rotation: 0.0,
            last_bounce_time: None,
        })
    }

    /// Replace two live words with one merged word at their midpoint
    ///
    /// The merged word carries both texts, moves at the averaged velocity
    /// scaled by `damping` with its vertical component forced downward, and
    /// inherits `unstable` if either input had it.
    pub fn merge(
        &mut self,
        a: WordId,
        b: WordId,
        damping: f32,
        ctx: &SpawnContext,
    ) -> Option<WordId> {
        if a == b || self.live_index(a).is_none() || self.live_index(b).is_none() {
            return None;
        }
        let first = self.take_live(a)?;
        let second = self.take_live(b)?;

        let display_text = format!("{}{}", first.display_text, second.display_text);
        let size = ctx.metrics.measure(&display_text);
        let midpoint = (first.pos + second.pos) * 0.5;
        let mut vel = (first.vel + second.vel) * 0.5 * damping;
        vel.y = vel.y.abs();

        let id = self.next_word_id();
        Some(self.insert(Word {
            id,
            display_text,
            required_text: format!("{}{}", first.required_text, second.required_text),
            original_word: format!("{}{}", first.original_word, second.original_word),
            pos: ctx.bounds.clamp(midpoint, size),
            vel,
            size,
            spawn_time: ctx.now,
            popped: false,
            is_merged: true,
            marks: WordMarks {
                unstable: first.marks.unstable || second.marks.unstable,
                ..WordMarks::default()
            },
            rotation: 0.0,
            last_bounce_time: None,
        }))
    }

    fn live_index(&self, id: WordId) -> Option<usize> {
        self.words.iter().position(|w| w.id == id && !w.popped)
    }

    fn take_live(&mut self, id: WordId) -> Option<Word> {
        let index = self.live_index(id)?;
        Some(self.words.remove(index))
    }

    /// Flag a word as popped; it stays in the pool until [`Self::sweep`]
    pub fn mark_popped(&mut self, id: WordId) -> Option<&Word> {
        let word = self.words.iter_mut().find(|w| w.id == id && !w.popped)?;
        word.popped = true;
        Some(word)
    }

    /// Drop every popped word
    pub fn sweep(&mut self) {
        self.words.retain(|w| !w.popped);
    }

    /// First live word whose required text matches `target` (already lowercased)
    pub fn find_required(&self, target: &str) -> Option<WordId> {
        self.iter_live()
            .find(|w| w.required_text.to_lowercase() == target)
            .map(|w| w.id)
    }

    /// Whether a live word was spawned from `original`
    pub fn contains_original(&self, original: &str) -> bool {
        self.iter_live()
            .any(|w| w.original_word.eq_ignore_ascii_case(original))
    }

    /// Re-clamp every word into new bounds without altering velocity
    pub fn clamp_all(&mut self, bounds: Bounds) {
        for word in &mut self.words {
            word.clamp_into(bounds);
        }
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn get(&self, id: WordId) -> Option<&Word> {
        self.words.iter().find(|w| w.id == id)
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Word> + '_ {
        self.words.iter().filter(|w| !w.popped)
    }

    pub fn iter_live_mut(&mut self) -> impl Iterator<Item = &mut Word> + '_ {
        self.words.iter_mut().filter(|w| !w.popped)
    }

    pub fn live_count(&self) -> usize {
        self.iter_live().count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, mut word: Word) -> WordId {
        word.id = self.next_word_id();
        self.insert(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use crate::sim::level::{Level, LevelVariant};
    use crate::sim::rng::{ScriptedRng, SimRng};
    use crate::sim::word::test_word;
    use crate::tuning::Tuning;

    fn ctx() -> SpawnContext {
        SpawnContext {
            bounds: Bounds::new(800.0, 600.0),
            metrics: TextMetrics::default(),
            now: 3.0,
        }
    }

    #[test]
    fn test_spawn_fits_bounds_and_assigns_fresh_ids() {
        let tuning = Tuning::default();
        let rules = LevelVariant::new(Level::Stable, &tuning);
        let mut pool = WordPool::new();
        let mut rng = SimRng::new(5);
        let mut ids = HashSet::new();
        for _ in 0..50 {
            let id = pool.spawn(&SpawnRequest::new("orbit", SpawnOrigin::Fresh), rules.rules(), &ctx(), &mut rng);
            assert!(ids.insert(id));
            let word = pool.get(id).unwrap();
            assert!(word.pos.x >= 0.0 && word.pos.x + word.size.x <= 800.0);
            assert!(word.pos.y >= 0.0 && word.pos.y + word.size.y <= 600.0);
            assert!((word.vel.length() - 100.0).abs() < 1e-3);
            assert_eq!(word.spawn_time, 3.0);
        }
        assert_eq!(pool.live_count(), 50);
    }

    #[test]
    fn test_spawn_in_tiny_area_falls_back_to_origin() {
        let tuning = Tuning::default();
        let rules = LevelVariant::new(Level::Stable, &tuning);
        let mut pool = WordPool::new();
        let mut rng = ScriptedRng::constant(0.7);
        let tiny = SpawnContext {
            bounds: Bounds::new(10.0, 10.0),
            ..ctx()
        };
        let id = pool.spawn(&SpawnRequest::new("matrix", SpawnOrigin::Fresh), rules.rules(), &tiny, &mut rng);
        assert_eq!(pool.get(id).unwrap().pos, Vec2::ZERO);
    }

    #[test]
    fn test_pop_is_deferred_until_sweep() {
        let mut pool = WordPool::new();
        let id = pool.push_for_test(test_word(0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE));
        assert!(pool.mark_popped(id).is_some());
        assert!(pool.get(id).is_some());
        assert_eq!(pool.live_count(), 0);
        assert!(pool.mark_popped(id).is_none());
        pool.sweep();
        assert!(pool.get(id).is_none());
    }

    #[test]
    fn test_merge_combines_and_nets_minus_one() {
        let mut pool = WordPool::new();
        let mut left = test_word(0, Vec2::new(100.0, 100.0), Vec2::new(40.0, -60.0), Vec2::new(60.0, 30.0));
        left.display_text = "echo".into();
        left.required_text = "echo".into();
        left.marks.unstable = true;
        let mut right = test_word(0, Vec2::new(200.0, 300.0), Vec2::new(20.0, -40.0), Vec2::new(60.0, 30.0));
        right.display_text = "wave".into();
        right.required_text = "wave".into();
        let a = pool.push_for_test(left);
        let b = pool.push_for_test(right);
        pool.push_for_test(test_word(0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE));

        let merged = pool.merge(a, b, 0.7, &ctx()).unwrap();
        assert_eq!(pool.live_count(), 2);
        assert!(pool.get(a).is_none() && pool.get(b).is_none());

        let word = pool.get(merged).unwrap();
        assert!(word.is_merged);
        assert!(word.marks.unstable);
        assert_eq!(word.required_text, "echowave");
        assert_eq!(word.display_text, "echowave");
        assert_eq!(word.pos, Vec2::new(150.0, 200.0));
        assert!((word.vel.x - 21.0).abs() < 1e-4);
        assert!((word.vel.y - 35.0).abs() < 1e-4);
    }

    #[test]
    fn test_merge_with_missing_word_is_noop() {
        let mut pool = WordPool::new();
        let a = pool.push_for_test(test_word(0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE));
        assert!(pool.merge(a, 999, 0.7, &ctx()).is_none());
        assert!(pool.merge(a, a, 0.7, &ctx()).is_none());
        assert_eq!(pool.live_count(), 1);
    }

    #[test]
    fn test_find_required_is_exact() {
        let mut pool = WordPool::new();
        let mut word = test_word(0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        word.required_text = "orbit".into();
        let id = pool.push_for_test(word);
        assert_eq!(pool.find_required("orbit"), Some(id));
        assert_eq!(pool.find_required("orbi"), None);
        assert_eq!(pool.find_required("orbitz"), None);
    }

    #[test]
    fn test_ids_survive_clear() {
        let mut pool = WordPool::new();
        let a = pool.push_for_test(test_word(0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE));
        pool.clear();
        let b = pool.push_for_test(test_word(0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE));
        assert!(b > a);
    }

    proptest! {
        #[test]
        fn prop_ids_unique(seed in any::<u64>(), ops in prop::collection::vec(0u8..4, 1..120)) {
            let tuning = Tuning::default();
            let rules = LevelVariant::new(Level::Stable, &tuning);
            let mut pool = WordPool::new();
            let mut rng = SimRng::new(seed);
            let mut issued = HashSet::new();
            for op in ops {
                let live: Vec<WordId> = pool.iter_live().map(|w| w.id).collect();
                let new_id = match op {
                    0 => Some(pool.spawn(&SpawnRequest::new("pulse", SpawnOrigin::Fresh), rules.rules(), &ctx(), &mut rng)),
                    1 if live.len() >= 2 => pool.merge(live[0], live[live.len() - 1], 0.7, &ctx()),
                    2 if !live.is_empty() => {
                        pool.mark_popped(live[rng.index(live.len())]);
                        pool.sweep();
                        None
                    }
                    3 => {
                        pool.clear();
                        None
                    }
                    _ => None,
                };
                if let Some(id) = new_id {
                    prop_assert!(issued.insert(id), "id {} issued twice", id);
                }
                let ids: HashSet<WordId> = pool.iter_live().map(|w| w.id).collect();
                prop_assert_eq!(ids.len(), pool.live_count());
            }
        }
    }
}
