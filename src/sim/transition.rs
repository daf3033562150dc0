//! Level transition controller
//!
//! The whole game flow as one table: `(phase, trigger) -> next phase`.
//! Triggers that have no edge from the current phase are ignored.

use serde::Serialize;

use super::level::{FailReason, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Won,
    Failed(FailReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollapseStage {
    Message,
    Fade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Playing(Level),
    /// Paused on a level outcome
    Resolving { level: Level, outcome: Outcome },
    Collapsing(CollapseStage),
}

impl Phase {
    pub fn is_playing(&self) -> bool {
        matches!(self, Phase::Playing(_))
    }

    /// Level the phase belongs to, if any
    pub fn level(&self) -> Option<Level> {
        match self {
            Phase::Playing(level) | Phase::Resolving { level, .. } => Some(*level),
            Phase::Collapsing(_) => Some(Level::RuleBreakdown),
            Phase::Idle => None,
        }
    }

    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            Phase::Resolving {
                outcome: Outcome::Failed(_),
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    Stop,
    Won,
    Failed(FailReason),
    Retry,
    AdvanceElapsed,
    Collapse,
    CollapseMessageElapsed,
    CollapseFadeElapsed,
}

/// Next phase for `trigger`, or `None` when the trigger doesn't apply
pub fn transition(phase: Phase, trigger: Trigger) -> Option<Phase> {
    use Phase::*;

    match (phase, trigger) {
        (Idle, Trigger::Start) => Some(Playing(Level::Stable)),
        (Idle, Trigger::Stop) => None,
        (_, Trigger::Stop) => Some(Idle),

        (Playing(Level::RuleBreakdown), Trigger::Won | Trigger::Failed(_)) => None,
        (Playing(level), Trigger::Won) => Some(Resolving {
            level,
            outcome: Outcome::Won,
        }),
        (Playing(level), Trigger::Failed(reason)) => Some(Resolving {
            level,
            outcome: Outcome::Failed(reason),
        }),

        (
            Resolving {
                level,
                outcome: Outcome::Won,
            },
            Trigger::AdvanceElapsed,
        ) => level.next().map(Playing),
        (
            Resolving {
                level,
                outcome: Outcome::Failed(_),
            },
            Trigger::Retry,
        ) => Some(Playing(level)),

        (Playing(Level::RuleBreakdown), Trigger::Collapse) => {
            Some(Collapsing(CollapseStage::Message))
        }
        (Collapsing(CollapseStage::Message), Trigger::CollapseMessageElapsed) => {
            Some(Collapsing(CollapseStage::Fade))
        }
        (Collapsing(CollapseStage::Fade), Trigger::CollapseFadeElapsed) => Some(Idle),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolving(level: Level, outcome: Outcome) -> Phase {
        Phase::Resolving { level, outcome }
    }

    #[test]
    fn test_full_win_path_to_collapse() {
        let mut phase = transition(Phase::Idle, Trigger::Start).unwrap();
        for level in &Level::ALL[..5] {
            assert_eq!(phase, Phase::Playing(*level));
            phase = transition(phase, Trigger::Won).unwrap();
            assert_eq!(phase, resolving(*level, Outcome::Won));
            phase = transition(phase, Trigger::AdvanceElapsed).unwrap();
        }
        assert_eq!(phase, Phase::Playing(Level::RuleBreakdown));
        phase = transition(phase, Trigger::Collapse).unwrap();
        phase = transition(phase, Trigger::CollapseMessageElapsed).unwrap();
        assert_eq!(phase, Phase::Collapsing(CollapseStage::Fade));
        assert_eq!(transition(phase, Trigger::CollapseFadeElapsed), Some(Phase::Idle));
    }

    #[test]
    fn test_rule_breakdown_has_no_outcome_edges() {
        let phase = Phase::Playing(Level::RuleBreakdown);
        assert_eq!(transition(phase, Trigger::Won), None);
        assert_eq!(transition(phase, Trigger::Failed(FailReason::Overload)), None);
    }

    #[test]
    fn test_retry_only_after_fail() {
        let failed = resolving(Level::EntropyDecay, Outcome::Failed(FailReason::DecayCritical));
        assert!(failed.can_retry());
        assert_eq!(transition(failed, Trigger::Retry), Some(Phase::Playing(Level::EntropyDecay)));
        assert_eq!(transition(failed, Trigger::AdvanceElapsed), None);

        let won = resolving(Level::EntropyDecay, Outcome::Won);
        assert!(!won.can_retry());
        assert_eq!(transition(won, Trigger::Retry), None);
        assert_eq!(transition(Phase::Playing(Level::Stable), Trigger::Retry), None);
    }

    #[test]
    fn test_stop_from_anywhere() {
        assert_eq!(transition(Phase::Idle, Trigger::Stop), None);
        for phase in [
            Phase::Playing(Level::AdaptiveDefense),
            resolving(Level::Stable, Outcome::Won),
            Phase::Collapsing(CollapseStage::Message),
        ] {
            assert_eq!(transition(phase, Trigger::Stop), Some(Phase::Idle));
        }
    }

    #[test]
    fn test_start_ignored_while_running() {
        assert_eq!(transition(Phase::Playing(Level::Stable), Trigger::Start), None);
        assert_eq!(
            transition(Phase::Collapsing(CollapseStage::Fade), Trigger::Start),
            None
        );
    }

    #[test]
    fn test_collapse_only_from_rule_breakdown() {
        assert_eq!(transition(Phase::Playing(Level::SpatialPressure), Trigger::Collapse), None);
    }
}
