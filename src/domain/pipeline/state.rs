//! Orchestrator state machine

use serde::{Deserialize, Serialize};

use crate::domain::envelope::StageName;

/// `pending → running(stage) → … → completed | halted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Running(StageName),
    Completed,
    Halted(StageName),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Halted(_))
    }

    /// Move into `stage`. Stages only move forward; terminal states stay put.
    pub fn enter(self, stage: StageName) -> Self {
        match self {
            Self::Pending => Self::Running(stage),
            Self::Running(current) if stage > current => Self::Running(stage),
            other => other,
        }
    }

    /// A fatal error stops the machine at the current stage
    pub fn halt(self) -> Self {
        match self {
            Self::Pending => Self::Halted(StageName::Intake),
            Self::Running(stage) => Self::Halted(stage),
            other => other,
        }
    }

    pub fn complete(self) -> Self {
        match self {
            Self::Pending | Self::Running(_) => Self::Completed,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = PipelineState::Pending;

        for stage in StageName::PIPELINE {
            state = state.enter(stage);
            assert_eq!(state, PipelineState::Running(stage));
        }

        state = state.complete();
        assert_eq!(state, PipelineState::Completed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_no_backward_transition() {
        let state = PipelineState::Pending
            .enter(StageName::Design)
            .enter(StageName::Parse);

        assert_eq!(state, PipelineState::Running(StageName::Design));
    }

    #[test]
    fn test_halt_records_stage() {
        let state = PipelineState::Pending.enter(StageName::Synthesize).halt();
        assert_eq!(state, PipelineState::Halted(StageName::Synthesize));

        assert_eq!(
            PipelineState::Pending.halt(),
            PipelineState::Halted(StageName::Intake)
        );
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let halted = PipelineState::Halted(StageName::Parse);

        assert_eq!(halted.enter(StageName::Design), halted);
        assert_eq!(halted.complete(), halted);
        assert_eq!(PipelineState::Completed.halt(), PipelineState::Completed);
    }
}
