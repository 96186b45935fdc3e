use crate::api::{TrialMode, TrialRequest};
use crate::state::ViewState;

/// Trial navigation requested by the user.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrialCommand {
    Next,
    Prev,
    GoToIndex(usize),
    Random,
}

impl TrialCommand {
    pub fn mode(self) -> TrialMode {
        match self {
            TrialCommand::Next => TrialMode::Next,
            TrialCommand::Prev => TrialMode::Prev,
            TrialCommand::GoToIndex(_) => TrialMode::Index,
            TrialCommand::Random => TrialMode::Random,
        }
    }
}

/// Turns a navigation command into a backend request.
///
/// Nothing is committed here: the backend clamps the index and answers with the trial it
/// actually served, which is what lands in [`ViewState`].
pub fn resolve(command: TrialCommand, state: &ViewState) -> TrialRequest {
    let current = state.current_trial_index();
    let index = match command {
        TrialCommand::Next => current + 1,
        TrialCommand::Prev => current.saturating_sub(1),
        TrialCommand::GoToIndex(index) => index,
        TrialCommand::Random => current,
    };
    TrialRequest {
        mode: command.mode(),
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(index: usize, total: usize) -> ViewState {
        let mut state = ViewState::default();
        state.apply_trial_position(index, total).unwrap();
        state
    }

    #[test]
    fn prev_never_goes_negative() {
        let request = resolve(TrialCommand::Prev, &ViewState::default());
        assert_eq!(request.index, 0);
        assert_eq!(request.mode, TrialMode::Prev);
        assert_eq!(resolve(TrialCommand::Prev, &state_at(7, 50)).index, 6);
    }

    #[test]
    fn next_is_not_clamped_client_side() {
        let request = resolve(TrialCommand::Next, &state_at(49, 50));
        assert_eq!(request.index, 50);
        assert_eq!(request.mode, TrialMode::Next);
    }

    #[test]
    fn index_is_passed_verbatim() {
        let request = resolve(TrialCommand::GoToIndex(500), &state_at(1, 50));
        assert_eq!(
            request,
            TrialRequest {
                mode: TrialMode::Index,
                index: 500
            }
        );
    }

    #[test]
    fn random_leaves_choice_to_backend() {
        let request = resolve(TrialCommand::Random, &state_at(3, 50));
        assert_eq!(request.mode, TrialMode::Random);
        assert_eq!(request.index, 3);
    }
}
