//! Changeset lifecycle states and their legal transitions

use std::fmt;

use crate::error::StateMachineError;

/// Where a changeset is in its lifecycle during one update run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangesetState {
    /// Nothing has been sent yet
    NotCreated,
    /// CreateChangeSet accepted
    Created,
    /// Change set finished evaluating
    CreateComplete,
    /// Change set creation failed or timed out
    CreateFailed,
    /// ExecuteChangeSet accepted
    Executed,
    /// Stack converged to its updated state
    StackUpdateComplete,
    /// Stack update failed, rolled back or timed out
    StackUpdateFailed,
    /// Change set deleted after a failure
    CleanedUp,
}

impl ChangesetState {
    /// Every state, in lifecycle order
    pub const ALL: [ChangesetState; 8] = [
        Self::NotCreated,
        Self::Created,
        Self::CreateComplete,
        Self::CreateFailed,
        Self::Executed,
        Self::StackUpdateComplete,
        Self::StackUpdateFailed,
        Self::CleanedUp,
    ];

    /// Whether a change set exists remotely that a failure must delete
    #[inline]
    #[must_use]
    pub fn requires_cleanup(self) -> bool {
        matches!(
            self,
            Self::Created
                | Self::CreateComplete
                | Self::CreateFailed
                | Self::Executed
                | Self::StackUpdateFailed
        )
    }

    /// State to record when the step started from `self` fails
    #[must_use]
    pub fn on_failure(self) -> Option<ChangesetState> {
        match self {
            Self::Created => Some(Self::CreateFailed),
            Self::Executed => Some(Self::StackUpdateFailed),
            _ => None,
        }
    }

    /// No further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

impl fmt::Display for ChangesetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotCreated => "NotCreated",
            Self::Created => "Created",
            Self::CreateComplete => "CreateComplete",
            Self::CreateFailed => "CreateFailed",
            Self::Executed => "Executed",
            Self::StackUpdateComplete => "StackUpdateComplete",
            Self::StackUpdateFailed => "StackUpdateFailed",
            Self::CleanedUp => "CleanedUp",
        };
        f.write_str(name)
    }
}

/// Validates a state transition.
pub fn validate_transition(
    from: ChangesetState,
    to: ChangesetState,
) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step; empty for terminal states
#[must_use]
pub fn allowed_transitions(from: ChangesetState) -> &'static [ChangesetState] {
    use ChangesetState::*;
    match from {
        NotCreated => &[Created],
        Created => &[CreateComplete, CreateFailed],
        // execute request rejected
        CreateComplete => &[Executed, CleanedUp],
        CreateFailed => &[CleanedUp],
        Executed => &[StackUpdateComplete, StackUpdateFailed],
        StackUpdateFailed => &[CleanedUp],
        StackUpdateComplete | CleanedUp => &[],
    }
}

/// Current state plus the path taken to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    state: ChangesetState,
    history: Vec<ChangesetState>,
}

impl Lifecycle {
    /// Start a fresh lifecycle in `NotCreated`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ChangesetState::NotCreated,
            history: vec![ChangesetState::NotCreated],
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChangesetState {
        self.state
    }

    /// Every state visited, starting with `NotCreated`
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[ChangesetState] {
        &self.history
    }

    /// Move to `to` if the transition is legal
    pub fn advance(&mut self, to: ChangesetState) -> Result<(), StateMachineError> {
        validate_transition(self.state, to)?;
        tracing::trace!(from = %self.state, to = %to, "changeset transition");
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        let mut lifecycle = Lifecycle::new();
        for to in [
            ChangesetState::Created,
            ChangesetState::CreateComplete,
            ChangesetState::Executed,
            ChangesetState::StackUpdateComplete,
        ] {
            lifecycle.advance(to).unwrap();
        }
        assert!(lifecycle.state().is_terminal());
        assert_eq!(lifecycle.history().len(), 5);
    }

    #[test]
    fn illegal_transition_keeps_state() {
        let mut lifecycle = Lifecycle::new();
        let err = lifecycle.advance(ChangesetState::Executed).unwrap_err();
        assert_eq!(
            err,
            StateMachineError::IllegalTransition {
                from: ChangesetState::NotCreated,
                to: ChangesetState::Executed,
            }
        );
        assert_eq!(lifecycle.state(), ChangesetState::NotCreated);
    }

    #[test]
    fn cleanup_never_reachable_before_creation() {
        assert!(validate_transition(ChangesetState::NotCreated, ChangesetState::CleanedUp).is_err());
        assert!(!ChangesetState::NotCreated.requires_cleanup());
    }

    #[test]
    fn successful_update_is_never_cleaned_up() {
        assert!(!ChangesetState::StackUpdateComplete.requires_cleanup());
        assert!(validate_transition(ChangesetState::StackUpdateComplete, ChangesetState::CleanedUp).is_err());
    }

    #[test]
    fn cleanup_reachable_from_every_state_that_requires_it() {
        for state in ChangesetState::ALL.into_iter().filter(|s| s.requires_cleanup()) {
            let next = state.on_failure().unwrap_or(state);
            assert!(
                validate_transition(next, ChangesetState::CleanedUp).is_ok(),
                "{state} cannot reach CleanedUp"
            );
        }
    }

    #[test]
    fn allowed_transitions_match_validation() {
        for from in ChangesetState::ALL {
            for to in ChangesetState::ALL {
                assert_eq!(
                    allowed_transitions(from).contains(&to),
                    validate_transition(from, to).is_ok(),
                    "{from} -> {to}"
                );
            }
        }
        assert!(allowed_transitions(ChangesetState::CleanedUp).is_empty());
        assert_eq!(allowed_transitions(ChangesetState::NotCreated), &[ChangesetState::Created]);
    }
}
