//! Error types for stack updates
//!
//! One error reaches the caller per invocation:
//! - Configuration errors are raised before any remote call
//! - Remote request errors are passed through unchanged
//! - Wait errors cover terminal failure states and exhausted wait budgets
//!
//! Every wrapper is transparent so the reported message is the original one.

use std::time::Duration;

use crate::state_machine::ChangesetState;

/// Main stackup error type
#[derive(Debug, thiserror::Error)]
pub enum StackupError {
    /// Invalid caller input, detected before any remote call
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request rejected by the remote stack service
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A wait reached a failure state or ran out of time
    #[error(transparent)]
    Wait(#[from] WaitError),

    /// Lifecycle bookkeeping went out of order
    #[error(transparent)]
    StateMachine(#[from] StateMachineError),
}

impl StackupError {
    /// Whether this error was raised before anything was sent to the service
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Caller input errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Argument failed validation
    #[error("{0}")]
    InvalidArgument(String),

    /// Required input is missing or blank
    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    /// Override line is not of the form `KEY=VALUE`
    #[error("Input parameter-overrides has an invalid entry {0:?}, expected KEY=VALUE")]
    MalformedOverride(String),

    /// Capability token is not one the service accepts
    #[error("Input capabilities has an unknown capability {0:?}")]
    UnknownCapability(String),

    /// Wait settings must be positive
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// Wait settings above the supported ceiling
    #[error("{name} must not exceed {} seconds", .limit.as_secs())]
    DurationTooLong {
        /// Setting name
        name: &'static str,
        /// Largest accepted value
        limit: Duration,
    },
}

impl ConfigError {
    /// Role identifier failed ARN validation
    #[inline]
    #[must_use]
    pub fn invalid_arn() -> Self {
        Self::InvalidArgument("Input role-arn is an invalid arn format".to_string())
    }
}

/// Error code the service uses for missing stacks and change sets
pub const VALIDATION_ERROR_CODE: &str = "ValidationError";

/// Request rejected by the remote stack service
///
/// Displays as the service's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Service error code, when one was returned
    pub code: Option<String>,
    /// Service error message
    pub message: String,
}

impl RemoteError {
    /// Create error without a code
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// With service error code
    #[inline]
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Service reported the target as invalid or missing
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        self.code.as_deref() == Some(VALIDATION_ERROR_CODE)
    }
}

/// Wait primitive errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// Resource reached a terminal failure state
    #[error("Waiter {waiter} failed: {reason}")]
    Failed {
        /// Waiter name
        waiter: &'static str,
        /// Failure state or service message
        reason: String,
    },

    /// Wait budget exhausted before a terminal state
    #[error("Waiter {waiter} timed out after {}s (last observed: {})", .waited.as_secs(), .last_observed.as_deref().unwrap_or("nothing"))]
    Timeout {
        /// Waiter name
        waiter: &'static str,
        /// Time spent waiting
        waited: Duration,
        /// Last non-terminal state seen
        last_observed: Option<String>,
    },
}

/// Lifecycle transition errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not permitted from the current state
    #[error("illegal changeset transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: ChangesetState,
        /// Requested state
        to: ChangesetState,
    },
}
