//! stackup core - changeset lifecycle orchestration
//!
//! Updates a deployed stack through a change set:
//! - Reconciles parameter overrides against the deployed template
//! - Validates the optional service role
//! - Creates, waits for, and executes the change set
//! - Waits for the stack to converge
//! - Deletes the change set again if anything fails after it was created
//!
//! # Example
//!
//! ```rust,ignore
//! use stackup_core::{run, ActionInputs, TracingReporter, UpdateConfig};
//!
//! # async fn example(service: &dyn stackup_core::StackService) -> Result<(), stackup_core::StackupError> {
//! let inputs = ActionInputs::new("my-stack")
//!     .with_parameter_overrides(["Name=test"])
//!     .with_capabilities(["CAPABILITY_IAM"]);
//!
//! run(service, &TracingReporter, &inputs, UpdateConfig::new()).await
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod arn;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod params;
pub mod reporter;
pub mod runner;
pub mod service;
pub mod state_machine;
pub mod types;
pub mod waiter;

// Re-exports for convenience
pub use arn::validate_arn;
pub use cleanup::cleanup_changeset;
pub use config::{UpdateConfig, WaiterConfig};
pub use error::{ConfigError, RemoteError, StackupError, StateMachineError, WaitError};
pub use orchestrator::StackUpdater;
pub use params::{parse_parameters, reconcile_parameters, ParameterOverrides};
pub use reporter::{running_in_actions, ActionsReporter, Reporter, TracingReporter};
pub use runner::{build_request, parse_multiline, run, ActionInputs};
pub use service::StackService;
pub use state_machine::{ChangesetState, Lifecycle};
pub use types::{
    changeset_name, Capability, ChangeSetDescription, ChangeSetStatus, ChangesetRequest,
    ParameterDirective, StackDescription, StackStatus, TemplateParameter, TemplateSummary,
    REDACTED,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
