//! Stack update orchestrator
//!
//! Drives one change set through its lifecycle:
//! create → wait for creation → execute → wait for the stack to converge.
//! Any failure after the change set exists deletes it before the original
//! error is returned.

use crate::cleanup::cleanup_changeset;
use crate::config::UpdateConfig;
use crate::error::StackupError;
use crate::reporter::Reporter;
use crate::service::StackService;
use crate::state_machine::{ChangesetState, Lifecycle};
use crate::types::ChangesetRequest;

/// Runs a single change set lifecycle against a stack service
pub struct StackUpdater<'a> {
    service: &'a dyn StackService,
    reporter: &'a dyn Reporter,
    config: UpdateConfig,
}

impl<'a> StackUpdater<'a> {
    /// Create updater with default wait budgets
    #[must_use]
    pub fn new(service: &'a dyn StackService, reporter: &'a dyn Reporter) -> Self {
        Self {
            service,
            reporter,
            config: UpdateConfig::default(),
        }
    }

    /// With wait budgets
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: UpdateConfig) -> Self {
        self.config = config;
        self
    }

    /// Update the stack, returning the final lifecycle on success.
    pub async fn update_stack(&self, request: &ChangesetRequest) -> Result<Lifecycle, StackupError> {
        let mut lifecycle = Lifecycle::new();
        self.run_lifecycle(request, &mut lifecycle).await?;
        Ok(lifecycle)
    }

    /// Update the stack, recording every transition in `lifecycle`.
    ///
    /// On failure `lifecycle` is left in `CleanedUp` if a change set had been
    /// created, otherwise in `NotCreated`.
    pub async fn run_lifecycle(
        &self,
        request: &ChangesetRequest,
        lifecycle: &mut Lifecycle,
    ) -> Result<(), StackupError> {
        match self.drive(request, lifecycle).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.recover(request, lifecycle, &error).await;
                Err(error)
            }
        }
    }

    async fn drive(
        &self,
        request: &ChangesetRequest,
        lifecycle: &mut Lifecycle,
    ) -> Result<(), StackupError> {
        let change_set = request.change_set_name.as_str();
        let stack = request.stack_name.as_str();

        self.reporter.info(&format!(
            "Creating CloudFormation Change Set {change_set} for stack {stack}"
        ));
        if let Ok(payload) = serde_json::to_string(&request.redacted()) {
            self.reporter.debug(&format!("CreateChangeSet request: {payload}"));
        }
        self.service.create_change_set(request).await?;
        lifecycle.advance(ChangesetState::Created)?;

        self.reporter
            .info("Waiting for CloudFormation changeset to create ...");
        self.service
            .wait_change_set_create_complete(change_set, stack, &self.config.changeset_wait)
            .await?;
        lifecycle.advance(ChangesetState::CreateComplete)?;

        self.reporter
            .info(&format!("Executing CloudFormation changeset {change_set}"));
        self.service.execute_change_set(change_set, stack).await?;
        lifecycle.advance(ChangesetState::Executed)?;

        self.reporter.info(&format!(
            "Waiting for CloudFormation stack {stack} to reach update complete ..."
        ));
        self.service
            .wait_stack_update_complete(stack, &self.config.stack_wait)
            .await?;
        lifecycle.advance(ChangesetState::StackUpdateComplete)?;

        Ok(())
    }

    async fn recover(&self, request: &ChangesetRequest, lifecycle: &mut Lifecycle, error: &StackupError) {
        let failed_in = lifecycle.state();
        tracing::debug!(state = %failed_in, %error, "changeset lifecycle failed");

        if let Some(failed) = failed_in.on_failure() {
            advance_quietly(lifecycle, failed);
        }
        if !lifecycle.state().requires_cleanup() {
            return;
        }

        cleanup_changeset(
            self.service,
            self.reporter,
            &request.change_set_name,
            &request.stack_name,
        )
        .await;
        advance_quietly(lifecycle, ChangesetState::CleanedUp);
    }
}

// The original error is already on its way out; a bookkeeping slip here
// must not replace it.
fn advance_quietly(lifecycle: &mut Lifecycle, to: ChangesetState) {
    if let Err(slip) = lifecycle.advance(to) {
        tracing::warn!(%slip, "lifecycle not advanced during recovery");
    }
}
