//! Remote stack service seam

use async_trait::async_trait;

use crate::config::WaiterConfig;
use crate::error::{RemoteError, WaitError};
use crate::waiter::{wait_for_changeset_create_complete, wait_for_stack_update_complete};
use crate::types::{ChangeSetDescription, ChangesetRequest, StackDescription, TemplateSummary};

/// Operations the update needs from the stack service
///
/// Implementations hold the client handle; callers never lock around it.
/// The two waits default to polling the describe operations; services with
/// a native wait primitive override them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackService: Send + Sync {
    /// Parameters and capabilities of the deployed template
    async fn get_template_summary(&self, stack_name: &str) -> Result<TemplateSummary, RemoteError>;

    /// Submit a change set; completion is observed by polling
    async fn create_change_set(&self, request: &ChangesetRequest) -> Result<(), RemoteError>;

    /// Current status of a change set
    async fn describe_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<ChangeSetDescription, RemoteError>;

    /// Start executing an evaluated change set
    async fn execute_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<(), RemoteError>;

    /// Current status of a stack
    async fn describe_stack(&self, stack_name: &str) -> Result<StackDescription, RemoteError>;

    /// Delete a change set that was never executed
    async fn delete_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<(), RemoteError>;

    /// Block until the change set is `CREATE_COMPLETE`, fails, or `config`
    /// runs out
    async fn wait_change_set_create_complete(
        &self,
        change_set_name: &str,
        stack_name: &str,
        config: &WaiterConfig,
    ) -> Result<(), WaitError> {
        wait_for_changeset_create_complete(self, config, change_set_name, stack_name).await
    }

    /// Block until the stack is `UPDATE_COMPLETE`, fails, or `config` runs out
    async fn wait_stack_update_complete(
        &self,
        stack_name: &str,
        config: &WaiterConfig,
    ) -> Result<(), WaitError> {
        wait_for_stack_update_complete(self, config, stack_name).await
    }
}
