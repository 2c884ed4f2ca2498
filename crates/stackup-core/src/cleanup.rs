//! Best-effort change set deletion on the failure path

use crate::reporter::Reporter;
use crate::service::StackService;

/// Delete a change set left behind by a failed update.
///
/// Never fails: a delete error is reported as a warning so the error that
/// triggered the cleanup stays the one the caller sees.
pub async fn cleanup_changeset(
    service: &dyn StackService,
    reporter: &dyn Reporter,
    change_set_name: &str,
    stack_name: &str,
) {
    reporter.info(&format!("Cleaning up failed changeset {change_set_name}"));
    match service.delete_change_set(change_set_name, stack_name).await {
        Ok(()) => reporter.info(&format!("Successfully deleted changeset {change_set_name}")),
        Err(error) => reporter.warning(&format!(
            "Failed to cleanup changeset {change_set_name}: {error}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::reporter::TracingReporter;
    use crate::service::MockStackService;

    #[tokio::test]
    async fn successfully_deletes_changeset() {
        let mut service = MockStackService::new();
        service
            .expect_delete_change_set()
            .withf(|change_set, stack| change_set == "test-changeset" && stack == "test-stack")
            .times(1)
            .returning(|_, _| Ok(()));

        cleanup_changeset(&service, &TracingReporter, "test-changeset", "test-stack").await;
    }

    #[tokio::test]
    async fn handles_deletion_failure_gracefully() {
        let mut service = MockStackService::new();
        service
            .expect_delete_change_set()
            .withf(|change_set, stack| change_set == "test-changeset" && stack == "test-stack")
            .times(1)
            .returning(|_, _| Err(RemoteError::new("Changeset not found")));

        // returns normally even though the delete failed
        cleanup_changeset(&service, &TracingReporter, "test-changeset", "test-stack").await;
    }
}
