//! Wait-until-condition primitive
//!
//! Polls immediately, then sleeps `min_delay`, doubling up to `max_delay`.
//! Each poll is bounded by the overall deadline, and a poll that would start
//! after the budget ends resolves to [`WaitError::Timeout`] instead of
//! blocking.
//!
//! [`StackService`] implementations without a native waiter fall back to
//! [`wait_for_changeset_create_complete`] and
//! [`wait_for_stack_update_complete`].

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout_at, Instant};

use crate::config::WaiterConfig;
use crate::error::{RemoteError, WaitError};
use crate::service::StackService;
use crate::types::{ChangeSetStatus, StackStatus};

/// Waiter name for change set creation
pub const CHANGESET_CREATE_COMPLETE: &str = "ChangeSetCreateComplete";
/// Waiter name for stack convergence
pub const STACK_UPDATE_COMPLETE: &str = "StackUpdateComplete";

// Stand-in deadline when the budget cannot be represented as an instant
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Verdict on one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptor {
    /// Target reached
    Success,
    /// Terminal failure with a reason
    Failure(String),
    /// Not there yet; carries the state observed
    Retry(String),
}

/// Poll `check` until it accepts, fails, or the budget runs out.
pub async fn wait_until<F, Fut>(
    waiter: &'static str,
    config: &WaiterConfig,
    mut check: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Acceptor>,
{
    let started = Instant::now();
    let deadline = started
        .checked_add(config.max_wait)
        .unwrap_or_else(|| started + FAR_FUTURE);
    let mut delay = config.min_delay;
    let mut attempt = 0u32;
    let mut last_observed = None;

    loop {
        attempt += 1;
        let Ok(verdict) = timeout_at(deadline, check()).await else {
            tracing::debug!(waiter, attempt, "poll outlived the wait budget");
            return Err(WaitError::Timeout {
                waiter,
                waited: started.elapsed(),
                last_observed,
            });
        };
        let observed = match verdict {
            Acceptor::Success => {
                tracing::debug!(waiter, attempt, "wait satisfied");
                return Ok(());
            }
            Acceptor::Failure(reason) => {
                tracing::debug!(waiter, attempt, %reason, "wait failed");
                return Err(WaitError::Failed { waiter, reason });
            }
            Acceptor::Retry(observed) => observed,
        };

        let now = Instant::now();
        if now.checked_add(delay).map_or(true, |next| next > deadline) {
            return Err(WaitError::Timeout {
                waiter,
                waited: now - started,
                last_observed: Some(observed),
            });
        }
        tracing::debug!(waiter, attempt, %observed, delay_secs = delay.as_secs(), "still waiting");
        last_observed = Some(observed);
        sleep(delay).await;
        delay = delay.saturating_mul(2).min(config.max_delay);
    }
}

fn on_poll_error(error: RemoteError) -> Acceptor {
    if error.is_validation_error() {
        Acceptor::Failure(error.message)
    } else {
        Acceptor::Retry(error.to_string())
    }
}

/// Wait for a change set to finish evaluating.
pub async fn wait_for_changeset_create_complete<S: StackService + ?Sized>(
    service: &S,
    config: &WaiterConfig,
    change_set_name: &str,
    stack_name: &str,
) -> Result<(), WaitError> {
    wait_until(CHANGESET_CREATE_COMPLETE, config, move || async move {
        match service.describe_change_set(change_set_name, stack_name).await {
            Ok(description) => match &description.status {
                ChangeSetStatus::CreateComplete => Acceptor::Success,
                ChangeSetStatus::Failed => Acceptor::Failure(describe_failure(
                    description.status.as_str(),
                    description.status_reason.as_deref(),
                )),
                other => Acceptor::Retry(other.as_str().to_string()),
            },
            Err(error) => on_poll_error(error),
        }
    })
    .await
}

/// Wait for a stack to finish its update.
pub async fn wait_for_stack_update_complete<S: StackService + ?Sized>(
    service: &S,
    config: &WaiterConfig,
    stack_name: &str,
) -> Result<(), WaitError> {
    wait_until(STACK_UPDATE_COMPLETE, config, move || async move {
        match service.describe_stack(stack_name).await {
            Ok(description) => match &description.status {
                StackStatus::UpdateComplete => Acceptor::Success,
                StackStatus::UpdateFailed
                | StackStatus::UpdateRollbackFailed
                | StackStatus::UpdateRollbackComplete => Acceptor::Failure(describe_failure(
                    description.status.as_str(),
                    description.status_reason.as_deref(),
                )),
                other => Acceptor::Retry(other.as_str().to_string()),
            },
            Err(error) => on_poll_error(error),
        }
    })
    .await
}

/// Failure reason as `STATUS: reason`, or just the status without one
#[must_use]
pub fn describe_failure(status: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("{status}: {reason}"),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config(max_wait_secs: u64) -> WaiterConfig {
        WaiterConfig::new(Duration::from_secs(max_wait_secs))
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_success_does_not_sleep() {
        let started = Instant::now();
        let result = wait_until("Test", &config(60), || async { Acceptor::Success }).await;
        assert!(result.is_ok());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_doubling_delay() {
        let polls = AtomicU32::new(0);
        let started = Instant::now();
        let result = wait_until("Test", &config(600), || {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Acceptor::Retry("IN_PROGRESS".into())
                } else {
                    Acceptor::Success
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(polls.load(Ordering::SeqCst), 4);
        // 10 + 20 + 40
        assert_eq!(started.elapsed(), Duration::from_secs(70));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_capped() {
        let polls = AtomicU32::new(0);
        let started = Instant::now();
        let result = wait_until("Test", &config(3600), || {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 6 {
                    Acceptor::Retry("IN_PROGRESS".into())
                } else {
                    Acceptor::Success
                }
            }
        })
        .await;

        assert!(result.is_ok());
        // 10 + 20 + 40 + 80 + 120 + 120
        assert_eq!(started.elapsed(), Duration::from_secs(390));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_stops_immediately() {
        let result = wait_until("Test", &config(60), || async { Acceptor::Failure("FAILED".into()) }).await;
        assert_eq!(
            result,
            Err(WaitError::Failed {
                waiter: "Test",
                reason: "FAILED".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_instead_of_blocking() {
        let result = wait_until("Test", &config(30), || async { Acceptor::Retry("CREATE_IN_PROGRESS".into()) }).await;
        match result {
            Err(WaitError::Timeout { waiter, waited, last_observed }) => {
                assert_eq!(waiter, "Test");
                // polls at 0, 10 and 30; the next would land at 70
                assert_eq!(waited, Duration::from_secs(30));
                assert_eq!(last_observed.as_deref(), Some("CREATE_IN_PROGRESS"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_poll_times_out_at_budget() {
        let started = Instant::now();
        let result = wait_until("Test", &config(60), std::future::pending::<Acceptor>).await;

        assert_eq!(
            result,
            Err(WaitError::Timeout {
                waiter: "Test",
                waited: Duration::from_secs(60),
                last_observed: None
            })
        );
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_hanging_after_retries_reports_last_state() {
        let polls = AtomicU32::new(0);
        let result = wait_until("Test", &config(60), || {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Acceptor::Retry("UPDATE_IN_PROGRESS".into())
                } else {
                    std::future::pending().await
                }
            }
        })
        .await;

        match result {
            Err(WaitError::Timeout { waited, last_observed, .. }) => {
                assert_eq!(waited, Duration::from_secs(60));
                assert_eq!(last_observed.as_deref(), Some("UPDATE_IN_PROGRESS"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_budget_does_not_panic() {
        let unbounded = WaiterConfig::new(Duration::MAX).with_min_delay(Duration::MAX);
        let polls = AtomicU32::new(0);
        let result = wait_until("Test", &unbounded, || {
            polls.fetch_add(1, Ordering::SeqCst);
            async { Acceptor::Retry("CREATE_PENDING".into()) }
        })
        .await;

        assert!(matches!(result, Err(WaitError::Timeout { .. })));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn validation_errors_are_terminal() {
        let err = RemoteError::new("ChangeSet [x] does not exist").with_code("ValidationError");
        assert_eq!(on_poll_error(err), Acceptor::Failure("ChangeSet [x] does not exist".into()));
        assert!(matches!(on_poll_error(RemoteError::new("Rate exceeded").with_code("Throttling")), Acceptor::Retry(_)));
    }

    #[test]
    fn failure_reason_includes_service_explanation() {
        assert_eq!(describe_failure("FAILED", Some("No updates are to be performed.")), "FAILED: No updates are to be performed.");
        assert_eq!(describe_failure("UPDATE_FAILED", Some("")), "UPDATE_FAILED");
    }
}
