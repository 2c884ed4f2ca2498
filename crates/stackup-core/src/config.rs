//! Wait budgets for the two long-running lifecycle steps

use std::time::Duration;

use crate::error::ConfigError;

/// Default minimum delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound for the backoff delay between polls
pub const DEFAULT_MAX_POLL_DELAY: Duration = Duration::from_secs(120);
/// Change set creation budget: 30 minutes
pub const DEFAULT_CHANGESET_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Stack update budget: 12 hours
pub const DEFAULT_STACK_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);
/// Largest accepted budget or poll interval: 7 days
pub const MAX_WAIT_SETTING: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Bounds for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterConfig {
    /// Overall budget, after which the wait fails
    pub max_wait: Duration,
    /// First delay between polls
    pub min_delay: Duration,
    /// Cap for the doubling delay
    pub max_delay: Duration,
}

impl WaiterConfig {
    /// Create with the default delays
    #[inline]
    #[must_use]
    pub fn new(max_wait: Duration) -> Self {
        Self {
            max_wait,
            min_delay: DEFAULT_POLL_INTERVAL,
            max_delay: DEFAULT_MAX_POLL_DELAY,
        }
    }

    /// Budget for change set creation
    #[inline]
    #[must_use]
    pub fn changeset_create() -> Self {
        Self::new(DEFAULT_CHANGESET_TIMEOUT)
    }

    /// Budget for the stack to converge after execution
    #[inline]
    #[must_use]
    pub fn stack_update() -> Self {
        Self::new(DEFAULT_STACK_TIMEOUT)
    }

    /// With minimum poll interval; the cap is raised if it would fall below it
    #[inline]
    #[must_use]
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self.max_delay = self.max_delay.max(delay);
        self
    }

    /// With overall budget
    #[inline]
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn validate(&self, name: &'static str, delay_name: &'static str) -> Result<(), ConfigError> {
        check_setting(name, self.max_wait)?;
        check_setting(delay_name, self.min_delay)
    }
}

fn check_setting(name: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ZeroDuration(name));
    }
    if value > MAX_WAIT_SETTING {
        return Err(ConfigError::DurationTooLong {
            name,
            limit: MAX_WAIT_SETTING,
        });
    }
    Ok(())
}

/// Configuration for one update run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Wait for the change set to finish evaluating
    pub changeset_wait: WaiterConfig,
    /// Wait for the stack to converge
    pub stack_wait: WaiterConfig,
}

impl UpdateConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With poll interval for both waits
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.changeset_wait = self.changeset_wait.with_min_delay(interval);
        self.stack_wait = self.stack_wait.with_min_delay(interval);
        self
    }

    /// With change set creation budget
    #[inline]
    #[must_use]
    pub fn with_changeset_timeout(mut self, timeout: Duration) -> Self {
        self.changeset_wait = self.changeset_wait.with_max_wait(timeout);
        self
    }

    /// With stack update budget
    #[inline]
    #[must_use]
    pub fn with_stack_timeout(mut self, timeout: Duration) -> Self {
        self.stack_wait = self.stack_wait.with_max_wait(timeout);
        self
    }

    /// Reject zero budgets and intervals, and any above [`MAX_WAIT_SETTING`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.changeset_wait
            .validate("changeset-timeout", "poll-interval")?;
        self.stack_wait.validate("stack-timeout", "poll-interval")
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            changeset_wait: WaiterConfig::changeset_create(),
            stack_wait: WaiterConfig::stack_update(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_budgets() {
        let config = UpdateConfig::new();
        assert_eq!(config.changeset_wait.max_wait, Duration::from_secs(1800));
        assert_eq!(config.stack_wait.max_wait, Duration::from_secs(43_200));
        assert_eq!(config.changeset_wait.min_delay, Duration::from_secs(10));
        assert_eq!(config.stack_wait.min_delay, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn poll_interval_above_cap_raises_cap() {
        let config = UpdateConfig::new().with_poll_interval(Duration::from_secs(300));
        assert_eq!(config.stack_wait.max_delay, Duration::from_secs(300));
    }

    #[test]
    fn zero_values_rejected() {
        assert_eq!(
            UpdateConfig::new().with_poll_interval(Duration::ZERO).validate(),
            Err(ConfigError::ZeroDuration("poll-interval"))
        );
        assert_eq!(
            UpdateConfig::new().with_stack_timeout(Duration::ZERO).validate(),
            Err(ConfigError::ZeroDuration("stack-timeout"))
        );
    }

    #[test]
    fn oversized_values_rejected() {
        let huge = Duration::from_secs(u64::MAX);
        assert_eq!(
            UpdateConfig::new().with_stack_timeout(huge).validate(),
            Err(ConfigError::DurationTooLong {
                name: "stack-timeout",
                limit: MAX_WAIT_SETTING
            })
        );
        assert_eq!(
            UpdateConfig::new().with_changeset_timeout(huge).validate(),
            Err(ConfigError::DurationTooLong {
                name: "changeset-timeout",
                limit: MAX_WAIT_SETTING
            })
        );
        assert!(matches!(
            UpdateConfig::new().with_poll_interval(huge).validate(),
            Err(ConfigError::DurationTooLong { name: "poll-interval", .. })
        ));
        assert!(UpdateConfig::new().with_stack_timeout(MAX_WAIT_SETTING).validate().is_ok());
    }
}
