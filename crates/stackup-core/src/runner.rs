//! Top-level entry point for one invocation
//!
//! Turns resolved inputs into a [`ChangesetRequest`], runs the update and
//! reports the single error that escapes, if any.

use crate::arn::validate_arn;
use crate::config::UpdateConfig;
use crate::error::{ConfigError, StackupError};
use crate::orchestrator::StackUpdater;
use crate::params::{reconcile_parameters, ParameterOverrides};
use crate::reporter::Reporter;
use crate::service::StackService;
use crate::types::{Capability, ChangesetRequest};

/// Inputs resolved by the invocation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInputs {
    /// Target stack, required
    pub stack_name: String,
    /// `KEY=VALUE` lines
    pub parameter_overrides: Vec<String>,
    /// Capability tokens
    pub capabilities: Vec<String>,
    /// Service role; blank means none
    pub role_arn: Option<String>,
}

impl ActionInputs {
    /// Create inputs for a stack
    #[inline]
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            ..Self::default()
        }
    }

    /// With override lines
    #[inline]
    #[must_use]
    pub fn with_parameter_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_overrides = overrides.into_iter().map(Into::into).collect();
        self
    }

    /// With capability tokens
    #[inline]
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// With role ARN
    #[inline]
    #[must_use]
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }
}

/// Split a multiline input into trimmed, non-empty lines.
#[must_use]
pub fn parse_multiline(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the CreateChangeSet payload.
///
/// Caller input is validated before anything is sent; the template summary
/// is only fetched when there are overrides to reconcile.
pub async fn build_request(
    service: &dyn StackService,
    reporter: &dyn Reporter,
    inputs: &ActionInputs,
) -> Result<ChangesetRequest, StackupError> {
    let stack_name = inputs.stack_name.trim();
    if stack_name.is_empty() {
        return Err(ConfigError::MissingInput("stack-name").into());
    }

    let role_arn = match inputs.role_arn.as_deref().map(str::trim) {
        Some(arn) if !arn.is_empty() => Some(validate_arn(arn)?.to_string()),
        _ => None,
    };

    let capabilities = inputs
        .capabilities
        .iter()
        .map(|token| Capability::parse(token))
        .collect::<Result<Vec<_>, _>>()?;

    let overrides = ParameterOverrides::parse(inputs.parameter_overrides.as_slice(), reporter)?;

    let mut request = ChangesetRequest::new(stack_name).with_capabilities(capabilities);

    if !inputs.parameter_overrides.is_empty() {
        let summary = service.get_template_summary(stack_name).await?;
        request = request.with_parameters(reconcile_parameters(&summary.parameters, &overrides, reporter));
    }

    if let Some(role_arn) = role_arn {
        request = request.with_role_arn(role_arn);
    }

    Ok(request)
}

/// Run one stack update and report its outcome.
///
/// On failure the error's debug form goes to [`Reporter::debug`], then its
/// original message to [`Reporter::report_failure`] as the last thing
/// reported; the error is returned so the caller can exit unsuccessfully.
pub async fn run(
    service: &dyn StackService,
    reporter: &dyn Reporter,
    inputs: &ActionInputs,
    config: UpdateConfig,
) -> Result<(), StackupError> {
    match execute(service, reporter, inputs, config).await {
        Ok(()) => {
            reporter.info("Cloudformation stack update is complete");
            Ok(())
        }
        Err(error) => {
            reporter.debug(&format!("{error:?}"));
            reporter.report_failure(&error.to_string());
            Err(error)
        }
    }
}

async fn execute(
    service: &dyn StackService,
    reporter: &dyn Reporter,
    inputs: &ActionInputs,
    config: UpdateConfig,
) -> Result<(), StackupError> {
    config.validate()?;
    let request = build_request(service, reporter, inputs).await?;
    StackUpdater::new(service, reporter)
        .with_config(config)
        .update_stack(&request)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::TracingReporter;
    use crate::service::MockStackService;

    #[test]
    fn multiline_drops_blank_lines() {
        assert_eq!(
            parse_multiline("UUID=1\n\n  Name=test  \r\n"),
            vec!["UUID=1".to_string(), "Name=test".to_string()]
        );
        assert!(parse_multiline("").is_empty());
    }

    #[tokio::test]
    async fn invalid_role_fails_before_any_remote_call() {
        let service = MockStackService::new();
        let inputs = ActionInputs::new("my-stack")
            .with_parameter_overrides(["Name=test"])
            .with_role_arn("arn:aws:ec2::111111111111:instance/i-abc123");

        let err = build_request(&service, &TracingReporter, &inputs).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn blank_role_is_omitted() {
        let service = MockStackService::new();
        let inputs = ActionInputs::new("my-stack").with_role_arn("  ");

        let request = build_request(&service, &TracingReporter, &inputs).await.unwrap();
        assert_eq!(request.role_arn, None);
        assert_eq!(request.parameters, None);
    }

    #[tokio::test]
    async fn missing_stack_name() {
        let service = MockStackService::new();
        let err = build_request(&service, &TracingReporter, &ActionInputs::new(" "))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Input required and not supplied: stack-name");
    }

    #[tokio::test]
    async fn malformed_override_fails_before_template_lookup() {
        let service = MockStackService::new();
        let inputs = ActionInputs::new("my-stack").with_parameter_overrides(["Name"]);

        let err = build_request(&service, &TracingReporter, &inputs).await.unwrap_err();
        assert!(matches!(err, StackupError::Config(ConfigError::MalformedOverride(_))));
    }
}
