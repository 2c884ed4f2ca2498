//! CloudFormation-backed [`StackService`]
//!
//! Thin mapping between the SDK's request builders and the core's request
//! and response shapes. Service errors keep their code and message so the
//! core can tell a missing resource from a transient failure.
//!
//! Both waits use the SDK's own waiters, which poll at the delays of the
//! service model. The caller's budget bounds the whole wait, including a
//! poll request that never returns.

use std::future::Future;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::client::Waiters;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{Capability as SdkCapability, Parameter};
use aws_sdk_cloudformation::Client;
use aws_smithy_runtime_api::client::waiters::error::WaiterError;
use stackup_core::error::VALIDATION_ERROR_CODE;
use stackup_core::waiter::{describe_failure, CHANGESET_CREATE_COMPLETE, STACK_UPDATE_COMPLETE};
use stackup_core::{
    Capability, ChangeSetDescription, ChangeSetStatus, ChangesetRequest, ParameterDirective,
    RemoteError, StackDescription, StackService, StackStatus, TemplateParameter, TemplateSummary,
    WaitError, WaiterConfig,
};

/// Stack service talking to CloudFormation
#[derive(Debug, Clone)]
pub struct CloudFormationService {
    client: Client,
}

impl CloudFormationService {
    /// Wrap an existing client
    #[inline]
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard credential and region chain,
    /// optionally pinning the region.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        tracing::debug!(region = ?config.region(), "CloudFormation client configured");
        Self::new(Client::new(&config))
    }
}

fn remote_error<E, R>(error: SdkError<E, R>) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = error.code().map(str::to_string);
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&error).to_string());
    let remote = RemoteError::new(message);
    match code {
        Some(code) => remote.with_code(code),
        None => remote,
    }
}

fn waiter_error<O, E>(
    waiter: &'static str,
    error: WaiterError<O, E>,
    failure_state: impl FnOnce(&O) -> String,
) -> WaitError
where
    O: std::fmt::Debug,
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match error {
        WaiterError::ExceededMaxWait(exceeded) => WaitError::Timeout {
            waiter,
            waited: exceeded.elapsed(),
            last_observed: None,
        },
        WaiterError::FailureState(failure) => {
            let reason = match failure.final_poll().as_result() {
                Ok(output) => failure_state(output),
                Err(service_error) => service_error
                    .message()
                    .map_or_else(|| DisplayErrorContext(service_error).to_string(), str::to_string),
            };
            WaitError::Failed { waiter, reason }
        }
        WaiterError::OperationFailed(failed) => WaitError::Failed {
            waiter,
            reason: remote_error(failed.into_error()).message,
        },
        other => {
            tracing::debug!(waiter, error = ?other, "waiter not started");
            WaitError::Failed {
                waiter,
                reason: "waiter could not be started".to_string(),
            }
        }
    }
}

// The SDK checks its budget between polls only
async fn within_budget<T>(
    waiter: &'static str,
    config: &WaiterConfig,
    wait: impl Future<Output = T>,
) -> Result<T, WaitError> {
    tokio::time::timeout(config.max_wait, wait)
        .await
        .map_err(|_| WaitError::Timeout {
            waiter,
            waited: config.max_wait,
            last_observed: None,
        })
}

fn to_parameter(directive: &ParameterDirective) -> Parameter {
    match directive {
        ParameterDirective::Value { key, value } => Parameter::builder()
            .parameter_key(key)
            .parameter_value(value)
            .build(),
        ParameterDirective::UsePrevious { key } => Parameter::builder()
            .parameter_key(key)
            .use_previous_value(true)
            .build(),
    }
}

fn to_sdk_capabilities(capabilities: &[Capability]) -> Option<Vec<SdkCapability>> {
    if capabilities.is_empty() {
        return None;
    }
    Some(
        capabilities
            .iter()
            .map(|capability| SdkCapability::from(capability.as_str()))
            .collect(),
    )
}

#[async_trait]
impl StackService for CloudFormationService {
    async fn get_template_summary(&self, stack_name: &str) -> Result<TemplateSummary, RemoteError> {
        let output = self
            .client
            .get_template_summary()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(remote_error)?;

        let parameters = output
            .parameters()
            .iter()
            .map(|declaration| TemplateParameter {
                key: declaration.parameter_key().unwrap_or_default().to_string(),
                parameter_type: declaration.parameter_type().map(str::to_string),
                no_echo: declaration.no_echo().unwrap_or(false),
                description: declaration.description().map(str::to_string),
            })
            .collect();
        let capabilities = output
            .capabilities()
            .iter()
            .filter_map(|capability| Capability::parse(capability.as_str()).ok())
            .collect();

        Ok(TemplateSummary {
            parameters,
            capabilities,
        })
    }

    async fn create_change_set(&self, request: &ChangesetRequest) -> Result<(), RemoteError> {
        let parameters = request
            .parameters
            .as_ref()
            .map(|directives| directives.iter().map(to_parameter).collect::<Vec<_>>());

        self.client
            .create_change_set()
            .change_set_name(&request.change_set_name)
            .stack_name(&request.stack_name)
            .use_previous_template(request.use_previous_template)
            .set_capabilities(to_sdk_capabilities(&request.capabilities))
            .set_parameters(parameters)
            .set_role_arn(request.role_arn.clone())
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn describe_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<ChangeSetDescription, RemoteError> {
        let output = self
            .client
            .describe_change_set()
            .change_set_name(change_set_name)
            .stack_name(stack_name)
            .send()
            .await
            .map_err(remote_error)?;

        let status = ChangeSetStatus::from(output.status().map_or("", |status| status.as_str()));
        Ok(ChangeSetDescription {
            status,
            status_reason: output.status_reason().map(str::to_string),
        })
    }

    async fn execute_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<(), RemoteError> {
        self.client
            .execute_change_set()
            .change_set_name(change_set_name)
            .stack_name(stack_name)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn describe_stack(&self, stack_name: &str) -> Result<StackDescription, RemoteError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(remote_error)?;

        let Some(stack) = output.stacks().first() else {
            return Err(RemoteError::new(format!("Stack with id {stack_name} does not exist"))
                .with_code(VALIDATION_ERROR_CODE));
        };
        let status = StackStatus::from(stack.stack_status().map_or("", |status| status.as_str()));
        Ok(StackDescription {
            status,
            status_reason: stack.stack_status_reason().map(str::to_string),
        })
    }

    async fn delete_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<(), RemoteError> {
        self.client
            .delete_change_set()
            .change_set_name(change_set_name)
            .stack_name(stack_name)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn wait_change_set_create_complete(
        &self,
        change_set_name: &str,
        stack_name: &str,
        config: &WaiterConfig,
    ) -> Result<(), WaitError> {
        let wait = self
            .client
            .wait_until_change_set_create_complete()
            .change_set_name(change_set_name)
            .stack_name(stack_name)
            .wait(config.max_wait);

        within_budget(CHANGESET_CREATE_COMPLETE, config, wait)
            .await?
            .map(|_| ())
            .map_err(|error| {
                waiter_error(CHANGESET_CREATE_COMPLETE, error, |output| {
                    describe_failure(
                        output.status().map_or("", |status| status.as_str()),
                        output.status_reason(),
                    )
                })
            })
    }

    async fn wait_stack_update_complete(
        &self,
        stack_name: &str,
        config: &WaiterConfig,
    ) -> Result<(), WaitError> {
        let wait = self
            .client
            .wait_until_stack_update_complete()
            .stack_name(stack_name)
            .wait(config.max_wait);

        within_budget(STACK_UPDATE_COMPLETE, config, wait)
            .await?
            .map(|_| ())
            .map_err(|error| {
                waiter_error(STACK_UPDATE_COMPLETE, error, |output| {
                    output.stacks().first().map_or_else(String::new, |stack| {
                        describe_failure(
                            stack.stack_status().map_or("", |status| status.as_str()),
                            stack.stack_status_reason(),
                        )
                    })
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn explicit_value_parameter() {
        let parameter = to_parameter(&ParameterDirective::Value {
            key: "Name".into(),
            value: "test".into(),
        });
        assert_eq!(parameter.parameter_key(), Some("Name"));
        assert_eq!(parameter.parameter_value(), Some("test"));
        assert_eq!(parameter.use_previous_value(), None);
    }

    #[test]
    fn previous_value_parameter_has_no_value() {
        let parameter = to_parameter(&ParameterDirective::UsePrevious { key: "UUID".into() });
        assert_eq!(parameter.parameter_key(), Some("UUID"));
        assert_eq!(parameter.parameter_value(), None);
        assert_eq!(parameter.use_previous_value(), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_wait_ends_at_budget() {
        let config = WaiterConfig::new(Duration::from_secs(90));
        let started = tokio::time::Instant::now();

        let result = within_budget(STACK_UPDATE_COMPLETE, &config, std::future::pending::<()>()).await;

        assert_eq!(
            result,
            Err(WaitError::Timeout {
                waiter: STACK_UPDATE_COMPLETE,
                waited: Duration::from_secs(90),
                last_observed: None
            })
        );
        assert_eq!(started.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test]
    async fn prompt_wait_passes_through() {
        let config = WaiterConfig::new(Duration::from_secs(90));
        assert_eq!(within_budget(CHANGESET_CREATE_COMPLETE, &config, async { 7 }).await, Ok(7));
    }

    #[test]
    fn capabilities_omitted_when_empty() {
        assert_eq!(to_sdk_capabilities(&[]), None);
        let capabilities = to_sdk_capabilities(&[Capability::parse("CAPABILITY_IAM").unwrap()]).unwrap();
        assert_eq!(capabilities, vec![SdkCapability::CapabilityIam]);
    }
}
