//! Testing utilities for the stackup workspace
//!
//! A scripted, recording [`StackService`] fake and a [`Reporter`] that keeps
//! every line, so tests can assert on the exact request sequence and on what
//! an operator would have seen.

#![allow(missing_docs)]

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use stackup_core::{
    ChangeSetDescription, ChangeSetStatus, ChangesetRequest, RemoteError, Reporter,
    StackDescription, StackService, StackStatus, TemplateParameter, TemplateSummary,
};

/// One request received by [`FakeStackService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetTemplateSummary { stack_name: String },
    CreateChangeSet(ChangesetRequest),
    DescribeChangeSet { change_set_name: String, stack_name: String },
    ExecuteChangeSet { change_set_name: String, stack_name: String },
    DescribeStacks { stack_name: String },
    DeleteChangeSet { change_set_name: String, stack_name: String },
}

impl Call {
    /// Operation name as the service spells it
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::GetTemplateSummary { .. } => "GetTemplateSummary",
            Self::CreateChangeSet(_) => "CreateChangeSet",
            Self::DescribeChangeSet { .. } => "DescribeChangeSet",
            Self::ExecuteChangeSet { .. } => "ExecuteChangeSet",
            Self::DescribeStacks { .. } => "DescribeStacks",
            Self::DeleteChangeSet { .. } => "DeleteChangeSet",
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    template: TemplateSummary,
    template_error: Option<RemoteError>,
    create_error: Option<RemoteError>,
    execute_error: Option<RemoteError>,
    delete_error: Option<RemoteError>,
    change_set_polls: VecDeque<Result<ChangeSetDescription, RemoteError>>,
    stack_polls: VecDeque<Result<StackDescription, RemoteError>>,
}

/// Stack service fake that records calls and replays scripted responses
///
/// Unscripted polls report `CREATE_COMPLETE` and `UPDATE_COMPLETE`.
#[derive(Debug, Default)]
pub struct FakeStackService {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

impl FakeStackService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Template declaring `keys` as String parameters
    #[must_use]
    pub fn with_template_parameters(self, keys: &[&str]) -> Self {
        self.script.lock().template = TemplateSummary {
            parameters: keys
                .iter()
                .map(|key| TemplateParameter {
                    parameter_type: Some("String".to_string()),
                    description: Some(String::new()),
                    ..TemplateParameter::new(*key)
                })
                .collect(),
            capabilities: Vec::new(),
        };
        self
    }

    /// Add a `NoEcho` parameter to the template
    #[must_use]
    pub fn with_secret_parameter(self, key: &str) -> Self {
        self.script.lock().template.parameters.push(TemplateParameter {
            parameter_type: Some("String".to_string()),
            no_echo: true,
            ..TemplateParameter::new(key)
        });
        self
    }

    #[must_use]
    pub fn failing_template_summary(self, error: RemoteError) -> Self {
        self.script.lock().template_error = Some(error);
        self
    }

    #[must_use]
    pub fn failing_create(self, error: RemoteError) -> Self {
        self.script.lock().create_error = Some(error);
        self
    }

    #[must_use]
    pub fn failing_execute(self, error: RemoteError) -> Self {
        self.script.lock().execute_error = Some(error);
        self
    }

    #[must_use]
    pub fn failing_delete(self, error: RemoteError) -> Self {
        self.script.lock().delete_error = Some(error);
        self
    }

    /// Queue a DescribeChangeSet response
    #[must_use]
    pub fn then_change_set(self, response: Result<ChangeSetDescription, RemoteError>) -> Self {
        self.script.lock().change_set_polls.push_back(response);
        self
    }

    /// Queue a DescribeStacks response
    #[must_use]
    pub fn then_stack(self, response: Result<StackDescription, RemoteError>) -> Self {
        self.script.lock().stack_polls.push_back(response);
        self
    }

    /// Every call received, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Operation names received, in order
    #[must_use]
    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(Call::operation).collect()
    }

    /// The CreateChangeSet payload, if one was sent
    #[must_use]
    pub fn created_request(&self) -> Option<ChangesetRequest> {
        self.calls.lock().iter().find_map(|call| match call {
            Call::CreateChangeSet(request) => Some(request.clone()),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn scripted_error(slot: &Option<RemoteError>) -> Result<(), RemoteError> {
        match slot {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StackService for FakeStackService {
    async fn get_template_summary(&self, stack_name: &str) -> Result<TemplateSummary, RemoteError> {
        self.record(Call::GetTemplateSummary {
            stack_name: stack_name.to_string(),
        });
        let script = self.script.lock();
        Self::scripted_error(&script.template_error)?;
        Ok(script.template.clone())
    }

    async fn create_change_set(&self, request: &ChangesetRequest) -> Result<(), RemoteError> {
        self.record(Call::CreateChangeSet(request.clone()));
        Self::scripted_error(&self.script.lock().create_error)
    }

    async fn describe_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<ChangeSetDescription, RemoteError> {
        self.record(Call::DescribeChangeSet {
            change_set_name: change_set_name.to_string(),
            stack_name: stack_name.to_string(),
        });
        self.script
            .lock()
            .change_set_polls
            .pop_front()
            .unwrap_or_else(|| Ok(ChangeSetDescription::new(ChangeSetStatus::CreateComplete)))
    }

    async fn execute_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<(), RemoteError> {
        self.record(Call::ExecuteChangeSet {
            change_set_name: change_set_name.to_string(),
            stack_name: stack_name.to_string(),
        });
        Self::scripted_error(&self.script.lock().execute_error)
    }

    async fn describe_stack(&self, stack_name: &str) -> Result<StackDescription, RemoteError> {
        self.record(Call::DescribeStacks {
            stack_name: stack_name.to_string(),
        });
        self.script
            .lock()
            .stack_polls
            .pop_front()
            .unwrap_or_else(|| Ok(StackDescription::new(StackStatus::UpdateComplete)))
    }

    async fn delete_change_set(
        &self,
        change_set_name: &str,
        stack_name: &str,
    ) -> Result<(), RemoteError> {
        self.record(Call::DeleteChangeSet {
            change_set_name: change_set_name.to_string(),
            stack_name: stack_name.to_string(),
        });
        Self::scripted_error(&self.script.lock().delete_error)
    }
}

/// Reporter line severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Debug,
    Failure,
    Mask,
}

/// Reporter that keeps every line
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    /// Messages at `level`, in order
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.messages(Level::Failure)
    }

    fn push(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(Level::Warning, message);
    }

    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn report_failure(&self, message: &str) {
        self.push(Level::Failure, message);
    }

    fn mask(&self, secret: &str) {
        self.push(Level::Mask, secret);
    }
}
