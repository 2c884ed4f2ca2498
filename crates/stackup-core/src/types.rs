//! Request and response shapes exchanged with the stack service

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ConfigError;

/// Suffix appended to the stack name to form the change set name
pub const CHANGESET_SUFFIX: &str = "-changeset";

/// Change set name owned by a stack's update run
#[inline]
#[must_use]
pub fn changeset_name(stack_name: &str) -> String {
    format!("{stack_name}{CHANGESET_SUFFIX}")
}

/// Parameter declared by the deployed template
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateParameter {
    /// Parameter name
    #[serde(rename = "ParameterKey")]
    pub key: String,
    /// Declared type, e.g. `String`
    #[serde(rename = "ParameterType", default)]
    pub parameter_type: Option<String>,
    /// Whether the value is masked by the service
    #[serde(default)]
    pub no_echo: bool,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl TemplateParameter {
    /// Create parameter with only a key
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

/// Result of GetTemplateSummary for a deployed stack
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TemplateSummary {
    /// Declared parameters, in template order
    pub parameters: Vec<TemplateParameter>,
    /// Capabilities the template requires
    pub capabilities: Vec<Capability>,
}

/// Acknowledgement token for privileged resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    /// Tokens accepted by the service
    pub const KNOWN: [&'static str; 3] = [
        "CAPABILITY_IAM",
        "CAPABILITY_NAMED_IAM",
        "CAPABILITY_AUTO_EXPAND",
    ];

    /// Parse a capability token, rejecting unknown ones
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let token = token.trim();
        if Self::KNOWN.contains(&token) {
            Ok(Self(token.to_string()))
        } else {
            Err(ConfigError::UnknownCapability(token.to_string()))
        }
    }

    /// Token as sent on the wire
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value to submit for one declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterDirective {
    /// Replace with an explicit value
    Value {
        /// Parameter name
        key: String,
        /// New value, verbatim
        value: String,
    },
    /// Keep the currently deployed value
    UsePrevious {
        /// Parameter name
        key: String,
    },
}

impl ParameterDirective {
    /// Parameter name
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Value { key, .. } | Self::UsePrevious { key } => key,
        }
    }

    /// Explicit value, if any
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Value { value, .. } => Some(value),
            Self::UsePrevious { .. } => None,
        }
    }

    /// Whether the deployed value is retained
    #[inline]
    #[must_use]
    pub fn uses_previous_value(&self) -> bool {
        matches!(self, Self::UsePrevious { .. })
    }
}

// Serialized in the service's wire shape so debug output matches what is sent.
impl Serialize for ParameterDirective {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Parameter", 2)?;
        match self {
            Self::Value { key, value } => {
                state.serialize_field("ParameterKey", key)?;
                state.serialize_field("ParameterValue", value)?;
            }
            Self::UsePrevious { key } => {
                state.serialize_field("ParameterKey", key)?;
                state.serialize_field("UsePreviousValue", &true)?;
            }
        }
        state.end()
    }
}

/// Placeholder logged in place of a parameter value
pub const REDACTED: &str = "****";

/// CreateChangeSet payload
///
/// `parameters` is only set when the caller supplied overrides, `role_arn`
/// only when a validated role was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangesetRequest {
    /// Change set name, `<stack>-changeset`
    pub change_set_name: String,
    /// Target stack
    pub stack_name: String,
    /// Always true: only parameters change, never the template
    pub use_previous_template: bool,
    /// Acknowledged capabilities
    pub capabilities: Vec<Capability>,
    /// Per-parameter directives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterDirective>>,
    /// Service role for the update
    #[serde(rename = "RoleARN", skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

impl ChangesetRequest {
    /// Create request for a stack, deriving the change set name
    pub fn new(stack_name: impl Into<String>) -> Self {
        let stack_name = stack_name.into();
        Self {
            change_set_name: changeset_name(&stack_name),
            stack_name,
            use_previous_template: true,
            capabilities: Vec::new(),
            parameters: None,
            role_arn: None,
        }
    }

    /// With capabilities
    #[inline]
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// With parameter directives
    #[inline]
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<ParameterDirective>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// With an already validated role ARN
    #[inline]
    #[must_use]
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Copy with every explicit parameter value replaced by [`REDACTED`]
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut request = self.clone();
        for directive in request.parameters.iter_mut().flatten() {
            if let ParameterDirective::Value { value, .. } = directive {
                *value = REDACTED.to_string();
            }
        }
        request
    }
}

/// Change set status values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetStatus {
    /// `CREATE_PENDING`
    CreatePending,
    /// `CREATE_IN_PROGRESS`
    CreateInProgress,
    /// `CREATE_COMPLETE`
    CreateComplete,
    /// `FAILED`
    Failed,
    /// Any other value, kept verbatim
    Other(String),
}

impl ChangeSetStatus {
    /// Wire value
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreatePending => "CREATE_PENDING",
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::Failed => "FAILED",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for ChangeSetStatus {
    fn from(value: &str) -> Self {
        match value {
            "CREATE_PENDING" => Self::CreatePending,
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result of DescribeChangeSet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetDescription {
    /// Current status
    pub status: ChangeSetStatus,
    /// Service-provided explanation, mostly set on failure
    pub status_reason: Option<String>,
}

impl ChangeSetDescription {
    /// Create description without a reason
    #[inline]
    #[must_use]
    pub fn new(status: ChangeSetStatus) -> Self {
        Self {
            status,
            status_reason: None,
        }
    }

    /// With status reason
    #[inline]
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.status_reason = Some(reason.into());
        self
    }
}

/// Stack status values relevant to an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackStatus {
    /// `UPDATE_IN_PROGRESS`
    UpdateInProgress,
    /// `UPDATE_COMPLETE`
    UpdateComplete,
    /// `UPDATE_FAILED`
    UpdateFailed,
    /// `UPDATE_ROLLBACK_IN_PROGRESS`
    UpdateRollbackInProgress,
    /// `UPDATE_ROLLBACK_FAILED`
    UpdateRollbackFailed,
    /// `UPDATE_ROLLBACK_COMPLETE`
    UpdateRollbackComplete,
    /// Any other value, kept verbatim
    Other(String),
}

impl StackStatus {
    /// Wire value
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            Self::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            Self::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for StackStatus {
    fn from(value: &str) -> Self {
        match value {
            "UPDATE_IN_PROGRESS" => Self::UpdateInProgress,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "UPDATE_FAILED" => Self::UpdateFailed,
            "UPDATE_ROLLBACK_IN_PROGRESS" => Self::UpdateRollbackInProgress,
            "UPDATE_ROLLBACK_FAILED" => Self::UpdateRollbackFailed,
            "UPDATE_ROLLBACK_COMPLETE" => Self::UpdateRollbackComplete,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result of DescribeStacks for a single stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
    /// Current status
    pub status: StackStatus,
    /// Service-provided explanation
    pub status_reason: Option<String>,
}

impl StackDescription {
    /// Create description without a reason
    #[inline]
    #[must_use]
    pub fn new(status: StackStatus) -> Self {
        Self {
            status,
            status_reason: None,
        }
    }

    /// With status reason
    #[inline]
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.status_reason = Some(reason.into());
        self
    }
}
