/// Validation Errors
///
/// Both configuration and tool-call validation report every failing field
/// rather than stopping at the first one, so callers can pinpoint exactly
/// which argument to fix. Messages never carry field values.

use serde::Serialize;
use std::fmt;

/// A single field that failed validation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Name of the offending field as the caller spelled it (e.g. "secret")
    pub field: &'static str,
    /// What is wrong with the field
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Connection configuration is missing or malformed.
///
/// Fatal to the connection: no tool call may be dispatched once this is raised.
#[derive(Debug, thiserror::Error)]
#[error("Invalid configuration: {}", join_issues(.issues))]
pub struct ConfigValidationError {
    pub issues: Vec<FieldIssue>,
}

/// Tool call arguments do not match the tool's input schema.
///
/// Recoverable: reported as the failed call's result, the connection stays usable.
#[derive(Debug, thiserror::Error)]
#[error("Invalid arguments: {}", join_issues(.issues))]
pub struct ToolInputValidationError {
    pub issues: Vec<FieldIssue>,
}

#[cfg(test)]
impl ToolInputValidationError {
    /// Whether `field` is among the reported issues.
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}
