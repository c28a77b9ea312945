use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a structural finding. Closed scale; strict mode never
/// changes the severity of an individual finding, only how the
/// aggregate validity boolean is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable classification of an executability finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintKind {
    IncompleteEdit,
    MissingDependency,
    CrossEntityReference,
    AmbiguousAnchor,
    PlaceholderContent,
}

impl LintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintKind::IncompleteEdit => "incomplete_edit",
            LintKind::MissingDependency => "missing_dependency",
            LintKind::CrossEntityReference => "cross_entity_reference",
            LintKind::AmbiguousAnchor => "ambiguous_anchor",
            LintKind::PlaceholderContent => "placeholder_content",
        }
    }
}

impl fmt::Display for LintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single executability violation, attributed to one subtask.
///
/// `fix` is mandatory: every lint error states the exact remediation a
/// mechanical executor would need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintIssue {
    pub subtask_id: String,
    pub kind: LintKind,
    pub message: String,
    pub fix: String,
}
