use serde::{Deserialize, Serialize};

use crate::issue::{LintIssue, Severity};
use crate::plan::Deliverable;

fn percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Aggregate counts shared by the validator and the progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub phases: usize,
    pub tasks: usize,
    pub subtasks: usize,
    pub completed_subtasks: usize,
    pub percent_complete: u32,
}

impl PlanStats {
    pub fn new(phases: usize, tasks: usize, subtasks: usize, completed_subtasks: usize) -> Self {
        PlanStats {
            phases,
            tasks,
            subtasks,
            completed_subtasks,
            percent_complete: percent(completed_subtasks, subtasks),
        }
    }
}

/// Outcome of structural validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub stats: PlanStats,
}

impl ValidationReport {
    pub fn new(stats: PlanStats) -> Self {
        ValidationReport {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            stats,
        }
    }

    /// File a finding under its severity class.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        match severity {
            Severity::Error => self.errors.push(message.into()),
            Severity::Warning => self.warnings.push(message.into()),
            Severity::Suggestion => self.suggestions.push(message.into()),
        }
    }

    /// Recompute the aggregate validity boolean. In strict mode any
    /// warning also invalidates; severities themselves never change.
    pub fn finalize(&mut self, strict: bool) {
        self.valid = self.errors.is_empty() && (!strict || self.warnings.is_empty());
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LintStats {
    pub subtasks_checked: usize,
    pub fragments_checked: usize,
    pub issues_found: usize,
}

/// Outcome of the executability lint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintReport {
    pub is_executable: bool,
    pub errors: Vec<LintIssue>,
    pub warnings: Vec<String>,
    pub stats: LintStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub id: String,
    pub title: String,
    pub completed: usize,
    pub total: usize,
    pub percent_complete: u32,
}

impl PhaseProgress {
    pub fn new(id: String, title: String, completed: usize, total: usize) -> Self {
        PhaseProgress {
            id,
            title,
            completed,
            total,
            percent_complete: percent(completed, total),
        }
    }
}

/// The single next actionable subtask, with enough context to prompt an
/// agent without re-reading the whole plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextSubtask {
    pub id: String,
    pub title: String,
    pub task: String,
    pub phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSubtask {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub stats: PlanStats,
    pub phase_progress: Vec<PhaseProgress>,
    pub next_subtask: Option<NextSubtask>,
    pub recently_completed: Vec<CompletedSubtask>,
}

/// One subtask extracted with its surrounding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskDetail {
    pub id: String,
    pub title: String,
    pub phase: String,
    pub task: String,
    pub completed: bool,
    pub prerequisites: Vec<String>,
    pub deliverables: Vec<Deliverable>,
    pub success_criteria: Vec<Deliverable>,
    pub completion_notes: String,
}
