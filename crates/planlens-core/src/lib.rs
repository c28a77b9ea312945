pub mod error;
pub mod id;
pub mod issue;
pub mod plan;
pub mod report;

pub use error::PlanlensError;
pub use id::SubtaskId;
pub use issue::{LintIssue, LintKind, Severity};
pub use plan::{CodeFragment, Deliverable, Phase, Plan, Subtask, Task, TrackingEntry};
pub use report::{
    CompletedSubtask, LintReport, LintStats, NextSubtask, PhaseProgress, PlanStats,
    ProgressReport, SubtaskDetail, ValidationReport,
};
