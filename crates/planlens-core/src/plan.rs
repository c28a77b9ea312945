use serde::{Deserialize, Serialize};

use crate::id::SubtaskId;
use crate::report::PlanStats;

/// One checkable line under a subtask's Deliverables or Success Criteria
/// section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deliverable {
    pub text: String,
    pub checked: bool,
}

/// A fenced code block found inside a subtask span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFragment {
    /// Language hint on the opening fence, if any.
    pub language: Option<String>,
    pub body: String,
}

impl CodeFragment {
    pub fn line_count(&self) -> usize {
        self.body.lines().count()
    }
}

/// One `- [x] X.Y.Z: Title` line from the flat Progress Tracking listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub id: SubtaskId,
    pub title: String,
    pub checked: bool,
}

/// The atomic unit of work. Everything here is re-derived from plan text
/// on every call; nothing is mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub title: String,
    /// From the Progress Tracking listing; falls back to "all
    /// deliverables checked" when the subtask never appears there.
    pub completed: bool,
    /// Prerequisite ids as written. Usually zero or one.
    pub prerequisites: Vec<SubtaskId>,
    /// The literal `- None` sentinel was used.
    pub no_prerequisite: bool,
    pub deliverables: Vec<Deliverable>,
    pub success_criteria: Vec<Deliverable>,
    pub fragments: Vec<CodeFragment>,
    pub completion_notes: String,
    pub has_prerequisites_section: bool,
    pub has_deliverables_section: bool,
    pub has_success_criteria_section: bool,
    pub has_completion_notes_section: bool,
    /// Raw span text, from the subtask marker to the next structural
    /// marker. Input for the executability rules.
    pub body: String,
}

impl Subtask {
    /// All four conventional sub-sections are present.
    pub fn has_all_sections(&self) -> bool {
        self.has_prerequisites_section
            && self.has_deliverables_section
            && self.has_success_criteria_section
            && self.has_completion_notes_section
    }
}

/// A named grouping of subtasks sharing a `phase.task` id prefix.
/// Completion is a view over the children, never stored independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn is_complete(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|s| s.completed)
    }
}

/// Top-level grouping. The id is kept as written: an integer, or a
/// fractional number like `4.5` for deferred phases outside the primary
/// dependency chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub title: String,
    pub goal: String,
    pub tasks: Vec<Task>,
}

impl Phase {
    pub fn total_subtasks(&self) -> usize {
        self.tasks.iter().map(|t| t.subtasks.len()).sum()
    }

    pub fn completed_subtasks(&self) -> usize {
        self.tasks
            .iter()
            .flat_map(|t| &t.subtasks)
            .filter(|s| s.completed)
            .count()
    }
}

/// The root document model, plus the document-level facts the structural
/// validator inspects but the progress tracker ignores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// A `#` heading containing "Development Plan" was found.
    pub has_title: bool,
    /// A Technology Stack section heading was found.
    pub has_tech_section: bool,
    /// Technologies declared under the Technology Stack section.
    pub technologies: Vec<String>,
    pub phases: Vec<Phase>,
    /// Flat Progress Tracking listing, in document order.
    pub tracking: Vec<TrackingEntry>,
    /// Count of task merge-checklist markers found.
    pub merge_checklists: usize,
}

impl Plan {
    /// All subtasks in document order.
    pub fn subtasks(&self) -> impl Iterator<Item = &Subtask> {
        self.phases
            .iter()
            .flat_map(|p| &p.tasks)
            .flat_map(|t| &t.subtasks)
    }

    pub fn subtask(&self, id: &SubtaskId) -> Option<&Subtask> {
        self.subtasks().find(|s| &s.id == id)
    }

    pub fn stats(&self) -> PlanStats {
        let tasks = self.phases.iter().map(|p| p.tasks.len()).sum();
        let subtasks = self.subtasks().count();
        let completed = self.subtasks().filter(|s| s.completed).count();
        PlanStats::new(self.phases.len(), tasks, subtasks, completed)
    }
}
