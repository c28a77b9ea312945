use std::collections::HashSet;

use planlens_core::{
    CompletedSubtask, NextSubtask, PhaseProgress, ProgressReport, SubtaskDetail, SubtaskId,
};
use tracing::debug;

use crate::parser::parse_plan;

/// How many recently completed subtasks to report.
const RECENT_WINDOW: usize = 3;

/// Compute live progress for a plan: aggregate stats, a per-phase
/// breakdown, the single next actionable subtask, and a small window of
/// recently completed work.
///
/// "Next actionable" is a single pass in document order: the first
/// incomplete subtask whose listed prerequisites are all complete. The
/// very first subtask of the plan is always eligible regardless of its
/// prerequisite text. `None` means the plan is exhausted or genuinely
/// blocked; callers distinguish the two via the stats.
pub fn track_progress(content: &str) -> ProgressReport {
    let plan = parse_plan(content);
    let stats = plan.stats();

    let phase_progress = plan
        .phases
        .iter()
        .map(|p| {
            PhaseProgress::new(
                p.id.clone(),
                p.title.clone(),
                p.completed_subtasks(),
                p.total_subtasks(),
            )
        })
        .collect();

    let completed_ids: HashSet<&SubtaskId> = plan
        .subtasks()
        .filter(|s| s.completed)
        .map(|s| &s.id)
        .collect();

    let mut next_subtask = None;
    let mut position = 0;
    'outer: for phase in &plan.phases {
        for task in &phase.tasks {
            for subtask in &task.subtasks {
                let first_in_plan = position == 0;
                position += 1;
                if subtask.completed {
                    continue;
                }
                let ready = first_in_plan
                    || subtask
                        .prerequisites
                        .iter()
                        .all(|p| completed_ids.contains(p));
                if ready {
                    next_subtask = Some(NextSubtask {
                        id: subtask.id.to_string(),
                        title: subtask.title.clone(),
                        task: task.title.clone(),
                        phase: phase.title.clone(),
                    });
                    break 'outer;
                }
            }
        }
    }

    let completed: Vec<CompletedSubtask> = plan
        .subtasks()
        .filter(|s| s.completed)
        .map(|s| CompletedSubtask {
            id: s.id.to_string(),
            title: s.title.clone(),
        })
        .collect();
    let recently_completed = completed
        .into_iter()
        .rev()
        .take(RECENT_WINDOW)
        .rev()
        .collect();

    debug!(
        subtasks = stats.subtasks,
        completed = stats.completed_subtasks,
        next = next_subtask.as_ref().map(|n| n.id.as_str()),
        "progress computed"
    );
    ProgressReport {
        stats,
        phase_progress,
        next_subtask,
        recently_completed,
    }
}

/// Extract a single subtask with its surrounding phase and task context.
pub fn find_subtask(content: &str, id: &SubtaskId) -> Option<SubtaskDetail> {
    let plan = parse_plan(content);
    for phase in &plan.phases {
        for task in &phase.tasks {
            for subtask in &task.subtasks {
                if &subtask.id == id {
                    return Some(SubtaskDetail {
                        id: subtask.id.to_string(),
                        title: subtask.title.clone(),
                        phase: phase.title.clone(),
                        task: task.title.clone(),
                        completed: subtask.completed,
                        prerequisites: subtask
                            .prerequisites
                            .iter()
                            .map(|p| p.to_string())
                            .collect(),
                        deliverables: subtask.deliverables.clone(),
                        success_criteria: subtask.success_criteria.clone(),
                        completion_notes: subtask.completion_notes.clone(),
                    });
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plan with subtasks 1.1.1..=1.1.N; the first `done` are complete.
    fn chain_plan(total: usize, done: usize) -> String {
        let mut text = String::from(
            "# Demo - Development Plan\n\n\
             ## Technology Stack\n\n**Language**: Rust\n\n\
             ## Progress Tracking\n\n",
        );
        for n in 1..=total {
            let mark = if n <= done { 'x' } else { ' ' };
            text.push_str(&format!("- [{mark}] 1.1.{n}: Step {n}\n"));
        }
        text.push_str("\n## Phase 1: Foundation\n\n**Goal**: build\n\n### Task 1.1: Steps\n\n");
        for n in 1..=total {
            let prereq = if n == 1 {
                "- None".to_string()
            } else {
                format!("- [{}] 1.1.{}", if n - 1 <= done { 'x' } else { ' ' }, n - 1)
            };
            text.push_str(&format!(
                "**Subtask 1.1.{n}: Step {n}**\n\n\
                 **Prerequisites**:\n{prereq}\n\n\
                 **Deliverables**:\n- [ ] a\n- [ ] b\n- [ ] c\n\n\
                 **Success Criteria**:\n- [ ] ok\n\n\
                 **Completion Notes**:\n- **Notes**:\n\n",
            ));
        }
        text
    }

    #[test]
    fn next_is_first_unblocked_incomplete() {
        // Subtask 2 lists subtask 1 as prerequisite; 1 is complete.
        let report = track_progress(&chain_plan(2, 1));
        let next = report.next_subtask.unwrap();
        assert_eq!(next.id, "1.1.2");
        assert_eq!(next.title, "Step 2");
        assert_eq!(next.task, "Steps");
        assert_eq!(next.phase, "Foundation");
    }

    #[test]
    fn first_subtask_always_eligible() {
        // Even with a dangling prerequisite reference, the very first
        // subtask of the plan qualifies.
        let text = chain_plan(2, 0).replace("- None", "- [ ] 9.9.9");
        let report = track_progress(&text);
        assert_eq!(report.next_subtask.unwrap().id, "1.1.1");
    }

    #[test]
    fn blocked_plan_has_no_next() {
        // 1.1.1 complete in tracking, 1.1.2 incomplete but its
        // prerequisite points at a subtask that is not complete.
        let text = chain_plan(3, 1).replace("- [ ] 1.1.2", "- [ ] 9.9.9");
        // Subtask 3 now requires the nonexistent 9.9.9; subtask 2 is
        // actionable, so cut it out of the plan body to force a block.
        let start = text.find("**Subtask 1.1.2").unwrap();
        let end = text.find("**Subtask 1.1.3").unwrap();
        let text = format!("{}{}", &text[..start], &text[end..]);
        let report = track_progress(&text);
        assert!(report.next_subtask.is_none());
        assert!(report.stats.completed_subtasks < report.stats.subtasks);
    }

    #[test]
    fn exhausted_plan_has_no_next() {
        let report = track_progress(&chain_plan(2, 2));
        assert!(report.next_subtask.is_none());
        assert_eq!(report.stats.completed_subtasks, report.stats.subtasks);
    }

    #[test]
    fn phase_breakdown_percentages() {
        let report = track_progress(&chain_plan(4, 1));
        assert_eq!(report.phase_progress.len(), 1);
        let phase = &report.phase_progress[0];
        assert_eq!(phase.id, "1");
        assert_eq!(phase.completed, 1);
        assert_eq!(phase.total, 4);
        assert_eq!(phase.percent_complete, 25);
        assert_eq!(report.stats.percent_complete, 25);
    }

    #[test]
    fn recently_completed_window() {
        let report = track_progress(&chain_plan(6, 5));
        let ids: Vec<_> = report
            .recently_completed
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1.1.3", "1.1.4", "1.1.5"]);
    }

    #[test]
    fn empty_plan() {
        let report = track_progress("");
        assert_eq!(report.stats.subtasks, 0);
        assert_eq!(report.stats.percent_complete, 0);
        assert!(report.next_subtask.is_none());
        assert!(report.phase_progress.is_empty());
        assert!(report.recently_completed.is_empty());
    }

    #[test]
    fn find_subtask_returns_context() {
        let text = chain_plan(2, 1);
        let id: SubtaskId = "1.1.2".parse().unwrap();
        let detail = find_subtask(&text, &id).unwrap();
        assert_eq!(detail.id, "1.1.2");
        assert_eq!(detail.phase, "Foundation");
        assert_eq!(detail.task, "Steps");
        assert!(!detail.completed);
        assert_eq!(detail.prerequisites, vec!["1.1.1"]);
        assert_eq!(detail.deliverables.len(), 3);

        let missing: SubtaskId = "9.9.9".parse().unwrap();
        assert!(find_subtask(&text, &missing).is_none());
    }

    #[test]
    fn determinism() {
        let text = chain_plan(3, 1);
        let a = serde_json::to_string(&track_progress(&text)).unwrap();
        let b = serde_json::to_string(&track_progress(&text)).unwrap();
        assert_eq!(a, b);
    }
}
