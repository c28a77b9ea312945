use planlens_core::{Severity, SubtaskId, ValidationReport};
use tracing::debug;

use crate::parser::parse_plan;

/// Pairs of mutually exclusive technologies. Declaring both in one
/// stack is almost always a copy-paste defect in the generated plan.
const TECH_CONFLICTS: &[(&str, &str, &str)] = &[
    ("react", "vue", "two competing frontend frameworks"),
    ("react", "angular", "two competing frontend frameworks"),
    ("vue", "angular", "two competing frontend frameworks"),
    ("django", "flask", "two competing Python web frameworks"),
    ("django", "fastapi", "two competing Python web frameworks"),
    ("postgresql", "mysql", "two competing relational databases"),
    ("npm", "yarn", "two competing package managers"),
    ("webpack", "vite", "two competing bundlers"),
];

/// Fraction of code fragments that should carry a language hint before
/// we stop suggesting tags.
const LANGUAGE_HINT_THRESHOLD: usize = 80;

const MIN_DELIVERABLES: usize = 3;

/// Validate a plan's structural integrity.
///
/// Every check is independent and order-insensitive. Defects in the
/// analyzed text are returned as data; this never fails. In strict mode
/// warnings also invalidate the plan, but individual severities are
/// never changed.
pub fn validate_plan(content: &str, strict: bool) -> ValidationReport {
    let plan = parse_plan(content);
    let mut report = ValidationReport::new(plan.stats());

    if !plan.has_title {
        report.push(
            Severity::Error,
            "plan is missing a \"Development Plan\" title heading",
        );
    }
    if !plan.has_tech_section {
        report.push(
            Severity::Error,
            "plan is missing a Technology Stack section",
        );
    }

    match plan.phases.len() {
        0 => report.push(Severity::Error, "plan has no phases"),
        1 => report.push(
            Severity::Warning,
            "plan has only one phase; expected at least two",
        ),
        _ => {}
    }

    if let Some(first) = plan.phases.first() {
        if !first.title.contains("Foundation") {
            report.push(
                Severity::Warning,
                format!(
                    "first phase should be the Foundation phase, got \"{}\"",
                    first.title
                ),
            );
        }
    }

    // Missing sub-sections are aggregated into one warning to keep the
    // report readable on large plans.
    let nonconforming = plan.subtasks().filter(|s| !s.has_all_sections()).count();
    if nonconforming > 0 {
        report.push(
            Severity::Warning,
            format!(
                "{nonconforming} subtask(s) are missing one of the Prerequisites, \
                 Deliverables, Success Criteria, or Completion Notes sections"
            ),
        );
    }

    for subtask in plan.subtasks() {
        if subtask.deliverables.len() < MIN_DELIVERABLES {
            report.push(
                Severity::Warning,
                format!(
                    "subtask {} has {} deliverables, recommended minimum is {}",
                    subtask.id,
                    subtask.deliverables.len(),
                    MIN_DELIVERABLES
                ),
            );
        }
    }

    let tasks = report.stats.tasks;
    if plan.merge_checklists < tasks {
        report.push(
            Severity::Warning,
            format!(
                "{} task(s) are missing a merge checklist marker",
                tasks - plan.merge_checklists
            ),
        );
    }

    check_prerequisites(&plan, &mut report);
    check_language_hints(&plan, &mut report);
    check_tech_conflicts(&plan.technologies, &mut report);

    report.finalize(strict);
    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        suggestions = report.suggestions.len(),
        valid = report.valid,
        "structural validation finished"
    );
    report
}

/// Every prerequisite must resolve to a subtask that exists earlier in
/// document order. Dangling or forward references are warnings, not
/// errors: the plan can still be followed manually.
fn check_prerequisites(plan: &planlens_core::Plan, report: &mut ValidationReport) {
    let order: Vec<&SubtaskId> = plan.subtasks().map(|s| &s.id).collect();

    for (position, subtask) in plan.subtasks().enumerate() {
        for prereq in &subtask.prerequisites {
            match order.iter().position(|id| *id == prereq) {
                None => report.push(
                    Severity::Warning,
                    format!(
                        "subtask {}: prerequisite \"{}\" does not exist in the plan",
                        subtask.id, prereq
                    ),
                ),
                Some(target) if target >= position => report.push(
                    Severity::Warning,
                    format!(
                        "subtask {}: prerequisite \"{}\" does not precede it in document order",
                        subtask.id, prereq
                    ),
                ),
                Some(_) => {}
            }
        }
    }
}

fn check_language_hints(plan: &planlens_core::Plan, report: &mut ValidationReport) {
    let fragments: Vec<_> = plan.subtasks().flat_map(|s| &s.fragments).collect();
    if fragments.is_empty() {
        return;
    }
    let hinted = fragments.iter().filter(|f| f.language.is_some()).count();
    if hinted * 100 < fragments.len() * LANGUAGE_HINT_THRESHOLD {
        report.push(
            Severity::Suggestion,
            format!(
                "only {hinted} of {} code fragments declare a language hint; \
                 tag fenced blocks so executors need not guess",
                fragments.len()
            ),
        );
    }
}

fn check_tech_conflicts(technologies: &[String], report: &mut ValidationReport) {
    let declared: Vec<String> = technologies.iter().map(|t| t.to_lowercase()).collect();
    let present = |name: &str| declared.iter().any(|t| t.contains(name));

    for (a, b, reason) in TECH_CONFLICTS {
        if present(a) && present(b) {
            report.push(
                Severity::Warning,
                format!("technology conflict: {a} and {b} ({reason})"),
            );
        }
    }
}
