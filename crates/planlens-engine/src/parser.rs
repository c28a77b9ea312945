use planlens_core::{
    CodeFragment, Deliverable, Phase, Plan, Subtask, SubtaskId, Task, TrackingEntry,
};

/// Which conventional sub-section of a subtask span we are inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Prerequisites,
    Deliverables,
    SuccessCriteria,
    CompletionNotes,
}

/// Which document-level section we are inside, outside of phase bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocSection {
    None,
    TechStack,
    Tracking,
}

#[derive(Debug)]
struct SubtaskBuilder {
    id: SubtaskId,
    title: String,
    prerequisites: Vec<SubtaskId>,
    no_prerequisite: bool,
    deliverables: Vec<Deliverable>,
    success_criteria: Vec<Deliverable>,
    fragments: Vec<CodeFragment>,
    notes: Vec<String>,
    has_prerequisites: bool,
    has_deliverables: bool,
    has_success_criteria: bool,
    has_completion_notes: bool,
    body: String,
    section: Section,
    fence_lang: Option<String>,
    fence_body: String,
    in_fence: bool,
}

impl SubtaskBuilder {
    fn new(id: SubtaskId, title: String) -> Self {
        SubtaskBuilder {
            id,
            title,
            prerequisites: Vec::new(),
            no_prerequisite: false,
            deliverables: Vec::new(),
            success_criteria: Vec::new(),
            fragments: Vec::new(),
            notes: Vec::new(),
            has_prerequisites: false,
            has_deliverables: false,
            has_success_criteria: false,
            has_completion_notes: false,
            body: String::new(),
            section: Section::None,
            fence_lang: None,
            fence_body: String::new(),
            in_fence: false,
        }
    }

    fn finish(mut self) -> Subtask {
        // Unterminated fence at the end of a span still counts.
        if self.in_fence && !self.fence_body.is_empty() {
            self.fragments.push(CodeFragment {
                language: self.fence_lang.take(),
                body: self.fence_body.split_off(0),
            });
        }
        Subtask {
            id: self.id,
            title: self.title,
            completed: false,
            prerequisites: self.prerequisites,
            no_prerequisite: self.no_prerequisite,
            deliverables: self.deliverables,
            success_criteria: self.success_criteria,
            fragments: self.fragments,
            completion_notes: self.notes.join("\n"),
            has_prerequisites_section: self.has_prerequisites,
            has_deliverables_section: self.has_deliverables,
            has_success_criteria_section: self.has_success_criteria,
            has_completion_notes_section: self.has_completion_notes,
            body: self.body,
        }
    }
}

/// Build the document model from plan text.
///
/// The scan is tolerant by design: anything that cannot confidently be
/// matched against the plan conventions is omitted from the model, and
/// the analyses report on the gaps. This never returns an error and
/// never panics on malformed input.
pub fn parse_plan(content: &str) -> Plan {
    let mut plan = Plan {
        has_title: false,
        has_tech_section: false,
        technologies: Vec::new(),
        phases: Vec::new(),
        tracking: Vec::new(),
        merge_checklists: 0,
    };

    let mut doc_section = DocSection::None;
    let mut current_phase: Option<Phase> = None;
    let mut current_task: Option<Task> = None;
    let mut current_subtask: Option<SubtaskBuilder> = None;
    // Fences outside subtask spans still suspend marker detection.
    let mut in_outer_fence = false;

    for line in content.lines() {
        let trimmed = line.trim();

        // Inside a subtask's code fence nothing is a structural marker.
        if let Some(builder) = current_subtask.as_mut() {
            if builder.in_fence {
                builder.body.push_str(line);
                builder.body.push('\n');
                if trimmed.starts_with("```") {
                    builder.in_fence = false;
                    builder.fragments.push(CodeFragment {
                        language: builder.fence_lang.take(),
                        body: builder.fence_body.split_off(0),
                    });
                } else {
                    builder.fence_body.push_str(line);
                    builder.fence_body.push('\n');
                }
                continue;
            }
        } else if in_outer_fence {
            if trimmed.starts_with("```") {
                in_outer_fence = false;
            }
            continue;
        }

        // Level-2 headings switch document context.
        if let Some(rest) = trimmed.strip_prefix("## ") {
            flush_subtask(&mut current_subtask, &mut current_task);
            flush_task(&mut current_task, &mut current_phase);

            if let Some(phase_rest) = rest.strip_prefix("Phase ") {
                flush_phase(&mut current_phase, &mut plan);
                doc_section = DocSection::None;
                current_phase = parse_phase_heading(phase_rest);
                continue;
            }

            flush_phase(&mut current_phase, &mut plan);
            let lower = rest.to_lowercase();
            if lower.contains("development plan") {
                plan.has_title = true;
            }
            doc_section = if lower.contains("technology stack") || lower.contains("tech stack") {
                plan.has_tech_section = true;
                DocSection::TechStack
            } else if lower.contains("progress tracking") {
                DocSection::Tracking
            } else {
                DocSection::None
            };
            continue;
        }

        // Title heading. Any `#` heading mentioning "development plan".
        if trimmed.starts_with('#') && trimmed.to_lowercase().contains("development plan") {
            plan.has_title = true;
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("### Task ") {
            if current_phase.is_some() {
                flush_subtask(&mut current_subtask, &mut current_task);
                flush_task(&mut current_task, &mut current_phase);
                current_task = parse_task_heading(rest);
                continue;
            }
        }

        // Subtask marker: `**Subtask X.Y.Z: Title**`.
        if let Some(builder) = parse_subtask_marker(trimmed) {
            if current_task.is_some() {
                flush_subtask(&mut current_subtask, &mut current_task);
                current_subtask = Some(builder);
                continue;
            }
        }

        // Task merge-checklist marker ends the previous subtask span.
        if trimmed.starts_with("**Task ") && trimmed.contains("Complete") {
            flush_subtask(&mut current_subtask, &mut current_task);
            plan.merge_checklists += 1;
            continue;
        }

        if let Some(builder) = current_subtask.as_mut() {
            subtask_line(builder, line, trimmed);
            continue;
        }

        match doc_section {
            DocSection::TechStack => collect_technologies(trimmed, &mut plan.technologies),
            DocSection::Tracking => collect_tracking(trimmed, &mut plan.tracking),
            DocSection::None => {
                if trimmed.starts_with("```") {
                    in_outer_fence = true;
                } else if let Some(phase) = current_phase.as_mut() {
                    if current_task.is_none() {
                        if let Some(goal) = trimmed.strip_prefix("**Goal**:") {
                            if phase.goal.is_empty() {
                                phase.goal = goal.trim().to_string();
                            }
                        }
                    }
                }
            }
        }
    }

    flush_subtask(&mut current_subtask, &mut current_task);
    flush_task(&mut current_task, &mut current_phase);
    flush_phase(&mut current_phase, &mut plan);

    resolve_completion(&mut plan);
    plan
}

fn flush_subtask(subtask: &mut Option<SubtaskBuilder>, task: &mut Option<Task>) {
    if let Some(builder) = subtask.take() {
        if let Some(task) = task.as_mut() {
            task.subtasks.push(builder.finish());
        }
    }
}

fn flush_task(task: &mut Option<Task>, phase: &mut Option<Phase>) {
    if let Some(task) = task.take() {
        if let Some(phase) = phase.as_mut() {
            phase.tasks.push(task);
        }
    }
}

fn flush_phase(phase: &mut Option<Phase>, plan: &mut Plan) {
    if let Some(phase) = phase.take() {
        plan.phases.push(phase);
    }
}

/// Parse `N: Title (3 days)` from a `## Phase ` heading. The number may
/// be fractional (`4.5`) for deferred phases.
fn parse_phase_heading(rest: &str) -> Option<Phase> {
    let (id, title) = rest.split_once(':')?;
    let id = id.trim();
    if !is_phase_number(id) {
        return None;
    }
    Some(Phase {
        id: id.to_string(),
        title: strip_duration_suffix(title.trim()).to_string(),
        goal: String::new(),
        tasks: Vec::new(),
    })
}

fn is_phase_number(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_digit() || c == '.')
        && s.chars().filter(|&c| c == '.').count() <= 1
        && !s.starts_with('.')
        && !s.ends_with('.')
}

/// Drop a trailing ` (3 days)` style suffix from a heading title.
fn strip_duration_suffix(title: &str) -> &str {
    if title.ends_with(')') {
        if let Some(idx) = title.rfind(" (") {
            return title[..idx].trim_end();
        }
    }
    title
}

/// Parse `X.Y: Title` from a `### Task ` heading.
fn parse_task_heading(rest: &str) -> Option<Task> {
    let (id, title) = rest.split_once(':')?;
    let id = id.trim();
    let mut parts = id.split('.');
    let valid = matches!(
        (
            parts.next().map(|p| p.parse::<u32>().is_ok()),
            parts.next().map(|p| p.parse::<u32>().is_ok()),
            parts.next(),
        ),
        (Some(true), Some(true), None)
    );
    if !valid {
        return None;
    }
    Some(Task {
        id: id.to_string(),
        title: title.trim().to_string(),
        subtasks: Vec::new(),
    })
}

fn parse_subtask_marker(trimmed: &str) -> Option<SubtaskBuilder> {
    let inner = trimmed
        .strip_prefix("**Subtask ")?
        .strip_suffix("**")?;
    let (id, title) = inner.split_once(':')?;
    let id: SubtaskId = id.trim().parse().ok()?;
    Some(SubtaskBuilder::new(id, title.trim().to_string()))
}

/// Feed one line of a subtask span into the builder.
fn subtask_line(builder: &mut SubtaskBuilder, line: &str, trimmed: &str) {
    builder.body.push_str(line);
    builder.body.push('\n');

    if trimmed.starts_with("```") {
        builder.in_fence = true;
        let lang = trimmed.trim_start_matches('`').trim();
        builder.fence_lang = if lang.is_empty() {
            None
        } else {
            Some(lang.to_lowercase())
        };
        builder.fence_body.clear();
        return;
    }

    if trimmed.starts_with("**Prerequisites**") {
        builder.section = Section::Prerequisites;
        builder.has_prerequisites = true;
        return;
    }
    if trimmed.starts_with("**Deliverables**") {
        builder.section = Section::Deliverables;
        builder.has_deliverables = true;
        return;
    }
    if trimmed.starts_with("**Success Criteria**") {
        builder.section = Section::SuccessCriteria;
        builder.has_success_criteria = true;
        return;
    }
    if trimmed.starts_with("**Completion Notes**") {
        builder.section = Section::CompletionNotes;
        builder.has_completion_notes = true;
        return;
    }
    // Any other bold label ends the current list section.
    if trimmed.starts_with("**") && trimmed.contains("**:") {
        builder.section = Section::None;
        return;
    }

    match builder.section {
        Section::Prerequisites => {
            if trimmed.eq_ignore_ascii_case("- none") {
                builder.no_prerequisite = true;
            } else if let Some((_, rest)) = parse_checkbox(trimmed) {
                // Tolerate both `- [x] 1.2.3` and `- [x] 1.2.3: Title`.
                let id_part = rest.split(':').next().unwrap_or(rest).trim();
                if let Ok(id) = id_part.parse::<SubtaskId>() {
                    builder.prerequisites.push(id);
                }
            }
        }
        Section::Deliverables => {
            if let Some((checked, text)) = parse_checkbox(trimmed) {
                builder.deliverables.push(Deliverable {
                    text: text.trim().to_string(),
                    checked,
                });
            }
        }
        Section::SuccessCriteria => {
            if let Some((checked, text)) = parse_checkbox(trimmed) {
                builder.success_criteria.push(Deliverable {
                    text: text.trim().to_string(),
                    checked,
                });
            }
        }
        Section::CompletionNotes => {
            if !trimmed.is_empty() && trimmed != "---" {
                builder.notes.push(trimmed.to_string());
            }
        }
        Section::None => {}
    }
}

/// Parse a `- [x] rest` / `- [ ] rest` list line. Case-insensitive on
/// the completion marker.
fn parse_checkbox(trimmed: &str) -> Option<(bool, &str)> {
    let rest = trimmed.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let mark = chars.next()?;
    let checked = match mark {
        'x' | 'X' => true,
        ' ' => false,
        _ => return None,
    };
    let rest = chars.as_str().strip_prefix(']')?;
    Some((checked, rest.trim_start()))
}

/// Collect `**Category**: Technology` lines from the Technology Stack
/// section. Comma-separated values each count as one technology.
fn collect_technologies(trimmed: &str, technologies: &mut Vec<String>) {
    let Some(rest) = trimmed.strip_prefix("**") else {
        return;
    };
    let Some((_, value)) = rest.split_once("**:") else {
        return;
    };
    for tech in value.split(',') {
        let tech = tech.trim();
        if !tech.is_empty() {
            technologies.push(tech.to_string());
        }
    }
}

/// Collect `- [x] X.Y.Z: Title` lines from the Progress Tracking listing.
fn collect_tracking(trimmed: &str, tracking: &mut Vec<TrackingEntry>) {
    let Some((checked, rest)) = parse_checkbox(trimmed) else {
        return;
    };
    let (id, title) = match rest.split_once(':') {
        Some((id, title)) => (id, title.trim()),
        None => (rest, ""),
    };
    if let Ok(id) = id.trim().parse::<SubtaskId>() {
        tracking.push(TrackingEntry {
            id,
            title: title.to_string(),
            checked,
        });
    }
}

/// Resolve each subtask's completion flag. The flat tracking listing is
/// authoritative; a subtask absent from it falls back to "all of its
/// deliverable checkboxes are checked".
fn resolve_completion(plan: &mut Plan) {
    let tracked: Vec<(SubtaskId, bool)> = plan
        .tracking
        .iter()
        .map(|e| (e.id.clone(), e.checked))
        .collect();

    for phase in &mut plan.phases {
        for task in &mut phase.tasks {
            for subtask in &mut task.subtasks {
                subtask.completed = match tracked.iter().find(|(id, _)| id == &subtask.id) {
                    Some((_, checked)) => *checked,
                    None => {
                        !subtask.deliverables.is_empty()
                            && subtask.deliverables.iter().all(|d| d.checked)
                    }
                };
            }
        }
    }
}
