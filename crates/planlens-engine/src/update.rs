use planlens_core::{PlanlensError, SubtaskId};
use tracing::debug;

use crate::parser::parse_plan;

/// Mark a subtask complete and hand the updated plan text back out.
///
/// Rewrites three things, leaving every other byte alone:
/// - the subtask's entry in the Progress Tracking listing flips to `[x]`;
/// - every Deliverables and Success Criteria checkbox in its span is
///   checked (Prerequisites checkboxes are left as written);
/// - `notes`, when non-empty, is written into the `- **Notes**:` line of
///   its Completion Notes block.
///
/// The engine persists nothing; the caller owns the returned text.
pub fn mark_complete(
    content: &str,
    id: &SubtaskId,
    notes: &str,
) -> Result<String, PlanlensError> {
    let plan = parse_plan(content);
    if plan.subtask(id).is_none() {
        return Err(PlanlensError::SubtaskNotFound(id.to_string()));
    }

    let marker = format!("**Subtask {id}:");
    let mut in_span = false;
    let mut in_prerequisites = false;
    let mut in_fence = false;
    let mut in_tracking = false;
    let mut out = String::with_capacity(content.len() + notes.len());

    for line in content.lines() {
        let trimmed = line.trim();

        if in_fence {
            out.push_str(line);
            out.push('\n');
            if trimmed.starts_with("```") {
                in_fence = false;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            in_fence = true;
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("## ") {
            in_tracking = rest.to_lowercase().contains("progress tracking");
        }

        if trimmed.starts_with(&marker) {
            in_span = true;
            in_prerequisites = false;
            out.push_str(line);
            out.push('\n');
            continue;
        }
        if in_span && span_ends(trimmed) {
            in_span = false;
        }

        if in_span {
            if trimmed.starts_with("**Prerequisites**") {
                in_prerequisites = true;
            } else if trimmed.starts_with("**") && trimmed.contains("**:") {
                in_prerequisites = false;
            }

            if trimmed.starts_with("- **Notes**:") && !notes.is_empty() {
                out.push_str(&format!("- **Notes**: {notes}\n"));
                continue;
            }
            if !in_prerequisites && trimmed.starts_with("- [ ]") {
                out.push_str(&line.replacen("[ ]", "[x]", 1));
                out.push('\n');
                continue;
            }
        } else if in_tracking && is_tracking_entry(trimmed, id) {
            out.push_str(&line.replacen("[ ]", "[x]", 1));
            out.push('\n');
            continue;
        }

        out.push_str(line);
        out.push('\n');
    }

    if !content.ends_with('\n') {
        out.pop();
    }
    debug!(%id, "subtask marked complete");
    Ok(out)
}

/// Structural markers that end a subtask span.
fn span_ends(trimmed: &str) -> bool {
    trimmed.starts_with("**Subtask ")
        || trimmed.starts_with("### ")
        || trimmed.starts_with("## ")
        || (trimmed.starts_with("**Task ") && trimmed.contains("Complete"))
}

/// An unchecked flat-listing line for exactly this subtask id.
fn is_tracking_entry(trimmed: &str, id: &SubtaskId) -> bool {
    let Some(rest) = trimmed.strip_prefix("- [ ]") else {
        return false;
    };
    let rest = rest.trim_start();
    let id_text = id.to_string();
    rest == id_text || rest.starts_with(&format!("{id_text}:"))
}
