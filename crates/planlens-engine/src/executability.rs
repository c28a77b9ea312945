use planlens_core::{LintIssue, LintKind, LintReport, LintStats, Subtask, SubtaskId};
use tracing::debug;

use crate::parser::parse_plan;

/// Fragments below this many lines legitimately omit imports.
const MIN_FRAGMENT_LINES: usize = 5;

/// Language hints we treat as executable content.
const RECOGNIZED_LANGUAGES: &[&str] = &[
    "python", "rust", "javascript", "typescript", "js", "ts", "go", "java", "ruby", "bash", "sh",
    "sql", "toml", "yaml", "json", "html", "css",
];

/// Prose markers that show the complete replacement content for a file
/// is given, which makes an "add to" instruction safe to follow.
const FULL_CONTENT_MARKERS: &[&str] = &[
    "entire content",
    "entire file",
    "complete content",
    "full content",
    "full contents",
    "replace the contents",
    "complete file",
];

/// Known external facilities: call-form needle, accepted import
/// needles, display name. A fragment exercising the call form without
/// one of the imports cannot run as shown.
const FACILITIES: &[(&str, &[&str], &str)] = &[
    ("pytest.", &["import pytest"], "pytest"),
    (
        "z.object(",
        &[
            "from 'zod'",
            "from \"zod\"",
            "require('zod')",
            "require(\"zod\")",
        ],
        "zod",
    ),
    ("BaseModel", &["from pydantic"], "pydantic"),
];

/// Placeholder idioms that a minimal-inference executor cannot expand.
/// `TODO` is handled separately as a standalone token so identifiers
/// like `todos` never match.
const PLACEHOLDER_NEEDLES: &[&str] = &[
    "implement this",
    "rest of file omitted",
    "[insert",
    "[your",
    "[implementation",
];

type Rule = fn(&Subtask, &mut Vec<LintIssue>);

/// The rule table. Each rule is an independent predicate over one
/// subtask span and may fire any number of times; adding a rule means
/// adding a function here, nothing else changes.
const RULES: &[Rule] = &[
    incomplete_edits,
    missing_dependencies,
    cross_entity_references,
    ambiguous_anchors,
    placeholder_content,
];

/// Lint a plan for low-inference executability: could an executor with
/// no ability to infer missing context carry it out verbatim.
///
/// Findings are never deduplicated across subtasks. Pass/fail is simply
/// "zero errors"; warnings are advisory.
pub fn lint_plan(content: &str) -> LintReport {
    let plan = parse_plan(content);

    let mut errors = Vec::new();
    let mut subtasks_checked = 0;
    let mut fragments_checked = 0;

    for subtask in plan.subtasks() {
        subtasks_checked += 1;
        fragments_checked += subtask.fragments.len();
        for rule in RULES {
            rule(subtask, &mut errors);
        }
    }

    let mut warnings = Vec::new();
    let recognized = plan.subtasks().flat_map(|s| &s.fragments).any(|f| {
        f.language
            .as_deref()
            .is_some_and(|l| RECOGNIZED_LANGUAGES.contains(&l))
    });
    if !recognized {
        warnings.push(
            "no code fragments of a recognized language were found; verify this is intentional"
                .to_string(),
        );
    }

    let stats = LintStats {
        subtasks_checked,
        fragments_checked,
        issues_found: errors.len() + warnings.len(),
    };
    debug!(
        subtasks = subtasks_checked,
        fragments = fragments_checked,
        errors = errors.len(),
        "executability lint finished"
    );
    LintReport {
        is_executable: errors.is_empty(),
        errors,
        warnings,
        stats,
    }
}

/// Lines of a subtask span with fenced code regions removed.
fn prose_lines(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_fence = false;
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            out.push(trimmed);
        }
    }
    out
}

/// First backticked token in a line, if any.
fn backtick_token(line: &str) -> Option<&str> {
    let start = line.find('`')?;
    let rest = &line[start + 1..];
    let end = rest.find('`')?;
    let token = rest[..end].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn looks_like_file(token: &str) -> bool {
    token.contains('.') && !token.contains(' ')
}

/// Rule 1: an instruction to add/append to an existing file with no
/// complete replacement content shown for that same file in the span.
fn incomplete_edits(subtask: &Subtask, issues: &mut Vec<LintIssue>) {
    let prose = prose_lines(&subtask.body);

    for line in &prose {
        let lower = line.to_lowercase();
        let is_edit = lower.contains("add to ")
            || lower.contains("append to ")
            || lower.contains("add the following to ")
            || (lower.contains("update ") && lower.contains("by adding"));
        if !is_edit {
            continue;
        }
        let Some(file) = backtick_token(line).filter(|t| looks_like_file(t)) else {
            continue;
        };
        // A full-content instruction excuses only the file it names.
        let excused = prose.iter().any(|other| {
            other.contains(file)
                && FULL_CONTENT_MARKERS
                    .iter()
                    .any(|m| other.to_lowercase().contains(m))
        });
        if excused {
            continue;
        }
        issues.push(LintIssue {
            subtask_id: subtask.id.to_string(),
            kind: LintKind::IncompleteEdit,
            message: format!(
                "instruction modifies `{file}` without showing the complete replacement content"
            ),
            fix: format!("replace the entire content of `{file}` and show it fully"),
        });
    }
}

/// Rule 2: a fragment exercising a known external facility without a
/// matching import. Short fragments are exempt.
fn missing_dependencies(subtask: &Subtask, issues: &mut Vec<LintIssue>) {
    for fragment in &subtask.fragments {
        if fragment.line_count() < MIN_FRAGMENT_LINES {
            continue;
        }
        for (call_form, imports, name) in FACILITIES {
            if !fragment.body.contains(call_form) {
                continue;
            }
            if imports.iter().any(|i| fragment.body.contains(i)) {
                continue;
            }
            issues.push(LintIssue {
                subtask_id: subtask.id.to_string(),
                kind: LintKind::MissingDependency,
                message: format!("code fragment uses {name} without importing it"),
                fix: format!("add the {name} import so the fragment runs exactly as shown"),
            });
        }
    }
}

/// Rule 3: a fragment depends on a name the prose attributes to a
/// different subtask. A fragment that defines the name itself is
/// self-contained and never fires.
fn cross_entity_references(subtask: &Subtask, issues: &mut Vec<LintIssue>) {
    for line in prose_lines(&subtask.body) {
        let Some((name, owner)) = attributed_name(line) else {
            continue;
        };
        if owner == subtask.id {
            continue;
        }
        let used = subtask.fragments.iter().any(|f| f.body.contains(name));
        if !used {
            continue;
        }
        let defined = subtask.fragments.iter().any(|f| defines(&f.body, name));
        if defined {
            continue;
        }
        issues.push(LintIssue {
            subtask_id: subtask.id.to_string(),
            kind: LintKind::CrossEntityReference,
            message: format!(
                "fragment references `{name}`, which the plan attributes to subtask {owner}"
            ),
            fix: format!("define `{name}` inside this subtask's fragment so it is self-contained"),
        });
    }
}

/// A prose line that names a backticked symbol and attributes it to a
/// subtask id, e.g. "uses `FIXTURE_ROWS` defined in subtask 1.2.3".
fn attributed_name(line: &str) -> Option<(&str, SubtaskId)> {
    let name = backtick_token(line)?;
    let lower = line.to_lowercase();
    let idx = lower.find("subtask ")?;
    let after = &line[idx + "subtask ".len()..];
    let id_text: String = after
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let id: SubtaskId = id_text.trim_end_matches('.').parse().ok()?;
    Some((name, id))
}

/// Does the fragment body define `name` (assignment, function, class,
/// constant) rather than merely referencing it?
fn defines(body: &str, name: &str) -> bool {
    let patterns = [
        format!("{name} ="),
        format!("{name}="),
        format!("def {name}"),
        format!("fn {name}"),
        format!("class {name}"),
        format!("function {name}"),
        format!("const {name}"),
        format!("let {name}"),
        format!("static {name}"),
    ];
    patterns.iter().any(|p| body.contains(p.as_str()))
}

/// Rule 4: "add this to the X method" / "insert near line N" style
/// anchors. Always an error: without literal surrounding context a
/// mechanical executor cannot locate the insertion point.
fn ambiguous_anchors(subtask: &Subtask, issues: &mut Vec<LintIssue>) {
    for line in prose_lines(&subtask.body) {
        let lower = line.to_lowercase();
        let verb = lower.contains("add ") || lower.contains("insert ");
        let entity_anchor = verb
            && lower.contains(" to the ")
            && (lower.contains(" method") || lower.contains(" function") || lower.contains(" class"));
        let line_anchor = lower.contains("insert near line")
            || lower.contains("insert at line")
            || lower.contains("insert after line");
        if !entity_anchor && !line_anchor {
            continue;
        }
        let snippet: String = line.chars().take(60).collect();
        issues.push(LintIssue {
            subtask_id: subtask.id.to_string(),
            kind: LintKind::AmbiguousAnchor,
            message: format!("ambiguous modification anchor: \"{snippet}\""),
            fix: "replace the entire file content, or give literal before/after context lines \
                  for the insertion point"
                .to_string(),
        });
    }
}

/// Rule 5: placeholder idioms inside fragments.
fn placeholder_content(subtask: &Subtask, issues: &mut Vec<LintIssue>) {
    for fragment in &subtask.fragments {
        let lower = fragment.body.to_lowercase();
        for needle in PLACEHOLDER_NEEDLES {
            if lower.contains(needle) {
                push_placeholder(subtask, needle, issues);
            }
        }
        if has_todo_marker(&fragment.body) {
            push_placeholder(subtask, "TODO", issues);
        }
        let has_ellipsis_body = fragment.body.lines().any(|l| {
            let t = l.trim();
            let t = t.trim_start_matches("# ").trim_start_matches("// ");
            t == "..." || t == "…"
        });
        if has_ellipsis_body {
            push_placeholder(subtask, "...", issues);
        }
    }
}

/// `TODO` as a standalone uppercase token. Word characters on either
/// side disqualify the match, so `todos` or `MY_TODO_LIST` pass.
fn has_todo_marker(body: &str) -> bool {
    let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric() && c != '_');
    body.lines().any(|line| {
        line.match_indices("TODO").any(|(idx, _)| {
            boundary(line[..idx].chars().next_back())
                && boundary(line[idx + "TODO".len()..].chars().next())
        })
    })
}

fn push_placeholder(subtask: &Subtask, needle: &str, issues: &mut Vec<LintIssue>) {
    issues.push(LintIssue {
        subtask_id: subtask.id.to_string(),
        kind: LintKind::PlaceholderContent,
        message: format!("code fragment contains placeholder content (\"{needle}\")"),
        fix: "write out the real content; placeholders cannot be executed mechanically".to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A two-phase plan with one subtask whose span contains `extra`.
    fn plan_with(extra: &str) -> String {
        format!(
            "# Demo - Development Plan\n\n\
             ## Technology Stack\n\n**Language**: Python\n\n\
             ## Phase 0: Foundation\n\n**Goal**: setup\n\n\
             ### Task 0.1: Setup\n\n\
             **Subtask 0.1.1: Do work**\n\n\
             **Prerequisites**:\n- None\n\n\
             **Deliverables**:\n- [ ] one\n- [ ] two\n- [ ] three\n\n\
             {extra}\n\n\
             **Success Criteria**:\n- [ ] passes\n\n\
             **Completion Notes**:\n- **Notes**:\n"
        )
    }

    #[test]
    fn incomplete_edit_names_the_file() {
        let text = plan_with("Add to `config.py` the new settings block.");
        let report = lint_plan(&text);
        assert!(!report.is_executable);
        let hits: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == LintKind::IncompleteEdit)
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subtask_id, "0.1.1");
        assert!(hits[0].message.contains("config.py"));
        assert!(hits[0].fix.contains("entire content"));
    }

    #[test]
    fn full_content_for_another_file_does_not_excuse_the_edit() {
        let text = plan_with(
            "Create `models.py` with the full content:\n\n\
             ```python\nROWS = 3\n```\n\n\
             Add to `storage.py` the new load function.",
        );
        let report = lint_plan(&text);
        let hits: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == LintKind::IncompleteEdit)
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].message.contains("storage.py"));
    }

    #[test]
    fn full_replacement_instruction_passes() {
        let text = plan_with(
            "Add to `config.py` the new settings block. \
             The entire content of the file after the change:\n\n\
             ```python\nDEBUG = False\n```",
        );
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind != LintKind::IncompleteEdit));
    }

    #[test]
    fn missing_import_in_long_fragment() {
        let text = plan_with(
            "```python\n\
             def test_divide():\n\
             \twith pytest.raises(ZeroDivisionError):\n\
             \t\tdivide(1, 0)\n\
             \tassert divide(4, 2) == 2\n\
             \tassert divide(9, 3) == 3\n\
             ```",
        );
        let report = lint_plan(&text);
        let hits: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == LintKind::MissingDependency)
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].message.contains("pytest"));
    }

    #[test]
    fn short_fragments_exempt_from_import_rule() {
        let text = plan_with("```python\npytest.raises(ValueError)\n```");
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind != LintKind::MissingDependency));
    }

    #[test]
    fn fragment_with_import_passes() {
        let text = plan_with(
            "```python\n\
             import pytest\n\n\
             def test_divide():\n\
             \twith pytest.raises(ZeroDivisionError):\n\
             \t\tdivide(1, 0)\n\
             ```",
        );
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind != LintKind::MissingDependency));
    }

    #[test]
    fn cross_entity_reference_fires() {
        let text = plan_with(
            "Reuse the `FIXTURE_ROWS` constant from subtask 0.1.2.\n\n\
             ```python\nassert load(FIXTURE_ROWS) == 3\n```",
        );
        let report = lint_plan(&text);
        let hits: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == LintKind::CrossEntityReference)
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].message.contains("FIXTURE_ROWS"));
        assert!(hits[0].message.contains("0.1.2"));
    }

    #[test]
    fn self_defined_name_is_not_a_violation() {
        let text = plan_with(
            "Define `FIXTURE_ROWS` here (first introduced in subtask 0.1.2).\n\n\
             ```python\nFIXTURE_ROWS = 3\nassert load(FIXTURE_ROWS) == 3\n```",
        );
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind != LintKind::CrossEntityReference));
    }

    #[test]
    fn attribution_to_own_subtask_is_fine() {
        let text = plan_with(
            "This subtask 0.1.1 introduces `FIXTURE_ROWS`.\n\n\
             ```python\nassert load(FIXTURE_ROWS) == 3\n```",
        );
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind != LintKind::CrossEntityReference));
    }

    #[test]
    fn ambiguous_anchor_always_errors() {
        let text = plan_with("Add this to the handle_request function in the router.");
        let report = lint_plan(&text);
        let hits: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == LintKind::AmbiguousAnchor)
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].fix.contains("before/after context"));

        let text = plan_with("Insert near line 42 the retry wrapper.");
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .any(|e| e.kind == LintKind::AmbiguousAnchor));
    }

    #[test]
    fn placeholder_idioms_error() {
        let text = plan_with("```python\ndef run():\n    ...\n```");
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .any(|e| e.kind == LintKind::PlaceholderContent));

        let text = plan_with("```python\n# TODO: implement this\npass\n```");
        let report = lint_plan(&text);
        let hits: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == LintKind::PlaceholderContent)
            .collect();
        assert!(hits.len() >= 2, "both needles fire: {hits:?}");
    }

    #[test]
    fn todo_like_identifiers_are_not_placeholders() {
        let text = plan_with(
            "```python\ntodos = []\n\ndef add(item):\n    todos.append(item)\n```",
        );
        let report = lint_plan(&text);
        assert!(
            report
                .errors
                .iter()
                .all(|e| e.kind != LintKind::PlaceholderContent),
            "{:?}",
            report.errors
        );

        let text = plan_with("```python\nTODO\n```");
        let report = lint_plan(&text);
        assert!(report
            .errors
            .iter()
            .any(|e| e.kind == LintKind::PlaceholderContent));
    }

    #[test]
    fn empty_plan_passes_with_advisory_warning() {
        let report = lint_plan("");
        assert!(report.is_executable);
        assert!(report.errors.is_empty());
        assert_eq!(report.stats.subtasks_checked, 0);
        assert_eq!(report.stats.fragments_checked, 0);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("recognized language"));
    }

    #[test]
    fn findings_are_not_deduplicated_across_subtasks() {
        let mut text = plan_with("Add to `config.py` the new block.");
        text.push_str(
            "\n**Subtask 0.1.2: More work**\n\n\
             **Prerequisites**:\n- [ ] 0.1.1\n\n\
             **Deliverables**:\n- [ ] a\n- [ ] b\n- [ ] c\n\n\
             Add to `config.py` the other block.\n\n\
             **Success Criteria**:\n- [ ] passes\n\n\
             **Completion Notes**:\n- **Notes**:\n",
        );
        let report = lint_plan(&text);
        let hits: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == LintKind::IncompleteEdit)
            .collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].subtask_id, "0.1.1");
        assert_eq!(hits[1].subtask_id, "0.1.2");
        assert_eq!(report.stats.issues_found, report.errors.len() + report.warnings.len());
    }

    #[test]
    fn clean_plan_is_executable() {
        let text = plan_with("```python\nprint('hello')\n```");
        let report = lint_plan(&text);
        assert!(report.is_executable, "{:?}", report.errors);
        assert_eq!(report.stats.subtasks_checked, 1);
        assert_eq!(report.stats.fragments_checked, 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn determinism() {
        let text = plan_with("Add to `config.py` the new block.");
        let a = serde_json::to_string(&lint_plan(&text)).unwrap();
        let b = serde_json::to_string(&lint_plan(&text)).unwrap();
        assert_eq!(a, b);
    }
}
