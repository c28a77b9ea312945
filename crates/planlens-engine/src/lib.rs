//! Analysis engine over generated development-plan documents.
//!
//! Three consumers share one tolerant text scan: the structural
//! validator, the executability linter, and the progress tracker. Each
//! public operation is a pure function of the plan text; nothing is
//! cached between calls.

pub mod executability;
pub mod parser;
pub mod progress;
pub mod update;
pub mod validate;

pub use executability::lint_plan;
pub use parser::parse_plan;
pub use progress::{find_subtask, track_progress};
pub use update::mark_complete;
pub use validate::validate_plan;
