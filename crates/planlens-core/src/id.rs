use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlanlensError;

/// Dotted `phase.task.subtask` triple, e.g. `2.1.3`.
///
/// Globally unique within a plan; textual order in the document defines
/// the default execution sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SubtaskId {
    pub phase: u32,
    pub task: u32,
    pub subtask: u32,
}

impl SubtaskId {
    pub fn new(phase: u32, task: u32, subtask: u32) -> Self {
        SubtaskId {
            phase,
            task,
            subtask,
        }
    }
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.phase, self.task, self.subtask)
    }
}

impl FromStr for SubtaskId {
    type Err = PlanlensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let phase = parts.next().and_then(|p| p.parse().ok());
        let task = parts.next().and_then(|p| p.parse().ok());
        let subtask = parts.next().and_then(|p| p.parse().ok());
        match (phase, task, subtask, parts.next()) {
            (Some(phase), Some(task), Some(subtask), None) => Ok(SubtaskId {
                phase,
                task,
                subtask,
            }),
            _ => Err(PlanlensError::InvalidId(s.to_string())),
        }
    }
}

impl From<SubtaskId> for String {
    fn from(id: SubtaskId) -> String {
        id.to_string()
    }
}

impl TryFrom<String> for SubtaskId {
    type Error = PlanlensError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
