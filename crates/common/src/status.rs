//! File processing status as shown on a row's badge

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Unprocessed,
    Processed,
}

impl FileStatus {
    /// Literal text the badge carries
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Unprocessed => "Unprocessed",
            FileStatus::Processed => "Processed",
        }
    }

    /// Parse badge text. "Unprocessed" has to be checked first: it contains
    /// "processed" once case is ignored.
    pub fn from_badge(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("unprocessed") {
            Some(FileStatus::Unprocessed)
        } else if lower.contains("processed") {
            Some(FileStatus::Processed)
        } else {
            None
        }
    }

    /// Processing only moves forward
    pub fn can_transition(from: FileStatus, to: FileStatus) -> bool {
        !matches!((from, to), (FileStatus::Processed, FileStatus::Unprocessed))
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
