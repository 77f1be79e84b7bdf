use std::path::PathBuf;

use thiserror::Error;

/// Why a classifier could not produce a verdict.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The model artifact is missing or unreadable.
    #[error("Failed to load classifier model {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// The model artifact is readable but malformed.
    #[error("Malformed classifier model at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// The input vector doesn't fit the model.
    #[error("Classifier expects {expected} features, got {got}")]
    Dimension { expected: usize, got: usize },
}

impl ClassifierError {
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}
