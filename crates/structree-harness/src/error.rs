use std::path::PathBuf;

use structree_tree::GrowthError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario file not found: {path}")]
    MissingScenario { path: PathBuf },

    #[error("invalid scenario: {message}")]
    InvalidScenario { message: String },

    #[error("growth engine failed at {context}: {source}")]
    Growth {
        context: String,
        #[source]
        source: GrowthError,
    },

    #[error("golden checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to install log subscriber: {message}")]
    Logging { message: String },
}

impl HarnessError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingScenario { .. } | Self::InvalidScenario { .. } => 2,
            Self::Growth { .. } => 3,
            Self::ChecksumMismatch { .. } => 4,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn growth(context: impl Into<String>, source: GrowthError) -> Self {
        Self::Growth {
            context: context.into(),
            source,
        }
    }
}
