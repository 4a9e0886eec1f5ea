use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Missing artifact {}", .path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("Invalid artifact {}: {reason}", .path.display())]
    ArtifactInvalid { path: PathBuf, reason: String },

    #[error("Feature resolution failed: {0}")]
    Resolution(String),

    #[error("Model returned {value}, which is not a probability")]
    InvalidPrediction { value: f64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScoreError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn artifact_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArtifactInvalid {
            path:   path.into(),
            reason: reason.into(),
        }
    }

    /// True for missing or unreadable artifacts.
    pub fn is_artifact_error(&self) -> bool {
        matches!(
            self,
            Self::ArtifactMissing { .. } | Self::ArtifactInvalid { .. }
        )
    }
}

pub type ScoreResult<T> = Result<T, ScoreError>;
