use std::path::PathBuf;

use fake_news_preprocessing::{ArtifactError, PreprocessError};
use thiserror::Error;

pub type Result<T, E = FakeNewsError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FakeNewsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("invalid training data at row {row}: {message}")]
    DataRow { row: usize, message: String },

    #[error("invalid training data: {0}")]
    Data(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("training cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error category reported to callers of the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ModelUnavailable,
    Internal,
}

impl FakeNewsError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_)
            | Self::DataRow { .. }
            | Self::Data(_)
            | Self::Csv(_)
            | Self::Preprocess(PreprocessError::EmptyCorpus | PreprocessError::EmptyVocabulary { .. }) => {
                ErrorKind::InvalidInput
            }
            Self::ModelUnavailable(_)
            | Self::Artifact(_) => ErrorKind::ModelUnavailable,
            _ => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FakeNewsError::invalid_input("too short").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            FakeNewsError::from(ArtifactError::Truncated { len: 3 }).kind(),
            ErrorKind::ModelUnavailable
        );
        assert_eq!(
            FakeNewsError::from(PreprocessError::EmptyCorpus).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            FakeNewsError::Cancelled { iterations: 3 }.kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_kind_serialises_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ModelUnavailable).unwrap();
        assert_eq!(json, "\"model_unavailable\"");
    }

    #[test]
    fn test_data_row_message() {
        let err = FakeNewsError::DataRow {
            row: 7,
            message: "unknown label \"maybe\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid training data at row 7: unknown label \"maybe\""
        );
    }
}
