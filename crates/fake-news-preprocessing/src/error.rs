use std::path::PathBuf;

use thiserror::Error;

use crate::artifact::ArtifactKind;

/// Errors raised while reading or writing a persisted artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact is truncated ({len} bytes)")]
    Truncated { len: usize },

    #[error("not a fake news detector artifact (magic {found:?})")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("expected a {expected} artifact, found kind tag {found}")]
    WrongKind { expected: ArtifactKind, found: u8 },

    #[error("artifact checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("failed to encode artifact: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode artifact: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("artifact contents are inconsistent: {0}")]
    Inconsistent(String),
}

/// Errors raised by the vectorizer.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot fit a vectorizer on an empty corpus")]
    EmptyCorpus,

    #[error(
        "no terms remain after pruning {num_documents} documents (min_df={min_df}, max_df={max_df})"
    )]
    EmptyVocabulary {
        num_documents: usize,
        min_df: f64,
        max_df: f64,
    },

    #[error("invalid vectorizer parameters: {0}")]
    InvalidParams(String),
}
