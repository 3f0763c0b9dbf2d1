//! Pre-processing for the fake news detector.
//!
//! Turns raw article text into TF-IDF feature vectors: normalization, word
//! tokenization with stopword removal and stemming, n-gram counting and the
//! fitted TF-IDF vocabulary. Also owns the versioned artifact envelope used to
//! persist fitted components.

pub mod artifact;
mod error;
pub mod pre_processor;

pub use error::{ArtifactError, PreprocessError};
