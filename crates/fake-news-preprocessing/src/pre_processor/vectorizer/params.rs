use std::ops::RangeInclusive;

use crate::PreprocessError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq, bincode::Encode, bincode::Decode)]
pub struct VectorizerParams {
    /// Inclusive range of n-gram sizes, in tokens.
    ngram_range: (usize, usize),
    /// Minimum document frequency for a term to enter the vocabulary.
    /// - If `min_df` is in (0.0, 1.0), it's a proportion of documents
    /// - If `min_df` >= 1.0, it's an absolute document count
    min_df: f64,
    /// Maximum document frequency for a term to enter the vocabulary.
    /// - If `max_df` is in (0.0, 1.0], it's a proportion of documents
    /// - If `max_df` > 1.0, it's an absolute document count
    max_df: f64,
    /// Keep only the `max_features` terms with the highest document frequency.
    max_features: Option<usize>,
    /// Apply sublinear tf scaling: replace term frequency `tf` with `1 + log(tf)`.
    /// This reduces the impact of terms that occur many times in a document.
    sublinear_tf: bool,
}

impl VectorizerParams {
    pub fn new(
        ngram_range: impl Into<RangeInclusive<usize>>,
        min_df: f64,
        max_df: f64,
        max_features: Option<usize>,
        sublinear_tf: bool,
    ) -> Self {
        let range = ngram_range.into();
        Self {
            ngram_range: (*range.start(), *range.end()),
            min_df,
            max_df,
            max_features,
            sublinear_tf,
        }
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    #[must_use]
    pub fn with_document_frequency_bounds(mut self, min_df: f64, max_df: f64) -> Self {
        self.min_df = min_df;
        self.max_df = max_df;
        self
    }

    /// Check the parameters before fitting. Values can come from
    /// configuration files, so this reports instead of panicking.
    pub fn validate(&self) -> Result<(), PreprocessError> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(PreprocessError::InvalidParams(format!(
                "ngram_range must satisfy 1 <= min <= max, got ({min_n}, {max_n})"
            )));
        }
        if !(self.min_df > 0.0) {
            return Err(PreprocessError::InvalidParams(format!(
                "min_df must be positive, got {}",
                self.min_df
            )));
        }
        if !(self.max_df > 0.0) {
            return Err(PreprocessError::InvalidParams(format!(
                "max_df must be positive, got {}",
                self.max_df
            )));
        }
        if self.max_features == Some(0) {
            return Err(PreprocessError::InvalidParams(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn ngram_range(&self) -> RangeInclusive<usize> {
        self.ngram_range.0..=self.ngram_range.1
    }

    #[must_use]
    pub fn min_df(&self) -> f64 {
        self.min_df
    }

    #[must_use]
    pub fn max_df(&self) -> f64 {
        self.max_df
    }

    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    #[must_use]
    pub fn sublinear_tf(&self) -> bool {
        self.sublinear_tf
    }

    /// Smallest document count accepted by `min_df` for a corpus of `num_documents`.
    #[must_use]
    pub fn min_document_count(&self, num_documents: usize) -> usize {
        if self.min_df < 1.0 {
            (self.min_df * num_documents as f64).ceil() as usize
        } else {
            self.min_df as usize
        }
    }

    /// Largest document count accepted by `max_df` for a corpus of `num_documents`.
    #[must_use]
    pub fn max_document_count(&self, num_documents: usize) -> usize {
        if self.max_df <= 1.0 {
            (self.max_df * num_documents as f64).floor() as usize
        } else {
            self.max_df as usize
        }
    }
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            ngram_range: (1, 2),
            min_df: 2.0,
            max_df: 0.95,
            max_features: Some(10_000),
            sublinear_tf: false,
        }
    }
}

impl From<((usize, usize), f64, f64, Option<usize>, bool)> for VectorizerParams {
    fn from(value: ((usize, usize), f64, f64, Option<usize>, bool)) -> Self {
        Self::new(value.0.0..=value.0.1, value.1, value.2, value.3, value.4)
    }
}
