use std::path::Path;

use ahash::HashMap;
use sprs::{CsMat, CsVec};
use tracing::debug;

use super::{
    count_vectorizer::CountVectorizer,
    params::VectorizerParams,
    tokenizer::{TokenSequence, Tokenizer},
};
use crate::{
    ArtifactError, PreprocessError,
    artifact::{self, ArtifactKind},
};

/// Sparse TF-IDF representation of one document.
pub type FeatureVector = CsVec<f64>;

/// TF-IDF vectorizer over word n-grams.
///
/// The fitted vocabulary and IDF weights never change after fitting, so one
/// instance can be shared across threads for inference.
#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct TfidfVectorizer {
    count_vectorizer: CountVectorizer,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit<T: AsRef<str> + Sync>(
        texts: &[T],
        tokenizer: Tokenizer,
        params: VectorizerParams,
    ) -> Result<Self, PreprocessError> {
        Self::fit_transform(texts, tokenizer, params).map(|(this, _)| this)
    }

    /// Fit on `texts` and return the TF-IDF matrix of the same texts.
    pub fn fit_transform<T: AsRef<str> + Sync>(
        texts: &[T],
        tokenizer: Tokenizer,
        params: VectorizerParams,
    ) -> Result<(Self, CsMat<f64>), PreprocessError> {
        debug!(num_texts = texts.len(), "Fitting TfidfVectorizer");
        let tokenized_texts = tokenizer.preprocess_batch(texts);
        Self::fit_tokenized(&tokenized_texts, tokenizer, params)
    }

    /// Fit on documents already run through `tokenizer`.
    pub fn fit_tokenized(
        tokenized_texts: &[TokenSequence],
        tokenizer: Tokenizer,
        params: VectorizerParams,
    ) -> Result<(Self, CsMat<f64>), PreprocessError> {
        let (count_vectorizer, tf_matrix) =
            CountVectorizer::fit_transform_tokenized(tokenized_texts, tokenizer, params)?;
        debug!("Calculating IDF values");

        // Calculate IDF: log((n_docs + 1) / (df + 1)) + 1
        let n_docs = tokenized_texts.len() as f64;
        let mut df = vec![0usize; count_vectorizer.num_features()];
        for row_vec in tf_matrix.outer_iterator() {
            for (col_idx, _) in row_vec.iter() {
                df[col_idx] += 1;
            }
        }
        let idf = df
            .iter()
            .map(|&doc_freq| ((n_docs + 1.0) / (doc_freq as f64 + 1.0)).ln() + 1.0)
            .collect();
        debug!("IDF calculation complete");

        let vectorizer = Self {
            count_vectorizer,
            idf,
        };
        let transformed = vectorizer.weight_matrix(tf_matrix);
        Ok((vectorizer, transformed))
    }

    pub fn transform<T: AsRef<str> + Sync>(&self, texts: &[T]) -> CsMat<f64> {
        debug!(
            num_texts = texts.len(),
            "Transforming texts using TfidfVectorizer"
        );
        self.weight_matrix(self.count_vectorizer.transform(texts))
    }

    pub fn transform_tokenized(&self, tokenized_texts: &[TokenSequence]) -> CsMat<f64> {
        self.weight_matrix(self.count_vectorizer.transform_tokenized(tokenized_texts))
    }

    /// Vectorize a single token sequence.
    ///
    /// Unknown n-grams are dropped; a document with no known n-gram maps to
    /// the zero vector.
    pub fn transform_tokens(&self, tokens: &[String]) -> FeatureVector {
        let mut entries = self.count_vectorizer.count_row(tokens);
        self.weight_row(entries.iter_mut().map(|(idx, val)| (*idx, val)));
        let (indices, data) = entries.into_iter().unzip();
        CsVec::new(self.num_features(), indices, data)
    }

    /// Normalize, tokenize and vectorize one raw text.
    pub fn transform_text(&self, raw: &str) -> FeatureVector {
        self.transform_tokens(&self.count_vectorizer.tokenizer().preprocess(raw))
    }

    fn weight_matrix(&self, mut tf_matrix: CsMat<f64>) -> CsMat<f64> {
        for mut row_vec in tf_matrix.outer_iterator_mut() {
            self.weight_row(row_vec.iter_mut());
        }
        tf_matrix
    }

    /// Apply tf scaling and IDF to one row in place, then L2-normalize it.
    fn weight_row<'a>(&self, row: impl Iterator<Item = (usize, &'a mut f64)>) {
        let sublinear = self.params().sublinear_tf();
        let mut values = Vec::new();
        for (col_idx, val) in row {
            if sublinear {
                *val = 1.0 + val.ln();
            }
            *val *= self.idf[col_idx];
            values.push(val);
        }

        let norm = values.iter().map(|v| **v * **v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for val in values {
                *val /= norm;
            }
        }
    }

    pub fn num_features(&self) -> usize {
        self.count_vectorizer.num_features()
    }

    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        self.count_vectorizer.vocabulary()
    }

    /// Vocabulary terms ordered by feature index.
    pub fn terms(&self) -> Vec<&str> {
        self.count_vectorizer.terms()
    }

    /// Per-feature IDF weights, indexed like the vocabulary.
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn params(&self) -> &VectorizerParams {
        self.count_vectorizer.params()
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        self.count_vectorizer.tokenizer()
    }

    /// CRC32 of the ordered vocabulary terms.
    ///
    /// Two vectorizers with equal fingerprints map text to the same feature
    /// indices, which is what a trained classifier depends on.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for (i, term) in self.terms().iter().enumerate() {
            if i > 0 {
                hasher.update(b"\n");
            }
            hasher.update(term.as_bytes());
        }
        hasher.finalize()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        artifact::encode(ArtifactKind::Vectorizer, self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let vectorizer: Self = artifact::decode(ArtifactKind::Vectorizer, bytes)?;
        vectorizer.check_consistency()?;
        Ok(vectorizer)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        artifact::write_atomic(path, &self.to_bytes()?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let vectorizer = Self::from_bytes(&artifact::read(path)?)?;
        debug!(
            path = %path.display(),
            num_features = vectorizer.num_features(),
            "Loaded TfidfVectorizer"
        );
        Ok(vectorizer)
    }

    fn check_consistency(&self) -> Result<(), ArtifactError> {
        if self.idf.len() != self.num_features() {
            return Err(ArtifactError::Inconsistent(format!(
                "{} IDF weights for {} features",
                self.idf.len(),
                self.num_features()
            )));
        }
        if let Some(bad) = self.idf.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(ArtifactError::Inconsistent(format!(
                "invalid IDF weight {bad}"
            )));
        }
        self.count_vectorizer
            .check_indices()
            .map_err(ArtifactError::Inconsistent)
    }
}
