use std::cmp::Reverse;

use ahash::HashMap;
use sprs::CsMat;
use tracing::debug;

use super::{
    ngrams::{self, document_frequencies},
    params::VectorizerParams,
    tokenizer::{TokenSequence, Tokenizer},
};
use crate::PreprocessError;

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct CountVectorizer {
    params: VectorizerParams,
    tokenizer: Tokenizer,
    /// Vocabulary mapping n-gram to feature index
    vocab: HashMap<String, usize>,
}

impl CountVectorizer {
    /// Fit on pre-tokenized documents and return their count matrix.
    ///
    /// N-grams are counted once and reused for both the vocabulary and the
    /// transform.
    pub fn fit_transform_tokenized(
        tokenized_texts: &[TokenSequence],
        tokenizer: Tokenizer,
        params: VectorizerParams,
    ) -> Result<(Self, CsMat<f64>), PreprocessError> {
        params.validate()?;
        if tokenized_texts.is_empty() {
            return Err(PreprocessError::EmptyCorpus);
        }

        debug!("Computing n-grams for all documents");
        let ngram_maps: Vec<_> = tokenized_texts
            .iter()
            .map(|tokens| ngrams::count_ngrams(tokens, params.ngram_range()))
            .collect();

        let vocab = build_vocabulary(&ngram_maps, &params)?;
        let vectorizer = Self {
            params,
            tokenizer,
            vocab,
        };

        let transformed = vectorizer.counts_to_matrix(&ngram_maps);
        debug!(
            vocab_size = vectorizer.num_features(),
            "CountVectorizer fitting complete"
        );
        Ok((vectorizer, transformed))
    }

    pub fn transform<T: AsRef<str> + Sync>(&self, texts: &[T]) -> CsMat<f64> {
        debug!(
            num_texts = texts.len(),
            "Transforming texts using CountVectorizer"
        );
        let tokenized_texts = self.tokenizer.preprocess_batch(texts);
        self.transform_tokenized(&tokenized_texts)
    }

    pub fn transform_tokenized(&self, tokenized_texts: &[TokenSequence]) -> CsMat<f64> {
        let ngram_maps: Vec<_> = tokenized_texts
            .iter()
            .map(|tokens| ngrams::count_ngrams(tokens, self.params.ngram_range()))
            .collect();
        self.counts_to_matrix(&ngram_maps)
    }

    /// Sorted `(feature index, count)` pairs for one document.
    /// Out-of-vocabulary n-grams are dropped.
    pub fn count_row(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        self.row_entries(&ngrams::count_ngrams(tokens, self.params.ngram_range()))
    }

    fn row_entries(&self, ngrams: &HashMap<String, usize>) -> Vec<(usize, f64)> {
        let mut row_entries = ngrams
            .iter()
            .filter_map(|(ngram, &count)| {
                self.vocab
                    .get(ngram)
                    .map(|&col_idx| (col_idx, count as f64))
            })
            .collect::<Vec<_>>();
        row_entries.sort_by_key(|(col_idx, _)| *col_idx);
        row_entries
    }

    fn counts_to_matrix(&self, ngram_maps: &[HashMap<String, usize>]) -> CsMat<f64> {
        // Build CSR format directly
        let mut indptr = Vec::with_capacity(ngram_maps.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(0);
        for ngrams in ngram_maps {
            for (col_idx, count) in self.row_entries(ngrams) {
                indices.push(col_idx);
                data.push(count);
            }
            indptr.push(indices.len());
        }

        debug!(
            non_zero_entries = data.len(),
            "Text transformation complete"
        );
        CsMat::new(
            (ngram_maps.len(), self.num_features()),
            indptr,
            indices,
            data,
        )
    }

    pub fn num_features(&self) -> usize {
        self.vocab.len()
    }

    /// The vocabulary as a mapping of n-gram to feature index.
    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocab
    }

    /// Vocabulary terms ordered by feature index.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms = vec![""; self.vocab.len()];
        for (term, &idx) in &self.vocab {
            if let Some(slot) = terms.get_mut(idx) {
                *slot = term.as_str();
            }
        }
        terms
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Check that feature indices are exactly `0..num_features`.
    pub(crate) fn check_indices(&self) -> Result<(), String> {
        let mut seen = vec![false; self.vocab.len()];
        for (term, &idx) in &self.vocab {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => return Err(format!("feature index {idx} is assigned twice")),
                None => return Err(format!("term {term:?} has out-of-range index {idx}")),
            }
        }
        Ok(())
    }
}

/// Select the vocabulary from per-document n-gram counts.
///
/// Terms outside the `[min_df, max_df]` document-frequency window are pruned,
/// then the `max_features` most frequent terms are kept. At the truncation
/// boundary the lexicographically smaller term wins. Kept terms are indexed
/// in lexicographic order, so refitting on the same corpus reproduces the
/// same vocabulary.
fn build_vocabulary(
    ngram_maps: &[HashMap<String, usize>],
    params: &VectorizerParams,
) -> Result<HashMap<String, usize>, PreprocessError> {
    let num_documents = ngram_maps.len();
    let vocab_df = document_frequencies(ngram_maps);
    let vocab_size = vocab_df.len();

    let min_count = params.min_document_count(num_documents);
    let max_count = params.max_document_count(num_documents);
    debug!(min_count, max_count, "Applying document frequency filtering");

    let mut candidates = vocab_df
        .into_iter()
        .filter(|(_, df)| (min_count..=max_count).contains(df))
        .collect::<Vec<_>>();
    debug!(
        original_size = vocab_size,
        filtered_size = candidates.len(),
        "Vocabulary filtered by document frequency"
    );

    if let Some(max_features) = params.max_features() {
        if candidates.len() > max_features {
            candidates.sort_by(|(a_term, a_df), (b_term, b_df)| {
                Reverse(a_df).cmp(&Reverse(b_df)).then_with(|| a_term.cmp(b_term))
            });
            candidates.truncate(max_features);
            debug!(max_features, "Vocabulary truncated to most frequent terms");
        }
    }

    if candidates.is_empty() {
        return Err(PreprocessError::EmptyVocabulary {
            num_documents,
            min_df: params.min_df(),
            max_df: params.max_df(),
        });
    }

    let mut sorted_terms = candidates
        .into_iter()
        .map(|(term, _)| term)
        .collect::<Vec<_>>();
    sorted_terms.sort();
    Ok(sorted_terms
        .into_iter()
        .enumerate()
        .map(|(idx, term)| (term, idx))
        .collect())
}
