use std::borrow::Cow;

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator, ProgressStyle};
use rayon::prelude::*;
use rust_stemmers::{Algorithm, Stemmer};
use tracing::debug;

use super::stopwords::is_stop_word;
use crate::pre_processor::normalizer::{NormalizerOptions, normalize_with};

/// Ordered, filtered and stemmed tokens of one document.
pub type TokenSequence = Vec<String>;

/// Minimum number of texts to consider parallelization
const MIN_TEXTS_FOR_PARALLEL: usize = 100;

/// Minimum total character count to consider parallelization
const MIN_CHARS_FOR_PARALLEL: usize = 10_000;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum StemmerKind {
    None,
    /// Snowball English (Porter2).
    #[default]
    English,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TokenizerParams {
    /// Tokens shorter than this many characters are dropped.
    pub min_token_len: usize,
    pub remove_stopwords: bool,
    /// Drop tokens made only of digits.
    pub drop_numeric: bool,
    pub stemmer: StemmerKind,
}

impl Default for TokenizerParams {
    fn default() -> Self {
        Self {
            min_token_len: 2,
            remove_stopwords: true,
            drop_numeric: true,
            stemmer: StemmerKind::English,
        }
    }
}

/// Normalizes raw text and splits it into filtered, stemmed tokens.
///
/// Holds only plain settings so it can be persisted alongside the vocabulary;
/// the same tokenizer must run at training and at inference time.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Tokenizer {
    normalizer: NormalizerOptions,
    params: TokenizerParams,
}

impl Tokenizer {
    #[must_use]
    pub fn new(normalizer: NormalizerOptions, params: TokenizerParams) -> Self {
        Self { normalizer, params }
    }

    #[must_use]
    pub fn normalizer(&self) -> NormalizerOptions {
        self.normalizer
    }

    #[must_use]
    pub fn params(&self) -> TokenizerParams {
        self.params
    }

    fn stemmer(&self) -> Option<Stemmer> {
        match self.params.stemmer {
            StemmerKind::None => None,
            StemmerKind::English => Some(Stemmer::create(Algorithm::English)),
        }
    }

    /// Split already normalized text into tokens.
    ///
    /// Empty input yields an empty sequence.
    #[must_use]
    pub fn tokenize(&self, normalized: &str) -> TokenSequence {
        let stemmer = self.stemmer();
        self.tokenize_with(normalized, stemmer.as_ref())
    }

    fn tokenize_with(&self, normalized: &str, stemmer: Option<&Stemmer>) -> TokenSequence {
        normalized
            .split_whitespace()
            // Punctuation survives normalization only when it was asked for.
            .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
            .filter(|token| token.chars().count() >= self.params.min_token_len)
            .filter(|token| !(self.params.drop_numeric && token.chars().all(|c| c.is_ascii_digit())))
            .filter(|token| !(self.params.remove_stopwords && is_stop_word(token)))
            .map(|token| match stemmer {
                Some(stemmer) => stemmer.stem(token).into_owned(),
                None => token.to_string(),
            })
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Normalize then tokenize a single raw text.
    #[must_use]
    pub fn preprocess(&self, raw: &str) -> TokenSequence {
        self.tokenize(&normalize_with(raw, self.normalizer))
    }

    /// Normalize then tokenize many raw texts, in parallel for large workloads.
    pub fn preprocess_batch<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Vec<TokenSequence> {
        if should_use_parallel(texts) {
            self.preprocess_texts_par(texts)
        } else {
            self.preprocess_texts(texts)
        }
    }

    fn preprocess_texts_par<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Vec<TokenSequence> {
        debug!(num_texts = texts.len(), "Using parallel tokenization");
        let pb = progress_bar_setup(texts.len(), "Tokenizing texts in parallel");
        let result = texts
            .par_iter()
            .progress_with(pb.clone())
            .map_init(
                || self.stemmer(),
                |stemmer, text| {
                    self.tokenize_with(
                        &normalize_with(text.as_ref(), self.normalizer),
                        stemmer.as_ref(),
                    )
                },
            )
            .collect();
        pb.finish_with_message("Parallel tokenization complete");
        result
    }

    fn preprocess_texts<T: AsRef<str>>(&self, texts: &[T]) -> Vec<TokenSequence> {
        debug!(num_texts = texts.len(), "Using sequential tokenization");
        let stemmer = self.stemmer();
        let pb = progress_bar_setup(texts.len(), "Tokenizing texts");

        let result = texts
            .iter()
            .progress_with(pb.clone())
            .map(|text| {
                self.tokenize_with(
                    &normalize_with(text.as_ref(), self.normalizer),
                    stemmer.as_ref(),
                )
            })
            .collect();
        pb.finish_with_message("Tokenization complete");
        result
    }
}

fn progress_bar_setup(len: usize, message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("#>-"));
    pb.set_style(style);
    pb.set_message(message);
    pb
}

/// Determine if parallel processing should be used based on workload characteristics.
///
/// Parallelization is beneficial when:
/// - There are many texts (>= 100), OR
/// - The total character count is large (>= 10,000 chars)
#[inline]
fn should_use_parallel<T: AsRef<str>>(texts: &[T]) -> bool {
    let num_texts = texts.len();

    if num_texts >= MIN_TEXTS_FOR_PARALLEL {
        return true;
    }

    // Estimate from the first 20 texts when there are more
    let total_chars: usize = if num_texts > 20 {
        let sample_chars: usize = texts.iter().take(20).map(|s| s.as_ref().len()).sum();
        (sample_chars * num_texts) / 20
    } else {
        texts.iter().map(|s| s.as_ref().len()).sum()
    };

    total_chars >= MIN_CHARS_FOR_PARALLEL
}
