//! Text pre-processing: normalization, tokenization, text statistics and
//! TF-IDF vectorization with word-level n-grams.

mod normalizer;
mod text_stats;
mod vectorizer;

pub use normalizer::{NormalizerOptions, normalize, normalize_with};
pub use text_stats::TextStatistics;
pub use vectorizer::{
    ENGLISH_STOP_WORDS, FeatureVector, StemmerKind, TfidfVectorizer, TokenSequence, Tokenizer,
    TokenizerParams, VectorizerParams, is_stop_word,
};
