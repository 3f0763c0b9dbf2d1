mod count_vectorizer;
mod ngrams;
mod params;
mod stopwords;
mod tfidf_vectorizer;
mod tokenizer;

pub use params::VectorizerParams;
pub use stopwords::{ENGLISH_STOP_WORDS, is_stop_word};
pub use tfidf_vectorizer::{FeatureVector, TfidfVectorizer};
pub use tokenizer::{StemmerKind, TokenSequence, Tokenizer, TokenizerParams};
