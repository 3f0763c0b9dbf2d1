use std::ops::RangeInclusive;

use ahash::HashMap;
use dashmap::DashMap;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

/// Count the n-grams of `tokens` for every size in `ngram_range`.
///
/// An n-gram key is its tokens joined by a single space.
pub fn count_ngrams(tokens: &[String], ngram_range: RangeInclusive<usize>) -> HashMap<String, usize> {
    let mut ngram_counter = HashMap::default();

    for n in ngram_range {
        if n == 0 {
            continue;
        }
        for window in tokens.windows(n) {
            *ngram_counter.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    ngram_counter
}

/// Number of documents each n-gram appears in.
pub fn document_frequencies(
    ngram_maps: &[HashMap<String, usize>],
) -> DashMap<String, usize, ahash::RandomState> {
    let vocab_df = DashMap::with_hasher(ahash::RandomState::default());

    ngram_maps.par_iter().progress().for_each(|ngrams| {
        for ngram in ngrams.keys() {
            vocab_df
                .entry(ngram.clone())
                .and_modify(|df| *df += 1)
                .or_insert(1usize);
        }
    });
    vocab_df
}
