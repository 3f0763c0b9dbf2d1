/// Surface statistics of a raw text, independent of the model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextStatistics {
    pub character_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    /// Mean characters per whitespace-separated word, rounded to 2 decimals.
    pub average_word_length: f64,
    /// Mean words per sentence, rounded to 2 decimals.
    pub average_sentence_length: f64,
}

impl TextStatistics {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let character_count = text.chars().count();
        let words = text.split_whitespace().collect::<Vec<_>>();
        let word_count = words.len();

        // A sentence is a run ending in terminal punctuation (or the end of the
        // text) that contains at least one alphanumeric character.
        let sentence_count = text
            .split(['.', '!', '?'])
            .filter(|segment| segment.chars().any(char::is_alphanumeric))
            .count();

        let average_word_length = if word_count == 0 {
            0.0
        } else {
            let total = words.iter().map(|w| w.chars().count()).sum::<usize>();
            round2(total as f64 / word_count as f64)
        };
        let average_sentence_length = if sentence_count == 0 {
            0.0
        } else {
            round2(word_count as f64 / sentence_count as f64)
        };

        Self {
            character_count,
            word_count,
            sentence_count,
            average_word_length,
            average_sentence_length,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
