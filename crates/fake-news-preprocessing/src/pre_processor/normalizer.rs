use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid HTML tag pattern"));

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z][a-z0-9+.\-]*://\S*|\bwww\.\S+").expect("valid URL pattern")
});

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+").expect("valid e-mail pattern"));

static MENTION_OR_HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#]\w+").expect("valid mention pattern"));

/// Punctuation retained when [`NormalizerOptions::keep_punctuation`] is set.
const KEPT_PUNCTUATION: &[char] = &['.', '!', '?', ',', '\''];

/// Options for [`normalize_with`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct NormalizerOptions {
    /// Keep basic sentence punctuation (`. ! ? , '`) instead of stripping it.
    pub keep_punctuation: bool,
}

/// Normalize raw article text with the default options.
///
/// Strips HTML tags, URLs, e-mail addresses, @mentions and #hashtags, folds
/// case, removes everything outside `[a-z0-9]` and whitespace, and collapses
/// whitespace runs to single spaces. Total and idempotent.
#[must_use]
pub fn normalize(raw: &str) -> String {
    normalize_with(raw, NormalizerOptions::default())
}

/// Normalize raw article text.
///
/// The cleaning pass is repeated until it reaches a fixpoint: removing a
/// character can bring two fragments together into something that looks like
/// a URL again, and the output must not change when normalized twice.
#[must_use]
pub fn normalize_with(raw: &str, options: NormalizerOptions) -> String {
    let mut current = clean(raw, options);
    loop {
        let next = clean(&current, options);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean(text: &str, options: NormalizerOptions) -> String {
    let text = HTML_TAG.replace_all(text, " ");
    let text = URL.replace_all(&text, " ");
    let text = EMAIL.replace_all(&text, " ");
    let text = MENTION_OR_HASHTAG.replace_all(&text, " ");

    let lowered = text.to_lowercase();
    let kept = lowered
        .chars()
        .filter(|&c| {
            c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || c.is_whitespace()
                || (options.keep_punctuation && KEPT_PUNCTUATION.contains(&c))
        })
        .collect::<String>();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
