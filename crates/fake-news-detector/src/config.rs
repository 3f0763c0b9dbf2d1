use std::path::{Path, PathBuf};

use fake_news_preprocessing::pre_processor::{NormalizerOptions, TokenizerParams, VectorizerParams};
use tracing::debug;

use crate::{
    error::{FakeNewsError, Result},
    train::TrainingParams,
};

/// Environment variable prefix, e.g. `FAKE_NEWS__MODEL_DIR`.
pub const ENV_PREFIX: &str = "FAKE_NEWS";
/// Default settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fake-news.toml";

/// Runtime settings.
///
/// Sources, lowest priority first: built-in defaults, an optional TOML file,
/// then `FAKE_NEWS__*` environment variables with `__` separating nested
/// keys (`FAKE_NEWS__TRAINING__MAX_ITER=500`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model_dir: PathBuf,
    pub min_text_length: usize,
    pub max_text_length: usize,
    pub normalizer: NormalizerOptions,
    pub tokenizer: TokenizerParams,
    pub vectorizer: VectorizerParams,
    pub training: TrainingParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("model_artifacts"),
            min_text_length: 10,
            max_text_length: 10_000,
            normalizer: NormalizerOptions::default(),
            tokenizer: TokenizerParams::default(),
            vectorizer: VectorizerParams::default(),
            training: TrainingParams::default(),
        }
    }
}

impl Settings {
    /// Load settings from `file` (or [`DEFAULT_CONFIG_FILE`] if present) and
    /// the environment.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?;
        if settings.min_text_length > settings.max_text_length {
            return Err(FakeNewsError::invalid_input(format!(
                "min_text_length ({}) must not exceed max_text_length ({})",
                settings.min_text_length, settings.max_text_length
            )));
        }
        debug!(?settings, "Loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model_dir, PathBuf::from("model_artifacts"));
        assert_eq!(settings.min_text_length, 10);
        assert_eq!(settings.max_text_length, 10_000);
        assert_eq!(settings.vectorizer.max_features(), Some(10_000));
        assert_eq!(settings.training.test_size, 0.2);
        assert_eq!(settings.training.random_state, 42);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "model_dir = \"artifacts/v2\"\nmax_text_length = 500\n\n[training]\nmax_iter = 50\n\n[tokenizer]\nstemmer = \"none\"\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.model_dir, PathBuf::from("artifacts/v2"));
        assert_eq!(settings.max_text_length, 500);
        assert_eq!(settings.min_text_length, 10);
        assert_eq!(settings.training.max_iter, 50);
        assert_eq!(settings.training.random_state, 42);
        assert_eq!(
            settings.tokenizer.stemmer,
            fake_news_preprocessing::pre_processor::StemmerKind::None
        );
    }

    #[test]
    fn test_inverted_text_limits_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "min_text_length = 500\nmax_text_length = 100\n").unwrap();

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, FakeNewsError::InvalidInput(_)));
        assert_eq!(
            err.to_string(),
            "invalid input: min_text_length (500) must not exceed max_text_length (100)"
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
