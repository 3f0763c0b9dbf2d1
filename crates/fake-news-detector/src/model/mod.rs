use std::path::{Path, PathBuf};

use fake_news_preprocessing::{
    ArtifactError,
    artifact::{self, ARTIFACT_FORMAT_VERSION, ArtifactKind},
    pre_processor::TfidfVectorizer,
};
use sprs::CsVecView;
use tracing::info;

use crate::error::Result;

mod loader;
mod logistic;

pub use loader::ModelLoader;
pub use logistic::{FitOptions, FitSummary, LogisticRegression, sigmoid, sparse_dot};

/// File name of the persisted vectorizer inside a model directory.
pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.bin";
/// File name of the persisted classifier inside a model directory.
pub const MODEL_FILE: &str = "fake_news_model.bin";
/// File name of the evaluation report written next to the artifacts.
pub const REPORT_FILE: &str = "training_report.json";

/// A trained binary classifier. Positive scores lean towards "fake".
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub enum Classifier {
    LogisticRegression(LogisticRegression),
}

impl Classifier {
    #[must_use]
    pub fn decision_function(&self, features: &CsVecView<'_, f64>) -> f64 {
        match self {
            Self::LogisticRegression(model) => model.decision_function(features),
        }
    }

    /// Probability that the features belong to a fake article.
    #[must_use]
    pub fn fake_probability(&self, features: &CsVecView<'_, f64>) -> f64 {
        sigmoid(self.decision_function(features))
    }

    #[must_use]
    pub fn num_features(&self) -> usize {
        match self {
            Self::LogisticRegression(model) => model.num_features(),
        }
    }

    #[must_use]
    pub fn model_type(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
        }
    }
}

/// Persisted classifier together with the shape of the vocabulary it was
/// trained against.
#[derive(Debug, Clone, bincode::Encode, bincode::Decode)]
struct ClassifierArtifact {
    classifier: Classifier,
    vocabulary_size: u64,
    vocabulary_fingerprint: u32,
}

/// A vectorizer and classifier that are known to agree on the feature space.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    vectorizer: TfidfVectorizer,
    classifier: Classifier,
    model_dir: Option<PathBuf>,
}

impl LoadedModel {
    /// Pair a vectorizer with a classifier, checking that their dimensions match.
    pub fn new(vectorizer: TfidfVectorizer, classifier: Classifier) -> Result<Self> {
        check_shape(vectorizer.num_features(), classifier.num_features())?;
        Ok(Self {
            vectorizer,
            classifier,
            model_dir: None,
        })
    }

    /// Load both artifacts from `dir`.
    ///
    /// Fails if either file is missing or damaged, or if the classifier was
    /// trained against a different vocabulary.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let vectorizer = TfidfVectorizer::load(dir.join(VECTORIZER_FILE))?;
        let stored: ClassifierArtifact =
            artifact::decode(ArtifactKind::Classifier, &artifact::read(dir.join(MODEL_FILE))?)?;

        let num_features = vectorizer.num_features();
        if stored.vocabulary_size != num_features as u64 {
            return Err(ArtifactError::Inconsistent(format!(
                "classifier was trained on {} features but the vectorizer has {num_features}",
                stored.vocabulary_size
            ))
            .into());
        }
        if stored.vocabulary_fingerprint != vectorizer.fingerprint() {
            return Err(ArtifactError::Inconsistent(format!(
                "vocabulary fingerprint mismatch (classifier {:#010x}, vectorizer {:#010x})",
                stored.vocabulary_fingerprint,
                vectorizer.fingerprint()
            ))
            .into());
        }
        check_shape(num_features, stored.classifier.num_features())?;

        info!(
            model_dir = %dir.display(),
            model_type = stored.classifier.model_type(),
            num_features,
            "Loaded model artifacts"
        );
        Ok(Self {
            vectorizer,
            classifier: stored.classifier,
            model_dir: Some(dir.to_path_buf()),
        })
    }

    /// Write both artifacts into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        self.vectorizer.save(dir.join(VECTORIZER_FILE))?;
        let stored = ClassifierArtifact {
            classifier: self.classifier.clone(),
            vocabulary_size: self.vectorizer.num_features() as u64,
            vocabulary_fingerprint: self.vectorizer.fingerprint(),
        };
        artifact::write_atomic(
            dir.join(MODEL_FILE),
            &artifact::encode(ArtifactKind::Classifier, &stored)?,
        )?;
        Ok(())
    }

    #[must_use]
    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    #[must_use]
    pub fn model_dir(&self) -> Option<&Path> {
        self.model_dir.as_deref()
    }

    #[must_use]
    pub fn info(&self) -> ModelInfo {
        let ngram_range = self.vectorizer.params().ngram_range();
        ModelInfo {
            model_type: self.classifier.model_type().to_string(),
            vocabulary_size: self.vectorizer.num_features(),
            num_features: self.classifier.num_features(),
            ngram_range: (*ngram_range.start(), *ngram_range.end()),
            artifact_format_version: ARTIFACT_FORMAT_VERSION,
            model_dir: self.model_dir.clone(),
        }
    }
}

fn check_shape(vocabulary_size: usize, classifier_features: usize) -> Result<()> {
    if vocabulary_size == classifier_features {
        Ok(())
    } else {
        Err(ArtifactError::Inconsistent(format!(
            "classifier expects {classifier_features} features but the vocabulary has {vocabulary_size}"
        ))
        .into())
    }
}

/// Description of the loaded model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub vocabulary_size: usize,
    pub num_features: usize,
    pub ngram_range: (usize, usize),
    pub artifact_format_version: u16,
    pub model_dir: Option<PathBuf>,
}

#[cfg(test)]
pub(crate) mod tests {
    use fake_news_preprocessing::pre_processor::{Tokenizer, VectorizerParams};

    use super::*;
    use crate::error::FakeNewsError;

    /// A small model with alternating feature weights.
    pub(crate) fn tiny_model() -> LoadedModel {
        let vectorizer = TfidfVectorizer::fit(
            &[
                "shocking miracle cure revealed",
                "researchers publish peer reviewed study",
            ],
            Tokenizer::default(),
            VectorizerParams::new(1..=1, 1.0, 1.0, None, false),
        )
        .unwrap();
        let weights = (0..vectorizer.num_features())
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let classifier = Classifier::LogisticRegression(LogisticRegression::new(weights, 0.1));
        LoadedModel::new(vectorizer, classifier).unwrap()
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let model = tiny_model();
        model.save(dir.path()).unwrap();

        let loaded = LoadedModel::load(dir.path()).unwrap();
        assert_eq!(loaded.classifier(), model.classifier());
        assert_eq!(loaded.vectorizer().terms(), model.vectorizer().terms());
        assert_eq!(loaded.model_dir(), Some(dir.path()));

        let info = loaded.info();
        assert_eq!(info.model_type, "logistic_regression");
        assert_eq!(info.vocabulary_size, model.vectorizer().num_features());
        assert_eq!(info.ngram_range, (1, 1));
        assert_eq!(info.artifact_format_version, ARTIFACT_FORMAT_VERSION);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let model = tiny_model();
        let wrong = Classifier::LogisticRegression(LogisticRegression::new(vec![0.0; 2], 0.0));
        let err = LoadedModel::new(model.vectorizer().clone(), wrong).unwrap_err();
        assert!(matches!(
            err,
            FakeNewsError::Artifact(ArtifactError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_mismatched_vectorizer_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        tiny_model().save(dir.path()).unwrap();

        // Same vocabulary size, different terms.
        let size = tiny_model().vectorizer().num_features();
        let other = TfidfVectorizer::fit(
            &[
                "alpha bravo charlie delta",
                "echo foxtrot golf hotel",
                "india juliet kilo lima mike",
            ],
            Tokenizer::default(),
            VectorizerParams::new(1..=1, 1.0, 1.0, Some(size), false),
        )
        .unwrap();
        assert_eq!(other.num_features(), size);
        other.save(dir.path().join(VECTORIZER_FILE)).unwrap();

        let err = LoadedModel::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            FakeNewsError::Artifact(ArtifactError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_missing_artifacts_are_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedModel::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_swapped_artifacts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        tiny_model().save(dir.path()).unwrap();
        std::fs::copy(dir.path().join(MODEL_FILE), dir.path().join(VECTORIZER_FILE)).unwrap();
        let err = LoadedModel::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            FakeNewsError::Artifact(ArtifactError::WrongKind { .. })
        ));
    }
}
