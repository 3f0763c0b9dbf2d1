//! Offline training of the vectorizer and classifier.

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use fake_news_preprocessing::{
    artifact,
    pre_processor::{TfidfVectorizer, TokenSequence, Tokenizer, VectorizerParams},
};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::{debug, info, warn};

use crate::{
    dataset::LabeledDocument,
    error::{FakeNewsError, Result},
    metrics::ClassificationReport,
    model::{Classifier, FitOptions, FitSummary, LoadedModel, LogisticRegression, REPORT_FILE},
    pipeline::{DECISION_THRESHOLD, Label},
};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Share of each class held out for evaluation.
    pub test_size: f64,
    /// Seed of the train/validation shuffle.
    pub random_state: u64,
    /// Inverse L2 regularization strength `C`.
    pub regularization: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        let fit = FitOptions::default();
        Self {
            test_size: 0.2,
            random_state: 42,
            regularization: fit.regularization,
            max_iter: fit.max_iter,
            tolerance: fit.tolerance,
        }
    }
}

impl TrainingParams {
    #[must_use]
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            regularization: self.regularization,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClassCounts {
    pub fake: usize,
    pub real: usize,
}

impl ClassCounts {
    fn of<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Self {
        labels.into_iter().fold(Self::default(), |mut counts, label| {
            match label {
                Label::Fake => counts.fake += 1,
                Label::Real => counts.real += 1,
            }
            counts
        })
    }

    fn has_both(&self) -> bool {
        self.fake > 0 && self.real > 0
    }
}

/// Summary of a training run, written next to the artifacts.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub producer_version: String,
    pub num_documents: usize,
    /// Documents left without any token after preprocessing.
    pub dropped_documents: usize,
    pub class_counts: ClassCounts,
    pub num_train: usize,
    pub num_validation: usize,
    pub vocabulary_size: usize,
    pub params: TrainingParams,
    pub vectorizer: VectorizerParams,
    pub optimizer: FitSummary,
    pub train_accuracy: f64,
    /// Scores on the held-out split, absent when it is empty.
    pub validation: Option<ClassificationReport>,
}

impl TrainingReport {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        artifact::write_atomic(path, &json)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: LoadedModel,
    pub report: TrainingReport,
}

impl TrainOutcome {
    /// Write both artifacts and the report into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        self.model.save(dir)?;
        self.report.save(dir.join(REPORT_FILE))?;
        info!(model_dir = %dir.display(), "Saved trained model");
        Ok(())
    }
}

/// Builder for a training run.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    tokenizer: Tokenizer,
    vectorizer_params: VectorizerParams,
    params: TrainingParams,
    cancel: Option<Arc<AtomicBool>>,
}

impl Trainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    #[must_use]
    pub fn with_vectorizer_params(mut self, params: VectorizerParams) -> Self {
        self.vectorizer_params = params;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: TrainingParams) -> Self {
        self.params = params;
        self
    }

    /// Stop the run with [`FakeNewsError::Cancelled`] once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[must_use]
    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn train(&self, documents: &[LabeledDocument]) -> Result<TrainOutcome> {
        if documents.is_empty() {
            return Err(FakeNewsError::invalid_input("training corpus is empty"));
        }
        if !(0.0..1.0).contains(&self.params.test_size) {
            return Err(FakeNewsError::invalid_input(format!(
                "test_size must be in [0, 1), got {}",
                self.params.test_size
            )));
        }
        let counts = ClassCounts::of(documents.iter().map(|d| &d.label));
        if !counts.has_both() {
            return Err(FakeNewsError::data(format!(
                "training needs both classes, got {} fake and {} real documents",
                counts.fake, counts.real
            )));
        }
        info!(
            documents = documents.len(),
            fake = counts.fake,
            real = counts.real,
            "Starting training"
        );

        let texts = documents.iter().map(|d| d.text.as_str()).collect::<Vec<_>>();
        let (tokens, labels): (Vec<TokenSequence>, Vec<Label>) = self
            .tokenizer
            .preprocess_batch(&texts)
            .into_iter()
            .zip(documents.iter().map(|d| d.label))
            .filter(|(tokens, _)| !tokens.is_empty())
            .unzip();
        let dropped_documents = documents.len() - tokens.len();
        if dropped_documents > 0 {
            warn!(dropped_documents, "Dropped documents with no usable tokens");
        }
        let kept = ClassCounts::of(&labels);
        if !kept.has_both() {
            return Err(FakeNewsError::data(format!(
                "after dropping empty documents {} fake and {} real remain",
                kept.fake, kept.real
            )));
        }
        self.check_cancelled(0)?;

        let (train_idx, validation_idx) =
            stratified_split(&labels, self.params.test_size, self.params.random_state);
        info!(
            train = train_idx.len(),
            validation = validation_idx.len(),
            "Split corpus"
        );
        let train_tokens = select(&tokens, &train_idx);
        let train_labels = select(&labels, &train_idx);

        let (vectorizer, x_train) = TfidfVectorizer::fit_tokenized(
            &train_tokens,
            self.tokenizer,
            self.vectorizer_params.clone(),
        )?;
        info!(vocabulary_size = vectorizer.num_features(), "Fitted vectorizer");
        self.check_cancelled(0)?;

        let targets = train_labels.iter().map(Label::target).collect::<Vec<_>>();
        let (logistic, optimizer) = LogisticRegression::fit(
            &x_train,
            &targets,
            &self.params.fit_options(),
            self.cancel.as_deref(),
        )?;
        let model = LoadedModel::new(vectorizer, Classifier::LogisticRegression(logistic))?;

        let train_predictions = predict_rows(&model, &x_train);
        let train_accuracy =
            ClassificationReport::from_labels(&train_labels, &train_predictions).accuracy;

        let validation = if validation_idx.is_empty() {
            None
        } else {
            let x_validation = model
                .vectorizer()
                .transform_tokenized(&select(&tokens, &validation_idx));
            let predicted = predict_rows(&model, &x_validation);
            let report = ClassificationReport::from_labels(&select(&labels, &validation_idx), &predicted);
            info!(
                accuracy = report.accuracy,
                macro_f1 = report.macro_f1,
                "Validation scores"
            );
            debug!("\n{report}");
            Some(report)
        };

        let report = TrainingReport {
            trained_at: Utc::now(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            num_documents: documents.len(),
            dropped_documents,
            class_counts: counts,
            num_train: train_idx.len(),
            num_validation: validation_idx.len(),
            vocabulary_size: model.vectorizer().num_features(),
            params: self.params,
            vectorizer: self.vectorizer_params.clone(),
            optimizer,
            train_accuracy,
            validation,
        };
        Ok(TrainOutcome { model, report })
    }

    fn check_cancelled(&self, iterations: usize) -> Result<()> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            warn!("Training cancelled");
            return Err(FakeNewsError::Cancelled { iterations });
        }
        Ok(())
    }
}

fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}

fn predict_rows(model: &LoadedModel, x: &sprs::CsMat<f64>) -> Vec<Label> {
    x.outer_iterator()
        .map(|row| {
            if model.classifier().fake_probability(&row) >= DECISION_THRESHOLD {
                Label::Fake
            } else {
                Label::Real
            }
        })
        .collect()
}

/// Deterministic stratified split into sorted `(train, validation)` indices.
///
/// Each class contributes `round(test_size * class_size)` documents to the
/// validation side, but always keeps at least one for training.
#[must_use]
pub fn stratified_split(labels: &[Label], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut validation = Vec::new();

    for class in [Label::Fake, Label::Real] {
        let mut members = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);
        let n_validation =
            ((test_size * members.len() as f64).round() as usize).min(members.len() - 1);
        validation.extend_from_slice(&members[..n_validation]);
        train.extend_from_slice(&members[n_validation..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    (train, validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<LabeledDocument> {
        let fake = [
            "Shocking miracle cure doctors hate revealed",
            "You won't believe this shocking secret",
            "Miracle pill melts fat overnight, click now",
            "Secret cure hidden by doctors, shocking truth",
            "Click here for the miracle they don't want you to see",
            "Shocking: celebrity secret miracle diet",
        ];
        let real = [
            "Researchers published a peer reviewed study",
            "The study followed participants for ten years",
            "Journal publishes peer reviewed climate research",
            "Researchers report results of clinical study",
            "Participants in the study were randomly assigned",
            "Peer reviewed journal research on participants",
        ];
        fake.iter()
            .map(|t| LabeledDocument::new(*t, Label::Fake))
            .chain(real.iter().map(|t| LabeledDocument::new(*t, Label::Real)))
            .collect()
    }

    fn trainer() -> Trainer {
        Trainer::new()
            .with_vectorizer_params(VectorizerParams::new(1..=2, 1.0, 1.0, None, false))
            .with_params(TrainingParams {
                regularization: 10.0,
                ..TrainingParams::default()
            })
    }

    #[test]
    fn test_split_is_stratified_and_deterministic() {
        let labels = [vec![Label::Fake; 10], vec![Label::Real; 5]].concat();
        let (train, validation) = stratified_split(&labels, 0.2, 42);
        assert_eq!(validation.len(), 3);
        assert_eq!(train.len(), 12);
        assert_eq!(validation.iter().filter(|&&i| labels[i] == Label::Fake).count(), 2);
        assert_eq!((train.clone(), validation.clone()), stratified_split(&labels, 0.2, 42));

        let mut all = [train, validation].concat();
        all.sort_unstable();
        assert_eq!(all, (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_keeps_a_training_document_per_class() {
        let labels = [Label::Fake, Label::Real];
        let (train, validation) = stratified_split(&labels, 0.9, 7);
        assert_eq!(train, vec![0, 1]);
        assert!(validation.is_empty());
    }

    #[test]
    fn test_train_produces_consistent_model_and_report() {
        let documents = corpus();
        let outcome = trainer().train(&documents).unwrap();
        let report = &outcome.report;

        assert_eq!(report.num_documents, 12);
        assert_eq!(report.dropped_documents, 0);
        assert_eq!(report.num_train + report.num_validation, 12);
        assert_eq!(report.num_validation, 2);
        assert_eq!(report.class_counts, ClassCounts { fake: 6, real: 6 });
        assert_eq!(report.vocabulary_size, outcome.model.vectorizer().num_features());
        assert!(report.train_accuracy > 0.9);
        assert!(report.validation.is_some());
    }

    #[test]
    fn test_rejects_empty_and_single_class_corpora() {
        assert!(matches!(
            trainer().train(&[]),
            Err(FakeNewsError::InvalidInput(_))
        ));

        let only_fake = vec![LabeledDocument::new("shocking miracle cure", Label::Fake); 4];
        assert!(matches!(
            trainer().train(&only_fake),
            Err(FakeNewsError::Data(_))
        ));
    }

    #[test]
    fn test_documents_without_tokens_are_dropped() {
        let mut documents = corpus();
        documents.push(LabeledDocument::new("1234567890", Label::Fake));
        documents.push(LabeledDocument::new("the and of", Label::Real));
        let outcome = trainer().train(&documents).unwrap();
        assert_eq!(outcome.report.dropped_documents, 2);
        assert_eq!(outcome.report.num_documents, 14);
    }

    #[test]
    fn test_class_left_empty_after_dropping_is_data_error() {
        let documents = vec![
            LabeledDocument::new("shocking miracle cure", Label::Fake),
            LabeledDocument::new("the of and", Label::Real),
        ];
        assert!(matches!(
            trainer().train(&documents),
            Err(FakeNewsError::Data(_))
        ));
    }

    #[test]
    fn test_cancelled_run_writes_nothing() {
        let flag = Arc::new(AtomicBool::new(true));
        let result = trainer().with_cancel_flag(flag).train(&corpus());
        assert!(matches!(result, Err(FakeNewsError::Cancelled { .. })));
    }

    #[test]
    fn test_outcome_save_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = trainer().train(&corpus()).unwrap();
        outcome.save(dir.path()).unwrap();

        for file in [crate::model::VECTORIZER_FILE, crate::model::MODEL_FILE, REPORT_FILE] {
            assert!(dir.path().join(file).is_file(), "{file} missing");
        }
        let json = std::fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
        let report: TrainingReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.num_documents, 12);
        assert!(LoadedModel::load(dir.path()).is_ok());
    }

    #[test]
    fn test_invalid_test_size() {
        let trainer = trainer().with_params(TrainingParams {
            test_size: 1.0,
            ..TrainingParams::default()
        });
        assert!(matches!(
            trainer.train(&corpus()),
            Err(FakeNewsError::InvalidInput(_))
        ));
    }
}
