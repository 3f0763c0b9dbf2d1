use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use fake_news_preprocessing::pre_processor::TextStatistics;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::Settings,
    error::{ErrorKind, FakeNewsError, Result},
    model::{LoadedModel, ModelInfo, ModelLoader},
    pipeline::{self, ConfidenceLevel, Label, Prediction},
};

/// Inclusive bounds on the trimmed length of a text, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self { min: 10, max: 10_000 }
    }
}

/// Check that `text` is usable for prediction.
pub fn validate_text(text: &str, limits: TextLimits) -> Result<()> {
    let length = text.trim().chars().count();
    if length == 0 {
        return Err(FakeNewsError::invalid_input("text is empty"));
    }
    if length < limits.min {
        return Err(FakeNewsError::invalid_input(format!(
            "text must be at least {} characters long",
            limits.min
        )));
    }
    if length > limits.max {
        return Err(FakeNewsError::invalid_input(format!(
            "text must be no more than {} characters long",
            limits.max
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

/// A prediction as returned to callers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredictionResult {
    pub prediction: Label,
    /// Probability of the predicted label.
    pub confidence: f64,
    pub confidence_percentage: f64,
    pub confidence_level: ConfidenceLevel,
    pub fake_probability: f64,
    pub real_probability: f64,
    pub text_stats: TextStatistics,
    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    #[must_use]
    pub fn new(prediction: &Prediction, text: &str) -> Self {
        Self {
            prediction: prediction.label(),
            confidence: prediction.confidence(),
            confidence_percentage: prediction.confidence_percentage(),
            confidence_level: prediction.confidence_level(),
            fake_probability: prediction.fake_probability(),
            real_probability: prediction.real_probability(),
            text_stats: TextStatistics::from_text(text),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&FakeNewsError> for ErrorResponse {
    fn from(err: &FakeNewsError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Either a prediction or an error, never both.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Prediction(PredictionResult),
    Error(ErrorResponse),
}

impl PredictResponse {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    #[must_use]
    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            Self::Prediction(result) => Some(result),
            Self::Error(_) => None,
        }
    }
}

/// Answer for one text of a batch, tagged with its position in the input.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(flatten)]
    pub response: PredictResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
}

/// Entry point for predictions, loading the model on first use.
///
/// Cheap to clone; clones share the same model.
///
/// ```no_run
/// use fake_news_detector::Predictor;
///
/// let predictor = Predictor::from_dir("model_artifacts");
/// let result = predictor.predict("Scientists discover a miracle cure, click here!")?;
/// println!("{} ({}%)", result.prediction, result.confidence_percentage);
/// # Ok::<(), fake_news_detector::FakeNewsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Predictor {
    loader: Arc<ModelLoader>,
    limits: TextLimits,
}

impl Predictor {
    #[must_use]
    pub fn new(loader: Arc<ModelLoader>) -> Self {
        Self {
            loader,
            limits: TextLimits::default(),
        }
    }

    /// Predictor loading its artifacts lazily from `model_dir`.
    #[must_use]
    pub fn from_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(ModelLoader::new(model_dir)))
    }

    /// Predictor over an already loaded model.
    #[must_use]
    pub fn from_model(model: LoadedModel) -> Self {
        Self::new(Arc::new(ModelLoader::from_model(model)))
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_dir(settings.model_dir.clone())
            .with_text_limits(settings.min_text_length, settings.max_text_length)
    }

    #[must_use]
    pub fn with_text_limits(mut self, min: usize, max: usize) -> Self {
        self.limits = TextLimits { min, max };
        self
    }

    #[must_use]
    pub fn text_limits(&self) -> TextLimits {
        self.limits
    }

    /// Validate and classify one text.
    pub fn predict(&self, text: &str) -> Result<PredictionResult> {
        validate_text(text, self.limits)?;
        let model = self.loader.get()?;
        let prediction = pipeline::predict(&model, text)?;
        debug!(%prediction, "Predicted");
        Ok(PredictionResult::new(&prediction, text))
    }

    pub fn classify(&self, text: &str) -> Result<Label> {
        self.predict(text).map(|result| result.prediction)
    }

    /// Classify many texts in parallel, one answer per text in input order.
    ///
    /// An invalid text only fails its own entry. The call as a whole fails
    /// only when no model can be loaded.
    pub fn predict_batch<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Result<Vec<BatchItem>> {
        let model = self.loader.get()?;
        let items = texts
            .par_iter()
            .enumerate()
            .map(|(index, text)| {
                let text = text.as_ref();
                let response = match validate_text(text, self.limits)
                    .and_then(|()| pipeline::predict(&model, text))
                {
                    Ok(prediction) => {
                        PredictResponse::Prediction(PredictionResult::new(&prediction, text))
                    }
                    Err(err) => PredictResponse::Error(ErrorResponse::from(&err)),
                };
                BatchItem { index, response }
            })
            .collect::<Vec<_>>();
        debug!(
            texts = items.len(),
            failed = items.iter().filter(|item| item.response.is_error()).count(),
            "Predicted batch"
        );
        Ok(items)
    }

    /// Answer a request, turning every failure into an error response.
    #[must_use]
    pub fn handle(&self, request: &PredictRequest) -> PredictResponse {
        match self.predict(&request.text) {
            Ok(result) => PredictResponse::Prediction(result),
            Err(err) => PredictResponse::Error(ErrorResponse::from(&err)),
        }
    }

    /// Report whether a model can be served, loading it if necessary.
    #[must_use]
    pub fn health(&self) -> HealthStatus {
        let model_loaded = self.loader.get().is_ok();
        HealthStatus {
            status: if model_loaded { "healthy" } else { "unhealthy" }.to_string(),
            model_loaded,
        }
    }

    pub fn info(&self) -> Result<ModelInfo> {
        Ok(self.loader.get()?.info())
    }
}
