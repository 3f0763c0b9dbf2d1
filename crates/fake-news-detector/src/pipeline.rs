use core::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::{
    error::{FakeNewsError, Result},
    model::LoadedModel,
};

/// Fake-news probability at or above which a text is labelled fake.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Lower bound of the high confidence tier.
pub const HIGH_CONFIDENCE: f64 = 0.80;

/// Lower bound of the medium confidence tier.
pub const MEDIUM_CONFIDENCE: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Fake,
    Real,
}

impl Label {
    #[must_use]
    pub fn is_fake(&self) -> bool {
        matches!(self, Self::Fake)
    }

    #[must_use]
    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real)
    }

    /// Regression target used by the classifier: 1.0 for fake, 0.0 for real.
    #[must_use]
    pub fn target(&self) -> f64 {
        match self {
            Self::Fake => 1.0,
            Self::Real => 0.0,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fake => write!(f, "fake"),
            Self::Real => write!(f, "real"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label {0:?} (expected fake, real, 0 or 1)")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    /// Accepts `fake`/`real` in any case, and the numeric dataset encoding
    /// where `0` is fake and `1` is real.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("fake") || trimmed == "0" {
            Ok(Self::Fake)
        } else if trimmed.eq_ignore_ascii_case("real") || trimmed == "1" {
            Ok(Self::Real)
        } else {
            Err(UnknownLabel(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Tier of a predicted-label probability. Boundaries belong to the
    /// higher tier.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_CONFIDENCE {
            Self::High
        } else if probability >= MEDIUM_CONFIDENCE {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Percentage rounded to two decimals and confidence tier of `probability`.
#[must_use]
pub fn interpret(probability: f64) -> (f64, ConfidenceLevel) {
    (
        (probability * 100.0 * 100.0).round() / 100.0,
        ConfidenceLevel::from_probability(probability),
    )
}

/// Classifier output for one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    label: Label,
    fake_probability: f64,
}

impl Prediction {
    /// Apply the decision rule to a fake-news probability.
    ///
    /// A non-finite or out-of-range probability means the model is broken and
    /// is reported as unavailable rather than returned to the caller.
    pub fn from_fake_probability(fake_probability: f64) -> Result<Self> {
        if !fake_probability.is_finite() || !(0.0..=1.0).contains(&fake_probability) {
            warn!(fake_probability, "Classifier produced an invalid probability");
            return Err(FakeNewsError::model_unavailable(format!(
                "classifier produced an invalid probability ({fake_probability})"
            )));
        }
        let label = if fake_probability >= DECISION_THRESHOLD {
            Label::Fake
        } else {
            Label::Real
        };
        Ok(Self {
            label,
            fake_probability,
        })
    }

    #[must_use]
    pub fn label(&self) -> Label {
        self.label
    }

    #[must_use]
    pub fn fake_probability(&self) -> f64 {
        self.fake_probability
    }

    #[must_use]
    pub fn real_probability(&self) -> f64 {
        1.0 - self.fake_probability
    }

    /// Probability of the predicted label; never below 0.5.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self.label {
            Label::Fake => self.fake_probability,
            Label::Real => self.real_probability(),
        }
    }

    #[must_use]
    pub fn confidence_percentage(&self) -> f64 {
        interpret(self.confidence()).0
    }

    #[must_use]
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_probability(self.confidence())
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}%, {} confidence)",
            self.label,
            self.confidence_percentage(),
            self.confidence_level()
        )
    }
}

/// Run one raw text through the full pipeline.
pub fn predict(model: &LoadedModel, text: &str) -> Result<Prediction> {
    let features = model.vectorizer().transform_text(text);
    debug!(nnz = features.nnz(), "Vectorized text");
    Prediction::from_fake_probability(model.classifier().fake_probability(&features.view()))
}
