//! # fake-news-detector
//!
//! Classify news articles as fake or real.
//!
//! Articles are normalized, tokenized and turned into TF-IDF features by
//! [`fake_news_preprocessing`], then scored by a logistic regression
//! classifier. Both halves are trained together by [`train::Trainer`] and
//! persisted side by side in a model directory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fake_news_detector::Predictor;
//!
//! let predictor = Predictor::from_dir("model_artifacts");
//! let result = predictor.predict("BREAKING: doctors hate this one weird trick!")?;
//! println!(
//!     "{} with {:.2}% confidence ({})",
//!     result.prediction, result.confidence_percentage, result.confidence_level
//! );
//! # Ok::<(), fake_news_detector::FakeNewsError>(())
//! ```
//!
//! ## Training
//!
//! ```no_run
//! use fake_news_detector::{dataset, train::Trainer};
//!
//! let documents = dataset::load_split_csv("Fake.csv", "True.csv")?;
//! let outcome = Trainer::new().train(&documents)?;
//! println!("{:?}", outcome.report.validation);
//! outcome.save("model_artifacts")?;
//! # Ok::<(), fake_news_detector::FakeNewsError>(())
//! ```

#[cfg(feature = "cli")]
pub mod cli;

pub mod config;
pub mod dataset;
mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod train;

pub use error::{ErrorKind, FakeNewsError, Result};
pub use model::{LoadedModel, ModelInfo, ModelLoader};
pub use pipeline::{ConfidenceLevel, Label, Prediction};
pub use service::{BatchItem, PredictRequest, PredictResponse, PredictionResult, Predictor};
