use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::LoadedModel;
use crate::error::{FakeNewsError, Result};

type LoadFn = dyn Fn() -> Result<LoadedModel> + Send + Sync;

/// Lazily loads the model artifacts at most once per success.
///
/// The first caller performs the load while holding the slot lock, so racing
/// callers wait and then share the same `Arc`. A failed load leaves the slot
/// empty and the next caller tries again.
pub struct ModelLoader {
    source: Option<PathBuf>,
    load: Box<LoadFn>,
    slot: Mutex<Option<Arc<LoadedModel>>>,
}

impl ModelLoader {
    /// Loader reading the artifacts from `model_dir` on first use.
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        let dir = model_dir.clone();
        Self {
            source: Some(model_dir),
            load: Box::new(move || LoadedModel::load(&dir)),
            slot: Mutex::new(None),
        }
    }

    /// Loader that is already populated.
    #[must_use]
    pub fn from_model(model: LoadedModel) -> Self {
        let source = model.model_dir().map(Path::to_path_buf);
        Self {
            source,
            load: Box::new(|| {
                Err(FakeNewsError::model_unavailable(
                    "in-memory model has no backing artifacts",
                ))
            }),
            slot: Mutex::new(Some(Arc::new(model))),
        }
    }

    /// Loader with a custom load function.
    pub fn with_loader<F>(load: F) -> Self
    where
        F: Fn() -> Result<LoadedModel> + Send + Sync + 'static,
    {
        Self {
            source: None,
            load: Box::new(load),
            slot: Mutex::new(None),
        }
    }

    /// Return the shared model, loading it first if needed.
    pub fn get(&self) -> Result<Arc<LoadedModel>> {
        let mut slot = self.slot.lock();
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        debug!(source = ?self.source, "Loading model");
        match (self.load)() {
            Ok(model) => {
                let model = Arc::new(model);
                *slot = Some(Arc::clone(&model));
                Ok(model)
            }
            Err(err) => {
                warn!(error = %err, "Model load failed");
                Err(err)
            }
        }
    }

    /// The model if it has been loaded, without triggering a load.
    #[must_use]
    pub fn loaded(&self) -> Option<Arc<LoadedModel>> {
        self.slot.lock().clone()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Directory the artifacts come from, when known.
    #[must_use]
    pub fn model_dir(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLoader")
            .field("source", &self.source)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}
