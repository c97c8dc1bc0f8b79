use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use log::{debug, error, info};
use ndarray::Array4;
use serde::Serialize;

use super::error::CropDocError;
use super::model::{ImageModel, ModelSource};

/// Availability of the model behind a [`ModelHandle`].
///
/// `Unloaded -> Loading -> Loaded`. A failed load goes back to `Unloaded` and
/// may be retried; `Loaded` is terminal for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Loaded,
}

/// Process-wide owner of the classifier model.
///
/// Loading and inference share one mutex, so concurrent first requests load the
/// model exactly once and inference calls never overlap. The status is tracked
/// separately so health checks never wait behind a running inference.
pub struct ModelHandle {
    source: Box<dyn ModelSource>,
    num_classes: usize,
    status: RwLock<ModelStatus>,
    model: Mutex<Option<Box<dyn ImageModel>>>,
}

impl ModelHandle {
    pub fn new(source: Box<dyn ModelSource>, num_classes: usize) -> Self {
        Self {
            source,
            num_classes,
            status: RwLock::new(ModelStatus::Unloaded),
            model: Mutex::new(None),
        }
    }

    pub fn status(&self) -> ModelStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == ModelStatus::Loaded
    }

    /// Number of probabilities every inference must return
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    fn set_status(&self, status: ModelStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn lock_model(&self) -> MutexGuard<'_, Option<Box<dyn ImageModel>>> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the model from its source. A no-op returning `Ok` once loaded.
    pub fn load(&self) -> Result<(), CropDocError> {
        let mut model = self.lock_model();
        if model.is_some() {
            debug!("Model already loaded");
            return Ok(());
        }

        self.set_status(ModelStatus::Loading);
        info!("Loading model from {}...", self.source.describe());
        let start = Instant::now();

        match self.source.load(self.num_classes) {
            Ok(loaded) => {
                *model = Some(loaded);
                self.set_status(ModelStatus::Loaded);
                info!("Model loaded successfully in {:.2?}", start.elapsed());
                Ok(())
            }
            Err(e) => {
                self.set_status(ModelStatus::Unloaded);
                error!("Failed to load model: {}", e);
                match e {
                    CropDocError::ModelLoad(_) => Err(e),
                    other => Err(CropDocError::ModelLoad(other.to_string())),
                }
            }
        }
    }

    /// Runs the model on one normalized input tensor.
    pub fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, CropDocError> {
        let guard = self.lock_model();
        let model = guard.as_ref().ok_or(CropDocError::NotLoaded)?;

        let probabilities = model.classify(input)?;
        if probabilities.len() != self.num_classes {
            return Err(CropDocError::Internal(format!(
                "Model returned {} probabilities, expected {}",
                probabilities.len(),
                self.num_classes
            )));
        }
        Ok(probabilities)
    }
}
