mod builder;
#[allow(clippy::module_inception)]
mod classifier;
mod error;
mod handle;
mod model;
mod predictor;
#[cfg(test)]
pub(crate) mod testing;
mod utils;

use serde::Serialize;

pub use builder::ClassifierBuilder;
pub use classifier::CropClassifier;
pub use error::CropDocError;
pub use handle::{ModelHandle, ModelStatus};
pub use model::{ImageModel, ModelSource, OnnxModel, OnnxSource};
pub use predictor::{CropPrediction, CropPredictor, RankedLabel, RankedLabels, DEFAULT_TOP_K};

/// Snapshot of a classifier's configuration and model state.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierInfo {
    pub model_source: String,
    pub input_size: u32,
    pub total_classes: usize,
    pub crops_supported: usize,
    pub top_k: usize,
    pub model_loaded: bool,
}
