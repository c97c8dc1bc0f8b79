//! Crop-constrained plant disease classification backed by an ONNX image classifier.
//!
//! A leaf photo is resized to the model's input resolution, scored against every
//! disease class the model knows, and the scores are then restricted to the
//! classes of the crop the caller names.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cropdoc::{CropClassifier, OnnxSource};
//!
//! let classifier = CropClassifier::builder()
//!     .with_source(OnnxSource::new("crop_disease_model.onnx"))?
//!     .build()?;
//! classifier.load()?;
//!
//! let image = std::fs::read("leaf.jpg")?;
//! let prediction = classifier.classify(&image, "Tomato")?;
//! println!("{} ({:.2}%)", prediction.disease, prediction.confidence * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `CropClassifier` is `Send + Sync`. Share it with an `Arc`; inference calls are
//! serialized by a single lock around the model.

pub mod classifier;
pub mod config;
pub mod model_store;
pub mod preprocess;
mod runtime;
pub mod server;
pub mod taxonomy;

pub use classifier::{
    ClassifierBuilder, ClassifierInfo, CropClassifier, CropDocError, CropPrediction, CropPredictor,
    ImageModel, ModelHandle, ModelSource, ModelStatus, OnnxSource, RankedLabel, RankedLabels,
    DEFAULT_TOP_K,
};
pub use model_store::{ModelStore, ModelStoreError};
pub use preprocess::{ImageNormalizer, PreprocessConfig, TensorLayout};
pub use runtime::{create_session_builder, Optimization, RuntimeConfig};
pub use taxonomy::{ClassLabel, CropIndex, Taxonomy};

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
