use std::sync::Arc;

use log::debug;

use super::error::CropDocError;
use super::handle::{ModelHandle, ModelStatus};
use super::predictor::{CropPrediction, CropPredictor};
use crate::preprocess::ImageNormalizer;
use crate::taxonomy::Taxonomy;

/// Classifies leaf images within a chosen crop.
///
/// Combines the image normalizer, the shared model handle and the crop-constrained
/// predictor. The type is `Send + Sync` and is meant to be shared behind an `Arc`;
/// inference calls are serialized internally.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use cropdoc::{CropClassifier, OnnxSource};
///
/// let classifier = CropClassifier::builder()
///     .with_source(OnnxSource::new("crop_disease_model.onnx"))?
///     .build()?;
/// classifier.load()?;
///
/// let image = std::fs::read("leaf.jpg")?;
/// let prediction = classifier.classify(&image, "Apple")?;
/// println!("{}: {:.2}%", prediction.disease, prediction.confidence * 100.0);
/// # Ok(())
/// # }
/// ```
pub struct CropClassifier {
    pub(super) taxonomy: Arc<Taxonomy>,
    pub(super) normalizer: ImageNormalizer,
    pub(super) handle: ModelHandle,
    pub(super) predictor: CropPredictor,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<CropClassifier>();
    }
};

impl CropClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            model_source: self.handle.source_description(),
            input_size: self.normalizer.config().size,
            total_classes: self.taxonomy.len(),
            crops_supported: self.taxonomy.crop_index().len(),
            top_k: self.predictor.top_k(),
            model_loaded: self.handle.is_loaded(),
        }
    }

    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }

    pub fn status(&self) -> ModelStatus {
        self.handle.status()
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_loaded()
    }

    /// Loads the model if it is not loaded yet
    pub fn load(&self) -> Result<(), CropDocError> {
        self.handle.load()
    }

    /// Classifies an encoded image, considering only the labels of `crop`.
    ///
    /// The crop is checked before anything else, so an unknown crop never reaches
    /// the model. An unloaded model is loaded first; a failed load is reported and
    /// retried on the next call.
    ///
    /// # Errors
    /// * `UnknownCrop` if the crop is not in the taxonomy
    /// * `Decode` if the bytes are not a readable image
    /// * `ModelLoad` if the model could not be loaded
    /// * `Internal` if inference failed
    pub fn classify(&self, image: &[u8], crop: &str) -> Result<CropPrediction, CropDocError> {
        if !self.taxonomy.crop_index().contains(crop) {
            return Err(CropDocError::UnknownCrop(crop.to_string()));
        }

        let input = self.normalizer.normalize(image)?;
        debug!("Normalized {} bytes into tensor {:?}", image.len(), input.shape());

        self.handle.load()?;
        let probabilities = self.handle.infer(&input)?;
        self.predictor.predict(&probabilities, crop)
    }
}
