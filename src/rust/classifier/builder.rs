use std::sync::Arc;

use log::info;

use super::classifier::CropClassifier;
use super::error::CropDocError;
use super::handle::ModelHandle;
use super::model::ModelSource;
use super::predictor::{CropPredictor, DEFAULT_TOP_K};
use crate::preprocess::{ImageNormalizer, PreprocessConfig};
use crate::taxonomy::Taxonomy;

/// A builder for constructing a [`CropClassifier`] with a fluent interface.
///
/// The model is not loaded by [`build`](Self::build); call
/// [`CropClassifier::load`] eagerly or let the first prediction load it.
pub struct ClassifierBuilder {
    taxonomy: Option<Arc<Taxonomy>>,
    source: Option<Box<dyn ModelSource>>,
    preprocess: PreprocessConfig,
    top_k: usize,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a builder using the built-in taxonomy, 224x224 NHWC input and top-3 ranking
    pub fn new() -> Self {
        Self {
            taxonomy: None,
            source: None,
            preprocess: PreprocessConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Uses a custom taxonomy. Its order must match the model's output layer.
    pub fn with_taxonomy(mut self, taxonomy: Arc<Taxonomy>) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }

    /// Sets where the model is loaded from
    ///
    /// # Errors
    /// * `Validation` if a source was already set
    pub fn with_source(mut self, source: impl ModelSource + 'static) -> Result<Self, CropDocError> {
        if self.source.is_some() {
            return Err(CropDocError::Validation("Model source already set".to_string()));
        }
        self.source = Some(Box::new(source));
        Ok(self)
    }

    pub fn with_preprocess(mut self, config: PreprocessConfig) -> Self {
        self.preprocess = config;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Builds the classifier.
    ///
    /// # Errors
    /// * `Validation` if no model source was set, the input size is zero, or `top_k` is zero
    pub fn build(self) -> Result<CropClassifier, CropDocError> {
        let source = self
            .source
            .ok_or_else(|| CropDocError::Validation("A model source must be set".to_string()))?;
        let taxonomy = self.taxonomy.unwrap_or_else(Taxonomy::builtin);

        let normalizer = ImageNormalizer::new(self.preprocess)?;
        let predictor = CropPredictor::new(Arc::clone(&taxonomy), self.top_k)?;
        let handle = ModelHandle::new(source, taxonomy.len());

        info!(
            "Classifier ready: {} classes across {} crops, input {}x{} ({})",
            taxonomy.len(),
            taxonomy.crop_index().len(),
            self.preprocess.size,
            self.preprocess.size,
            self.preprocess.layout
        );

        Ok(CropClassifier {
            taxonomy,
            normalizer,
            handle,
            predictor,
        })
    }
}
