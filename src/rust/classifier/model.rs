use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::Array4;
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::error::CropDocError;
use crate::model_store::sha256_file;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A loaded image classifier: one batched input tensor in, one probability per class out.
///
/// Implementations do not need to be `Sync`; the model handle serializes every call.
pub trait ImageModel: Send {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, CropDocError>;
}

/// Where a model comes from. Called by the model handle on each load attempt.
pub trait ModelSource: Send + Sync {
    /// Loads the model, checking it produces `num_classes` outputs where the format allows.
    fn load(&self, num_classes: usize) -> Result<Box<dyn ImageModel>, CropDocError>;

    /// Human readable origin, used in log lines
    fn describe(&self) -> String;
}

/// An ONNX model file executed with ONNX Runtime.
#[derive(Debug, Clone)]
pub struct OnnxSource {
    model_path: PathBuf,
    runtime_config: RuntimeConfig,
    expected_sha256: Option<String>,
}

impl OnnxSource {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            runtime_config: RuntimeConfig::default(),
            expected_sha256: None,
        }
    }

    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Requires the artifact's SHA-256 digest (lowercase hex) to match before loading.
    pub fn with_expected_sha256(mut self, digest: Option<String>) -> Self {
        self.expected_sha256 = digest.map(|d| d.trim().to_ascii_lowercase());
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Validates that the model has one image input and an output compatible with the taxonomy
    fn validate_model(session: &Session, num_classes: usize) -> Result<(), CropDocError> {
        if session.inputs.is_empty() {
            return Err(CropDocError::ModelLoad("Model must have at least 1 input".to_string()));
        }
        if session.inputs.len() > 1 {
            warn!(
                "Model declares {} inputs, only '{}' will be fed",
                session.inputs.len(),
                session.inputs[0].name
            );
        }

        let output = session.outputs.first().ok_or_else(|| {
            CropDocError::ModelLoad(
                "Model must have at least 1 output for class probabilities".to_string(),
            )
        })?;

        if let ValueType::Tensor { dimensions, .. } = &output.output_type {
            // Dynamic dimensions are reported as -1 and checked at inference time instead
            if let Some(&classes) = dimensions.last() {
                if classes > 0 && classes as usize != num_classes {
                    return Err(CropDocError::ModelLoad(format!(
                        "Model outputs {} classes but the taxonomy has {}",
                        classes, num_classes
                    )));
                }
            }
        }

        Ok(())
    }
}

impl ModelSource for OnnxSource {
    fn load(&self, num_classes: usize) -> Result<Box<dyn ImageModel>, CropDocError> {
        if !self.model_path.exists() {
            return Err(CropDocError::ModelLoad(format!(
                "Model file not found: {:?}",
                self.model_path
            )));
        }

        if let Some(expected) = &self.expected_sha256 {
            let actual = sha256_file(&self.model_path).map_err(|e| {
                CropDocError::ModelLoad(format!("Failed to read {:?}: {}", self.model_path, e))
            })?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(CropDocError::ModelLoad(format!(
                    "Hash mismatch for {:?}: expected {}, got {}",
                    self.model_path, expected, actual
                )));
            }
            info!("Model digest verified");
        }

        // Create session using the singleton environment
        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(&self.model_path)?;

        Self::validate_model(&session, num_classes)?;
        info!("Model structure validated successfully");

        let input_name = session.inputs[0].name.clone();
        Ok(Box::new(OnnxModel { session, input_name }))
    }

    fn describe(&self) -> String {
        format!("{}", self.model_path.display())
    }
}

#[derive(Debug)]
pub struct OnnxModel {
    session: Session,
    input_name: String,
}

impl ImageModel for OnnxModel {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, CropDocError> {
        let input_dyn = input.view().into_dyn();
        let pixels = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&pixels).map_err(|e| {
                CropDocError::Internal(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| CropDocError::Internal(format!("Failed to run model: {}", e)))?;
        let probabilities = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                CropDocError::Internal(format!("Failed to extract output tensor: {}", e))
            })?;

        Ok(probabilities.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_artifact_is_load_error() {
        let source = OnnxSource::new("/nonexistent/cropdoc/model.onnx");
        let result = source.load(50);
        assert!(matches!(result, Err(CropDocError::ModelLoad(_))));
    }

    #[test]
    fn test_corrupt_artifact_is_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"corrupted data").unwrap();

        let source = OnnxSource::new(file.path());
        let result = source.load(50);
        assert!(matches!(result, Err(CropDocError::ModelLoad(_))));
    }

    #[test]
    fn test_digest_mismatch_is_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"corrupted data").unwrap();

        let source = OnnxSource::new(file.path())
            .with_expected_sha256(Some("00".repeat(32)));
        match source.load(50) {
            Err(CropDocError::ModelLoad(msg)) => assert!(msg.contains("Hash mismatch")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("corrupt model loaded"),
        }
    }

    #[test]
    fn test_describe_uses_path() {
        let source = OnnxSource::new("models/crop.onnx");
        assert_eq!(source.describe(), "models/crop.onnx");
        assert_eq!(source.model_path(), Path::new("models/crop.onnx"));
    }
}
