use ort::Error as OrtError;

/// Represents the different types of errors that can occur while classifying a leaf image.
#[derive(Debug, thiserror::Error)]
pub enum CropDocError {
    /// The uploaded bytes could not be decoded as an image
    #[error("Decode error: {0}")]
    Decode(String),
    /// The model artifact is missing, corrupt, or incompatible with the taxonomy
    #[error("Model load error: {0}")]
    ModelLoad(String),
    /// Inference was requested before a successful load
    #[error("Model not loaded")]
    NotLoaded,
    /// The crop is not part of the crop index
    #[error("Invalid crop: {0}")]
    UnknownCrop(String),
    /// The crop exists but has no labels under it
    #[error("Crop has no labels: {0}")]
    EmptyCrop(String),
    /// Invalid taxonomy or configuration input
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CropDocError {
    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::UnknownCrop(_) | Self::EmptyCrop(_) | Self::Validation(_)
        )
    }
}

impl From<OrtError> for CropDocError {
    fn from(err: OrtError) -> Self {
        CropDocError::ModelLoad(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(CropDocError::Decode("bad".into()).is_client_error());
        assert!(CropDocError::UnknownCrop("Kale".into()).is_client_error());
        assert!(!CropDocError::NotLoaded.is_client_error());
        assert!(!CropDocError::ModelLoad("missing".into()).is_client_error());
        assert!(!CropDocError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(CropDocError::UnknownCrop("Kale".into()).to_string(), "Invalid crop: Kale");
        assert_eq!(CropDocError::NotLoaded.to_string(), "Model not loaded");
    }
}
