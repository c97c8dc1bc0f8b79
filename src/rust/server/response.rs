use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;

use crate::classifier::{CropDocError, CropPrediction, RankedLabels};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

#[derive(Debug, Serialize)]
pub struct CropsResponse {
    pub success: bool,
    pub crops: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub model_name: String,
    pub version: String,
    pub input_size: u32,
    pub total_classes: usize,
    pub crops_supported: usize,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub disease: String,
    pub confidence: f32,
    pub all_predictions: RankedLabels,
    pub crop: String,
    pub inference_time_ms: f64,
}

impl PredictResponse {
    pub fn new(prediction: CropPrediction, inference_time_ms: f64) -> Self {
        Self {
            success: true,
            disease: prediction.disease,
            confidence: prediction.confidence,
            all_predictions: prediction.ranked,
            crop: prediction.crop,
            inference_time_ms,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_crops: Option<Vec<String>>,
}

/// An error answered to the client as `{success: false, error}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub available_crops: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            available_crops: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn invalid_crop(crop: &str, available_crops: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid crop: {}", crop),
            available_crops: Some(available_crops),
        }
    }
}

impl From<CropDocError> for ApiError {
    fn from(err: CropDocError) -> Self {
        match err {
            CropDocError::Decode(detail) => Self::bad_request(format!("Invalid image: {}", detail)),
            CropDocError::UnknownCrop(crop) => Self::bad_request(format!("Invalid crop: {}", crop)),
            CropDocError::EmptyCrop(_) | CropDocError::Validation(_) => {
                Self::bad_request(err.to_string())
            }
            CropDocError::NotLoaded | CropDocError::ModelLoad(_) => {
                error!("Prediction failed, model unavailable: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Model not loaded")
            }
            CropDocError::Internal(_) => {
                error!("Prediction failed: {}", err);
                Self::internal()
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large("Request body too large")
        } else {
            Self::bad_request(format!("Invalid multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
            available_crops: self.available_crops,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ApiError::from(CropDocError::Decode("x".into())).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CropDocError::UnknownCrop("Kale".into())).message,
            "Invalid crop: Kale"
        );

        let not_loaded = ApiError::from(CropDocError::NotLoaded);
        assert_eq!(not_loaded.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(not_loaded.message, "Model not loaded");

        // Details of internal failures stay in the log
        let internal = ApiError::from(CropDocError::Internal("session exploded at 0x1f".into()));
        assert_eq!(internal.message, "Internal server error");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            success: false,
            error: "Crop name required".into(),
            available_crops: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"success": false, "error": "Crop name required"})
        );
    }
}
