use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use log::{debug, error, info};

use super::response::{ApiError, CropsResponse, HealthResponse, InfoResponse, PredictResponse};
use super::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.classifier.is_loaded(),
        timestamp,
    })
}

pub async fn crops(State(state): State<Arc<AppState>>) -> Json<CropsResponse> {
    let crops = state.classifier.taxonomy().crop_index().crop_names();
    Json(CropsResponse {
        success: true,
        count: crops.len(),
        crops,
    })
}

pub async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let info = state.classifier.info();
    Json(InfoResponse {
        model_name: state.config.model_name.clone(),
        version: state.config.version.clone(),
        input_size: info.input_size,
        total_classes: info.total_classes,
        crops_supported: info.crops_supported,
        model_loaded: info.model_loaded,
    })
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

struct ImageUpload {
    file_name: String,
    bytes: Bytes,
}

#[derive(Default)]
struct PredictForm {
    image: Option<ImageUpload>,
    crop: Option<String>,
}

/// Reads the `image` file part and the `crop` text part; other parts are skipped.
///
/// An `image` part without a filename is a plain form value, not a file, and is ignored.
async fn read_form(multipart: &mut Multipart) -> Result<PredictForm, ApiError> {
    let mut form = PredictForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") if form.image.is_none() => {
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let bytes = field.bytes().await?;
                form.image = Some(ImageUpload { file_name, bytes });
            }
            Some("crop") if form.crop.is_none() => {
                form.crop = Some(field.text().await?);
            }
            other => debug!("Skipping multipart field {:?}", other),
        }
    }

    Ok(form)
}

fn size_limit_message(max_bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if max_bytes >= MB && max_bytes % MB == 0 {
        format!("Image too large (max {}MB)", max_bytes / MB)
    } else {
        format!("Image too large (max {} bytes)", max_bytes)
    }
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let start = Instant::now();

    // A body that is not multipart carries no image file
    let mut multipart = multipart.map_err(|_| ApiError::bad_request("Image file required"))?;
    let form = read_form(&mut multipart).await?;

    let image = form.image.ok_or_else(|| ApiError::bad_request("Image file required"))?;
    let crop = form.crop.ok_or_else(|| ApiError::bad_request("Crop name required"))?;

    if image.file_name.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }

    let crop = crop.trim().to_string();
    let crop_index = state.classifier.taxonomy().crop_index();
    if !crop_index.contains(&crop) {
        return Err(ApiError::invalid_crop(&crop, crop_index.crop_names()));
    }

    if image.bytes.len() > state.config.max_image_bytes {
        return Err(ApiError::payload_too_large(size_limit_message(
            state.config.max_image_bytes,
        )));
    }

    info!("Predicting disease for crop '{}' ({} bytes)", crop, image.bytes.len());

    let classifier = Arc::clone(&state.classifier);
    let prediction = tokio::task::spawn_blocking(move || classifier.classify(&image.bytes, &crop))
        .await
        .map_err(|e| {
            error!("Prediction task failed: {}", e);
            ApiError::internal()
        })??;

    let elapsed_ms = (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;
    info!(
        "Prediction for '{}': {} ({:.4}) in {}ms",
        prediction.crop, prediction.disease, prediction.confidence, elapsed_ms
    );

    Ok(Json(PredictResponse::new(prediction, elapsed_ms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_message() {
        assert_eq!(size_limit_message(5 * 1024 * 1024), "Image too large (max 5MB)");
        assert_eq!(size_limit_message(1000), "Image too large (max 1000 bytes)");
    }
}
