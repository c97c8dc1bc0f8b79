//! HTTP surface of the crop disease classifier.
//!
//! | route | |
//! |---|---|
//! | `GET /health` | liveness and model-loaded flag, never touches the model |
//! | `GET /crops` | sorted crop names |
//! | `GET /info` | static model metadata |
//! | `POST /predict` | multipart `image` + `crop`, crop-constrained prediction |

mod response;
mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::classifier::CropClassifier;
use crate::config::DEFAULT_MAX_IMAGE_BYTES;

pub use response::{ApiError, CropsResponse, HealthResponse, InfoResponse, PredictResponse};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest accepted image, larger uploads get 413
    pub max_image_bytes: usize,
    pub model_name: String,
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            model_name: "Crop Disease Detection Model".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Transport limit for request bodies. Leaves room above the image ceiling so
    /// oversize images reach the handler and get a descriptive error.
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes.saturating_mul(2).max(1024 * 1024)
    }
}

pub struct AppState {
    pub classifier: Arc<CropClassifier>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(classifier: Arc<CropClassifier>, config: ServerConfig) -> Self {
        Self { classifier, config }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.body_limit();

    Router::new()
        .route("/health", get(routes::health))
        .route("/crops", get(routes::crops))
        .route("/info", get(routes::info))
        .route("/predict", post(routes::predict))
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves until Ctrl-C is received.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
