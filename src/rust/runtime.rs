use std::sync::OnceLock;

use log::debug;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::classifier::CropDocError;

/// Outcome of the one-time ONNX Runtime environment setup, shared by every session.
static ENVIRONMENT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimization applied when a model session is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optimization {
    Disabled,
    Basic,
    Extended,
    #[default]
    All,
}

impl From<Optimization> for GraphOptimizationLevel {
    fn from(level: Optimization) -> Self {
        match level {
            Optimization::Disabled => GraphOptimizationLevel::Disable,
            Optimization::Basic => GraphOptimizationLevel::Level1,
            Optimization::Extended => GraphOptimizationLevel::Level2,
            Optimization::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// Session options for the image classifier. Zero thread counts leave the choice
/// to ONNX Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization: Optimization,
}

/// Initializes the process-wide ONNX Runtime environment on first call.
///
/// A failed initialization is remembered and reported to every later caller.
pub fn ensure_initialized() -> Result<(), CropDocError> {
    ENVIRONMENT
        .get_or_init(|| {
            ort::init()
                .with_name("cropdoc")
                .commit()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(|e| CropDocError::ModelLoad(format!("Failed to initialize ONNX Runtime: {}", e)))
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, CropDocError> {
    ensure_initialized()?;
    debug!("Creating session builder with {:?}", config);

    let mut builder = Session::builder()?;
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    Ok(builder.with_optimization_level(config.optimization.into())?)
}
