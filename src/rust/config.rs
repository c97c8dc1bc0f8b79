use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser};

use crate::classifier::CropDocError;
use crate::model_store::ModelStore;
use crate::preprocess::{PreprocessConfig, TensorLayout, DEFAULT_INPUT_SIZE};
use crate::runtime::RuntimeConfig;
use crate::server::ServerConfig;
use crate::taxonomy::Taxonomy;

/// Largest accepted image upload.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Model and preprocessing options shared by the server and the offline tool.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to the ONNX model artifact [default: <cache>/cropdoc/models/crop_disease_model.onnx]
    #[arg(long = "model", env = "CROPDOC_MODEL")]
    pub model_path: Option<PathBuf>,

    /// URL to download the model from when the artifact is missing
    #[arg(long, env = "CROPDOC_MODEL_URL")]
    pub model_url: Option<String>,

    /// Expected SHA-256 digest of the model artifact (hex)
    #[arg(long, env = "CROPDOC_MODEL_SHA256")]
    pub model_sha256: Option<String>,

    /// JSON labels file in model output order [default: built-in taxonomy]
    #[arg(long, env = "CROPDOC_LABELS")]
    pub labels: Option<PathBuf>,

    /// Square input resolution of the model
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
    pub input_size: u32,

    /// Input tensor layout (nhwc or nchw)
    #[arg(long, default_value_t = TensorLayout::Nhwc)]
    pub layout: TensorLayout,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    pub intra_threads: usize,
}

impl ModelArgs {
    pub fn load_taxonomy(&self) -> Result<Arc<Taxonomy>, CropDocError> {
        match &self.labels {
            Some(path) => Ok(Arc::new(Taxonomy::from_json_file(path)?)),
            None => Ok(Taxonomy::builtin()),
        }
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            size: self.input_size,
            layout: self.layout,
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            intra_threads: self.intra_threads,
            ..RuntimeConfig::default()
        }
    }

    pub fn resolve_model_path(&self, store: &ModelStore) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| store.default_model_path())
    }

    /// True when the artifact should go through the model store before loading
    pub fn needs_store(&self) -> bool {
        self.model_url.is_some() || self.model_sha256.is_some()
    }
}

/// Crop disease classification HTTP service
#[derive(Parser, Debug)]
#[command(name = "cropdoc_server", author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Largest accepted image upload in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    pub max_image_bytes: usize,

    /// Defer loading the model until the first prediction
    #[arg(long)]
    pub lazy: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl ServerArgs {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            max_image_bytes: self.max_image_bytes,
            ..ServerConfig::default()
        }
    }
}
