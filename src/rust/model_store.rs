use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::classifier::CropDocError;

/// File name of the model artifact inside the models directory.
pub const DEFAULT_MODEL_FILE: &str = "crop_disease_model.onnx";

#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    #[error("Model file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl From<ModelStoreError> for CropDocError {
    fn from(err: ModelStoreError) -> Self {
        CropDocError::ModelLoad(err.to_string())
    }
}

/// Lowercase hex SHA-256 digest of a file.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(sha256_hex(&bytes))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Locates the model artifact on disk and fetches it when it is missing.
#[derive(Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelStore {
    /// Creates a new ModelStore with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("CROPDOC_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("cropdoc").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("cropdoc").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("cropdoc").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn default_model_path(&self) -> PathBuf {
        self.models_dir.join(DEFAULT_MODEL_FILE)
    }

    /// Checks `path` against `expected_hash`. A missing file is reported as `Ok(false)`.
    pub fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelStoreError> {
        if !path.exists() {
            log::info!("File {:?} does not exist", path);
            return Ok(false);
        }
        let hash = sha256_file(path)?;
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Ensures the artifact at `path` exists and, when a digest is given, matches it.
    ///
    /// A missing or mismatching file is downloaded from `url` when one is configured.
    /// Without a URL the file must already be in place.
    pub async fn ensure_artifact(
        &self,
        path: &Path,
        url: Option<&str>,
        expected_hash: Option<&str>,
    ) -> Result<(), ModelStoreError> {
        let _lock = self.download_lock.lock().await;

        if path.exists() {
            let Some(expected) = expected_hash else {
                log::info!("Model artifact present at {:?}", path);
                return Ok(());
            };

            if self.verify_file(path, expected)? {
                log::info!("Existing model artifact verified successfully");
                return Ok(());
            }

            let actual = sha256_file(path)?;
            match url {
                Some(url) => {
                    log::warn!("Model artifact verification failed, redownloading");
                    self.download_and_verify_file(url, path, expected_hash).await
                }
                None => Err(ModelStoreError::HashMismatch {
                    path: path.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                }),
            }
        } else {
            match url {
                Some(url) => {
                    log::info!("Model artifact does not exist, downloading...");
                    self.download_and_verify_file(url, path, expected_hash).await
                }
                None => Err(ModelStoreError::NotFound(path.to_path_buf())),
            }
        }
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
    ) -> Result<(), ModelStoreError> {
        log::info!("Downloading model from {} to {:?}", url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        log::info!("Download response status: {}", response.status());
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = sha256_hex(&bytes);
        log::info!("Calculated hash: {}", hash);

        if let Some(expected) = expected_hash {
            if !hash.eq_ignore_ascii_case(expected) {
                log::error!("Model hash mismatch: expected {}, got {}", expected, hash);
                return Err(ModelStoreError::HashMismatch {
                    path: path.to_path_buf(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        log::info!("Writing {} bytes to {:?}", bytes.len(), path);
        fs::write(path, &bytes)?;

        log::info!("Model artifact downloaded successfully");
        Ok(())
    }
}
