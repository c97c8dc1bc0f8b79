use cropdoc::model_store::sha256_file;
use cropdoc::{ModelStore, ModelStoreError};

#[tokio::test]
async fn test_model_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path().join("models"))?;

    assert!(store.models_dir().is_dir());
    assert!(store.default_model_path().ends_with("models/crop_disease_model.onnx"));
    Ok(())
}

#[tokio::test]
async fn test_model_verification() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;
    let path = store.default_model_path();

    // Clean slate: nothing to verify, nothing to download from
    assert!(!store.verify_file(&path, "00")?);
    assert!(matches!(
        store.ensure_artifact(&path, None, None).await,
        Err(ModelStoreError::NotFound(_))
    ));

    std::fs::write(&path, b"onnx bytes")?;
    let digest = sha256_file(&path)?;
    assert_eq!(digest.len(), 64);
    store.ensure_artifact(&path, None, Some(&digest)).await?;

    std::fs::write(&path, b"tampered onnx bytes")?;
    assert!(matches!(
        store.ensure_artifact(&path, None, Some(&digest)).await,
        Err(ModelStoreError::HashMismatch { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_download() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;
    let path = dir.path().join("nested").join("model.onnx");

    // Port 9 on loopback refuses connections
    let result = store
        .ensure_artifact(&path, Some("http://127.0.0.1:9/model.onnx"), None)
        .await;
    assert!(matches!(result, Err(ModelStoreError::DownloadError(_))));
    assert!(!path.exists());
    Ok(())
}
