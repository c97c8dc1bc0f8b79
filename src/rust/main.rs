use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use cropdoc::config::ServerArgs;
use cropdoc::server::{self, AppState};
use cropdoc::{CropClassifier, ModelStore, OnnxSource, DEFAULT_TOP_K};
use log::{error, info, warn};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cropdoc::init_logger();
    let args = ServerArgs::parse();

    info!("=== Starting Crop Disease Detection Service ===");

    let taxonomy = args.model.load_taxonomy().context("failed to load class labels")?;
    info!(
        "Loaded {} class labels across {} crops",
        taxonomy.len(),
        taxonomy.crop_index().len()
    );

    let store = ModelStore::new_default().context("failed to open model cache")?;
    let model_path = args.model.resolve_model_path(&store);

    // A missing artifact is not fatal; the service answers with "Model not loaded"
    if args.model.needs_store() {
        if let Err(e) = store
            .ensure_artifact(
                &model_path,
                args.model.model_url.as_deref(),
                args.model.model_sha256.as_deref(),
            )
            .await
        {
            error!("Model artifact unavailable: {}", e);
        }
    }

    let source = OnnxSource::new(&model_path)
        .with_runtime_config(args.model.runtime_config())
        .with_expected_sha256(args.model.model_sha256.clone());

    let classifier = CropClassifier::builder()
        .with_taxonomy(taxonomy)
        .with_source(source)?
        .with_preprocess(args.model.preprocess_config())
        .with_top_k(DEFAULT_TOP_K)
        .build()?;
    let classifier = Arc::new(classifier);

    if args.lazy {
        info!("Lazy loading enabled, model will load on first prediction");
    } else {
        let start = Instant::now();
        let loader = Arc::clone(&classifier);
        match tokio::task::spawn_blocking(move || loader.load()).await? {
            Ok(()) => info!("Model loaded from {:?} in {:.2?}", model_path, start.elapsed()),
            Err(e) => warn!("Model failed to load, predictions will retry: {}", e),
        }
    }

    let listener = TcpListener::bind(args.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", args.bind_address()))?;

    let state = Arc::new(AppState::new(classifier, args.server_config()));
    server::serve(listener, state).await?;

    info!("=== Service stopped ===");
    Ok(())
}
