use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use cropdoc::config::ModelArgs;
use cropdoc::{CropClassifier, ModelStore, OnnxSource, DEFAULT_TOP_K};
use log::info;

/// Classify a single leaf image from the command line
#[derive(Parser, Debug)]
#[command(name = "cropdoc_predict", author, version, about, long_about = None)]
struct Args {
    /// Image file to classify
    image: PathBuf,

    /// Crop the leaf belongs to (see the server's /crops for names)
    crop: String,

    /// Number of ranked labels to print
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cropdoc::init_logger();
    let args = Args::parse();

    let taxonomy = args.model.load_taxonomy()?;
    let crop = args.crop.trim();
    if !taxonomy.crop_index().contains(crop) {
        bail!(
            "Invalid crop: {}. Available crops: {}",
            crop,
            taxonomy.crop_index().crop_names().join(", ")
        );
    }

    let store = ModelStore::new_default()?;
    let model_path = args.model.resolve_model_path(&store);
    if args.model.needs_store() {
        store
            .ensure_artifact(
                &model_path,
                args.model.model_url.as_deref(),
                args.model.model_sha256.as_deref(),
            )
            .await?;
    }

    let image = std::fs::read(&args.image)
        .with_context(|| format!("failed to read image {:?}", args.image))?;

    let classifier = CropClassifier::builder()
        .with_taxonomy(taxonomy)
        .with_source(
            OnnxSource::new(&model_path)
                .with_runtime_config(args.model.runtime_config())
                .with_expected_sha256(args.model.model_sha256.clone()),
        )?
        .with_preprocess(args.model.preprocess_config())
        .with_top_k(args.top_k)
        .build()?;

    info!("Loading model from {:?}", model_path);
    classifier.load()?;

    let prediction = classifier.classify(&image, crop)?;

    println!("Crop: {}", prediction.crop);
    println!("Disease: {}", prediction.disease);
    println!("Confidence: {:.2}%", prediction.confidence * 100.0);
    println!("Top predictions:");
    for (rank, entry) in prediction.ranked.0.iter().enumerate() {
        println!("  {}. {}: {:.2}%", rank + 1, entry.label, entry.confidence * 100.0);
    }

    Ok(())
}
