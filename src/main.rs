use std::env;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

use ssd_detect::{BatchDetector, Config, LabelSet, SsdSettings};

fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let config = Config::parse();
    config.validate()?;

    let settings = SsdSettings::ssd512_voc();
    ensure!(
        LabelSet::voc().len() == settings.n_classes + 1,
        "label set does not match the {} model classes",
        settings.n_classes
    );
    settings.log();
    info!("input directory: {}", config.input_dir.display());
    info!("output directory: {}", config.output_dir.display());
    info!("confidence threshold: {}", config.confidence);

    info!("loading weights from {}", config.weights.display());
    let detector = BatchDetector::with_ssd_model(config.clone())
        .with_context(|| format!("failed to load model {}", config.weights.display()))?;

    let summary = detector
        .process_directory()
        .with_context(|| format!("failed to process {}", config.input_dir.display()))?;
    info!(
        "done: {} images, {} detections",
        summary.images, summary.detections
    );

    Ok(())
}
