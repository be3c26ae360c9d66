//! Batch generation example
//!
//! Runs the pipeline over one contiguous batch of a city list and prints the
//! index the next batch should start at.
//!
//! ```bash
//! # .env: PERPLEXITY_API_KEY=...
//! cargo run --example generate_batch -- --cities cities.json --start 0 --batch 10
//! cargo run --example generate_batch -- --cities cities.json --all --force
//! ```
//!
//! Flags:
//! - `--cities PATH` - entity list document (default: `cities.json`)
//! - `--config PATH` - JSON config file (default: built-in defaults)
//! - `--start N` / `--batch N` - subrange to process (default: 0 / 10)
//! - `--all` - process the whole list instead of a batch
//! - `--force` - regenerate entities that already have output

use city_directory::config::{API_URL_ENV, Config, MODEL_ENV, ProviderConfig};
use city_directory::storage::{ContentStore, FsContentStore};
use city_directory::types::load_entities;
use city_directory::{PerplexityClient, Pipeline, PipelineEvent, RecordBuilder};
use std::sync::Arc;

struct Args {
    cities: String,
    config: Option<String>,
    start: usize,
    batch: usize,
    all: bool,
    force: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        cities: "cities.json".to_string(),
        config: None,
        start: 0,
        batch: 10,
        all: false,
        force: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || iter.next().ok_or_else(|| format!("{flag} needs a value"));
        match flag.as_str() {
            "--cities" => args.cities = value()?,
            "--config" => args.config = Some(value()?),
            "--start" => args.start = value()?.parse().map_err(|e| format!("--start: {e}"))?,
            "--batch" => args.batch = value()?.parse().map_err(|e| format!("--batch: {e}"))?,
            "--all" => args.all = true,
            "--force" => args.force = true,
            other => return Err(format!("unknown flag: {other}")),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "city_directory=info".into()),
        )
        .init();

    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    // environment wins over the config file for the credential and endpoint
    let env = ProviderConfig::from_env()?;
    config.provider.api_key = env.api_key;
    if std::env::var(API_URL_ENV).is_ok() {
        config.provider.api_url = env.api_url;
    }
    if std::env::var(MODEL_ENV).is_ok() {
        config.provider.model = env.model;
    }
    config.validate()?;

    let entities = load_entities(&args.cities)?;
    println!("Loaded {} cities from {}", entities.len(), args.cities);

    let store: Arc<dyn ContentStore> = Arc::new(FsContentStore::from_config(&config.storage));
    let client = PerplexityClient::new(config.provider.clone())?.with_cache(store.clone());
    let pipeline = Pipeline::new(
        store,
        Arc::new(client),
        Arc::new(RecordBuilder::default()),
        entities,
        config.pipeline,
    );

    let mut events = pipeline.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PipelineEvent::EntitySkipped { slug } => println!("- {slug}: already present"),
                PipelineEvent::EntitySucceeded { slug, path } => println!("✓ {slug}: {path}"),
                PipelineEvent::EntityFailed { slug, error } => println!("✗ {slug}: {error}"),
                _ => {}
            }
        }
    });

    let skip_existing = pipeline.config().skip_existing && !args.force;
    let report = if args.all {
        pipeline.run_full(skip_existing).await?
    } else {
        pipeline.run_range(args.start, args.batch, skip_existing).await?
    };

    println!(
        "\n{} succeeded, {} skipped, {} failed",
        report.succeeded_count, report.skipped_count, report.failed_count
    );
    match report.next_start {
        Some(next) => println!("Next batch: --start {next} --batch {}", args.batch),
        None if !args.all => println!("All cities processed"),
        None => {}
    }

    Ok(())
}
