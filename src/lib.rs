pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod io_utils;
pub mod pipeline;
pub mod profile;
pub mod reconcile;
pub mod report;
pub mod rules;
pub mod schema;
pub mod store;
pub mod table;
pub mod transform;
pub mod upload;

use std::{env, sync::OnceLock};

use anyhow::{Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands},
    config::{DatabaseConfig, FileConfig, PipelineConfig},
    pipeline::RunReport,
    store::{CsvStore, TableStore},
    upload::{PostgresSink, UploadReport},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("olist_etl", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    // A missing .env file is normal; real environment variables still apply.
    let _ = dotenvy::dotenv();
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Upload(args) => handle_upload(&args),
        Commands::Profile(args) => handle_profile(&args),
    }
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let file = FileConfig::load_optional(args.locations.config.as_deref())?;
    let mut config = PipelineConfig::resolve(&args.locations, args.reconcile_mode, &file)?;
    config.reconcile = !args.skip_reconcile;
    // Checked before any cleaning work starts.
    let database = if args.upload {
        Some(DatabaseConfig::resolve(&args.database, &file)?)
    } else {
        None
    };
    debug!("Resolved configuration: {config:?}");
    info!(
        "Cleaning datasets from {:?} into {:?} (reconcile: {})",
        config.input_dir,
        config.output_dir,
        if config.reconcile {
            format!("{:?}", config.reconcile_mode).to_lowercase()
        } else {
            "off".to_string()
        }
    );

    let mut store = CsvStore::new(
        &config.input_dir,
        &config.output_dir,
        config.delimiter,
        config.encoding,
    );
    let report = pipeline::run(&config, &mut store);
    log_run_summary(&report);

    if let Some(database) = database {
        let mut sink = PostgresSink::connect(&database)?;
        let uploads = upload::upload_cleaned(&store, &mut sink)?;
        log_upload_summary(&uploads);
    }

    if !report.failed_writes.is_empty() {
        bail!(
            "Failed to write {} output file(s): {}",
            report.failed_writes.len(),
            report.failed_writes.join(", ")
        );
    }
    Ok(())
}

fn handle_upload(args: &cli::UploadArgs) -> Result<()> {
    let file = FileConfig::load_optional(args.locations.config.as_deref())?;
    let output_dir = config::resolve_output_dir(&args.locations, &file)?;
    let database = DatabaseConfig::resolve(&args.database, &file)?;
    let store = config::output_store(&args.locations, &file)?;
    if store.list_outputs(dataset::CLEANED_PREFIX)?.is_empty() {
        warn!("No cleaned files found in {output_dir:?}; nothing to upload");
        return Ok(());
    }
    let mut sink = PostgresSink::connect(&database)?;
    let uploads = upload::upload_cleaned(&store, &mut sink)?;
    log_upload_summary(&uploads);
    Ok(())
}

fn handle_profile(args: &cli::ProfileArgs) -> Result<()> {
    let file = FileConfig::load_optional(args.locations.config.as_deref())?;
    let input_dir = config::resolve_input_dir(&args.locations, &file)?;
    let delimiter = config::resolve_delimiter(&args.locations, &file)?;
    let encoding = config::resolve_input_encoding(&args.locations, &file)?;
    let profiles = profile::profile_folder(&input_dir, delimiter, encoding)?;
    if args.json {
        println!("{}", profile::render_json(&profiles)?);
    } else {
        print!("{}", profile::render_text(&profiles));
    }
    Ok(())
}

fn log_run_summary(report: &RunReport) {
    for summary in &report.datasets {
        info!(
            "{}: {} raw, {} cleaned, {} final",
            summary.kind, summary.raw_rows, summary.cleaned_rows, summary.final_rows
        );
    }
    if !report.skipped.is_empty() {
        let skipped: Vec<String> = report.skipped.iter().map(|kind| kind.to_string()).collect();
        warn!("Skipped {} dataset(s): {}", skipped.len(), skipped.join(", "));
    }
}

fn log_upload_summary(report: &UploadReport) {
    info!(
        "Uploaded {} file(s); {} failed, {} unmapped",
        report.uploaded.len(),
        report.failed.len(),
        report.unmapped.len()
    );
}
