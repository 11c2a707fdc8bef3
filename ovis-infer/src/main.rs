//! ovis-infer command-line entry point
//!
//! - `flatten`: stream a raw accelerometer CSV into a flattened-window CSV
//! - `persist`: write a labeled-window CSV to InfluxDB

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ovis_common::config::TomlConfig;
use ovis_common::TimestampParser;
use tracing::info;

use ovis_infer::export::{default_flattened_output, flatten_file_with, read_labeled_file};
use ovis_infer::{persist, InfluxClient, WindowSpec};

/// Command-line arguments for ovis-infer
#[derive(Parser, Debug)]
#[command(name = "ovis-infer")]
#[command(about = "Sheep behaviour windowing and result persistence")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, global = true, env = "OVIS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten a raw CSV into fixed-length windows
    Flatten {
        /// Raw accelerometer CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV (default: <input stem>__flattened.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Raw rows per chunk (multiple of the window length)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Samples per window
        #[arg(short, long)]
        window: Option<usize>,

        /// Name of the timestamp column
        #[arg(long)]
        time_column: Option<String>,
    },

    /// Write a labeled CSV to InfluxDB
    Persist {
        /// Labeled CSV (flattened columns plus behaviour, confidence)
        #[arg(short, long)]
        input: PathBuf,

        /// Samples per window in the labeled file
        #[arg(short, long)]
        window: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = TomlConfig::load_with_source(args.config.as_deref())
        .context("Failed to load configuration")?;
    config.apply_env_overrides();

    ovis_common::logging::init_tracing(&config.logging.level)
        .context("Failed to initialize logging")?;
    source.log();

    match args.command {
        Command::Flatten {
            input,
            output,
            chunk_size,
            window,
            time_column,
        } => {
            let output = output.unwrap_or_else(|| default_flattened_output(&input));
            let chunk_size = chunk_size.unwrap_or(config.pipeline.chunk_size);
            let window_length = window.unwrap_or(config.pipeline.window_length);
            let time_column = time_column.unwrap_or_else(|| config.pipeline.time_column.clone());

            let mut spec = WindowSpec::new(window_length, time_column)?;
            if let Some(entity) = config.pipeline.entity_column() {
                spec = spec.with_entity_column(entity);
            }

            info!(
                input = %input.display(),
                chunk_size,
                window_length,
                "Flattening"
            );
            let windows = flatten_file_with(&input, &output, chunk_size, &spec)
                .with_context(|| format!("Failed to flatten {}", input.display()))?;

            println!("Saved: {} ({} windows)", output.display(), windows);
        }

        Command::Persist { input, window } => {
            let window_length = window.unwrap_or(config.pipeline.window_length);
            config.pipeline.validate()?;
            let entity = config.pipeline.entity_column();

            let labeled = read_labeled_file(&input, window_length, entity)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let client = InfluxClient::from_config(&config.influx)?;
            let parser = TimestampParser::new(config.pipeline.utc_offset()?);

            let written = persist(
                &labeled,
                &client,
                &config.pipeline.measurement,
                entity,
                &parser,
            )
            .await
            .context("Failed to write to InfluxDB")?;

            println!(
                "Wrote {} of {} rows to bucket '{}'",
                written,
                labeled.len(),
                client.bucket()
            );
        }
    }

    Ok(())
}
