//! Receipt Scanner - Main Entry Point

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use scanner_cli::{init_logging, run_scan, CameraChoice, ScanOptions, ScannerConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "receipt-scanner")]
#[command(about = "Capture a receipt and send it for extraction")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./scanner.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture (or pick) an image and optionally submit it
    Scan {
        /// Image file to use instead of the camera
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Camera backend
        #[arg(long, value_enum, default_value_t = CameraChoice::Synthetic)]
        camera: CameraChoice,

        /// Send the image to the processing service
        #[arg(short, long)]
        submit: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ScannerConfig::load(cli.config.as_deref())?;
    init_logging(&config.log_level)?;

    info!("=== Receipt Scanner v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Scan {
            file,
            camera,
            submit,
            json,
        } => {
            let options = ScanOptions {
                file,
                camera,
                submit,
            };
            let status = run_scan(&config, &options).await?;

            match &status.result {
                Some(view) if json => println!("{}", serde_json::to_string_pretty(view)?),
                Some(view) => print!("{view}"),
                None => {
                    println!("Status: {}", status.mode);
                    if let Some(url) = &status.preview_url {
                        println!("Preview: {url}");
                    }
                }
            }

            if let Some(message) = status.last_error {
                bail!(message);
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
