//! Receipt Scanner Host
//!
//! Wires the capture session to a camera provider and the processing
//! service, driven from the command line.

mod config;
mod scan;

pub use config::{ScannerConfig, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use scan::{run_scan, CameraChoice, ScanOptions};

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging.
///
/// `RUST_LOG` wins over `level`. Logs go to stderr so stdout stays clean for
/// scan output.
pub fn init_logging(level: &str) -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
