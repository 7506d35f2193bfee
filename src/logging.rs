use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
///
/// Logs go to the configured file when there is one: during playback the
/// terminal belongs to the keyboard display.
pub fn init(config: &PlayerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| PlayerError::Config(format!("invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| PlayerError::Config(format!("couldn't install logger: {e}")))
}
