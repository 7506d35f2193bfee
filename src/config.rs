use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PlayerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Name announced to the MIDI system.
    pub client_name: String,
    pub output_port: usize,
    /// When set, relay this input port instead of playing a file.
    pub input_port: Option<usize>,
    /// Milliseconds
    pub poll_interval_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            client_name: "pianola".to_string(),
            output_port: 0,
            input_port: None,
            poll_interval_ms: 100,
            log_filter: "warn".to_string(),
            log_file: None,
        }
    }
}

impl PlayerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let ron_string = fs::read_to_string(path)?;
        Self::from_ron(&ron_string)
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        let config: PlayerConfig =
            ron::from_str(source).map_err(|e| PlayerError::Config(e.to_string()))?;
        if config.poll_interval_ms == 0 {
            return Err(PlayerError::Config(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = PlayerConfig::from_ron("(output_port: 2)").unwrap();
        assert_eq!(config.output_port, 2);
        assert_eq!(config.client_name, "pianola");
        assert_eq!(config.input_port, None);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_full_config() {
        let config = PlayerConfig::from_ron(
            r#"(
                client_name: "studio",
                output_port: 1,
                input_port: Some(3),
                poll_interval_ms: 20,
                log_filter: "pianola=debug",
                log_file: Some("/tmp/pianola.log"),
            )"#,
        )
        .unwrap();
        assert_eq!(config.client_name, "studio");
        assert_eq!(config.input_port, Some(3));
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/pianola.log")));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            PlayerConfig::from_ron("(output_port: \"one\")"),
            Err(PlayerError::Config(_))
        ));
        assert!(matches!(
            PlayerConfig::from_ron("(poll_interval_ms: 0)"),
            Err(PlayerError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(output_port: 4, log_filter: \"info\")").unwrap();
        let config = PlayerConfig::load(file.path()).unwrap();
        assert_eq!(config.output_port, 4);
        assert_eq!(config.log_filter, "info");

        assert!(matches!(
            PlayerConfig::load(Path::new("/nonexistent/pianola.ron")),
            Err(PlayerError::Io(_))
        ));
    }
}
