//! Job and scheduler configuration
//!
//! Configuration is plain serde data with per-field defaults, so a config
//! file only needs to name what it overrides:
//!
//! ```yaml
//! num_workers: 8
//! num_reduce: 4
//! scheduler:
//!   map_timeout: 5s
//!   reduce_timeout: 10s
//!   poll_interval: 200ms
//!   fence_stale_reports: false
//! ```
//!
//! YAML, TOML and JSON files are accepted, chosen by file extension.

use crate::error::{MapReduceError, MapReduceResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Lease and polling settings used by the coordinator and workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How long a map task may stay in progress before it is handed out again
    #[serde(default = "default_map_timeout", with = "humantime_serde")]
    pub map_timeout: Duration,

    /// How long a reduce task may stay in progress before it is handed out again
    #[serde(default = "default_reduce_timeout", with = "humantime_serde")]
    pub reduce_timeout: Duration,

    /// Upper bound on how long an idle worker waits before asking again
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Reject reports whose attempt is not the task's current attempt.
    /// Off by default: execution is at-least-once and a reassigned task may
    /// be reported twice.
    #[serde(default)]
    pub fence_stale_reports: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            map_timeout: default_map_timeout(),
            reduce_timeout: default_reduce_timeout(),
            poll_interval: default_poll_interval(),
            fence_stale_reports: false,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> MapReduceResult<()> {
        let durations = [
            ("scheduler.map_timeout", self.map_timeout),
            ("scheduler.reduce_timeout", self.reduce_timeout),
            ("scheduler.poll_interval", self.poll_interval),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(MapReduceError::invalid_config(
                    field,
                    format!("{value:?}"),
                    "must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

/// Top-level configuration for one MapReduce job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapReduceConfig {
    /// Number of concurrent worker loops
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Number of reduce partitions
    #[serde(default = "default_num_reduce")]
    pub num_reduce: usize,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for MapReduceConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            num_reduce: default_num_reduce(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

impl MapReduceConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> MapReduceResult<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| MapReduceError::ConfigParse {
            path: path.to_path_buf(),
            reason: "unsupported extension (expected .yaml, .yml, .toml or .json)".to_string(),
            source: None,
        })?;

        let contents = std::fs::read_to_string(path).map_err(|source| MapReduceError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&contents, format).map_err(|source| MapReduceError::ConfigParse {
            path: path.to_path_buf(),
            reason: source.to_string(),
            source: Some(source),
        })?;
        config.validate()?;

        debug!("Loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Parse configuration text without validating it
    pub fn parse(
        contents: &str,
        format: ConfigFormat,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config: MapReduceConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
            ConfigFormat::Toml => toml::from_str(contents)?,
            ConfigFormat::Json => serde_json::from_str(contents)?,
        };
        Ok(config)
    }

    pub fn validate(&self) -> MapReduceResult<()> {
        if self.num_workers == 0 {
            return Err(MapReduceError::invalid_config(
                "num_workers",
                self.num_workers,
                "at least one worker is required",
            ));
        }
        self.scheduler.validate()
    }
}

fn default_map_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_reduce_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_num_workers() -> usize {
    4
}

fn default_num_reduce() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn temp_config(suffix: &str) -> NamedTempFile {
        Builder::new().suffix(suffix).tempfile().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = MapReduceConfig::default();
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.num_reduce, 4);
        assert_eq!(config.scheduler.map_timeout, Duration::from_secs(5));
        assert_eq!(config.scheduler.reduce_timeout, Duration::from_secs(10));
        assert_eq!(config.scheduler.poll_interval, Duration::from_millis(200));
        assert!(!config.scheduler.fence_stale_reports);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml_keeps_defaults() {
        let yaml = "num_workers: 8\nscheduler:\n  map_timeout: 2s\n";
        let config = MapReduceConfig::parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.num_workers, 8);
        assert_eq!(config.num_reduce, 4);
        assert_eq!(config.scheduler.map_timeout, Duration::from_secs(2));
        assert_eq!(config.scheduler.reduce_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_toml_and_json() {
        let toml_text = r#"
num_reduce = 2

[scheduler]
poll_interval = "50ms"
fence_stale_reports = true
"#;
        let config = MapReduceConfig::parse(toml_text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.num_reduce, 2);
        assert_eq!(config.scheduler.poll_interval, Duration::from_millis(50));
        assert!(config.scheduler.fence_stale_reports);

        let json = r#"{"num_workers": 2, "scheduler": {"reduce_timeout": "1m"}}"#;
        let config = MapReduceConfig::parse(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.num_workers, 2);
        assert_eq!(config.scheduler.reduce_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = MapReduceConfig {
            num_workers: 0,
            ..MapReduceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MapReduceError::InvalidConfiguration { field, .. }) if field == "num_workers"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = MapReduceConfig::default();
        config.scheduler.poll_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(MapReduceError::InvalidConfiguration { field, .. }) if field == "scheduler.poll_interval"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = temp_config(".yml");
        writeln!(file, "num_reduce: 3").unwrap();

        let config = MapReduceConfig::load(file.path()).unwrap();
        assert_eq!(config.num_reduce, 3);
    }

    #[test]
    fn test_load_unknown_extension() {
        let file = temp_config(".ini");
        let err = MapReduceConfig::load(file.path()).unwrap_err();
        let MapReduceError::ConfigParse { source, .. } = &err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert!(source.is_none());
    }

    #[test]
    fn test_load_invalid_contents() {
        let mut file = temp_config(".json");
        write!(file, "{{ not json").unwrap();
        let err = MapReduceConfig::load(file.path()).unwrap_err();
        let MapReduceError::ConfigParse { source, .. } = &err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert!(source.is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = MapReduceConfig::load("/nonexistent/mapreduce.yaml").unwrap_err();
        assert!(matches!(err, MapReduceError::ConfigRead { .. }));
    }
}
