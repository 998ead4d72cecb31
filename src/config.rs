//! Reasoner configuration, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on saturation workers; more threads than this only add
/// contention on the shared queue.
const MAX_WORKER_THREADS: usize = 1024;

/// Configuration for a [`Reasoner`](crate::reasoner::Reasoner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonerConfig {
    /// Saturation worker threads. `0` uses one per logical CPU, `1` runs
    /// on the calling thread.
    #[serde(default)]
    pub worker_threads: usize,
    /// Reuse the previous classification when axioms are added or removed.
    /// When `false` every classify starts from scratch.
    #[serde(default = "default_incremental")]
    pub incremental: bool,
    /// Check taxonomy invariants after every build.
    #[serde(default)]
    pub validate_taxonomy: bool,
}

fn default_incremental() -> bool {
    true
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            incremental: default_incremental(),
            validate_taxonomy: false,
        }
    }
}

impl ReasonerConfig {
    /// Parse from a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads > MAX_WORKER_THREADS {
            return Err(ConfigError::Invalid {
                message: format!(
                    "worker_threads must be at most {MAX_WORKER_THREADS}, got {}",
                    self.worker_threads
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ReasonerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReasonerConfig::default());
        assert!(config.incremental);
    }

    #[test]
    fn fields_are_read() {
        let config = ReasonerConfig::from_toml_str(
            "worker_threads = 4\nincremental = false\nvalidate_taxonomy = true\n",
        )
        .unwrap();
        assert_eq!(config.worker_threads, 4);
        assert!(!config.incremental);
        assert!(config.validate_taxonomy);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            ReasonerConfig::from_toml_str("worker_threads = \"many\""),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            ReasonerConfig::from_toml_str("worker_threads = 100000"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let config = ReasonerConfig {
            worker_threads: 2,
            incremental: false,
            validate_taxonomy: true,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ReasonerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reasoner.toml");
        std::fs::write(&path, "worker_threads = 1\n").unwrap();
        assert_eq!(ReasonerConfig::load(&path).unwrap().worker_threads, 1);
        assert!(matches!(
            ReasonerConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
