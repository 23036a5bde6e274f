//! Configuration discovery and loading
//!
//! Lookup order used by [`ConfigDiscovery`]:
//! 1. Current directory: ./tmc-core.toml or ./.tmc/config.toml
//! 2. User config: ~/.tmc/config.toml
//! 3. Built-in defaults

use crate::download::ExerciseLayout;
use crate::env;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Worker threads of an owned pool; `None` uses the available parallelism
    pub worker_threads: Option<usize>,
    /// Update cache file; must exist when the core is built
    pub cache_file: Option<PathBuf>,
    /// Report failed operations to the diagnostics sink
    pub send_diagnostics: bool,
    /// Server address the session starts with. Only recorded; the service
    /// is expected to be built for it, or told later via `select_server`
    pub server_address: Option<String>,
    pub student_source_dir: String,
    pub declaration_file: String,
    /// Build descriptors that mark an exercise root
    pub root_markers: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            cache_file: None,
            send_diagnostics: false,
            server_address: None,
            student_source_dir: env::exercise::STUDENT_SOURCE_DIR.to_string(),
            declaration_file: env::exercise::DECLARATION_FILE_NAME.to_string(),
            root_markers: env::exercise::DEFAULT_ROOT_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl CoreConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| CoreError::io("failed to read config", path, e))?;
        toml::from_str(&content).map_err(|e| {
            CoreError::Data(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Data(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|e| CoreError::io("failed to write config", path, e))
    }

    /// Worker count for an owned pool
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn exercise_layout(&self) -> ExerciseLayout {
        ExerciseLayout {
            student_source_dir: self.student_source_dir.clone(),
            declaration_file: self.declaration_file.clone(),
        }
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the first config found from `current_dir` and `home_dir`, or defaults
    pub fn discover(current_dir: &Path, home_dir: Option<&Path>) -> CoreResult<CoreConfig> {
        match Self::find_config_file(current_dir, home_dir) {
            Some(path) => {
                info!("Loading configuration from: {:?}", path);
                CoreConfig::from_toml_file(path)
            }
            None => {
                info!("No configuration file found, using defaults");
                Ok(CoreConfig::default())
            }
        }
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file(current_dir: &Path, home_dir: Option<&Path>) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = env::local_config_file_paths(current_dir).into();
        if let Some(home) = home_dir {
            candidates.push(env::user_config_file_path(home));
        }

        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }
}
