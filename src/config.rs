use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for a single fetch operation in milliseconds (10 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 10_000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// File name suffixes read by default when walking a manifest tree
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

const APP_NAME: &str = "manifest-drift";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub scan: ScanConfig,
    pub fetch: FetchConfig,
    pub detectors: DetectorsConfig,
    pub registries: RegistriesConfig,
}

/// Which files are read while walking the manifest tree
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Remote fetch behaviour
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Delay between consecutive fetch starts within one detector
    pub stagger_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: FETCH_TIMEOUT_MS,
            stagger_delay_ms: FETCH_STAGGER_DELAY_MS,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn stagger_delay(&self) -> Duration {
        Duration::from_millis(self.stagger_delay_ms)
    }
}

/// Detector toggles
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorsConfig {
    pub helm_release: DetectorConfig,
    pub image: DetectorConfig,
}

/// Individual detector configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    pub enabled: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Registry-specific configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistriesConfig {
    pub container: ContainerRegistryConfig,
}

/// Container registry access
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerRegistryConfig {
    /// Send every registry request to this base URL instead of the image's host
    pub endpoint: Option<String>,
    /// Registry hosts reached over plain HTTP
    pub plain_http: Vec<String>,
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = config_path();
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml_ng::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
    }
}

/// Returns the path to the config directory for manifest-drift.
/// Uses $XDG_CONFIG_HOME/manifest-drift if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/manifest-drift,
/// or ./manifest-drift if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join(APP_NAME)
}
