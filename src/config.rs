//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\slideflow\config.toml
//! - macOS: ~/Library/Application Support/slideflow/config.toml
//! - Linux: ~/.config/slideflow/config.toml
//!
//! Every option is an explicit, typed field with a serde default, so a
//! partial file is fine. The whole config is validated once at load;
//! providers never re-interpret raw keys. Widget configurations from
//! the previous generation are translated in one explicit step by
//! [`migrate_legacy`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::model::MediaType;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Slideshow timing and history settings.
    pub playback: PlaybackConfig,

    /// Which media source to use.
    pub source: SourceConfig,

    /// Settings for the probabilistic subtree scanner.
    pub subfolder: SubfolderConfig,

    /// Settings for the indexed-catalog provider.
    pub indexed: IndexedConfig,

    /// Endpoints of the external catalog services.
    pub catalog: CatalogConfig,

    /// Scan reconnection cache.
    pub cache: CacheConfig,
}

/// What manual navigation does to the auto-advance countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Restart the countdown on manual navigation.
    #[default]
    Reset,
    /// Halt the timer until an explicit resume.
    Pause,
    /// Leave the running countdown untouched.
    Continue,
}

/// Slideshow timing and history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Seconds between automatic advances.
    pub interval_secs: u64,

    /// Effect of manual navigation on the countdown.
    pub advance_policy: AdvancePolicy,

    /// Maximum entries in the navigation history.
    pub history_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            advance_policy: AdvancePolicy::Reset,
            history_capacity: 100,
        }
    }
}

/// The configured media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One fixed file.
    Single,
    /// All media directly inside one folder.
    Folder,
    /// Weighted-random sample of a whole subtree.
    #[default]
    Subfolder,
    /// Paged queue over the external catalog index.
    Indexed,
}

/// Which source to use and where it is rooted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,

    /// Root locator: the file for `single`, the folder otherwise.
    /// Unused by `indexed` (see [`IndexedConfig::folder`]).
    pub root: String,
}

/// A path pattern granted a sampling-probability multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityFolder {
    /// Substring matched against folder locators.
    pub pattern: String,
    /// Acceptance-probability multiplier, > 1.0.
    pub weight: f64,
}

/// Settings for the probabilistic subtree scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubfolderConfig {
    /// Queue size the sampler aims to hold.
    pub target_queue_size: usize,

    /// Maximum folder depth below the root to descend into
    /// (0 = unlimited).
    pub max_depth: usize,

    /// User-supplied total file count. When set, the acceptance
    /// probability is computed against this instead of the adaptive
    /// estimate.
    pub total_estimate: Option<u64>,

    /// Folders granted extra sampling weight.
    pub priority_folders: Vec<PriorityFolder>,

    /// Fixed RNG seed, mainly for reproducible tests.
    pub seed: Option<u64>,
}

impl Default for SubfolderConfig {
    fn default() -> Self {
        Self {
            target_queue_size: 200,
            max_depth: 0,
            total_estimate: None,
            priority_folders: Vec::new(),
            seed: None,
        }
    }
}

/// Paging mode of the indexed provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Random batches, rotate forward.
    #[default]
    Random,
    /// Batches ordered by capture date.
    Sequential,
    /// One folder at a time, wrapping at the last.
    FolderSequential,
}

/// Settings for the indexed-catalog provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexedConfig {
    pub mode: QueueMode,

    /// Restrict the query to one folder subtree.
    pub folder: Option<String>,

    /// Restrict the query to one media class.
    pub file_type: Option<MediaType>,

    /// Items requested per catalog query.
    pub batch_size: usize,

    /// Refill when this close to the end of the queue.
    pub low_threshold: usize,

    /// How many positions ahead of the current item to enrich.
    pub lookahead: usize,
}

impl Default for IndexedConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::Random,
            folder: None,
            file_type: None,
            batch_size: 50,
            low_threshold: 5,
            lookahead: 3,
        }
    }
}

/// Endpoints of the external catalog services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the catalog index API. Required for `indexed`.
    pub base_url: String,

    /// Base URL of the reverse-geocoding service. Empty disables
    /// place enrichment.
    pub geocode_url: String,
}

/// Scan reconnection cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum scan snapshots retained across reconnects.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 8 }
    }
}

impl Config {
    /// Check cross-field requirements once, at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.playback.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "playback.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.playback.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "playback.history_capacity must be at least 1".to_string(),
            ));
        }

        match self.source.kind {
            SourceKind::Indexed => {
                if self.catalog.base_url.is_empty() {
                    return Err(ConfigError::Invalid(
                        "indexed source requires catalog.base_url".to_string(),
                    ));
                }
                if self.indexed.batch_size == 0 {
                    return Err(ConfigError::Invalid(
                        "indexed.batch_size must be at least 1".to_string(),
                    ));
                }
            }
            _ => {
                if self.source.root.is_empty() {
                    return Err(ConfigError::Invalid(
                        "source.root is required".to_string(),
                    ));
                }
            }
        }

        if self.source.kind == SourceKind::Subfolder && self.subfolder.target_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "subfolder.target_queue_size must be at least 1".to_string(),
            ));
        }
        for priority in &self.subfolder.priority_folders {
            if priority.weight < 1.0 {
                return Err(ConfigError::Invalid(format!(
                    "priority folder '{}' has weight {} (must be >= 1.0)",
                    priority.pattern, priority.weight
                )));
            }
        }

        Ok(())
    }
}

/// Translate a previous-generation flat widget configuration.
///
/// The old widget stored everything as loose string keys with inline
/// fallback chains; this is the single place those keys are interpreted.
/// Unknown keys are ignored, unparseable values fall back to defaults.
pub fn migrate_legacy(legacy: &HashMap<String, String>) -> Config {
    let mut config = Config::default();

    if let Some(path) = legacy.get("path") {
        config.source.root = path.clone();
    }
    if let Some(mode) = legacy.get("mode") {
        config.source.kind = match mode.as_str() {
            "single_file" => SourceKind::Single,
            "folder" => SourceKind::Folder,
            "random_subfolders" => SourceKind::Subfolder,
            "indexed" => SourceKind::Indexed,
            other => {
                tracing::warn!("unknown legacy mode '{other}', keeping default");
                config.source.kind
            }
        };
    }

    fn parse<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str) -> Option<T> {
        map.get(key).and_then(|v| v.parse().ok())
    }

    if let Some(size) = parse(legacy, "queueSize") {
        config.subfolder.target_queue_size = size;
    }
    if let Some(depth) = parse(legacy, "scanDepth") {
        config.subfolder.max_depth = depth;
    }
    if let Some(estimate) = parse(legacy, "totalEstimate") {
        config.subfolder.total_estimate = Some(estimate);
    }
    if let Some(interval) = parse(legacy, "updateInterval") {
        config.playback.interval_secs = interval;
    }
    if let Some(capacity) = parse(legacy, "historySize") {
        config.playback.history_capacity = capacity;
    }
    if let Some(batch) = parse(legacy, "batchSize") {
        config.indexed.batch_size = batch;
    }

    // "pattern:weight,pattern:weight"
    if let Some(raw) = legacy.get("priorityFolders") {
        for part in raw.split(',').filter(|p| !p.is_empty()) {
            let Some((pattern, weight)) = part.rsplit_once(':') else {
                tracing::warn!("ignoring malformed priority folder entry '{part}'");
                continue;
            };
            match weight.parse::<f64>() {
                Ok(weight) if weight >= 1.0 => {
                    config.subfolder.priority_folders.push(PriorityFolder {
                        pattern: pattern.to_string(),
                        weight,
                    });
                }
                _ => tracing::warn!("ignoring priority folder '{part}' with bad weight"),
            }
        }
    }

    config
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("slideflow"))
}

/// Get the full path to the config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk.
///
/// Returns default config if the file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk.
///
/// Creates the config directory if it doesn't exist. The write is
/// atomic (temp file, then rename).
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
