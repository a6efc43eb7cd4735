//! Configuration management

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Query-string key the front-end package manager stamps onto the loader URL
pub const DEFAULT_TAG_KEY: &str = "hacstag";

/// Matched against the last path segment of a script's `src`
const DEFAULT_ENTRY_PATTERN: &str = r"(^|/)dashboard-strategy(\.min)?\.js$";
const DEFAULT_LOADER_PATTERN: &str = r"(^|/)loader(\.min)?\.js$";

/// Submodules imported by the loader, in load order
const DEFAULT_MANIFEST: &[&str] = &[
    "./version.js",
    "./helpers.js",
    "./cards.js",
    "./views.js",
    "./strategy.js",
];

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_tag_key")]
    pub tag_key: String,

    /// Filename pattern of the strategy's entry bundle
    #[serde(default = "default_entry_pattern")]
    pub entry_pattern: String,

    /// Filename pattern of the loader shim, used when no entry script is found
    #[serde(default = "default_loader_pattern")]
    pub loader_pattern: String,

    /// Base URL for resolution; defaults to the loader module's own URL
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,
}

fn default_tag_key() -> String {
    DEFAULT_TAG_KEY.to_string()
}

fn default_entry_pattern() -> String {
    DEFAULT_ENTRY_PATTERN.to_string()
}

fn default_loader_pattern() -> String {
    DEFAULT_LOADER_PATTERN.to_string()
}

fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            tag_key: default_tag_key(),
            entry_pattern: default_entry_pattern(),
            loader_pattern: default_loader_pattern(),
            base_url: None,
            manifest: default_manifest(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tag key must not be empty")]
    EmptyTagKey,

    #[error("tag key {0:?} must use only unreserved URL characters (A-Z a-z 0-9 - . _ ~)")]
    InvalidTagKey(String),

    #[error("invalid {field} pattern {pattern:?}: {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Validated discovery settings derived from [`LoaderConfig`]
#[derive(Debug, Clone)]
pub struct TagSettings {
    pub key: String,
    pub entry: Regex,
    pub loader: Regex,
}

impl TagSettings {
    /// Settings with the default patterns and a custom key
    pub fn with_key(key: impl Into<String>) -> Result<Self, ConfigError> {
        LoaderConfig {
            tag_key: key.into(),
            ..LoaderConfig::default()
        }
        .compile()
    }
}

impl LoaderConfig {
    /// Validate the key and compile the script filename patterns
    pub fn compile(&self) -> Result<TagSettings, ConfigError> {
        let key = self.tag_key.trim();
        if key.is_empty() {
            return Err(ConfigError::EmptyTagKey);
        }
        // Must survive percent-encoding unchanged so a tagged path still
        // contains the literal key
        if !key.chars().all(is_unreserved) {
            return Err(ConfigError::InvalidTagKey(key.to_string()));
        }
        Ok(TagSettings {
            key: key.to_string(),
            entry: compile_pattern("entry", &self.entry_pattern)?,
            loader: compile_pattern("loader", &self.loader_pattern)?,
        })
    }
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

fn compile_pattern(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

/// Get config directory (XDG_CONFIG_HOME or platform default)
#[cfg(feature = "cli")]
pub fn get_config_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("STRATEGY_LOADER_CONFIG_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/dashboard-strategy-loader");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return std::path::PathBuf::from(xdg).join("dashboard-strategy-loader");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".config/dashboard-strategy-loader");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return std::path::PathBuf::from(appdata).join("dashboard-strategy-loader");
        }
    }

    // Fallback to current directory
    std::path::PathBuf::from(".")
}

/// Load layered configuration: defaults, then `config.*` file, then environment
#[cfg(feature = "cli")]
pub fn load_config() -> anyhow::Result<LoaderConfig> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        .set_default("tag_key", DEFAULT_TAG_KEY)?
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (STRATEGY_LOADER__BASE_URL, etc.)
        .add_source(
            ::config::Environment::with_prefix("STRATEGY_LOADER")
                .separator("__")
                .try_parsing(true),
        );

    // Single-underscore names are what deployment scripts set; they take precedence
    if let Ok(key) = std::env::var("STRATEGY_LOADER_TAG_KEY") {
        if !key.trim().is_empty() {
            builder = builder.set_override("tag_key", key)?;
        }
    }
    if let Ok(base) = std::env::var("STRATEGY_LOADER_BASE_URL") {
        if !base.trim().is_empty() {
            builder = builder.set_override("base_url", base)?;
        }
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}
