//! TOML Configuration File Support
//!
//! Centralized configuration loading for card-studio, supporting a TOML file
//! at `~/.config/card-studio/studio.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [gemini]
//! api_key = "..."
//! text_model = "gemini-2.5-flash"
//! image_model = "gemini-2.5-flash-image"
//! timeout_secs = 60
//!
//! [generation]
//! in_flight = "skip_while_busy"
//!
//! [export]
//! pixel_ratio = 3
//! settle_delay_ms = 200
//! background = "#ffffff"
//! download_dir = "/home/me/Pictures"
//!
//! [share]
//! origin = "https://cards.example.com"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::GeminiConfig;
use crate::export::{ExportConfig, RgbColor};
use crate::orchestrator::{InFlightPolicy, OrchestratorConfig};

/// Origin used in share links when none is configured
pub const DEFAULT_SHARE_ORIGIN: &str = "http://localhost:3000";

// =============================================================================
// Error Types
// =============================================================================

/// Why `studio.toml` could not be turned into a [`StudioConfig`]
///
/// A missing file is not one of these; defaults apply instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `studio.toml` exists but could not be read (permissions, not a file)
    #[error("Cannot read studio config {path}: {source}")]
    ReadError {
        /// Config file that failed to open
        path: PathBuf,
        /// Reason from the filesystem
        source: std::io::Error,
    },

    /// `studio.toml` is not valid TOML or has a field of the wrong type
    #[error("Malformed studio config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A field parsed but its value is unusable, such as `pixel_ratio = 0`
    /// or a background that is not a hex color
    #[error("Unusable studio config value: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// The highest-priority layer that contributed to a [`StudioConfig`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// A `card-studio` flag such as `--text-model` or `--origin`
    Cli,
    /// `GEMINI_API_KEY`, `API_KEY` or a `CARD_STUDIO_*` variable
    Env,
    /// `studio.toml`
    File,
    /// Nothing was configured
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Cli => "command line",
            Self::Env => "environment",
            Self::File => "studio.toml",
            Self::Default => "built-in defaults",
        };
        f.write_str(label)
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Gemini section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiToml {
    /// API key
    pub api_key: Option<String>,

    /// REST base URL
    pub base_url: Option<String>,

    /// Model for wish text
    pub text_model: Option<String>,

    /// Model for illustrations
    pub image_model: Option<String>,

    /// HTTP timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Generation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationToml {
    /// Re-entry policy for generation requests
    pub in_flight: Option<InFlightPolicy>,
}

/// Export section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportToml {
    /// Pixel density multiplier
    pub pixel_ratio: Option<u32>,

    /// Settling delay before capture, in milliseconds
    pub settle_delay_ms: Option<u64>,

    /// Background color (`#rrggbb`)
    pub background: Option<String>,

    /// Download directory
    pub download_dir: Option<PathBuf>,
}

/// Share section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareToml {
    /// Origin linked from shared messages
    pub origin: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioToml {
    /// Gemini configuration section
    pub gemini: GeminiToml,

    /// Generation configuration section
    pub generation: GenerationToml,

    /// Export configuration section
    pub export: ExportToml,

    /// Share configuration section
    pub share: ShareToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for card-studio
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct StudioConfig {
    /// Generation backend settings
    pub gemini: GeminiConfig,

    /// Orchestrator settings
    pub orchestrator: OrchestratorConfig,

    /// Export settings
    pub export: ExportConfig,

    /// Origin linked from shared messages
    pub share_origin: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            export: ExportConfig::default(),
            share_origin: DEFAULT_SHARE_ORIGIN.to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl StudioConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Whether an API key is available
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.gemini
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/card-studio/studio.toml` or
/// `~/.config/card-studio/studio.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("card-studio").join("studio.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<StudioConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed, or
/// holds invalid values.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<StudioConfig, ConfigError> {
    let mut config = StudioConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: StudioToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut StudioConfig, toml: &StudioToml) -> Result<(), ConfigError> {
    // Gemini settings
    if toml.gemini.api_key.is_some() {
        config.gemini.api_key = toml.gemini.api_key.clone();
    }
    if let Some(ref url) = toml.gemini.base_url {
        config.gemini.base_url = url.clone();
    }
    if let Some(ref model) = toml.gemini.text_model {
        config.gemini.text_model = model.clone();
    }
    if let Some(ref model) = toml.gemini.image_model {
        config.gemini.image_model = model.clone();
    }
    if let Some(secs) = toml.gemini.timeout_secs {
        config.gemini.timeout = Duration::from_secs(secs);
    }

    // Generation settings
    if let Some(policy) = toml.generation.in_flight {
        config.orchestrator.in_flight = policy;
    }

    // Export settings
    if let Some(ratio) = toml.export.pixel_ratio {
        if ratio == 0 {
            return Err(ConfigError::ValidationError(
                "export.pixel_ratio must be at least 1".to_string(),
            ));
        }
        config.export.pixel_ratio = ratio;
    }
    if let Some(ms) = toml.export.settle_delay_ms {
        config.export.settle_delay = Duration::from_millis(ms);
    }
    if let Some(ref color) = toml.export.background {
        config.export.background = color
            .parse::<RgbColor>()
            .map_err(ConfigError::ValidationError)?;
    }
    if toml.export.download_dir.is_some() {
        config.export.download_dir = toml.export.download_dir.clone();
    }

    // Share settings
    if let Some(ref origin) = toml.share.origin {
        config.share_origin = origin.clone();
    }

    Ok(())
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut StudioConfig) {
    let non_blank = |var: &str| std::env::var(var).ok().filter(|v| !v.trim().is_empty());
    if let Some(key) = non_blank("GEMINI_API_KEY").or_else(|| non_blank("API_KEY")) {
        config.gemini.api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Ok(model) = std::env::var("CARD_STUDIO_TEXT_MODEL") {
        config.gemini.text_model = model;
        config.source = ConfigSource::Env;
    }
    if let Ok(model) = std::env::var("CARD_STUDIO_IMAGE_MODEL") {
        config.gemini.image_model = model;
        config.source = ConfigSource::Env;
    }
    if let Ok(dir) = std::env::var("CARD_STUDIO_DOWNLOAD_DIR") {
        config.export.download_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }
    if let Ok(origin) = std::env::var("CARD_STUDIO_ORIGIN") {
        config.share_origin = origin;
        config.source = ConfigSource::Env;
    }
    if let Ok(policy) = std::env::var("CARD_STUDIO_IN_FLIGHT") {
        match policy.parse::<InFlightPolicy>() {
            Ok(policy) => {
                config.orchestrator.in_flight = policy;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring CARD_STUDIO_IN_FLIGHT"),
        }
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values supplied on the command line, applied last
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Text model override
    pub text_model: Option<String>,

    /// Image model override
    pub image_model: Option<String>,

    /// Download directory override
    pub download_dir: Option<PathBuf>,

    /// Share origin override
    pub share_origin: Option<String>,

    /// Settle delay override (milliseconds)
    pub settle_delay_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set text model override
    #[must_use]
    pub fn with_text_model(mut self, model: String) -> Self {
        self.text_model = Some(model);
        self
    }

    /// Set image model override
    #[must_use]
    pub fn with_image_model(mut self, model: String) -> Self {
        self.image_model = Some(model);
        self
    }

    /// Set download directory override
    #[must_use]
    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = Some(dir);
        self
    }

    /// Set share origin override
    #[must_use]
    pub fn with_share_origin(mut self, origin: String) -> Self {
        self.share_origin = Some(origin);
        self
    }

    /// Set settle delay override
    #[must_use]
    pub fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = Some(ms);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text_model.is_none()
            && self.image_model.is_none()
            && self.download_dir.is_none()
            && self.share_origin.is_none()
            && self.settle_delay_ms.is_none()
    }

    /// Apply the overrides to `config`
    pub fn apply(&self, config: &mut StudioConfig) {
        if let Some(ref model) = self.text_model {
            config.gemini.text_model = model.clone();
        }
        if let Some(ref model) = self.image_model {
            config.gemini.image_model = model.clone();
        }
        if let Some(ref dir) = self.download_dir {
            config.export.download_dir = Some(dir.clone());
        }
        if let Some(ref origin) = self.share_origin {
            config.share_origin = origin.clone();
        }
        if let Some(ms) = self.settle_delay_ms {
            config.export.settle_delay = Duration::from_millis(ms);
        }
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }
    }
}
