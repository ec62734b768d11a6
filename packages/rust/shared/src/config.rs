//! Application configuration for recipefeed.
//!
//! User config lives at `~/.recipefeed/recipefeed.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecipeFeedError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "recipefeed.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".recipefeed";

/// Site selector meaning "every registered connector, in registry order".
pub const ALL_SITES: &str = "all";

// ---------------------------------------------------------------------------
// Config structs (matching recipefeed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub images: ImagesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory the manifest, index, details and images are written to.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Connector name or `all`.
    #[serde(default = "default_site")]
    pub site: String,

    /// Listing pages fetched per connector.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Target language for localized text.
    #[serde(default = "default_dest_language")]
    pub dest_language: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            site: default_site(),
            max_pages: default_max_pages(),
            dest_language: default_dest_language(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_site() -> String {
    ALL_SITES.into()
}
fn default_max_pages() -> u32 {
    20
}
fn default_dest_language() -> String {
    "zh-CN".into()
}

/// `[translation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the translation endpoint.
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_translate_timeout")]
    pub timeout_secs: u64,

    /// Inputs longer than this many chars are truncated before sending.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Fraction of fragments that must come back in the target script
    /// for a record to count as translated.
    #[serde(default = "default_min_success_ratio")]
    pub min_success_ratio: f64,

    /// Keep translations in the local database across runs.
    #[serde(default = "default_true")]
    pub persistent_cache: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_translate_endpoint(),
            timeout_secs: default_translate_timeout(),
            max_chars: default_max_chars(),
            min_success_ratio: default_min_success_ratio(),
            persistent_cache: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_translate_endpoint() -> String {
    "https://translate.googleapis.com".into()
}
fn default_translate_timeout() -> u64 {
    30
}
fn default_max_chars() -> usize {
    4500
}
fn default_min_success_ratio() -> f64 {
    0.5
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for listing and recipe pages.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Timeout for cover image downloads.
    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            page_timeout_secs: default_page_timeout(),
            image_timeout_secs: default_image_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("recipefeed/", env!("CARGO_PKG_VERSION")).into()
}
fn default_page_timeout() -> u64 {
    20
}
fn default_image_timeout() -> u64 {
    30
}

/// `[images]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Longest side in pixels after downscaling.
    #[serde(default = "default_max_side")]
    pub max_side: u32,

    /// JPEG quality, 1-100.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_side: default_max_side(),
            quality: default_quality(),
        }
    }
}

fn default_max_side() -> u32 {
    1080
}
fn default_quality() -> u8 {
    80
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Connector name or `all`.
    pub site: String,
    /// Global record limit across all connectors. `None` means unlimited.
    pub limit: Option<usize>,
    pub max_pages: u32,
    pub download_images: bool,
    pub translate: bool,
    pub dry_run: bool,
    pub data_dir: PathBuf,
    pub dest_language: String,
    pub min_success_ratio: f64,
    /// Explicit version token; minted from the clock when absent.
    pub version_override: Option<String>,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            site: config.defaults.site.clone(),
            limit: None,
            max_pages: config.defaults.max_pages,
            download_images: config.images.enabled,
            translate: config.translation.enabled,
            dry_run: false,
            data_dir: expand_home(&config.defaults.data_dir),
            dest_language: config.defaults.dest_language.clone(),
            min_success_ratio: config.translation.min_success_ratio,
            version_override: None,
        }
    }
}

impl RunConfig {
    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.site.trim().is_empty() {
            return Err(RecipeFeedError::config("site must not be empty"));
        }
        if self.max_pages == 0 {
            return Err(RecipeFeedError::config("max_pages must be at least 1"));
        }
        if self.dest_language.trim().is_empty() {
            return Err(RecipeFeedError::config("dest_language must not be empty"));
        }
        if !(self.min_success_ratio > 0.0 && self.min_success_ratio <= 1.0) {
            return Err(RecipeFeedError::config(format!(
                "min_success_ratio must be in (0, 1], got {}",
                self.min_success_ratio
            )));
        }
        if self.dry_run && self.version_override.is_some() {
            return Err(RecipeFeedError::config(
                "a version override has no effect on a dry run",
            ));
        }
        Ok(())
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.recipefeed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RecipeFeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RecipeFeedError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RecipeFeedError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RecipeFeedError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RecipeFeedError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RecipeFeedError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("min_success_ratio"));
        assert!(toml_str.contains("zh-CN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_pages, 20);
        assert_eq!(parsed.translation.max_chars, 4500);
        assert_eq!(parsed.images.max_side, 1080);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
site = "myplate_gov"

[translation]
min_success_ratio = 0.75
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.site, "myplate_gov");
        assert_eq!(config.defaults.dest_language, "zh-CN");
        assert!(config.translation.enabled);
        assert!((config.translation.min_success_ratio - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.http.page_timeout_secs, 20);
    }

    #[test]
    fn run_config_from_app_config() {
        let app = AppConfig::default();
        let run = RunConfig::from(&app);
        assert_eq!(run.site, "all");
        assert_eq!(run.max_pages, 20);
        assert!(run.translate);
        assert!(run.download_images);
        assert!(run.limit.is_none());
        assert!(run.validate().is_ok());
    }

    #[test]
    fn run_config_rejects_bad_ratio() {
        let mut run = RunConfig::from(&AppConfig::default());
        run.min_success_ratio = 0.0;
        assert!(run.validate().is_err());
        run.min_success_ratio = 1.5;
        assert!(run.validate().is_err());
        run.min_success_ratio = 1.0;
        assert!(run.validate().is_ok());
    }

    #[test]
    fn run_config_rejects_version_on_dry_run() {
        let mut run = RunConfig::from(&AppConfig::default());
        run.dry_run = true;
        run.version_override = Some("v1".into());
        let err = run.validate().unwrap_err();
        assert!(err.to_string().contains("dry run"));
    }

    #[test]
    fn expand_home_leaves_relative_paths() {
        assert_eq!(expand_home("data"), PathBuf::from("data"));
        assert_eq!(expand_home("/srv/feed"), PathBuf::from("/srv/feed"));
    }
}
