//! Runtime configuration.
//!
//! Everything has a built-in default. An optional `config.toml` in the
//! platform config directory overrides individual keys:
//!
//! ```toml
//! [api]
//! endpoint = "https://jsonplaceholder.typicode.com/photos"
//!
//! [table]
//! debounce_ms = 300
//!
//! [palette]
//! background = "#1E1E2E"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use directories::ProjectDirs;
use eframe::egui::Color32;
use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/photos";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid colour '{0}': expected #RRGGBB or #RRGGBBAA")]
    Colour(String),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub table: TableConfig,
    pub thumbnails: ThumbnailConfig,
    pub window: WindowConfig,
    pub palette: Palette,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows per pagination page.
    pub page_size: usize,
    /// Count reported to the pagination control while browsing albums.
    pub browse_total: usize,
    pub debounce_ms: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            browse_total: 5000,
            debounce_ms: 500,
        }
    }
}

impl TableConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub workers: usize,
    /// Avatar edge length in points.
    pub size: f32,
    pub cache_limit: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            size: 40.0,
            cache_limit: 512,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 860.0,
        }
    }
}

/// Colour written as `#RRGGBB` or `#RRGGBBAA` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct HexColour(pub Color32);

impl TryFrom<String> for HexColour {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_hex_colour(&value).map(HexColour)
    }
}

impl From<HexColour> for Color32 {
    fn from(value: HexColour) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: HexColour,
    pub surface: HexColour,
    pub header: HexColour,
    pub shadow: HexColour,
    pub text: HexColour,
    pub muted: HexColour,
    pub danger: HexColour,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: HexColour(Color32::from_rgb(0x29, 0x2D, 0x3E)),
            surface: HexColour(Color32::WHITE),
            header: HexColour(Color32::from_rgb(0xD3, 0xD3, 0xD3)),
            shadow: HexColour(Color32::from_rgb(0x88, 0x88, 0x88)),
            text: HexColour(Color32::from_rgb(0x1E, 0x1E, 0x1E)),
            muted: HexColour(Color32::from_rgb(0x6E, 0x6E, 0x6E)),
            danger: HexColour(Color32::from_rgb(0xC0, 0x39, 0x2B)),
        }
    }
}

pub fn parse_hex_colour(value: &str) -> Result<Color32, ConfigError> {
    let err = || ConfigError::Colour(value.to_string());
    let digits = value.trim().strip_prefix('#').ok_or_else(err)?;
    if !digits.is_ascii() || !(digits.len() == 6 || digits.len() == 8) {
        return Err(err());
    }

    let channel = |idx: usize| u8::from_str_radix(&digits[idx..idx + 2], 16).map_err(|_| err());
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    if digits.len() == 8 {
        Ok(Color32::from_rgba_unmultiplied(r, g, b, channel(6)?))
    } else {
        Ok(Color32::from_rgb(r, g, b))
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.api.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "api.endpoint",
                reason: format!("'{endpoint}' is not an http(s) URL"),
            });
        }
        if self.table.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "table.page_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.thumbnails.workers == 0 {
            return Err(ConfigError::Invalid {
                key: "thumbnails.workers",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.thumbnails.size.is_finite() || self.thumbnails.size <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "thumbnails.size",
                reason: "must be a positive number".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "PhotosTable", "photos_table")
        .map(|proj| proj.config_dir().join(CONFIG_FILE_NAME))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Load the user config, falling back to defaults. A missing file is expected;
/// anything else is logged and ignored.
pub fn load() -> AppConfig {
    let Some(path) = config_path() else {
        tracing::warn!(
            event = "photos.config.no_config_dir",
            "Cannot determine config directory - using defaults"
        );
        return AppConfig::default();
    };

    match load_from_path(&path) {
        Ok(config) => {
            tracing::info!(event = "photos.config.loaded", path = %path.display());
            config
        }
        Err(err) => {
            let is_not_found = err
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound);
            if !is_not_found {
                tracing::warn!(
                    event = "photos.config.load_failed",
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "Config file exists but could not be loaded - using defaults"
                );
            }
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_match_photo_table_layout() {
        let config = AppConfig::default();
        assert_eq!(config.api.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.table.page_size, 50);
        assert_eq!(config.table.browse_total, 5000);
        assert_eq!(config.table.debounce(), Duration::from_millis(500));
        assert_eq!(
            Color32::from(config.palette.background),
            Color32::from_rgb(0x29, 0x2D, 0x3E)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_hex_colours() {
        assert_eq!(
            parse_hex_colour("#D3D3D3").unwrap(),
            Color32::from_rgb(211, 211, 211)
        );
        assert_eq!(
            parse_hex_colour("#00000080").unwrap(),
            Color32::from_rgba_unmultiplied(0, 0, 0, 128)
        );
        assert!(parse_hex_colour("D3D3D3").is_err());
        assert!(parse_hex_colour("#D3D3").is_err());
        assert!(parse_hex_colour("#GGGGGG").is_err());
        assert!(parse_hex_colour("#ééé").is_err());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r##"
                [table]
                debounce_ms = 250

                [palette]
                background = "#101010"
            "##,
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.table.debounce_ms, 250);
        assert_eq!(config.table.page_size, 50);
        assert_eq!(
            Color32::from(config.palette.background),
            Color32::from_rgb(0x10, 0x10, 0x10)
        );
        assert_eq!(config.palette.surface, Palette::default().surface);
    }

    #[test]
    fn rejects_bad_colour_in_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[palette]\nheader = \"lightgray\"\n").unwrap();

        assert!(load_from_path(&path).is_err());
    }

    #[test]
    fn rejects_zero_page_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[table]\npage_size = 0\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("table.page_size"));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let mut config = AppConfig::default();
        config.api.endpoint = "ftp://example.com/photos".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "api.endpoint",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_is_not_found_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
