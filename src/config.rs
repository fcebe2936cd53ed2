/// Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EditorError, EditorResult};

/// Environment variable overriding `api_base_url`.
pub const ENV_API_URL: &str = "PHOTO_EDITOR_API_URL";
/// Environment variable overriding `auth_token`.
pub const ENV_TOKEN: &str = "PHOTO_EDITOR_TOKEN";
/// Environment variable overriding `library_dir`.
pub const ENV_LIBRARY: &str = "PHOTO_EDITOR_LIBRARY";

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Base URL of the photo API (e.g. "https://host/api").
    /// When absent, photos are read from `library_dir`.
    pub api_base_url: Option<String>,

    /// Bearer token sent with every API request.
    pub auth_token: Option<String>,

    /// Directory of images used as the local photo store.
    pub library_dir: PathBuf,

    /// JPEG quality for exported images (1-100).
    pub jpeg_quality: u8,

    /// Longest side of the on-screen preview surface, in pixels.
    pub max_preview_dimension: u32,

    /// Try the wgpu compositor before the software one.
    pub prefer_gpu: bool,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "photo_editor=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            auth_token: None,
            library_dir: default_library_dir(),
            jpeg_quality: 92,
            max_preview_dimension: 2048,
            prefer_gpu: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EditorConfig {
    /// Load config from the standard location plus environment overrides,
    /// falling back to defaults.
    ///
    /// Logging is not initialized yet when this runs, so parse failures are
    /// returned alongside the config and reported by the caller.
    pub fn load() -> (Self, Option<EditorError>) {
        let (config, warning) = match Self::load_from(&config_file_path()) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        };
        (config.with_env(|key| std::env::var(key).ok()), warning)
    }

    /// Load config from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> EditorResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| EditorError::config(format!("{}: {}", path.display(), e)))?;
        Ok(config.sanitized())
    }

    /// Apply environment overrides using the given lookup.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.auth_token = Some(token);
        }
        if let Some(dir) = lookup(ENV_LIBRARY).filter(|v| !v.is_empty()) {
            self.library_dir = PathBuf::from(dir);
        }
        self
    }

    fn sanitized(mut self) -> Self {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.max_preview_dimension = self.max_preview_dimension.max(64);
        self
    }
}

/// Standard config file location.
/// - Linux: ~/.config/photo-editor/config.json
pub fn config_file_path() -> PathBuf {
    let mut path = dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir);
    path.push("photo-editor");
    path.push("config.json");
    path
}

/// Default local photo store.
fn default_library_dir() -> PathBuf {
    let mut path = dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir);
    path.push("photo-editor");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.jpeg_quality, 92);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{ "api_base_url": "http://localhost:5000/api", "jpeg_quality": 250 }}"#
        )
        .unwrap();

        let config = EditorConfig::load_from(&path).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("http://localhost:5000/api"));
        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(config.max_preview_dimension, 2048);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = EditorConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, EditorError::Config { .. }));
    }

    #[test]
    fn env_overrides_win() {
        let config = EditorConfig::default().with_env(|key| match key {
            ENV_API_URL => Some("https://photos.example/api".to_string()),
            ENV_TOKEN => Some("abc".to_string()),
            ENV_LIBRARY => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api_base_url.as_deref(), Some("https://photos.example/api"));
        assert_eq!(config.auth_token.as_deref(), Some("abc"));
        assert_eq!(config.library_dir, default_library_dir());
    }
}
