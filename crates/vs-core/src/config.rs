//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, auth, storage, tools, the ingest pipeline and
//! rate limiting. Every section defaults sensibly so `{}` is a valid file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Placeholder JWT secret used when none is configured.
pub const DEFAULT_JWT_SECRET: &str = "change-me-vidshare-secret";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub pipeline: PipelineConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if let Some(ref url) = self.server.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(format!(
                    "server.public_url '{url}' should start with http:// or https://"
                ));
            }
        }

        if self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            warnings.push("auth.jwt_secret is the built-in default; set a real secret".into());
        }

        if self.storage.max_upload_bytes == 0 {
            warnings.push("storage.max_upload_bytes is 0; every upload will be rejected".into());
        }

        if self.storage.allowed_mime_types.is_empty() {
            warnings.push("storage.allowed_mime_types is empty; every upload will be rejected".into());
        }

        if self.pipeline.max_concurrent_encodes == Some(0) {
            warnings.push(
                "pipeline.max_concurrent_encodes is 0; it will be raised to 1".into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Absolute base URL used to resolve stored file references. When unset
    /// the request `Host` header is used.
    pub public_url: Option<String>,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            db_path: PathBuf::from("./data/vidshare.db"),
            public_url: None,
            cors_origins: Vec::new(),
        }
    }
}

/// Bearer token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            token_ttl_hours: 24,
        }
    }
}

/// Upload storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Static upload root. Sources land directly under it, processed outputs
    /// under `processed/<id>/`.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

impl StorageConfig {
    /// Directory holding the processed outputs of every video.
    pub fn processed_dir(&self) -> PathBuf {
        self.upload_dir.join("processed")
    }

    pub fn is_allowed_mime(&self, mime: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 100 * 1024 * 1024,
            allowed_mime_types: [
                "video/mp4",
                "video/webm",
                "video/avi",
                "video/mov",
                "video/mkv",
                "video/quicktime",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// What happens when a single rendition encode fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenditionPolicy {
    /// Any rendition failure fails the whole run.
    #[default]
    AllOrNothing,
    /// A failed rendition is dropped from the result; the run continues.
    Isolate,
}

/// Ingest pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cap on simultaneous encoder processes. `None` means one per CPU core.
    pub max_concurrent_encodes: Option<usize>,
    pub encode_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub rendition_policy: RenditionPolicy,
    /// Extract a poster frame after the renditions.
    pub thumbnails: bool,
}

impl PipelineConfig {
    /// Effective encode concurrency, never below one.
    pub fn encode_slots(&self) -> usize {
        self.max_concurrent_encodes
            .unwrap_or_else(num_cpus::get)
            .max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_encodes: None,
            encode_timeout_secs: 3600,
            probe_timeout_secs: 60,
            rendition_policy: RenditionPolicy::AllOrNothing,
            thumbnails: true,
        }
    }
}

/// Governor quotas per route group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub api_per_minute: u32,
    pub auth_per_minute: u32,
    pub uploads_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_per_minute: 300,
            auth_per_minute: 20,
            uploads_per_hour: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.auth.token_ttl_hours, 24);
        assert_eq!(cfg.storage.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.storage.upload_dir, PathBuf::from("uploads"));
        assert_eq!(cfg.pipeline.rendition_policy, RenditionPolicy::AllOrNothing);
        assert!(cfg.pipeline.thumbnails);
    }

    #[test]
    fn default_secret_warns() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("jwt_secret")));
    }

    #[test]
    fn configured_secret_has_no_warnings() {
        let mut cfg = Config::default();
        cfg.auth.jwt_secret = "s3cret".into();
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn mime_allow_list_is_case_insensitive() {
        let storage = StorageConfig::default();
        assert!(storage.is_allowed_mime("video/mp4"));
        assert!(storage.is_allowed_mime("Video/QuickTime"));
        assert!(!storage.is_allowed_mime("text/plain"));
        assert!(!storage.is_allowed_mime("video/x-flv"));
    }

    #[test]
    fn processed_dir_is_under_upload_root() {
        let storage = StorageConfig {
            upload_dir: PathBuf::from("/srv/uploads"),
            ..StorageConfig::default()
        };
        assert_eq!(storage.processed_dir(), PathBuf::from("/srv/uploads/processed"));
    }

    #[test]
    fn encode_slots_never_zero() {
        let mut cfg = PipelineConfig::default();
        assert!(cfg.encode_slots() >= 1);
        cfg.max_concurrent_encodes = Some(0);
        assert_eq!(cfg.encode_slots(), 1);
        cfg.max_concurrent_encodes = Some(3);
        assert_eq!(cfg.encode_slots(), 3);
    }

    #[test]
    fn parse_partial_json() {
        let json = r#"{"server": {"port": 9090}, "pipeline": {"rendition_policy": "isolate"}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.pipeline.rendition_policy, RenditionPolicy::Isolate);
        assert_eq!(cfg.pipeline.encode_timeout_secs, 3600);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage": {"max_upload_bytes": 1024}}"#).unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.storage.max_upload_bytes, 1024);
    }
}
