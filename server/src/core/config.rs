use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::pricing::RateOverride;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_API_URL, DEFAULT_HOST, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_PORT, SESSION_FILE_NAME,
};

// =============================================================================
// File Config Sections
// =============================================================================

/// CORS configuration (nested under server)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CorsFileConfig {
    pub origins: Option<Vec<String>>,
}

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors: Option<CorsFileConfig>,
}

/// Session loading configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SessionsFileConfig {
    pub preload_dir: Option<String>,
    pub max_upload_bytes: Option<usize>,
}

/// Pricing configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PricingFileConfig {
    pub models: Option<BTreeMap<String, RateOverride>>,
}

/// Account service configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AccountFileConfig {
    pub api_url: Option<String>,
    pub session_file: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub sessions: Option<SessionsFileConfig>,
    pub pricing: Option<PricingFileConfig>,
    pub account: Option<AccountFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Names of top-level keys no section claims
    fn unknown_fields(&self) -> Vec<&str> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn warn_unknown_fields(&self) {
        let unknown = self.unknown_fields();
        if !unknown.is_empty() {
            tracing::warn!(
                fields = %unknown.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Server
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
            if let Some(cors) = server.cors
                && cors.origins.is_some()
            {
                tracing::trace!(origins = ?cors.origins, "Merging server.cors.origins");
                current.cors = Some(cors);
            }
        }

        // Sessions
        if let Some(sessions) = other.sessions {
            let current = self.sessions.get_or_insert_with(SessionsFileConfig::default);
            if sessions.preload_dir.is_some() {
                tracing::trace!(dir = ?sessions.preload_dir, "Merging sessions.preload_dir");
                current.preload_dir = sessions.preload_dir;
            }
            if sessions.max_upload_bytes.is_some() {
                tracing::trace!(
                    bytes = ?sessions.max_upload_bytes,
                    "Merging sessions.max_upload_bytes"
                );
                current.max_upload_bytes = sessions.max_upload_bytes;
            }
        }

        // Pricing: model overrides merge per key
        if let Some(pricing) = other.pricing
            && let Some(models) = pricing.models
        {
            let current = self.pricing.get_or_insert_with(PricingFileConfig::default);
            let current_models = current.models.get_or_insert_with(BTreeMap::new);
            for (key, rate) in models {
                tracing::trace!(model = %key, "Merging pricing.models entry");
                current_models.insert(key, rate);
            }
        }

        // Account
        if let Some(account) = other.account {
            let current = self.account.get_or_insert_with(AccountFileConfig::default);
            if account.api_url.is_some() {
                tracing::trace!(api_url = ?account.api_url, "Merging account.api_url");
                current.api_url = account.api_url;
            }
            if account.session_file.is_some() {
                tracing::trace!(file = ?account.session_file, "Merging account.session_file");
                current.session_file = account.session_file;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SessionsConfig {
    pub preload_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PricingConfig {
    pub models: BTreeMap<String, RateOverride>,
}

#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub api_url: String,
    pub session_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sessions: SessionsConfig,
    pub pricing: PricingConfig,
    pub account: AccountConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.shepherd/shepherd.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let file_server = file_config.server.unwrap_or_default();
        let file_sessions = file_config.sessions.unwrap_or_default();
        let file_pricing = file_config.pricing.unwrap_or_default();
        let file_account = file_config.account.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
            cors_origins: file_server
                .cors
                .and_then(|c| c.origins)
                .unwrap_or_default(),
        };

        let sessions = SessionsConfig {
            preload_dir: cli
                .preload_dir
                .clone()
                .or_else(|| file_sessions.preload_dir.map(PathBuf::from))
                .map(|p| expand_path(&p.to_string_lossy())),
            max_upload_bytes: file_sessions
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };

        let account = AccountConfig {
            api_url: cli
                .api_url
                .clone()
                .or(file_account.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            session_file: file_account
                .session_file
                .map(|p| expand_path(&p))
                .or_else(default_session_file_path)
                .unwrap_or_else(|| PathBuf::from(SESSION_FILE_NAME)),
        };

        let config = Self {
            server,
            sessions,
            pricing: PricingConfig {
                models: file_pricing.models.unwrap_or_default(),
            },
            account,
        };

        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            preload_dir = ?config.sessions.preload_dir,
            pricing_overrides = config.pricing.models.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port 0 would bind to a random port
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.sessions.max_upload_bytes == 0 {
            anyhow::bail!("Configuration error: sessions.max_upload_bytes must be greater than 0");
        }

        for (model, rate) in &self.pricing.models {
            if rate.input < 0.0 || rate.output < 0.0 {
                anyhow::bail!(
                    "Configuration error: pricing.models.{} rates must not be negative",
                    model
                );
            }
        }

        if self.account.api_url.trim().is_empty() {
            anyhow::bail!("Configuration error: account.api_url must not be empty");
        }

        if is_all_interfaces(&self.server.host) {
            tracing::warn!(
                host = %self.server.host,
                "Server binds to all interfaces; uploaded sessions are reachable from the network"
            );
        }

        Ok(())
    }
}

/// Get the profile directory config path (~/.shepherd/shepherd.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Default location of the stored account session (~/.shepherd/session.json)
fn default_session_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(SESSION_FILE_NAME))
}

/// Check if host binds to all network interfaces
fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(json: &str) -> tempfile::NamedTempFile {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file.write_all(json.as_bytes()).unwrap();
        temp_file
    }

    fn cli_with_file(file: &tempfile::NamedTempFile) -> CliConfig {
        CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080, "cors": { "origins": ["http://localhost:3000"] } },
            "sessions": { "preload_dir": "/tmp/sessions", "max_upload_bytes": 1024 },
            "pricing": { "models": { "my-model": { "input": 1.0, "output": 2.0 } } },
            "account": { "api_url": "http://localhost:9000" }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(
            server.cors.as_ref().unwrap().origins.as_ref().unwrap().len(),
            1
        );
        assert_eq!(
            config.sessions.as_ref().unwrap().max_upload_bytes,
            Some(1024)
        );
        let models = config.pricing.as_ref().unwrap().models.as_ref().unwrap();
        assert_eq!(models["my-model"].output, 2.0);
        assert!(config.unknown_fields().is_empty());
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.sessions.is_none());
        assert!(config.unknown_fields().is_empty());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "port": 1 }, "sever": {}, "pricng": {} }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.unknown_fields(), vec!["sever", "pricng"]);
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{
                "server": { "host": "127.0.0.1", "port": 5000 },
                "pricing": { "models": { "a": { "input": 1.0, "output": 1.0 } } }
            }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{
                "server": { "port": 6000 },
                "sessions": { "preload_dir": "/data" },
                "pricing": { "models": { "b": { "input": 2.0, "output": 2.0 } } }
            }"#,
        )
        .unwrap();

        base.merge(overlay);

        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(6000));
        assert_eq!(
            base.sessions.unwrap().preload_dir.as_deref(),
            Some("/data")
        );
        let models = base.pricing.unwrap().models.unwrap();
        assert_eq!(models.len(), 2);
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::load(&CliConfig::default()).unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.sessions.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.account.api_url, DEFAULT_API_URL);
        assert!(config.account.session_file.ends_with(SESSION_FILE_NAME));
    }

    #[test]
    fn test_app_config_cli_override() {
        let file = config_file(r#"{ "server": { "host": "10.0.0.1", "port": 7000 } }"#);
        let cli = CliConfig {
            port: Some(9999),
            api_url: Some("http://accounts.local".to_string()),
            ..cli_with_file(&file)
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.account.api_url, "http://accounts.local");
    }

    #[test]
    fn test_app_config_pricing_from_file() {
        let file = config_file(
            r#"{ "pricing": { "models": { "default": { "input": 9.0, "output": 9.0 } } } }"#,
        );
        let config = AppConfig::load(&cli_with_file(&file)).unwrap();
        assert_eq!(config.pricing.models["default"].input, 9.0);
    }

    #[test]
    fn test_app_config_missing_file() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/definitely/not/here/shepherd.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_app_config_invalid_json() {
        let file = config_file("{ not json");
        let err = AppConfig::load(&cli_with_file(&file)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_app_config_validation_server_port_zero() {
        let cli = CliConfig {
            port: Some(0),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_app_config_validation_empty_host() {
        let cli = CliConfig {
            host: Some(String::new()),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_app_config_validation_zero_upload_limit() {
        let file = config_file(r#"{ "sessions": { "max_upload_bytes": 0 } }"#);
        let err = AppConfig::load(&cli_with_file(&file)).unwrap_err();
        assert!(err.to_string().contains("max_upload_bytes"));
    }

    #[test]
    fn test_app_config_validation_negative_rate() {
        let file = config_file(
            r#"{ "pricing": { "models": { "x": { "input": -1.0, "output": 1.0 } } } }"#,
        );
        let err = AppConfig::load(&cli_with_file(&file)).unwrap_err();
        assert!(err.to_string().contains("pricing.models.x"));
    }

    #[test]
    fn test_is_all_interfaces() {
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(is_all_interfaces("::"));
        assert!(is_all_interfaces("[::]"));
        assert!(!is_all_interfaces("127.0.0.1"));
        assert!(!is_all_interfaces("localhost"));
    }
}
