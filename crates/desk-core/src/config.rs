use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from default path (~/.config/frontdesk/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Write current configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("frontdesk")
            .join("config.toml")
    }
}

/// Upstream cloud-function endpoints the dashboard reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Conversation log endpoint (`?phone=&date=&startAfter=`).
    pub conversations_url: String,
    /// Customer directory endpoint.
    pub customers_url: String,
    /// SMS agent customer list (`?uid=&type=&limit=`).
    pub sms_customers_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Upper bound on pages followed when collecting a full log.
    pub max_pages: usize,
    /// Bearer token sent upstream when the caller supplies none.
    pub auth_token: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            conversations_url: "https://getconversations-ieskeqprjq-uc.a.run.app".into(),
            customers_url: "https://listcustomers-ieskeqprjq-uc.a.run.app".into(),
            sms_customers_url: "https://listcustomersforsms-ieskeqprjq-uc.a.run.app".into(),
            timeout_secs: 30,
            user_agent: concat!("frontdesk/", env!("CARGO_PKG_VERSION")).into(),
            max_pages: 20,
            auth_token: None,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Enable CORS.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            cors: true,
        }
    }
}
