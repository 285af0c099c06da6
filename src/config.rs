//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Delivery REST API settings.
    pub api: ApiCfg,
    /// Reverse-geocoding service settings.
    pub geocoding: GeocodingCfg,
    /// Local session storage.
    pub session: SessionCfg,
    /// Delivery creation wizard limits.
    pub wizard: WizardCfg,
    /// Chat paging.
    pub chat: ChatCfg,
    /// Log output.
    pub logging: LoggingCfg,
}

/// REST API endpoint and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCfg {
    /// API root, e.g. `https://host/api`.
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,
}

/// Reverse-geocoding endpoint (Nominatim-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingCfg {
    pub base_url: String,
    /// Sent as `User-Agent`, required by public Nominatim instances.
    pub user_agent: String,
    /// Preferred address language (`accept-language`).
    pub language: String,
}

/// Where the session file lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCfg {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardCfg {
    /// Maximum number of photos per delivery.
    pub max_photos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCfg {
    /// Messages requested per page.
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingCfg {
    /// Log file written next to the working directory.
    pub file: String,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl ApiCfg {
    /// WebSocket root derived from the REST root (`http` → `ws`, `https` → `wss`).
    pub fn ws_base_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiCfg {
                base_url: "http://localhost:8080/api".into(),
                request_timeout_secs: 30,
            },
            geocoding: GeocodingCfg {
                base_url: "https://nominatim.openstreetmap.org".into(),
                user_agent: "swiftflow_tui/0.1".into(),
                language: "id".into(),
            },
            session: SessionCfg {
                path: "session.json".into(),
            },
            wizard: WizardCfg { max_photos: 10 },
            chat: ChatCfg { page_size: 50 },
            logging: LoggingCfg {
                file: "swiftflow_tui.log".into(),
            },
        }
    }
}
