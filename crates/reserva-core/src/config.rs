use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ReservaError, Result};
use crate::types::UserContext;

/// Top-level configuration for the booking widget.
///
/// Loaded from a TOML file supplied by the host page; every section has
/// full defaults so an empty file (or none at all) yields a working
/// local-mode widget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub widget: WidgetSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub dialogue: DialogueSection,
    #[serde(default)]
    pub messages: MessagesSection,
    /// Known identity of the page visitor, forwarded with every
    /// transition when present.
    #[serde(default)]
    pub user: Option<UserContext>,
}

impl WidgetConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WidgetConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file does not
    /// exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReservaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Widget identity and presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSection {
    /// Opaque tenant identity, passed through to the backend unvalidated.
    pub tenant_id: String,
    /// BCP 47 locale tag.
    pub locale: String,
    /// Overrides the tenant greeting when set.
    pub greeting_message: Option<String>,
    /// Open the chat window on load.
    pub auto_open: bool,
}

impl Default for WidgetSection {
    fn default() -> Self {
        Self {
            tenant_id: "demo".to_string(),
            locale: "es-CL".to_string(),
            greeting_message: None,
            auto_open: false,
        }
    }
}

/// Which transport implementation serves the dialogue contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process engine, no network.
    Local,
    /// Remote API; the transport collaborator owns timeouts.
    Remote,
}

/// Backend selection. The dialogue contract is identical either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    /// Required when `kind = "remote"`.
    pub api_url: Option<String>,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            api_url: None,
        }
    }
}

/// Dialogue engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueSection {
    /// Idle conversations are evicted after this many minutes.
    pub session_ttl_minutes: u32,
    /// Days of availability offered after a service is chosen.
    pub horizon_days: u32,
    /// Hour marks (UTC) at which slots are offered each day.
    pub hour_marks: Vec<u32>,
    pub slot_duration_minutes: u32,
}

impl Default for DialogueSection {
    fn default() -> Self {
        Self {
            session_ttl_minutes: 30,
            horizon_days: 2,
            hour_marks: vec![10, 12, 15, 17],
            slot_duration_minutes: 60,
        }
    }
}

/// Host-overridable user-facing strings. `None` falls back to the
/// built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesSection {
    pub error_connection: Option<String>,
    pub booking_success: Option<String>,
    pub booking_error: Option<String>,
    pub no_availability: Option<String>,
}
