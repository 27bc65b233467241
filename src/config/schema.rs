/// Configuration schema and defaults for vitalis.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[api]`, `[chat]`, `[storage]` and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level vitalis configuration.
///
/// Maps directly to the `~/.vitalis/config.toml` and `.vitalis.toml` file
/// schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalisConfig {
    pub api: ApiConfig,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Prediction service connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the prediction service.
    pub base_url: String,
    /// Overall request timeout in milliseconds. `0` leaves the HTTP stack's
    /// defaults in place.
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// [chat]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Use the streaming endpoint; `false` goes straight to `/api/chat`.
    pub stream: bool,
    /// Seconds between assistant status checks.
    pub status_interval_secs: u64,
    /// Chat page used when building hand-off links.
    pub chat_page: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            stream: true,
            status_interval_secs: 30,
            chat_page: "chat.html".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [storage]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for persisted chat state. `~` is expanded to the home
    /// directory.
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: "~/.vitalis/storage".to_string(),
        }
    }
}

impl StorageConfig {
    /// Resolve `dir`, expanding a leading `~`.
    pub fn resolved_dir(&self) -> PathBuf {
        expand_tilde(&self.dir)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Diagnostic log filter: `"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`, or a full filter directive such as `"vitalis=debug"`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default config file
// ---------------------------------------------------------------------------

impl VitalisConfig {
    /// Annotated default config written by `vitalis config init`.
    pub fn default_toml() -> String {
        r#"# vitalis configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (VITALIS_*)
#   2. Project config (.vitalis.toml in current directory)
#   3. User global config (~/.vitalis/config.toml)
#   4. Built-in defaults

[api]
base_url = "http://localhost:5000"
timeout_ms = 0                 # 0 = no explicit timeout

[chat]
stream = true                  # false = always use the non-streaming endpoint
status_interval_secs = 30
chat_page = "chat.html"

[storage]
dir = "~/.vitalis/storage"

[logging]
level = "warn"                 # error | warn | info | debug | trace
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
