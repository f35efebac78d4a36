//! Server-level configuration.
//!
//! Built from [`ServerConfig::default`], then the environment, then the CLI.

use std::fmt;
use std::path::PathBuf;

/// Forces the offline path without attempting any network call.
pub const ENV_OFFLINE: &str = "EXPO_OFFLINE";
/// Overrides the API base URL.
pub const ENV_API_URL: &str = "EXPO_API_URL";
/// Session token sent to the API.
pub const ENV_TOKEN: &str = "EXPO_TOKEN";

pub const DEFAULT_API_BASE_URL: &str = "https://api.expo.dev";
pub const DEFAULT_BUNDLER_PORT: u16 = 8081;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundlerMode {
    #[default]
    Development,
    Production,
}

impl BundlerMode {
    pub fn is_dev(&self) -> bool {
        matches!(self, BundlerMode::Development)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(BundlerMode::Development),
            "production" | "prod" => Some(BundlerMode::Production),
            _ => None,
        }
    }
}

impl fmt::Display for BundlerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BundlerMode::Development => "development",
            BundlerMode::Production => "production",
        })
    }
}

/// Which manifest protocol the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVariant {
    /// Multipart-capable protocol with negotiated content types.
    #[default]
    Modern,
    /// Single text document, signature requested by a boolean header.
    Legacy,
}

impl ProtocolVariant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "modern" => Some(ProtocolVariant::Modern),
            "legacy" => Some(ProtocolVariant::Legacy),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub project_root: PathBuf,
    pub bundler_port: u16,
    pub mode: BundlerMode,
    pub api_base_url: String,
    pub session_token: Option<String>,
    /// Developer private key; defaults to `keys/private-key.pem` beside the
    /// certificate directory.
    pub private_key_path: Option<PathBuf>,
    pub protocol: ProtocolVariant,
    pub offline: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            bundler_port: DEFAULT_BUNDLER_PORT,
            mode: BundlerMode::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_token: None,
            private_key_path: None,
            protocol: ProtocolVariant::default(),
            offline: false,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("project_root", &self.project_root)
            .field("bundler_port", &self.bundler_port)
            .field("mode", &self.mode)
            .field("api_base_url", &self.api_base_url)
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("protocol", &self.protocol)
            .field("offline", &self.offline)
            .finish()
    }
}

impl ServerConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, which stands in for the environment.
    #[must_use]
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_OFFLINE) {
            self.offline = is_truthy(&value);
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.session_token = Some(token);
        }
        self
    }

    /// Directory holding per-project server state such as the host id.
    pub fn state_dir(&self) -> PathBuf {
        self.project_root.join(".expo")
    }
}

/// `1`, `true`, `yes` or `on`, ignoring case and surrounding whitespace.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
