use devserve_signing::SignatureHeader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key of the launch asset; clients look the bundle up by this literal.
pub const LAUNCH_ASSET_KEY: &str = "bundle";

/// Media type of the JavaScript bundle.
pub const LAUNCH_ASSET_CONTENT_TYPE: &str = "application/javascript";

/// The document served to the client.
///
/// Built fresh for every request: `hostUri` and the bundle URL depend on the
/// hostname the client used to reach the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: Uuid,
    /// ISO 8601, millisecond precision, UTC.
    pub created_at: String,
    pub runtime_version: String,
    pub launch_asset: LaunchAsset,
    pub assets: Vec<Asset>,
    pub metadata: Map<String, Value>,
    pub extra: ManifestExtra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchAsset {
    pub key: String,
    pub content_type: String,
    pub url: String,
}

impl LaunchAsset {
    pub fn bundle(url: impl Into<String>) -> Self {
        Self {
            key: LAUNCH_ASSET_KEY.to_string(),
            content_type: LAUNCH_ASSET_CONTENT_TYPE.to_string(),
            url: url.into(),
        }
    }
}

/// A resolved asset file referenced by the project config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Hex SHA-256 of the file contents.
    pub hash: String,
    pub key: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestExtra {
    pub eas: EasExtra,
    /// Public subset of the project config plus `hostUri`.
    pub expo_client: Value,
    /// Reserved for client-specific hints.
    pub expo_go: Map<String, Value>,
    pub scope_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EasExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// What signing produced for one manifest body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningOutcome {
    pub signature: Option<SignatureHeader>,
    /// PEM bundle, only for platform-issued signatures.
    pub certificate_chain: Option<String>,
}

impl SigningOutcome {
    pub fn unsigned() -> Self {
        Self::default()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}
