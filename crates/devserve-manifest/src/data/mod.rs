//! Plain data: requests, manifests, configuration and shared process state.

pub mod config;
pub mod manifest;
pub mod project;
pub mod request;
pub mod state;

pub use config::{BundlerMode, ProtocolVariant, ServerConfig, is_truthy};
pub use manifest::{Asset, EasExtra, LaunchAsset, Manifest, ManifestExtra, SigningOutcome};
pub use project::{
    ConfigPatch, PlatformConfig, ProjectConfig, RuntimeVersionConfig, RuntimeVersionPolicy,
    UpdatesConfig,
};
pub use request::{ManifestRequest, RawRequest, ResponseContentType, RuntimePlatform};
pub use state::{OwnerHandle, RuntimeState, WarningMemo, load_or_create_host_id};
