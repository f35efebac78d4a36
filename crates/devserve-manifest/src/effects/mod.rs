//! Network, filesystem and process-state effects behind trait seams.

pub mod api;
pub mod assets;
pub mod bundler;
pub mod offline;
pub mod pipeline;
pub mod protocol;
pub mod signing;

pub use api::{CertificateAuthority, ExpoApiClient, IdentityService, ProjectAccess};
pub use assets::FsAssetResolver;
pub use bundler::MetroBundlerAdapter;
pub use offline::{OfflineFallback, TracingWarnings, WarningSink, warning_message};
pub use pipeline::ManifestPipeline;
pub use protocol::{LegacyProtocol, ManifestMiddleware, ManifestProtocol, ModernProtocol};
pub use signing::{
    CachedChain, ChainCache, CodeSigningService, PLATFORM_KEYID, PLATFORM_ROOT_KEYID, SigningPlan,
};
