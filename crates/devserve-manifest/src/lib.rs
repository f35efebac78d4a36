//! Development-server manifest protocol.
//!
//! Answers a mobile client's manifest request: negotiates the response
//! format, builds the manifest from the project config, signs it with a
//! developer or platform-issued certificate, and degrades to an anonymous,
//! offline manifest when the identity or certificate service cannot be used.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Requests, manifests, configuration and shared process state
//! - [`core`] - Pure transformations: classification, negotiation, building, framing
//! - [`effects`] - Remote services, filesystem collaborators, signing and fallback
//!
//! # Key Features
//!
//! - **Total negotiation**: every request gets a response format, never an error
//! - **Memoized chains**: platform certificates are issued once per project and reused offline
//! - **Quiet degradation**: recoverable failures warn once per owner and switch the process offline
//! - **Framework-free**: responses are plain status, headers and bytes

pub mod core;
pub mod data;
pub mod effects;
pub mod error;

pub use self::core::{FramedResponse, ManifestBuilder, RequestClassifier, ResponseFramer, negotiate};
pub use self::data::{
    Manifest, ManifestRequest, ProjectConfig, RawRequest, ResponseContentType, RuntimeState,
    ServerConfig,
};
pub use self::effects::{
    CodeSigningService, ExpoApiClient, ManifestMiddleware, ManifestPipeline, OfflineFallback,
    TracingWarnings, WarningSink,
};
pub use self::error::{ErrorKind, ManifestError, RemoteError, Result};
