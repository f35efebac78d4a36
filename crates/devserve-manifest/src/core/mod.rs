//! Pure transformations: classification, negotiation, building and framing.

pub mod accept;
pub mod builder;
pub mod classify;
pub mod collaborators;
pub mod framer;
pub mod runtime_version;
pub mod scope;

pub use accept::negotiate;
pub use builder::ManifestBuilder;
pub use classify::RequestClassifier;
pub use collaborators::{AssetResolver, BundleUrlRequest, BundlerAdapter, RuntimeVersionResolver};
pub use framer::{FramedResponse, ResponseFramer};
pub use runtime_version::{ConfigRuntimeVersionResolver, resolve_runtime_version, sdk_runtime_version};
pub use scope::{anonymous_scope_key, is_anonymous_scope_key};
