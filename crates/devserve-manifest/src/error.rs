//! Error types for devserve-manifest.
//!
//! [`RemoteError`] is what the identity and certificate services raise; its
//! [`ErrorKind`] decides whether the offline fallback absorbs it.
//! [`ManifestError`] is fatal for the request and becomes an HTTP 500.

use std::path::PathBuf;

use devserve_signing::SigningError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Classification of failures, used both for fallback decisions and as half
/// of the warning de-duplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller cannot view the app or the account that owns it.
    PermissionDenied,
    /// DNS failure, refused connection, timeout.
    Unreachable,
    /// Developer certificate or key missing, unreadable or mismatched.
    SigningConfigurationInvalid,
    UnknownRemoteError,
}

impl ErrorKind {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::PermissionDenied | ErrorKind::Unreachable)
    }
}

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("permission denied: {detail}")]
    PermissionDenied { detail: String },

    #[error("service unreachable: {detail}")]
    Unreachable { detail: String },

    #[error("unexpected response from service: {detail}")]
    Unknown { detail: String },
}

impl RemoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RemoteError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            RemoteError::Unreachable { .. } => ErrorKind::Unreachable,
            RemoteError::Unknown { .. } => ErrorKind::UnknownRemoteError,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            RemoteError::PermissionDenied { detail }
            | RemoteError::Unreachable { detail }
            | RemoteError::Unknown { detail } => detail,
        }
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("unsupported platform \"{0}\"; expected one of: ios, android, web")]
    UnsupportedPlatform(String),

    #[error("failed to load project config from {path}: {reason}")]
    ProjectConfig { path: PathBuf, reason: String },

    #[error("failed to resolve runtime version: {0}")]
    RuntimeVersion(String),

    #[error("failed to resolve assets: {0}")]
    Assets(String),

    #[error("failed to build bundle URL: {0}")]
    BundleUrl(String),

    #[error("invalid code signing configuration: {0}")]
    SigningConfigurationInvalid(String),

    #[error("failed to sign manifest: {0}")]
    Signing(#[source] SigningError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response header: {0}")]
    InvalidHeader(String),
}

impl ManifestError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ManifestError::SigningConfigurationInvalid(_) => {
                Some(ErrorKind::SigningConfigurationInvalid)
            }
            ManifestError::Remote(e) => Some(e.kind()),
            _ => None,
        }
    }
}
