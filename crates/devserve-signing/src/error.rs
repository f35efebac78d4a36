use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SigningError>;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid PEM in {what}: {reason}")]
    InvalidPem { what: String, reason: String },

    #[error("expected a {expected} PEM block in {what}, found {found}")]
    UnexpectedPemLabel {
        what: String,
        expected: &'static str,
        found: String,
    },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signing failed: {0}")]
    Sign(#[from] rsa::Error),
}
