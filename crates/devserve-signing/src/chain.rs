use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SigningError};
use crate::header::SignatureAlgorithm;
use crate::key::SigningKey;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Platform-issued certificate chain: a per-project development certificate
/// plus the intermediate that links it to the root clients already trust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    pub development_certificate: String,
    pub intermediate_certificate: String,
}

impl CertificateChain {
    pub fn new(
        development_certificate: impl Into<String>,
        intermediate_certificate: impl Into<String>,
    ) -> Result<Self> {
        let chain = Self {
            development_certificate: development_certificate.into(),
            intermediate_certificate: intermediate_certificate.into(),
        };
        check_certificate_pem(&chain.development_certificate, "development certificate")?;
        check_certificate_pem(&chain.intermediate_certificate, "intermediate certificate")?;
        Ok(chain)
    }

    /// Leaf first, then intermediate, each ending in a newline.
    pub fn to_pem_bundle(&self) -> String {
        let mut bundle = String::new();
        for cert in [&self.development_certificate, &self.intermediate_certificate] {
            bundle.push_str(cert.trim());
            bundle.push('\n');
        }
        bundle
    }
}

/// `updates.codeSigningMetadata` from the project config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSigningMetadata {
    pub keyid: String,
    #[serde(default)]
    pub alg: SignatureAlgorithm,
}

/// A developer-supplied certificate and private key, read straight from disk.
///
/// Nothing is cached: the filesystem is the source of truth, so each signing
/// call loads the pair again and picks up rotated keys immediately.
#[derive(Debug, Clone)]
pub struct DeveloperSigningInfo {
    pub certificate: String,
    pub key: SigningKey,
    pub metadata: CodeSigningMetadata,
}

impl DeveloperSigningInfo {
    pub fn load(
        certificate_path: &Path,
        private_key_path: &Path,
        metadata: CodeSigningMetadata,
    ) -> Result<Self> {
        let certificate = read(certificate_path)?;
        check_certificate_pem(&certificate, &certificate_path.display().to_string())?;
        let key = SigningKey::from_pem(&read(private_key_path)?)?;
        Ok(Self {
            certificate,
            key,
            metadata,
        })
    }

    /// Where the private key lives when the caller did not name one:
    /// `keys/private-key.pem` next to the certificate's parent directory.
    pub fn default_private_key_path(certificate_path: &Path) -> PathBuf {
        certificate_path
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""))
            .join("keys")
            .join("private-key.pem")
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| SigningError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn check_certificate_pem(pem: &str, what: &str) -> Result<()> {
    let (label, _der) =
        pem_rfc7468::decode_vec(pem.trim().as_bytes()).map_err(|e| SigningError::InvalidPem {
            what: what.to_string(),
            reason: e.to_string(),
        })?;
    if label != CERTIFICATE_LABEL {
        return Err(SigningError::UnexpectedPemLabel {
            what: what.to_string(),
            expected: CERTIFICATE_LABEL,
            found: label.to_string(),
        });
    }
    Ok(())
}
