use std::fmt;
use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::error::{Result, SigningError};
use crate::header::SignatureAlgorithm;

/// Default modulus size for generated development keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// An RSA private key used to sign manifest bodies.
///
/// PKCS#1 v1.5 padding is deterministic, so the same key over the same bytes
/// always produces the same signature. Cached keys can therefore re-sign
/// offline without the signature drifting between requests.
#[derive(Clone)]
pub struct SigningKey {
    inner: RsaPrivateKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("inner", &"{ ... }")
            .finish()
    }
}

impl SigningKey {
    /// Decode a `PRIVATE KEY` (PKCS#8) or `RSA PRIVATE KEY` (PKCS#1) PEM block.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let inner = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn from_pem_file(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|source| SigningError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem)
    }

    /// Generate a fresh key. This is CPU-heavy; async callers should run it
    /// on a blocking thread.
    pub fn generate(bits: usize) -> Result<Self> {
        let inner = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// SubjectPublicKeyInfo PEM for the matching public key.
    pub fn public_key_pem(&self) -> Result<String> {
        self.inner
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))
    }

    pub fn sign(&self, data: &[u8], alg: SignatureAlgorithm) -> Result<Vec<u8>> {
        match alg {
            SignatureAlgorithm::RsaV15Sha256 => {
                let digest = Sha256::digest(data);
                Ok(self.inner.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)?)
            }
        }
    }

    pub fn verify(&self, data: &[u8], signature: &[u8], alg: SignatureAlgorithm) -> bool {
        match alg {
            SignatureAlgorithm::RsaV15Sha256 => {
                let digest = Sha256::digest(data);
                self.inner
                    .to_public_key()
                    .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
                    .is_ok()
            }
        }
    }
}
