//! Decides which key signs a manifest and keeps platform-issued chains.
//!
//! Developer certificates are read from disk on every call. Platform chains
//! are issued once per project id and kept for the life of the process, so a
//! server that later goes offline can still sign for projects it has seen.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use devserve_signing::{
    CertificateChain, CodeSigningMetadata, DEFAULT_KEY_BITS, DeveloperSigningInfo,
    ExpectSignature, SignatureAlgorithm, SignatureHeader, SigningError, SigningKey,
};
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::data::{ProjectConfig, SigningOutcome};
use crate::effects::api::CertificateAuthority;
use crate::error::{ManifestError, RemoteError, Result};

/// Keyid a client sends to ask for the platform-issued chain.
pub const PLATFORM_ROOT_KEYID: &str = "expo-root";

/// Keyid reported on manifests signed with a platform-issued certificate.
pub const PLATFORM_KEYID: &str = "expo-go";

/// A generated key and the chain certifying it.
#[derive(Debug)]
pub struct CachedChain {
    pub key: SigningKey,
    pub chain: CertificateChain,
}

/// Platform chains by project id.
///
/// Each project gets its own cell, so concurrent requests for one project
/// share a single issuance while other projects proceed independently. A
/// failed issuance drops its cell; the next request starts afresh.
#[derive(Debug, Default)]
pub struct ChainCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Arc<CachedChain>>>>>,
}

impl ChainCache {
    fn cell(&self, project_id: &str) -> Arc<OnceCell<Arc<CachedChain>>> {
        self.cells
            .lock()
            .entry(project_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop the cell for `project_id` if it is empty and nobody else holds it.
    fn forget_failed(&self, project_id: &str) {
        let mut cells = self.cells.lock();
        if cells
            .get(project_id)
            .is_some_and(|cell| !cell.initialized() && Arc::strong_count(cell) == 1)
        {
            cells.remove(project_id);
        }
    }

    pub fn get(&self, project_id: &str) -> Option<Arc<CachedChain>> {
        self.cells
            .lock()
            .get(project_id)
            .and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, project_id: &str) -> bool {
        self.get(project_id).is_some()
    }

    /// Number of projects with an issued chain.
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which signature a request gets, decided before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningPlan {
    Unsigned,
    Developer {
        certificate_path: PathBuf,
        private_key_path: PathBuf,
        metadata: CodeSigningMetadata,
    },
    Platform {
        /// `None` when the project has no EAS project id; served unsigned.
        project_id: Option<String>,
        alg: SignatureAlgorithm,
    },
}

impl SigningPlan {
    /// Project whose platform chain this plan needs.
    pub fn platform_project_id(&self) -> Option<&str> {
        match self {
            SigningPlan::Platform { project_id, .. } => project_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct CodeSigningService<A> {
    authority: A,
    cache: ChainCache,
    key_bits: usize,
    private_key_path: Option<PathBuf>,
}

impl<A: CertificateAuthority> CodeSigningService<A> {
    pub fn new(authority: A) -> Self {
        Self {
            authority,
            cache: ChainCache::default(),
            key_bits: DEFAULT_KEY_BITS,
            private_key_path: None,
        }
    }

    /// Size of generated development keys.
    #[must_use]
    pub fn with_key_bits(mut self, bits: usize) -> Self {
        self.key_bits = bits;
        self
    }

    /// Developer private key, overriding the path derived from the certificate.
    #[must_use]
    pub fn with_private_key_path(mut self, path: Option<PathBuf>) -> Self {
        self.private_key_path = path;
        self
    }

    pub fn cache(&self) -> &ChainCache {
        &self.cache
    }

    /// Map the expect-signature header onto a key source.
    pub fn plan(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
        expect_signature: Option<&str>,
    ) -> Result<SigningPlan> {
        let Some(header) = expect_signature else {
            return Ok(SigningPlan::Unsigned);
        };
        let expect = ExpectSignature::parse(header);
        let alg = expect.algorithm().map_err(ManifestError::Signing)?;

        if expect.keyid.as_deref() == Some(PLATFORM_KEYID) {
            return Err(ManifestError::SigningConfigurationInvalid(format!(
                "keyid \"{PLATFORM_KEYID}\" identifies platform-signed responses; request \
                 keyid=\"{PLATFORM_ROOT_KEYID}\" to receive one"
            )));
        }
        if expect.keyid.as_deref() == Some(PLATFORM_ROOT_KEYID) {
            return Ok(SigningPlan::Platform {
                project_id: config.eas_project_id().map(str::to_string),
                alg,
            });
        }

        let Some(certificate_path) = config.code_signing_certificate_path(project_root) else {
            debug!(keyid = ?expect.keyid, "no code signing certificate configured; serving unsigned");
            return Ok(SigningPlan::Unsigned);
        };
        let metadata = config
            .updates
            .as_ref()
            .and_then(|u| u.code_signing_metadata.clone())
            .ok_or_else(|| {
                ManifestError::SigningConfigurationInvalid(
                    "updates.codeSigningMetadata must be set alongside codeSigningCertificate"
                        .to_string(),
                )
            })?;
        if let Some(keyid) = expect.keyid.as_deref() {
            if keyid != metadata.keyid {
                return Err(ManifestError::SigningConfigurationInvalid(format!(
                    "requested keyid \"{keyid}\" does not match configured keyid \"{}\"",
                    metadata.keyid
                )));
            }
        }

        let private_key_path = self
            .private_key_path
            .clone()
            .unwrap_or_else(|| DeveloperSigningInfo::default_private_key_path(&certificate_path));
        Ok(SigningPlan::Developer {
            certificate_path,
            private_key_path,
            metadata,
        })
    }

    /// Issue the platform chain for `project_id` unless one is cached.
    pub async fn ensure_chain(&self, project_id: &str) -> Result<Arc<CachedChain>> {
        let cell = self.cache.cell(project_id);
        let result = cell
            .get_or_try_init(|| self.issue_chain(project_id))
            .await
            .cloned();
        drop(cell);
        if result.is_err() {
            self.cache.forget_failed(project_id);
        }
        result
    }

    async fn issue_chain(&self, project_id: &str) -> Result<Arc<CachedChain>> {
        let bits = self.key_bits;
        let key = tokio::task::spawn_blocking(move || SigningKey::generate(bits))
            .await
            .map_err(|e| {
                ManifestError::Signing(SigningError::InvalidKey(format!(
                    "key generation task failed: {e}"
                )))
            })?
            .map_err(ManifestError::Signing)?;
        let public_key_pem = key.public_key_pem().map_err(ManifestError::Signing)?;

        let certificate = self
            .authority
            .issue_development_certificate(project_id, &public_key_pem)
            .await?;
        let intermediate = self.authority.intermediate_certificate().await?;
        let chain = CertificateChain::new(certificate, intermediate).map_err(|e| {
            RemoteError::Unknown {
                detail: format!("certificate authority returned an invalid chain: {e}"),
            }
        })?;

        info!(project_id, "issued development certificate");
        Ok(Arc::new(CachedChain { key, chain }))
    }

    /// Sign `body` according to `plan`.
    ///
    /// A platform plan with nothing cached is served unsigned.
    pub fn sign(&self, plan: &SigningPlan, body: &[u8]) -> Result<SigningOutcome> {
        match plan {
            SigningPlan::Unsigned => Ok(SigningOutcome::unsigned()),
            SigningPlan::Developer {
                certificate_path,
                private_key_path,
                metadata,
            } => {
                let info =
                    DeveloperSigningInfo::load(certificate_path, private_key_path, metadata.clone())
                        .map_err(|e| ManifestError::SigningConfigurationInvalid(e.to_string()))?;
                let signature = info
                    .key
                    .sign(body, info.metadata.alg)
                    .map_err(ManifestError::Signing)?;
                Ok(SigningOutcome {
                    signature: Some(SignatureHeader::new(
                        signature,
                        info.metadata.keyid,
                        info.metadata.alg,
                    )),
                    certificate_chain: None,
                })
            }
            SigningPlan::Platform {
                project_id: None, ..
            } => {
                debug!("project has no EAS project id; serving unsigned");
                Ok(SigningOutcome::unsigned())
            }
            SigningPlan::Platform {
                project_id: Some(project_id),
                alg,
            } => {
                let Some(cached) = self.cache.get(project_id) else {
                    debug!(project_id, "no development certificate cached; serving unsigned");
                    return Ok(SigningOutcome::unsigned());
                };
                let signature = cached.key.sign(body, *alg).map_err(ManifestError::Signing)?;
                Ok(SigningOutcome {
                    signature: Some(SignatureHeader::new(signature, PLATFORM_KEYID, *alg)),
                    certificate_chain: Some(cached.chain.to_pem_bundle()),
                })
            }
        }
    }
}
