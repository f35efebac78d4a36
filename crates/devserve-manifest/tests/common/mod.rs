#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use devserve_manifest::data::OwnerHandle;
use devserve_manifest::effects::{CertificateAuthority, IdentityService, ProjectAccess};
use devserve_manifest::{
    ErrorKind, FramedResponse, ManifestMiddleware, ManifestPipeline, RemoteError, ResponseFramer,
    RuntimeState, WarningSink,
};
use devserve_manifest::data::ProtocolVariant;
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

pub const CERTIFICATE: &str = include_str!("../fixtures/certificate.pem");
pub const INTERMEDIATE: &str = include_str!("../fixtures/intermediate.pem");
pub const PRIVATE_KEY: &str = include_str!("../fixtures/private-key.pem");

pub const HOST_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";
pub const BOUNDARY: &str = "test-boundary";

pub fn host_id() -> Uuid {
    Uuid::parse_str(HOST_ID).unwrap()
}

pub struct FakeIdentity {
    response: Mutex<Result<ProjectAccess, RemoteError>>,
    pub calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn granting(scope_key: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(ProjectAccess {
                scope_key: scope_key.to_string(),
                owner: None,
            })),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn granting_owned(scope_key: &str, owner: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(ProjectAccess {
                scope_key: scope_key.to_string(),
                owner: Some(OwnerHandle::new(owner)),
            })),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: RemoteError) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityService for FakeIdentity {
    async fn check_project_access(&self, _project_id: &str) -> Result<ProjectAccess, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.lock().clone()
    }
}

pub struct FakeAuthority {
    failure: Mutex<Option<RemoteError>>,
    pub issued: AtomicUsize,
    pub public_keys: Mutex<Vec<String>>,
}

impl FakeAuthority {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            failure: Mutex::new(None),
            issued: AtomicUsize::new(0),
            public_keys: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: RemoteError) -> Arc<Self> {
        let authority = Self::new();
        *authority.failure.lock() = Some(error);
        authority
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

impl CertificateAuthority for FakeAuthority {
    async fn issue_development_certificate(
        &self,
        _project_id: &str,
        public_key_pem: &str,
    ) -> Result<String, RemoteError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.public_keys.lock().push(public_key_pem.to_string());
        Ok(CERTIFICATE.to_string())
    }

    async fn intermediate_certificate(&self) -> Result<String, RemoteError> {
        Ok(INTERMEDIATE.to_string())
    }
}

#[derive(Default)]
pub struct RecordingWarnings {
    pub warnings: Mutex<Vec<(ErrorKind, OwnerHandle, String)>>,
}

impl RecordingWarnings {
    pub fn messages(&self) -> Vec<String> {
        self.warnings.lock().iter().map(|(_, _, m)| m.clone()).collect()
    }
}

impl WarningSink for RecordingWarnings {
    fn warn(&self, kind: ErrorKind, owner: &OwnerHandle, message: &str) {
        self.warnings
            .lock()
            .push((kind, owner.clone(), message.to_string()));
    }
}

pub type TestMiddleware =
    ManifestMiddleware<Arc<FakeIdentity>, Arc<FakeAuthority>, Arc<RecordingWarnings>>;

pub struct Harness {
    pub project: TempDir,
    pub state: Arc<RuntimeState>,
    pub identity: Arc<FakeIdentity>,
    pub authority: Arc<FakeAuthority>,
    pub warnings: Arc<RecordingWarnings>,
    pub middleware: TestMiddleware,
}

impl Harness {
    pub fn new(app_json: Value, identity: Arc<FakeIdentity>, authority: Arc<FakeAuthority>) -> Self {
        Self::with_variant(ProtocolVariant::Modern, app_json, identity, authority)
    }

    pub fn with_variant(
        variant: ProtocolVariant,
        app_json: Value,
        identity: Arc<FakeIdentity>,
        authority: Arc<FakeAuthority>,
    ) -> Self {
        let project = tempfile::tempdir().unwrap();
        write_app_json(project.path(), &app_json);

        let state = Arc::new(RuntimeState::new(host_id()));
        let warnings = Arc::new(RecordingWarnings::default());
        let pipeline = ManifestPipeline::new(
            project.path(),
            state.clone(),
            identity.clone(),
            authority.clone(),
            warnings.clone(),
        )
        .with_signing(|signing| signing.with_key_bits(1024))
        .with_framer(ResponseFramer::with_boundary(BOUNDARY));

        Self {
            project,
            state,
            identity,
            authority,
            warnings,
            middleware: ManifestMiddleware::new(variant, pipeline),
        }
    }

    pub fn root(&self) -> &Path {
        self.project.path()
    }

    pub fn rewrite_app_json(&self, app_json: &Value) {
        write_app_json(self.root(), app_json);
    }

    /// Place the fixture certificate and key where a developer would.
    pub fn install_developer_certificate(&self) {
        std::fs::create_dir_all(self.root().join("certs")).unwrap();
        std::fs::create_dir_all(self.root().join("keys")).unwrap();
        std::fs::write(self.root().join("certs/certificate.pem"), CERTIFICATE).unwrap();
        std::fs::write(self.root().join("keys/private-key.pem"), PRIVATE_KEY).unwrap();
    }
}

pub fn write_app_json(root: &Path, app_json: &Value) {
    std::fs::write(
        root.join("app.json"),
        serde_json::to_string_pretty(app_json).unwrap(),
    )
    .unwrap();
}

#[derive(Debug, Clone)]
pub struct Part {
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Part {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        let disposition = self.header("content-disposition")?;
        let start = disposition.find("name=\"")? + "name=\"".len();
        let end = disposition[start..].find('"')? + start;
        Some(&disposition[start..end])
    }
}

pub fn parse_multipart(response: &FramedResponse) -> Vec<Part> {
    let content_type = response.header("content-type").unwrap();
    let boundary = content_type
        .split("boundary=")
        .nth(1)
        .expect("multipart boundary");
    let body = std::str::from_utf8(&response.body).unwrap();
    let delimiter = format!("--{boundary}");

    body.split(delimiter.as_str())
        .skip(1)
        .take_while(|chunk| !chunk.starts_with("--"))
        .map(|chunk| {
            let chunk = chunk.strip_prefix("\r\n").unwrap_or(chunk);
            let (head, body) = chunk.split_once("\r\n\r\n").expect("part separator");
            let headers = head
                .split("\r\n")
                .filter_map(|line| line.split_once(": "))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Part {
                headers,
                body: body.strip_suffix("\r\n").unwrap_or(body).to_string(),
            }
        })
        .collect()
}

pub fn part<'a>(parts: &'a [Part], name: &str) -> Option<&'a Part> {
    parts.iter().find(|p| p.name() == Some(name))
}

pub fn body_json(response: &FramedResponse) -> Value {
    serde_json::from_slice(&response.body).unwrap()
}
