//! Remote collaborators and the reqwest-backed client that implements them.

use std::future::Future;
use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::OwnerHandle;
use crate::error::RemoteError;

const SESSION_HEADER: &str = "expo-session";

/// Result of a successful identity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAccess {
    pub scope_key: String,
    pub owner: Option<OwnerHandle>,
}

/// Confirms the caller may view a project and reports its scope key.
pub trait IdentityService: Send + Sync {
    fn check_project_access(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<ProjectAccess, RemoteError>> + Send;
}

/// Issues development certificates for locally generated keys.
pub trait CertificateAuthority: Send + Sync {
    /// Certify `public_key_pem` for `project_id`; returns the certificate PEM.
    fn issue_development_certificate(
        &self,
        project_id: &str,
        public_key_pem: &str,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;

    /// The intermediate linking development certificates to the root.
    fn intermediate_certificate(&self) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

impl<T: IdentityService> IdentityService for Arc<T> {
    fn check_project_access(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<ProjectAccess, RemoteError>> + Send {
        (**self).check_project_access(project_id)
    }
}

impl<T: CertificateAuthority> CertificateAuthority for Arc<T> {
    fn issue_development_certificate(
        &self,
        project_id: &str,
        public_key_pem: &str,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send {
        (**self).issue_development_certificate(project_id, public_key_pem)
    }

    fn intermediate_certificate(&self) -> impl Future<Output = Result<String, RemoteError>> + Send {
        (**self).intermediate_certificate()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectData {
    scope_key: String,
    #[serde(default)]
    owner_account: Option<OwnerAccount>,
}

#[derive(Debug, Deserialize)]
struct OwnerAccount {
    name: String,
}

#[derive(Debug, Serialize)]
struct CertificateRequest<'a> {
    #[serde(rename = "csrPEM")]
    csr_pem: &'a str,
}

#[derive(Debug, Deserialize)]
struct CertificateData {
    certificate: String,
}

/// HTTP client for the project and certificate endpoints.
#[derive(Clone)]
pub struct ExpoApiClient {
    client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl std::fmt::Debug for ExpoApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpoApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.session_token.is_some())
            .finish()
    }
}

impl ExpoApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: None,
        }
    }

    #[must_use]
    pub fn with_session_token(mut self, token: Option<String>) -> Self {
        self.session_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_token {
            Some(token) => request.header(SESSION_HEADER, token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = self.authorize(request).send().await.map_err(classify)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Unknown {
                detail: format!("malformed response: {e}"),
            })
    }
}

impl IdentityService for ExpoApiClient {
    async fn check_project_access(&self, project_id: &str) -> Result<ProjectAccess, RemoteError> {
        let url = self.url(&format!("projects/{project_id}"));
        let envelope: Envelope<ProjectData> = self.json(self.client.get(url)).await?;
        Ok(ProjectAccess {
            scope_key: envelope.data.scope_key,
            owner: envelope.data.owner_account.map(|a| OwnerHandle::new(a.name)),
        })
    }
}

impl CertificateAuthority for ExpoApiClient {
    async fn issue_development_certificate(
        &self,
        project_id: &str,
        public_key_pem: &str,
    ) -> Result<String, RemoteError> {
        let url = self.url(&format!("projects/{project_id}/development-certificates"));
        let body = CertificateRequest {
            csr_pem: public_key_pem,
        };
        let envelope: Envelope<CertificateData> =
            self.json(self.client.post(url).json(&body)).await?;
        Ok(envelope.data.certificate)
    }

    async fn intermediate_certificate(&self) -> Result<String, RemoteError> {
        let url = self.url("development-certificates/expo-go-intermediate-certificate");
        self.send(self.client.get(url))
            .await?
            .text()
            .await
            .map_err(|e| RemoteError::Unknown {
                detail: format!("failed to read intermediate certificate: {e}"),
            })
    }
}

fn classify(error: reqwest::Error) -> RemoteError {
    let detail = error.to_string();
    if error.is_connect() || error.is_timeout() {
        RemoteError::Unreachable { detail }
    } else if let Some(status) = error.status() {
        classify_status(status, &detail)
    } else {
        RemoteError::Unknown { detail }
    }
}

fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied { detail },
        _ => RemoteError::Unknown { detail },
    }
}
