//! Serializes a manifest into the negotiated wire format.
//!
//! Pure: every function here turns values into bytes and headers, no I/O.

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::data::{ResponseContentType, SigningOutcome};
use crate::error::{ManifestError, Result};

pub const PROTOCOL_VERSION_HEADER: &str = "expo-protocol-version";
pub const SFV_VERSION_HEADER: &str = "expo-sfv-version";
pub const SIGNATURE_HEADER: &str = "expo-signature";
pub const CACHE_CONTROL_VALUE: &str = "private, max-age=0";

const MANIFEST_PART: &str = "manifest";
const CERTIFICATE_CHAIN_PART: &str = "certificate_chain";
const PEM_CONTENT_TYPE: &str = "application/x-pem-file";
const UNSIGNED: &str = "UNSIGNED";

/// A complete HTTP response, independent of any server framework.
#[derive(Debug, Clone, PartialEq)]
pub struct FramedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FramedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
pub struct ResponseFramer {
    boundary: Option<String>,
}

impl Default for ResponseFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseFramer {
    /// A framer that draws a fresh multipart boundary per response.
    pub fn new() -> Self {
        Self { boundary: None }
    }

    /// A framer that always uses `boundary`.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: Some(boundary.into()),
        }
    }

    /// Frame `manifest_json`, the exact bytes that were signed.
    ///
    /// `signature_requested` only matters for the text format, which wraps
    /// the manifest whenever the client asked for a signature, signed or not.
    pub fn frame(
        &self,
        content_type: ResponseContentType,
        manifest_json: &str,
        signing: &SigningOutcome,
        signature_requested: bool,
    ) -> Result<FramedResponse> {
        let mut headers = protocol_headers();
        let body = match content_type {
            ResponseContentType::MultipartMixed => {
                let boundary = self
                    .boundary
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
                headers.insert(
                    CONTENT_TYPE,
                    header_value(&format!("multipart/mixed; boundary={boundary}"))?,
                );
                multipart_body(&boundary, manifest_json, signing)
            }
            ResponseContentType::ApplicationJson | ResponseContentType::ApplicationExpoJson => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
                Bytes::copy_from_slice(manifest_json.as_bytes())
            }
            ResponseContentType::TextPlain => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
                if signature_requested {
                    let signature = signing
                        .signature
                        .as_ref()
                        .map_or_else(|| UNSIGNED.to_string(), ToString::to_string);
                    let wrapped = json!({
                        "manifestString": manifest_json,
                        "signature": signature,
                    });
                    Bytes::from(serde_json::to_vec(&wrapped)?)
                } else {
                    Bytes::copy_from_slice(manifest_json.as_bytes())
                }
            }
        };

        Ok(FramedResponse {
            status: StatusCode::OK,
            headers,
            body,
        })
    }

    /// HTTP 500 with `{"error": "<message>"}`.
    pub fn error(&self, error: &ManifestError) -> FramedResponse {
        let body = json!({ "error": error.to_string() }).to_string();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        FramedResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers,
            body: Bytes::from(body),
        }
    }
}

fn protocol_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(PROTOCOL_VERSION_HEADER),
        HeaderValue::from_static("0"),
    );
    headers.insert(
        HeaderName::from_static(SFV_VERSION_HEADER),
        HeaderValue::from_static("0"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ManifestError::InvalidHeader(e.to_string()))
}

fn multipart_body(boundary: &str, manifest_json: &str, signing: &SigningOutcome) -> Bytes {
    let mut body = String::new();

    body.push_str(&format!("--{boundary}\r\n"));
    body.push_str(&format!(
        "Content-Disposition: form-data; name=\"{MANIFEST_PART}\"\r\n"
    ));
    body.push_str("Content-Type: application/json\r\n");
    if let Some(signature) = &signing.signature {
        body.push_str(&format!("{SIGNATURE_HEADER}: {signature}\r\n"));
    }
    body.push_str("\r\n");
    body.push_str(manifest_json);
    body.push_str("\r\n");

    if let Some(chain) = &signing.certificate_chain {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str(&format!(
            "Content-Disposition: form-data; name=\"{CERTIFICATE_CHAIN_PART}\"\r\n"
        ));
        body.push_str(&format!("Content-Type: {PEM_CONTENT_TYPE}\r\n"));
        body.push_str("\r\n");
        body.push_str(chain);
        body.push_str("\r\n");
    }

    body.push_str(&format!("--{boundary}--\r\n"));
    Bytes::from(body)
}
