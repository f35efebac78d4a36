use std::fmt;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Uri;

use crate::error::{ManifestError, Result};

/// The parts of an incoming HTTP request the classifier looks at.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RawRequest {
    pub fn new(uri: Uri, headers: HeaderMap) -> Self {
        Self { uri, headers }
    }

    /// Add a header, silently skipping values that are not valid header text.
    /// `name` must be a lowercase header name.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(HeaderName::from_static(name), value);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Response format negotiated from the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseContentType {
    MultipartMixed,
    ApplicationJson,
    ApplicationExpoJson,
    /// Legacy single-document response; also the fallback.
    #[default]
    TextPlain,
}

impl ResponseContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseContentType::MultipartMixed => "multipart/mixed",
            ResponseContentType::ApplicationJson => "application/json",
            ResponseContentType::ApplicationExpoJson => "application/expo+json",
            ResponseContentType::TextPlain => "text/plain",
        }
    }
}

impl fmt::Display for ResponseContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized intent of one manifest request. Built by the classifier and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRequest {
    /// Raw platform string; validated only when platform-specific work needs it.
    pub platform: String,
    pub hostname: Option<String>,
    pub response_content_type: ResponseContentType,
    /// Opaque structured-field value of the expect-signature header.
    pub expect_signature: Option<String>,
}

impl Default for ManifestRequest {
    fn default() -> Self {
        Self {
            platform: RuntimePlatform::Ios.as_str().to_string(),
            hostname: None,
            response_content_type: ResponseContentType::TextPlain,
            expect_signature: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimePlatform {
    Ios,
    Android,
    Web,
}

impl RuntimePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimePlatform::Ios => "ios",
            RuntimePlatform::Android => "android",
            RuntimePlatform::Web => "web",
        }
    }

    /// Fails with a descriptive error for anything but `ios`, `android`, `web`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "ios" => Ok(RuntimePlatform::Ios),
            "android" => Ok(RuntimePlatform::Android),
            "web" => Ok(RuntimePlatform::Web),
            other => Err(ManifestError::UnsupportedPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for RuntimePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
