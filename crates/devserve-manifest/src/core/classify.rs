use http::uri::Authority;

use crate::core::accept::negotiate;
use crate::data::{ManifestRequest, RawRequest, ResponseContentType, RuntimePlatform, is_truthy};

/// Platform header names, most preferred first.
pub const PLATFORM_HEADERS: [&str; 2] = ["expo-platform", "exponent-platform"];

/// Expect-signature header names, most preferred first.
pub const EXPECT_SIGNATURE_HEADERS: [&str; 2] =
    ["expo-expect-signature", "exponent-expect-signature"];

/// Boolean header the legacy protocol uses to ask for a signature.
pub const LEGACY_ACCEPT_SIGNATURE_HEADER: &str = "exponent-accept-signature";

/// What a legacy signature request means in the modern header syntax.
pub const LEGACY_EXPECT_SIGNATURE: &str = r#"sig, keyid="expo-root", alg="rsa-v1_5-sha256""#;

/// Turns raw request parts into a [`ManifestRequest`].
///
/// Never fails. Anything malformed degrades to its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestClassifier {
    legacy: bool,
}

impl RequestClassifier {
    pub fn modern() -> Self {
        Self { legacy: false }
    }

    pub fn legacy() -> Self {
        Self { legacy: true }
    }

    pub fn classify(&self, raw: &RawRequest) -> ManifestRequest {
        let response_content_type = if self.legacy {
            ResponseContentType::TextPlain
        } else {
            negotiate(raw.header("accept"))
        };
        let expect_signature = if self.legacy {
            legacy_expect_signature(raw)
        } else {
            first_header(raw, &EXPECT_SIGNATURE_HEADERS).map(str::to_string)
        };

        ManifestRequest {
            platform: platform(raw),
            hostname: hostname(raw),
            response_content_type,
            expect_signature,
        }
    }
}

fn first_header<'a>(raw: &'a RawRequest, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| raw.header(name))
}

fn platform(raw: &RawRequest) -> String {
    let non_empty = |p: &str| {
        let p = p.trim();
        (!p.is_empty()).then(|| p.to_string())
    };
    let from_query = raw.uri.query().and_then(|query| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "platform")
            .and_then(|(_, value)| non_empty(&value))
    });

    from_query
        .or_else(|| first_header(raw, &PLATFORM_HEADERS).and_then(non_empty))
        .unwrap_or_else(|| RuntimePlatform::Ios.as_str().to_string())
}

fn hostname(raw: &RawRequest) -> Option<String> {
    let host = raw
        .header("host")
        .and_then(|h| h.parse::<Authority>().ok())
        .map(|a| a.host().to_string())
        .or_else(|| raw.uri.host().map(str::to_string))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    (!host.is_empty()).then(|| host.to_string())
}

fn legacy_expect_signature(raw: &RawRequest) -> Option<String> {
    if raw
        .header(LEGACY_ACCEPT_SIGNATURE_HEADER)
        .is_some_and(is_truthy)
    {
        return Some(LEGACY_EXPECT_SIGNATURE.to_string());
    }
    first_header(raw, &EXPECT_SIGNATURE_HEADERS).map(str::to_string)
}
