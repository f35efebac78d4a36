//! Structured-field codec for the signature request and response headers.
//!
//! Clients announce the signature they can check in a dictionary such as
//! `sig, keyid="expo-root", alg="rsa-v1_5-sha256"`. The server answers with
//! `sig="<base64>", keyid="expo-go", alg="rsa-v1_5-sha256"`. Only the subset
//! of RFC 8941 dictionaries these headers use is understood; anything else is
//! skipped rather than rejected.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SigningError};

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA with PKCS#1 v1.5 padding over a SHA-256 digest.
    #[default]
    #[serde(rename = "rsa-v1_5-sha256")]
    RsaV15Sha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaV15Sha256 => "rsa-v1_5-sha256",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "rsa-v1_5-sha256" => Ok(SignatureAlgorithm::RsaV15Sha256),
            other => Err(SigningError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed `expo-expect-signature` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectSignature {
    /// Whether the bare `sig` member was present.
    pub sig: bool,
    pub keyid: Option<String>,
    pub alg: Option<String>,
}

impl ExpectSignature {
    /// Parse a header value. Never fails: malformed input yields whatever
    /// members were read before the parser lost its footing.
    pub fn parse(header: &str) -> Self {
        let mut expect = Self::default();
        for (key, value) in parse_dictionary(header) {
            match (key.as_str(), value) {
                ("sig", _) => expect.sig = true,
                ("keyid", Some(v)) => expect.keyid = Some(v),
                ("alg", Some(v)) => expect.alg = Some(v),
                _ => {}
            }
        }
        expect
    }

    /// The requested algorithm, defaulting when the client left it out.
    pub fn algorithm(&self) -> Result<SignatureAlgorithm> {
        self.alg
            .as_deref()
            .map_or(Ok(SignatureAlgorithm::default()), SignatureAlgorithm::parse)
    }
}

/// Value of the `expo-signature` header attached to a signed manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub signature: Vec<u8>,
    pub keyid: String,
    pub alg: SignatureAlgorithm,
}

impl SignatureHeader {
    pub fn new(signature: Vec<u8>, keyid: impl Into<String>, alg: SignatureAlgorithm) -> Self {
        Self {
            signature,
            keyid: keyid.into(),
            alg,
        }
    }

    pub fn signature_base64(&self) -> String {
        STANDARD.encode(&self.signature)
    }
}

impl fmt::Display for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sig={}, keyid={}, alg={}",
            quote(&self.signature_base64()),
            quote(&self.keyid),
            quote(self.alg.as_str())
        )
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Dictionary members in order of appearance. A bare key maps to `None`;
/// string and token values are returned unquoted. Parameters are dropped.
fn parse_dictionary(input: &str) -> Vec<(String, Option<String>)> {
    let mut members = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}

        let mut key = String::new();
        while let Some(c) =
            chars.next_if(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_-.*".contains(*c))
        {
            key.push(c);
        }
        if key.is_empty() {
            break;
        }

        let value = if chars.next_if_eq(&'=').is_some() {
            match parse_bare_item(&mut chars) {
                Some(v) => Some(v),
                None => break,
            }
        } else {
            None
        };

        // Parameters (`;name=value`) carry nothing these headers need.
        while let Some(&c) = chars.peek() {
            if c == ',' {
                break;
            }
            if c == '"' {
                chars.next();
                skip_quoted(&mut chars);
            } else {
                chars.next();
            }
        }

        if let Some(existing) = members.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            members.push((key, value));
        }

        if chars.next_if_eq(&',').is_none() {
            break;
        }
    }

    members
}

fn parse_bare_item(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    if chars.next_if_eq(&'"').is_some() {
        let mut value = String::new();
        loop {
            match chars.next()? {
                '\\' => value.push(chars.next()?),
                '"' => return Some(value),
                c => value.push(c),
            }
        }
    }

    let mut value = String::new();
    while let Some(c) = chars.next_if(|c| !matches!(*c, ',' | ';') && !c.is_ascii_whitespace()) {
        value.push(c);
    }
    (!value.is_empty()).then_some(value)
}

fn skip_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => return,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expo_go_request() {
        let expect = ExpectSignature::parse(r#"sig, keyid="expo-root", alg="rsa-v1_5-sha256""#);
        assert!(expect.sig);
        assert_eq!(expect.keyid.as_deref(), Some("expo-root"));
        assert_eq!(expect.alg.as_deref(), Some("rsa-v1_5-sha256"));
        assert_eq!(expect.algorithm().unwrap(), SignatureAlgorithm::RsaV15Sha256);
    }

    #[test]
    fn test_parse_without_whitespace_and_token_values() {
        let expect = ExpectSignature::parse("keyid=main,sig,alg=rsa-v1_5-sha256");
        assert!(expect.sig);
        assert_eq!(expect.keyid.as_deref(), Some("main"));
    }

    #[test]
    fn test_parse_skips_parameters() {
        let expect = ExpectSignature::parse(r#"sig;x=1, keyid="a;b";y="q,r", alg="rsa-v1_5-sha256""#);
        assert_eq!(expect.keyid.as_deref(), Some("a;b"));
        assert_eq!(expect.alg.as_deref(), Some("rsa-v1_5-sha256"));
    }

    #[test]
    fn test_parse_escaped_string() {
        let expect = ExpectSignature::parse(r#"keyid="a\"b\\c""#);
        assert_eq!(expect.keyid.as_deref(), Some(r#"a"b\c"#));
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        let expect = ExpectSignature::parse(r#"keyid="one", keyid="two""#);
        assert_eq!(expect.keyid.as_deref(), Some("two"));
    }

    #[test]
    fn test_parse_malformed_degrades() {
        assert_eq!(ExpectSignature::parse(""), ExpectSignature::default());
        assert_eq!(ExpectSignature::parse("!!!"), ExpectSignature::default());

        let expect = ExpectSignature::parse(r#"sig, keyid="unterminated"#);
        assert!(expect.sig);
        assert_eq!(expect.keyid, None);
    }

    #[test]
    fn test_missing_alg_defaults() {
        let expect = ExpectSignature::parse("sig");
        assert_eq!(expect.algorithm().unwrap(), SignatureAlgorithm::RsaV15Sha256);
    }

    #[test]
    fn test_unknown_alg_rejected() {
        let expect = ExpectSignature::parse(r#"sig, alg="ecdsa-p256""#);
        assert!(matches!(
            expect.algorithm(),
            Err(SigningError::UnsupportedAlgorithm(alg)) if alg == "ecdsa-p256"
        ));
    }

    #[test]
    fn test_signature_header_display() {
        let header = SignatureHeader::new(vec![1, 2, 3], "expo-go", SignatureAlgorithm::RsaV15Sha256);
        assert_eq!(
            header.to_string(),
            r#"sig="AQID", keyid="expo-go", alg="rsa-v1_5-sha256""#
        );
    }

    #[test]
    fn test_signature_header_parses_back() {
        let header = SignatureHeader::new(vec![9; 4], r#"odd"id"#, SignatureAlgorithm::RsaV15Sha256);
        let parsed = ExpectSignature::parse(&header.to_string());
        assert_eq!(parsed.keyid.as_deref(), Some(r#"odd"id"#));
    }
}
