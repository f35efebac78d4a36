//! Code-signing primitives for development manifests.
//!
//! Signs manifest bodies with RSA PKCS#1 v1.5 / SHA-256 and speaks the
//! structured-field headers clients use to ask for and check signatures.
//! Nothing here knows about HTTP or projects; callers decide which key
//! applies to a request.
//!
//! # Key Features
//!
//! - **Deterministic**: identical bytes and key always yield the identical signature
//! - **Header codec**: parses `expo-expect-signature`, renders `expo-signature`
//! - **Two key sources**: developer certificate on disk, or a platform-issued chain
//!
//! # Example
//!
//! ```
//! use devserve_signing::ExpectSignature;
//!
//! let expect = ExpectSignature::parse(r#"sig, keyid="expo-root", alg="rsa-v1_5-sha256""#);
//! assert_eq!(expect.keyid.as_deref(), Some("expo-root"));
//! ```

pub use self::chain::{CertificateChain, CodeSigningMetadata, DeveloperSigningInfo};
pub use self::error::{Result, SigningError};
pub use self::header::{ExpectSignature, SignatureAlgorithm, SignatureHeader};
pub use self::key::{DEFAULT_KEY_BITS, SigningKey};

mod chain;
mod error;
mod header;
mod key;
