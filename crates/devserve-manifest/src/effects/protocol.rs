//! The two manifest protocol variants and the middleware that serves one.

use std::future::Future;
use std::sync::Arc;

use tracing::error;

use crate::core::{FramedResponse, RequestClassifier};
use crate::data::{ManifestRequest, ProtocolVariant, RawRequest};
use crate::effects::api::{CertificateAuthority, IdentityService};
use crate::effects::offline::WarningSink;
use crate::effects::pipeline::ManifestPipeline;
use crate::error::Result;

pub trait ManifestProtocol: Send + Sync {
    fn classify(&self, raw: &RawRequest) -> ManifestRequest;

    fn build_manifest_response(
        &self,
        request: &ManifestRequest,
    ) -> impl Future<Output = Result<FramedResponse>> + Send;
}

/// Negotiated content types, multipart signatures and certificate chains.
pub struct ModernProtocol<I, C, W> {
    pipeline: Arc<ManifestPipeline<I, C, W>>,
}

/// A single text document; a boolean header asks for the platform signature.
pub struct LegacyProtocol<I, C, W> {
    pipeline: Arc<ManifestPipeline<I, C, W>>,
}

impl<I, C, W> ModernProtocol<I, C, W> {
    pub fn new(pipeline: Arc<ManifestPipeline<I, C, W>>) -> Self {
        Self { pipeline }
    }
}

impl<I, C, W> LegacyProtocol<I, C, W> {
    pub fn new(pipeline: Arc<ManifestPipeline<I, C, W>>) -> Self {
        Self { pipeline }
    }
}

impl<I, C, W> ManifestProtocol for ModernProtocol<I, C, W>
where
    I: IdentityService,
    C: CertificateAuthority,
    W: WarningSink,
{
    fn classify(&self, raw: &RawRequest) -> ManifestRequest {
        RequestClassifier::modern().classify(raw)
    }

    fn build_manifest_response(
        &self,
        request: &ManifestRequest,
    ) -> impl Future<Output = Result<FramedResponse>> + Send {
        self.pipeline.respond(request)
    }
}

impl<I, C, W> ManifestProtocol for LegacyProtocol<I, C, W>
where
    I: IdentityService,
    C: CertificateAuthority,
    W: WarningSink,
{
    fn classify(&self, raw: &RawRequest) -> ManifestRequest {
        RequestClassifier::legacy().classify(raw)
    }

    fn build_manifest_response(
        &self,
        request: &ManifestRequest,
    ) -> impl Future<Output = Result<FramedResponse>> + Send {
        self.pipeline.respond(request)
    }
}

/// Serves manifest requests with the variant chosen at construction.
pub enum ManifestMiddleware<I, C, W> {
    Modern(ModernProtocol<I, C, W>),
    Legacy(LegacyProtocol<I, C, W>),
}

impl<I, C, W> ManifestMiddleware<I, C, W>
where
    I: IdentityService,
    C: CertificateAuthority,
    W: WarningSink,
{
    pub fn new(variant: ProtocolVariant, pipeline: ManifestPipeline<I, C, W>) -> Self {
        let pipeline = Arc::new(pipeline);
        match variant {
            ProtocolVariant::Modern => Self::Modern(ModernProtocol::new(pipeline)),
            ProtocolVariant::Legacy => Self::Legacy(LegacyProtocol::new(pipeline)),
        }
    }

    pub fn variant(&self) -> ProtocolVariant {
        match self {
            Self::Modern(_) => ProtocolVariant::Modern,
            Self::Legacy(_) => ProtocolVariant::Legacy,
        }
    }

    pub fn pipeline(&self) -> &ManifestPipeline<I, C, W> {
        match self {
            Self::Modern(p) => &p.pipeline,
            Self::Legacy(p) => &p.pipeline,
        }
    }

    pub fn classify(&self, raw: &RawRequest) -> ManifestRequest {
        match self {
            Self::Modern(p) => p.classify(raw),
            Self::Legacy(p) => p.classify(raw),
        }
    }

    /// Classify, build and frame. Fatal errors become a 500 response and are
    /// logged; they never escape.
    pub async fn handle(&self, raw: &RawRequest) -> FramedResponse {
        let request = self.classify(raw);
        let result = match self {
            Self::Modern(p) => p.build_manifest_response(&request).await,
            Self::Legacy(p) => p.build_manifest_response(&request).await,
        };
        result.unwrap_or_else(|e| {
            error!(platform = %request.platform, "failed to serve manifest: {e}");
            self.pipeline().framer().error(&e)
        })
    }
}
