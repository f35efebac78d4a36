use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::core::{
    AssetResolver, BundlerAdapter, ConfigRuntimeVersionResolver, FramedResponse, ManifestBuilder,
    ResponseFramer, RuntimeVersionResolver, anonymous_scope_key,
};
use crate::data::{
    BundlerMode, ManifestRequest, OwnerHandle, ProjectConfig, ResponseContentType, RuntimeState,
};
use crate::effects::api::{CertificateAuthority, IdentityService, ProjectAccess};
use crate::effects::assets::FsAssetResolver;
use crate::effects::bundler::MetroBundlerAdapter;
use crate::effects::offline::{OfflineFallback, WarningSink};
use crate::effects::signing::{CodeSigningService, SigningPlan};
use crate::error::Result;

type DynBuilder = ManifestBuilder<
    Box<dyn RuntimeVersionResolver>,
    Box<dyn AssetResolver>,
    Box<dyn BundlerAdapter>,
>;

/// Builds, signs and frames the manifest for one classified request.
///
/// Identity and certificate calls run under the [`OfflineFallback`]; the
/// project config is re-read on every request.
pub struct ManifestPipeline<I, C, W> {
    project_root: PathBuf,
    builder: DynBuilder,
    identity: I,
    signing: CodeSigningService<C>,
    fallback: OfflineFallback<W>,
    framer: ResponseFramer,
}

impl<I, C, W> ManifestPipeline<I, C, W>
where
    I: IdentityService,
    C: CertificateAuthority,
    W: WarningSink,
{
    /// A pipeline with the config resolver, filesystem assets and a Metro
    /// bundler on the default port.
    pub fn new(
        project_root: impl Into<PathBuf>,
        state: Arc<RuntimeState>,
        identity: I,
        authority: C,
        warnings: W,
    ) -> Self {
        let project_root = project_root.into();
        let builder = ManifestBuilder::new(
            project_root.clone(),
            Box::new(ConfigRuntimeVersionResolver) as Box<dyn RuntimeVersionResolver>,
            Box::new(FsAssetResolver) as Box<dyn AssetResolver>,
            Box::new(MetroBundlerAdapter::default()) as Box<dyn BundlerAdapter>,
        );
        Self {
            project_root,
            builder,
            identity,
            signing: CodeSigningService::new(authority),
            fallback: OfflineFallback::new(state, warnings),
            framer: ResponseFramer::new(),
        }
    }

    /// Swap the local collaborators.
    #[must_use]
    pub fn with_collaborators(
        mut self,
        runtime_versions: impl RuntimeVersionResolver + 'static,
        assets: impl AssetResolver + 'static,
        bundler: impl BundlerAdapter + 'static,
    ) -> Self {
        self.builder = ManifestBuilder::new(
            self.project_root.clone(),
            Box::new(runtime_versions) as Box<dyn RuntimeVersionResolver>,
            Box::new(assets) as Box<dyn AssetResolver>,
            Box::new(bundler) as Box<dyn BundlerAdapter>,
        );
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: BundlerMode) -> Self {
        self.builder = self.builder.with_mode(mode);
        self
    }

    #[must_use]
    pub fn with_signing(
        mut self,
        configure: impl FnOnce(CodeSigningService<C>) -> CodeSigningService<C>,
    ) -> Self {
        self.signing = configure(self.signing);
        self
    }

    #[must_use]
    pub fn with_framer(mut self, framer: ResponseFramer) -> Self {
        self.framer = framer;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state(&self) -> &RuntimeState {
        self.fallback.state()
    }

    pub fn signing(&self) -> &CodeSigningService<C> {
        &self.signing
    }

    pub fn framer(&self) -> &ResponseFramer {
        &self.framer
    }

    pub async fn respond(&self, request: &ManifestRequest) -> Result<FramedResponse> {
        let config = ProjectConfig::load(&self.project_root)?;
        let owner = config.owner_handle();

        let plan = match request.response_content_type {
            ResponseContentType::ApplicationJson | ResponseContentType::ApplicationExpoJson => {
                SigningPlan::Unsigned
            }
            _ => self.signing.plan(
                &self.project_root,
                &config,
                request.expect_signature.as_deref(),
            )?,
        };

        let access = self.check_access(&config, &owner).await?;
        let owner = access
            .as_ref()
            .and_then(|access| access.owner.clone())
            .unwrap_or(owner);
        let mut scope_key = match access {
            Some(access) => access.scope_key,
            None => self.anonymous_scope(&config),
        };

        if let Some(project_id) = plan.platform_project_id() {
            let chain = self
                .fallback
                .guard(&owner, || self.signing.ensure_chain(project_id))
                .await?;
            if chain.is_none() {
                scope_key = self.anonymous_scope(&config);
            }
        }

        let manifest = self.builder.build(request, &config, &scope_key)?;
        let body = serde_json::to_string(&manifest)?;
        let signing = self.signing.sign(&plan, body.as_bytes())?;

        self.framer.frame(
            request.response_content_type,
            &body,
            &signing,
            request.expect_signature.is_some(),
        )
    }

    fn anonymous_scope(&self, config: &ProjectConfig) -> String {
        anonymous_scope_key(&config.slug, self.state().host_id())
    }

    /// `None` when the project has no EAS id or the check fell back offline.
    async fn check_access(
        &self,
        config: &ProjectConfig,
        owner: &OwnerHandle,
    ) -> Result<Option<ProjectAccess>> {
        let Some(project_id) = config.eas_project_id() else {
            debug!("project has no EAS project id; using anonymous scope");
            return Ok(None);
        };
        self.fallback
            .guard(owner, || self.identity.check_project_access(project_id))
            .await
    }
}
