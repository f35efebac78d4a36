//! HTTP surface: the manifest endpoint plus a status probe.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use devserve_manifest::core::ConfigRuntimeVersionResolver;
use devserve_manifest::effects::{FsAssetResolver, MetroBundlerAdapter};
use devserve_manifest::{
    ExpoApiClient, FramedResponse, ManifestMiddleware, ManifestPipeline, RawRequest, RuntimeState,
    ServerConfig, TracingWarnings,
};
use tower_http::trace::TraceLayer;

pub const STATUS_BODY: &str = "packager-status:running";

pub type Middleware = ManifestMiddleware<ExpoApiClient, ExpoApiClient, TracingWarnings>;

/// Wire the production collaborators for `config`.
pub fn build_middleware(config: &ServerConfig, state: Arc<RuntimeState>) -> Middleware {
    let api = ExpoApiClient::new(config.api_base_url.clone())
        .with_session_token(config.session_token.clone());
    let pipeline = ManifestPipeline::new(
        config.project_root.clone(),
        state,
        api.clone(),
        api,
        TracingWarnings,
    )
    .with_collaborators(
        ConfigRuntimeVersionResolver,
        FsAssetResolver,
        MetroBundlerAdapter::new(config.bundler_port),
    )
    .with_mode(config.mode)
    .with_signing(|signing| signing.with_private_key_path(config.private_key_path.clone()));
    ManifestMiddleware::new(config.protocol, pipeline)
}

pub fn router(middleware: Arc<Middleware>) -> Router {
    Router::new()
        .route("/", get(manifest))
        .route("/manifest", get(manifest))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(middleware)
}

async fn manifest(
    State(middleware): State<Arc<Middleware>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let raw = RawRequest::new(uri, headers);
    into_response(middleware.handle(&raw).await)
}

async fn status() -> &'static str {
    STATUS_BODY
}

fn into_response(framed: FramedResponse) -> Response {
    let mut response = Response::new(Body::from(framed.body));
    *response.status_mut() = framed.status;
    *response.headers_mut() = framed.headers;
    response
}
