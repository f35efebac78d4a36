use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::collaborators::{AssetResolver, BundleUrlRequest, BundlerAdapter, RuntimeVersionResolver};
use crate::core::runtime_version::sdk_runtime_version;
use crate::data::{
    BundlerMode, EasExtra, LaunchAsset, Manifest, ManifestExtra, ManifestRequest, ProjectConfig,
    RuntimePlatform,
};
use crate::error::Result;

/// Composes the unsigned manifest from the project config and the three
/// local collaborators.
///
/// The scope key is an input: identity is resolved before building, so the
/// builder never touches the network.
#[derive(Debug, Clone)]
pub struct ManifestBuilder<R, A, B> {
    project_root: PathBuf,
    mode: BundlerMode,
    runtime_versions: R,
    assets: A,
    bundler: B,
}

impl<R, A, B> ManifestBuilder<R, A, B>
where
    R: RuntimeVersionResolver,
    A: AssetResolver,
    B: BundlerAdapter,
{
    pub fn new(
        project_root: impl Into<PathBuf>,
        runtime_versions: R,
        assets: A,
        bundler: B,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            mode: BundlerMode::default(),
            runtime_versions,
            assets,
            bundler,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: BundlerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn build(
        &self,
        request: &ManifestRequest,
        config: &ProjectConfig,
        scope_key: &str,
    ) -> Result<Manifest> {
        self.build_at(request, config, scope_key, Uuid::new_v4(), Utc::now())
    }

    /// [`build`](Self::build) with a fixed id and timestamp.
    pub fn build_at(
        &self,
        request: &ManifestRequest,
        config: &ProjectConfig,
        scope_key: &str,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Manifest> {
        let platform = RuntimePlatform::parse(&request.platform)?;

        let runtime_version = self
            .runtime_versions
            .resolve(&self.project_root, config, platform)?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| sdk_runtime_version(config));

        let host_uri = self.bundler.host_uri(request.hostname.as_deref());
        let main_module = config.main_module_name();
        let bundle_url = self.bundler.bundle_url(&BundleUrlRequest {
            hostname: request.hostname.as_deref(),
            platform,
            mode: self.mode,
            main_module: &main_module,
        })?;

        let assets = self
            .assets
            .resolve_manifest_assets(&self.project_root, config, &host_uri)?;

        let mut expo_client = config.public_config()?;
        self.assets
            .resolve_google_services_file(&self.project_root, config)?
            .apply(&mut expo_client);
        if let Value::Object(object) = &mut expo_client {
            object.insert("hostUri".to_string(), Value::String(host_uri));
        }

        Ok(Manifest {
            id,
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            runtime_version,
            launch_asset: LaunchAsset::bundle(bundle_url),
            assets,
            metadata: Map::new(),
            extra: ManifestExtra {
                eas: EasExtra {
                    project_id: config.eas_project_id().map(str::to_string),
                },
                expo_client,
                expo_go: Map::new(),
                scope_key: scope_key.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::data::{Asset, ConfigPatch};
    use crate::error::ManifestError;

    struct FixedRuntime(Option<&'static str>);

    impl RuntimeVersionResolver for FixedRuntime {
        fn resolve(&self, _: &Path, _: &ProjectConfig, _: RuntimePlatform) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct NoAssets;

    impl AssetResolver for NoAssets {
        fn resolve_manifest_assets(&self, _: &Path, _: &ProjectConfig, _: &str) -> Result<Vec<Asset>> {
            Ok(Vec::new())
        }

        fn resolve_google_services_file(&self, _: &Path, _: &ProjectConfig) -> Result<ConfigPatch> {
            let mut patch = ConfigPatch::default();
            patch.set("ios", "googleServicesFile", json!("INLINED"));
            Ok(patch)
        }
    }

    struct FailingAssets;

    impl AssetResolver for FailingAssets {
        fn resolve_manifest_assets(&self, _: &Path, _: &ProjectConfig, _: &str) -> Result<Vec<Asset>> {
            Err(ManifestError::Assets("disk on fire".into()))
        }

        fn resolve_google_services_file(&self, _: &Path, _: &ProjectConfig) -> Result<ConfigPatch> {
            Ok(ConfigPatch::default())
        }
    }

    struct Bundler;

    impl BundlerAdapter for Bundler {
        fn host_uri(&self, hostname: Option<&str>) -> String {
            format!("{}:8081", hostname.unwrap_or("localhost"))
        }

        fn bundle_url(&self, request: &BundleUrlRequest<'_>) -> Result<String> {
            Ok(format!(
                "http://{}/{}.bundle?platform={}",
                self.host_uri(request.hostname),
                request.main_module,
                request.platform
            ))
        }
    }

    fn config() -> ProjectConfig {
        serde_json::from_value(json!({
            "name": "Demo",
            "slug": "demo",
            "sdkVersion": "52.0.0",
            "hooks": {"postPublish": []},
            "extra": {"eas": {"projectId": "project-1"}}
        }))
        .unwrap()
    }

    fn request(platform: &str) -> ManifestRequest {
        ManifestRequest {
            platform: platform.to_string(),
            hostname: Some("10.0.0.2".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_fills_every_field() {
        let builder = ManifestBuilder::new("/project", FixedRuntime(None), NoAssets, Bundler);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let manifest = builder
            .build_at(&request("android"), &config(), "@bacon/demo", Uuid::nil(), now)
            .unwrap();

        assert_eq!(manifest.id, Uuid::nil());
        assert_eq!(manifest.created_at, "2024-05-01T12:00:00.000Z");
        assert_eq!(manifest.runtime_version, "exposdk:52.0.0");
        assert_eq!(manifest.launch_asset.key, "bundle");
        assert_eq!(manifest.launch_asset.content_type, "application/javascript");
        assert_eq!(
            manifest.launch_asset.url,
            "http://10.0.0.2:8081/index.bundle?platform=android"
        );
        assert_eq!(manifest.extra.eas.project_id.as_deref(), Some("project-1"));
        assert_eq!(manifest.extra.scope_key, "@bacon/demo");
        assert_eq!(manifest.extra.expo_client["hostUri"], "10.0.0.2:8081");
        assert_eq!(manifest.extra.expo_client["ios"]["googleServicesFile"], "INLINED");
        assert!(manifest.extra.expo_client.get("hooks").is_none());
        assert!(manifest.extra.expo_go.is_empty());
        assert!(manifest.metadata.is_empty());
    }

    #[test]
    fn test_resolved_runtime_version_wins() {
        let builder = ManifestBuilder::new("/project", FixedRuntime(Some("1.0.0")), NoAssets, Bundler);
        let manifest = builder.build(&request("ios"), &config(), "@bacon/demo").unwrap();
        assert_eq!(manifest.runtime_version, "1.0.0");
    }

    #[test]
    fn test_fresh_id_per_build() {
        let builder = ManifestBuilder::new("/project", FixedRuntime(None), NoAssets, Bundler);
        let a = builder.build(&request("ios"), &config(), "k").unwrap();
        let b = builder.build(&request("ios"), &config(), "k").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_invalid_platform_is_fatal() {
        let builder = ManifestBuilder::new("/project", FixedRuntime(None), NoAssets, Bundler);
        let err = builder.build(&request("windows"), &config(), "k").unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedPlatform(_)));
    }

    #[test]
    fn test_asset_failure_is_fatal() {
        let builder = ManifestBuilder::new("/project", FixedRuntime(None), FailingAssets, Bundler);
        let err = builder.build(&request("ios"), &config(), "k").unwrap_err();
        assert!(matches!(err, ManifestError::Assets(_)));
    }

    #[test]
    fn test_wire_field_names() {
        let builder = ManifestBuilder::new("/project", FixedRuntime(None), NoAssets, Bundler);
        let manifest = builder.build(&request("ios"), &config(), "k").unwrap();
        let value = serde_json::to_value(&manifest).unwrap();

        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            ["assets", "createdAt", "extra", "id", "launchAsset", "metadata", "runtimeVersion"]
        );
        let mut extra: Vec<_> = value["extra"].as_object().unwrap().keys().cloned().collect();
        extra.sort();
        assert_eq!(extra, ["eas", "expoClient", "expoGo", "scopeKey"]);
    }
}
