//! Local collaborators the manifest builder delegates to.
//!
//! All three are synchronous: they read the project, never the network.

use std::path::Path;

use crate::data::{Asset, BundlerMode, ConfigPatch, ProjectConfig, RuntimePlatform};
use crate::error::Result;

/// Computes the runtime version a client checks before loading a manifest.
pub trait RuntimeVersionResolver: Send + Sync {
    /// `Ok(None)` when the project has no concrete runtime version, in which
    /// case the builder falls back to the SDK version.
    fn resolve(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
        platform: RuntimePlatform,
    ) -> Result<Option<String>>;
}

/// Turns asset references in the project config into manifest entries.
pub trait AssetResolver: Send + Sync {
    /// Files that cannot be found are left out rather than failing.
    fn resolve_manifest_assets(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
        host_uri: &str,
    ) -> Result<Vec<Asset>>;

    /// Config fields to overlay on the public config, such as inlined
    /// Google services files.
    fn resolve_google_services_file(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
    ) -> Result<ConfigPatch>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleUrlRequest<'a> {
    pub hostname: Option<&'a str>,
    pub platform: RuntimePlatform,
    pub mode: BundlerMode,
    /// Module path without extension, e.g. `index`.
    pub main_module: &'a str,
}

/// Knows where the bundler serves the launch asset.
pub trait BundlerAdapter: Send + Sync {
    /// `host:port` the client should use to reach the bundler.
    fn host_uri(&self, hostname: Option<&str>) -> String;

    fn bundle_url(&self, request: &BundleUrlRequest<'_>) -> Result<String>;
}

impl<T: RuntimeVersionResolver + ?Sized> RuntimeVersionResolver for Box<T> {
    fn resolve(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
        platform: RuntimePlatform,
    ) -> Result<Option<String>> {
        (**self).resolve(project_root, config, platform)
    }
}

impl<T: AssetResolver + ?Sized> AssetResolver for Box<T> {
    fn resolve_manifest_assets(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
        host_uri: &str,
    ) -> Result<Vec<Asset>> {
        (**self).resolve_manifest_assets(project_root, config, host_uri)
    }

    fn resolve_google_services_file(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
    ) -> Result<ConfigPatch> {
        (**self).resolve_google_services_file(project_root, config)
    }
}

impl<T: BundlerAdapter + ?Sized> BundlerAdapter for Box<T> {
    fn host_uri(&self, hostname: Option<&str>) -> String {
        (**self).host_uri(hostname)
    }

    fn bundle_url(&self, request: &BundleUrlRequest<'_>) -> Result<String> {
        (**self).bundle_url(request)
    }
}
