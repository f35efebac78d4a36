use std::collections::BTreeSet;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::AssetResolver;
use crate::data::{Asset, ConfigPatch, ProjectConfig};
use crate::error::{ManifestError, Result};

/// Config locations that may name an image asset.
const ASSET_POINTERS: &[&str] = &[
    "/icon",
    "/splash/image",
    "/ios/icon",
    "/ios/splash/image",
    "/android/icon",
    "/android/splash/image",
    "/android/adaptiveIcon/foregroundImage",
];

/// Resolves assets by reading them from the project directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAssetResolver;

impl AssetResolver for FsAssetResolver {
    fn resolve_manifest_assets(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
        host_uri: &str,
    ) -> Result<Vec<Asset>> {
        let value = serde_json::to_value(config)?;
        let paths: BTreeSet<&str> = ASSET_POINTERS
            .iter()
            .filter_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
            .filter(|p| !p.is_empty() && !is_remote(p))
            .collect();

        let mut assets = Vec::with_capacity(paths.len());
        for path in paths {
            let relative = path.trim_start_matches("./");
            let contents = match std::fs::read(project_root.join(relative)) {
                Ok(contents) => contents,
                Err(e) => {
                    debug!("skipping asset {relative}: {e}");
                    continue;
                }
            };
            let hash = hex::encode(Sha256::digest(&contents));
            let extension = Path::new(relative)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            assets.push(Asset {
                key: hash.clone(),
                hash,
                content_type: guess_content_type(extension.as_deref()).to_string(),
                file_extension: extension.map(|e| format!(".{e}")),
                url: format!("http://{host_uri}/assets/{relative}"),
            });
        }
        Ok(assets)
    }

    fn resolve_google_services_file(
        &self,
        project_root: &Path,
        config: &ProjectConfig,
    ) -> Result<ConfigPatch> {
        let mut patch = ConfigPatch::default();

        if let Some(file) = config
            .ios
            .as_ref()
            .and_then(|ios| ios.google_services_file.as_deref())
        {
            let contents = read_services_file(project_root, file)?;
            patch.set("ios", "googleServicesFile", Value::String(STANDARD.encode(contents)));
        }
        if let Some(file) = config
            .android
            .as_ref()
            .and_then(|android| android.google_services_file.as_deref())
        {
            let contents = read_services_file(project_root, file)?;
            let text = String::from_utf8(contents).map_err(|e| {
                ManifestError::Assets(format!("googleServicesFile {file} is not UTF-8: {e}"))
            })?;
            patch.set("android", "googleServicesFile", Value::String(text));
        }

        Ok(patch)
    }
}

fn read_services_file(project_root: &Path, file: &str) -> Result<Vec<u8>> {
    std::fs::read(project_root.join(file.trim_start_matches("./")))
        .map_err(|e| ManifestError::Assets(format!("failed to read googleServicesFile {file}: {e}")))
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn guess_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        _ => "application/octet-stream",
    }
}
