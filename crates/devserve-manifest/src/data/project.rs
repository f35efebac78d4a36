//! Project configuration as read from `app.json`.
//!
//! Only the fields the manifest protocol reads are typed; everything else is
//! carried through untouched so it can be echoed back to the client in
//! `extra.expoClient`.

use std::path::{Path, PathBuf};

use devserve_signing::CodeSigningMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::request::RuntimePlatform;
use crate::data::state::OwnerHandle;
use crate::error::{ManifestError, Result};

pub const CONFIG_FILE_NAME: &str = "app.json";

/// Keys stripped from the config before it is exposed to clients.
const PRIVATE_KEYS: &[&str] = &["hooks", "_internal"];

/// Per-platform keys stripped before exposure. `config` holds API keys.
const PRIVATE_PLATFORM_KEYS: &[&str] = &["config"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<RuntimeVersionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<PlatformConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<PlatformConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<UpdatesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<RuntimeVersionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_services_file: Option<String>,
    /// iOS only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    /// Android only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<u64>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatesConfig {
    /// Path to the developer certificate, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_signing_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_signing_metadata: Option<CodeSigningMetadata>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `runtimeVersion`: either a literal or a policy computed from other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeVersionConfig {
    Literal(String),
    Policy { policy: RuntimeVersionPolicy },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuntimeVersionPolicy {
    SdkVersion,
    AppVersion,
    NativeVersion,
    Fingerprint,
}

impl ProjectConfig {
    /// Read `app.json`, unwrapping a top-level `expo` key when present.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE_NAME);
        let config_error = |reason: String| ManifestError::ProjectConfig {
            path: path.clone(),
            reason,
        };

        let text = std::fs::read_to_string(&path).map_err(|e| config_error(e.to_string()))?;
        let mut value: Value =
            serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))?;
        if let Some(expo) = value.get_mut("expo").map(Value::take) {
            value = expo;
        }
        serde_json::from_value(value).map_err(|e| config_error(e.to_string()))
    }

    pub fn platform(&self, platform: RuntimePlatform) -> Option<&PlatformConfig> {
        match platform {
            RuntimePlatform::Ios => self.ios.as_ref(),
            RuntimePlatform::Android => self.android.as_ref(),
            RuntimePlatform::Web => None,
        }
    }

    /// `extra.eas.projectId`.
    pub fn eas_project_id(&self) -> Option<&str> {
        self.extra
            .as_ref()?
            .get("eas")?
            .get("projectId")?
            .as_str()
            .filter(|id| !id.is_empty())
    }

    /// The account named in warnings about this project.
    pub fn owner_handle(&self) -> OwnerHandle {
        OwnerHandle::new(self.owner.as_deref().unwrap_or(&self.slug))
    }

    /// Module the bundler serves, from `entryPoint` minus its extension.
    pub fn main_module_name(&self) -> String {
        let Some(entry) = self.entry_point.as_deref() else {
            return "index".to_string();
        };
        let entry = entry.trim_start_matches("./");
        let path = Path::new(entry);
        match path.extension() {
            Some(_) => path.with_extension("").to_string_lossy().replace('\\', "/"),
            None => entry.to_string(),
        }
    }

    pub fn code_signing_certificate_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.updates
            .as_ref()?
            .code_signing_certificate
            .as_deref()
            .map(|p| project_root.join(p))
    }

    /// The config as clients may see it.
    pub fn public_config(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            for key in PRIVATE_KEYS {
                object.remove(*key);
            }
            for platform in ["ios", "android"] {
                if let Some(platform) = object.get_mut(platform).and_then(Value::as_object_mut) {
                    for key in PRIVATE_PLATFORM_KEYS {
                        platform.remove(*key);
                    }
                }
            }
        }
        Ok(value)
    }
}

/// A partial config merged over the public config, e.g. inlined Google
/// services files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch(pub Map<String, Value>);

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set `section.key = value`, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: Value) {
        let entry = self
            .0
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(object) = entry.as_object_mut() {
            object.insert(key.to_string(), value);
        }
    }

    /// Deep-merge into `target`; objects merge, everything else overwrites.
    pub fn apply(&self, target: &mut Value) {
        merge(target, &Value::Object(self.0.clone()));
    }
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
