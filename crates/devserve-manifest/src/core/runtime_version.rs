use std::path::Path;

use tracing::debug;

use crate::core::collaborators::RuntimeVersionResolver;
use crate::data::{ProjectConfig, RuntimePlatform, RuntimeVersionConfig, RuntimeVersionPolicy};
use crate::error::{ManifestError, Result};

const UNVERSIONED_SDK: &str = "UNVERSIONED";

/// `exposdk:<sdkVersion>`, the runtime version of a project with no
/// explicit one.
pub fn sdk_runtime_version(config: &ProjectConfig) -> String {
    let sdk = config
        .sdk_version
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(UNVERSIONED_SDK);
    format!("exposdk:{sdk}")
}

/// Resolve `runtimeVersion` for `platform`; the platform section overrides
/// the top-level value.
pub fn resolve_runtime_version(
    config: &ProjectConfig,
    platform: RuntimePlatform,
) -> Result<Option<String>> {
    let platform_config = config.platform(platform);
    let Some(runtime_version) = platform_config
        .and_then(|p| p.runtime_version.as_ref())
        .or(config.runtime_version.as_ref())
    else {
        return Ok(None);
    };

    match runtime_version {
        RuntimeVersionConfig::Literal(value) if value.trim().is_empty() => Err(
            ManifestError::RuntimeVersion("runtimeVersion must not be empty".to_string()),
        ),
        RuntimeVersionConfig::Literal(value) => Ok(Some(value.clone())),
        RuntimeVersionConfig::Policy { policy } => match policy {
            RuntimeVersionPolicy::SdkVersion => {
                let sdk = config.sdk_version.as_deref().ok_or_else(|| {
                    ManifestError::RuntimeVersion(
                        "the sdkVersion policy requires sdkVersion to be set".to_string(),
                    )
                })?;
                Ok(Some(format!("exposdk:{sdk}")))
            }
            RuntimeVersionPolicy::AppVersion => Ok(Some(app_version(config)?.to_string())),
            RuntimeVersionPolicy::NativeVersion => {
                let version = app_version(config)?;
                let build = native_build(platform_config, platform).ok_or_else(|| {
                    ManifestError::RuntimeVersion(format!(
                        "the nativeVersion policy requires a {} build number",
                        platform
                    ))
                })?;
                Ok(Some(format!("{version}({build})")))
            }
            RuntimeVersionPolicy::Fingerprint => {
                debug!("fingerprint runtime version is computed at build time; using SDK version");
                Ok(None)
            }
        },
    }
}

fn app_version(config: &ProjectConfig) -> Result<&str> {
    config
        .version
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ManifestError::RuntimeVersion("this runtime version policy requires `version`".into())
        })
}

fn native_build(
    platform_config: Option<&crate::data::PlatformConfig>,
    platform: RuntimePlatform,
) -> Option<String> {
    let platform_config = platform_config?;
    match platform {
        RuntimePlatform::Ios => platform_config.build_number.clone(),
        RuntimePlatform::Android => platform_config.version_code.map(|c| c.to_string()),
        RuntimePlatform::Web => None,
    }
}

/// Resolves runtime versions straight from the project config.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigRuntimeVersionResolver;

impl RuntimeVersionResolver for ConfigRuntimeVersionResolver {
    fn resolve(
        &self,
        _project_root: &Path,
        config: &ProjectConfig,
        platform: RuntimePlatform,
    ) -> Result<Option<String>> {
        resolve_runtime_version(config, platform)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(value: serde_json::Value) -> ProjectConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sdk_fallback() {
        assert_eq!(
            sdk_runtime_version(&config(json!({"sdkVersion": "52.0.0"}))),
            "exposdk:52.0.0"
        );
        assert_eq!(
            sdk_runtime_version(&ProjectConfig::default()),
            "exposdk:UNVERSIONED"
        );
    }

    #[test]
    fn test_no_runtime_version() {
        let resolved = resolve_runtime_version(&ProjectConfig::default(), RuntimePlatform::Ios);
        assert_eq!(resolved.unwrap(), None);
    }

    #[test]
    fn test_literal_and_platform_override() {
        let config = config(json!({
            "runtimeVersion": "1.0.0",
            "android": {"runtimeVersion": "2.0.0"}
        }));
        assert_eq!(
            resolve_runtime_version(&config, RuntimePlatform::Ios).unwrap(),
            Some("1.0.0".to_string())
        );
        assert_eq!(
            resolve_runtime_version(&config, RuntimePlatform::Android).unwrap(),
            Some("2.0.0".to_string())
        );
    }

    #[test]
    fn test_policies() {
        let config = config(json!({
            "version": "1.2.3",
            "sdkVersion": "52.0.0",
            "ios": {"buildNumber": "7"},
            "android": {"versionCode": 12},
            "runtimeVersion": {"policy": "nativeVersion"}
        }));
        assert_eq!(
            resolve_runtime_version(&config, RuntimePlatform::Ios).unwrap(),
            Some("1.2.3(7)".to_string())
        );
        assert_eq!(
            resolve_runtime_version(&config, RuntimePlatform::Android).unwrap(),
            Some("1.2.3(12)".to_string())
        );

        let mut app = config.clone();
        app.runtime_version = Some(RuntimeVersionConfig::Policy {
            policy: RuntimeVersionPolicy::AppVersion,
        });
        assert_eq!(
            resolve_runtime_version(&app, RuntimePlatform::Ios).unwrap(),
            Some("1.2.3".to_string())
        );

        let mut sdk = config;
        sdk.runtime_version = Some(RuntimeVersionConfig::Policy {
            policy: RuntimeVersionPolicy::SdkVersion,
        });
        assert_eq!(
            resolve_runtime_version(&sdk, RuntimePlatform::Web).unwrap(),
            Some("exposdk:52.0.0".to_string())
        );
    }

    #[test]
    fn test_policy_missing_inputs_fail() {
        let config = config(json!({"runtimeVersion": {"policy": "appVersion"}}));
        let err = resolve_runtime_version(&config, RuntimePlatform::Ios).unwrap_err();
        assert!(matches!(err, ManifestError::RuntimeVersion(_)));
    }

    #[test]
    fn test_fingerprint_defers_to_sdk() {
        let config = config(json!({"runtimeVersion": {"policy": "fingerprint"}}));
        assert_eq!(
            resolve_runtime_version(&config, RuntimePlatform::Ios).unwrap(),
            None
        );
    }
}
