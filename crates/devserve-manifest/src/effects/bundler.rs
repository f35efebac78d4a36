use crate::core::{BundleUrlRequest, BundlerAdapter};
use crate::data::config::DEFAULT_BUNDLER_PORT;
use crate::error::{ManifestError, Result};

const DEFAULT_HOST: &str = "localhost";

/// Points clients at a Metro bundler on the same machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetroBundlerAdapter {
    port: u16,
}

impl Default for MetroBundlerAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BUNDLER_PORT)
    }
}

impl MetroBundlerAdapter {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl BundlerAdapter for MetroBundlerAdapter {
    fn host_uri(&self, hostname: Option<&str>) -> String {
        let host = hostname.filter(|h| !h.is_empty()).unwrap_or(DEFAULT_HOST);
        if host.contains(':') {
            format!("[{host}]:{}", self.port)
        } else {
            format!("{host}:{}", self.port)
        }
    }

    fn bundle_url(&self, request: &BundleUrlRequest<'_>) -> Result<String> {
        let main = request.main_module.trim_matches('/');
        if main.is_empty() {
            return Err(ManifestError::BundleUrl("empty entry point".to_string()));
        }
        let dev = request.mode.is_dev();
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("platform", request.platform.as_str())
            .append_pair("dev", bool_str(dev))
            .append_pair("hot", "false")
            .append_pair("lazy", "true")
            .append_pair("minify", bool_str(!dev))
            .finish();
        Ok(format!(
            "http://{}/{main}.bundle?{query}",
            self.host_uri(request.hostname)
        ))
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BundlerMode, RuntimePlatform};

    fn request<'a>(hostname: Option<&'a str>, mode: BundlerMode) -> BundleUrlRequest<'a> {
        BundleUrlRequest {
            hostname,
            platform: RuntimePlatform::Ios,
            mode,
            main_module: "index",
        }
    }

    #[test]
    fn test_development_url() {
        let url = MetroBundlerAdapter::new(8081)
            .bundle_url(&request(Some("192.168.1.5"), BundlerMode::Development))
            .unwrap();
        assert_eq!(
            url,
            "http://192.168.1.5:8081/index.bundle?platform=ios&dev=true&hot=false&lazy=true&minify=false"
        );
    }

    #[test]
    fn test_production_url_defaults_host() {
        let url = MetroBundlerAdapter::new(19000)
            .bundle_url(&request(None, BundlerMode::Production))
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:19000/index.bundle?platform=ios&dev=false&hot=false&lazy=true&minify=true"
        );
    }

    #[test]
    fn test_ipv6_host_uri() {
        assert_eq!(MetroBundlerAdapter::default().host_uri(Some("::1")), "[::1]:8081");
    }

    #[test]
    fn test_empty_main_module() {
        let mut req = request(None, BundlerMode::Development);
        req.main_module = "";
        let err = MetroBundlerAdapter::default().bundle_url(&req).unwrap_err();
        assert!(matches!(err, ManifestError::BundleUrl(_)));
    }
}
