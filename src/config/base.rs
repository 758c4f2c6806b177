//! Explicit pipeline configuration.

use super::error::ConfigError;
use super::source::{ConfigSource, FigmentConfig};
use std::path::Path;

/// Key holding the `;`-separated list of allowed CORS origins.
pub const CORS_ORIGINS_KEY: &str = "CorsPolicy:Origins";
/// Key holding the `,`-separated list of allowed CORS methods.
pub const CORS_METHODS_KEY: &str = "CorsPolicy:Methods";
/// Key overriding the forwarded client certificate header name.
pub const CERT_HEADER_KEY: &str = "CertificateForwarding:HeaderName";

/// Header a TLS-terminating proxy uses for the client certificate by default.
pub const DEFAULT_CERT_HEADER: &str = "X-ARR-ClientCert";

/// Values the pipeline defaults are built from.
///
/// Read once at startup and passed to each setup step:
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | `CorsPolicy:Origins` | (none) | `;`-separated allowed origins |
/// | `CorsPolicy:Methods` | (none) | `,`-separated allowed methods |
/// | `CertificateForwarding:HeaderName` | `X-ARR-ClientCert` | Forwarded certificate header |
///
/// # Example
///
/// ```rust
/// use pipeline_defaults::{MapConfig, PipelineConfig};
///
/// let source = MapConfig::new().with("CorsPolicy:Origins", "https://app.example");
/// let config = PipelineConfig::from_source(&source);
///
/// assert_eq!(config.cors_origins.as_deref(), Some("https://app.example"));
/// assert_eq!(config.client_cert_header, "X-ARR-ClientCert");
/// ```
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Raw `CorsPolicy:Origins` value
    pub cors_origins: Option<String>,
    /// Raw `CorsPolicy:Methods` value
    pub cors_methods: Option<String>,
    /// Header carrying the base64 DER client certificate
    pub client_cert_header: String,
}

impl PipelineConfig {
    /// Read the pipeline keys from any configuration source.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        Self {
            cors_origins: source.get(CORS_ORIGINS_KEY),
            cors_methods: source.get(CORS_METHODS_KEY),
            client_cert_header: source
                .get(CERT_HEADER_KEY)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_CERT_HEADER.to_string()),
        }
    }

    /// Read the pipeline keys from environment variables
    /// (`CorsPolicy__Origins`, `CorsPolicy__Methods`, ...).
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = FigmentConfig::from_env();
        source.validate()?;
        Ok(Self::from_source(&source))
    }

    /// Read a JSON settings file, then let environment variables override it.
    /// A missing file is not an error.
    pub fn load(settings: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = FigmentConfig::new().merge_json_file(settings).merge_env();
        source.validate()?;
        Ok(Self::from_source(&source))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            cors_methods: None,
            client_cert_header: DEFAULT_CERT_HEADER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;

    #[test]
    fn test_default_values() {
        let config = PipelineConfig::from_source(&MapConfig::new());
        assert!(config.cors_origins.is_none());
        assert!(config.cors_methods.is_none());
        assert_eq!(config.client_cert_header, DEFAULT_CERT_HEADER);
    }

    #[test]
    fn test_reads_all_keys() {
        let source = MapConfig::new()
            .with(CORS_ORIGINS_KEY, "https://a.example;https://b.example")
            .with(CORS_METHODS_KEY, "GET, POST")
            .with(CERT_HEADER_KEY, " X-Client-Cert ");

        let config = PipelineConfig::from_source(&source);
        assert_eq!(
            config.cors_origins.as_deref(),
            Some("https://a.example;https://b.example")
        );
        assert_eq!(config.cors_methods.as_deref(), Some("GET, POST"));
        assert_eq!(config.client_cert_header, "X-Client-Cert");
    }

    #[test]
    fn test_blank_cert_header_uses_default() {
        let source = MapConfig::new().with(CERT_HEADER_KEY, "   ");
        let config = PipelineConfig::from_source(&source);
        assert_eq!(config.client_cert_header, DEFAULT_CERT_HEADER);
    }

    #[test]
    fn test_load_layers_env_over_settings_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{
                    "CorsPolicy": { "Origins": "https://file.example", "Methods": "GET" },
                    "CertificateForwarding": { "HeaderName": "X-Client-Cert" }
                }"#,
            )?;
            jail.set_env("CorsPolicy__Methods", "GET,POST");

            let config = PipelineConfig::load("settings.json").unwrap();
            assert_eq!(config.cors_origins.as_deref(), Some("https://file.example"));
            assert_eq!(config.cors_methods.as_deref(), Some("GET,POST"));
            assert_eq!(config.client_cert_header, "X-Client-Cert");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_malformed_settings() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("settings.json", "{ \"CorsPolicy\": ")?;
            assert!(matches!(
                PipelineConfig::load("settings.json"),
                Err(ConfigError::Load(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn test_default_matches_empty_source() {
        let config = PipelineConfig::default();
        assert!(config.cors_origins.is_none());
        assert_eq!(config.client_cert_header, DEFAULT_CERT_HEADER);
    }
}
