//! Assembly of the request pipeline defaults onto an axum router.

use crate::config::{ConfigError, PipelineConfig};
use axum::Router;

#[cfg(feature = "cert-forwarding")]
use crate::cert::CertificateForwardingLayer;
#[cfg(feature = "cors")]
use crate::cors::CorsPolicy;
#[cfg(feature = "versioning")]
use crate::versioning::ApiVersioningLayer;

/// Collects the pipeline defaults and applies them to a [`Router`].
///
/// Each step is configured once at startup from an explicit
/// [`PipelineConfig`]. `apply` installs them with CORS outermost, so
/// preflight requests are answered before version negotiation or
/// certificate decoding run.
///
/// # Example
///
/// ```rust,ignore
/// use pipeline_defaults::{PipelineConfig, ServerDefaults};
///
/// let config = PipelineConfig::from_env()?;
/// let router = ServerDefaults::new()
///     .with_default_cors_policy(&config, false)?
///     .with_api_versioning()
///     .with_client_cert_forwarding(&config.client_cert_header)?
///     .apply(my_routes());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ServerDefaults {
    #[cfg(feature = "cors")]
    cors: Option<CorsPolicy>,
    #[cfg(feature = "versioning")]
    versioning: Option<ApiVersioningLayer>,
    #[cfg(feature = "cert-forwarding")]
    cert_forwarding: Option<CertificateForwardingLayer>,
}

impl ServerDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every default this build supports, configured from `config`.
    #[cfg_attr(
        not(all(feature = "cors", feature = "cert-forwarding")),
        allow(unused_variables)
    )]
    pub fn from_config(config: &PipelineConfig, signal_r: bool) -> Result<Self, ConfigError> {
        let defaults = Self::new();
        #[cfg(feature = "cors")]
        let defaults = defaults.with_default_cors_policy(config, signal_r)?;
        #[cfg(feature = "versioning")]
        let defaults = defaults.with_api_versioning();
        #[cfg(feature = "cert-forwarding")]
        let defaults = defaults.with_client_cert_forwarding(&config.client_cert_header)?;
        Ok(defaults)
    }

    /// Register the default CORS policy from `CorsPolicy:Origins` and
    /// `CorsPolicy:Methods`.
    ///
    /// Fails when `signal_r` asks for credentials but no origins are listed.
    #[cfg(feature = "cors")]
    pub fn with_default_cors_policy(
        mut self,
        config: &PipelineConfig,
        signal_r: bool,
    ) -> Result<Self, ConfigError> {
        let policy = CorsPolicy::from_config(config, signal_r)?;
        tracing::info!(
            origins = ?policy.origins,
            methods = ?policy.methods,
            credentials = policy.allow_credentials,
            "registered default CORS policy"
        );
        self.cors = Some(policy);
        Ok(self)
    }

    /// Negotiate versions from `api-version`, assuming `1.0` when absent.
    #[cfg(feature = "versioning")]
    pub fn with_api_versioning(self) -> Self {
        self.with_versioning_layer(ApiVersioningLayer::new())
    }

    #[cfg(feature = "versioning")]
    pub fn with_versioning_layer(mut self, layer: ApiVersioningLayer) -> Self {
        self.versioning = Some(layer);
        self
    }

    /// Attach certificates forwarded in `header_name` (base64 DER).
    #[cfg(feature = "cert-forwarding")]
    pub fn with_client_cert_forwarding(self, header_name: &str) -> Result<Self, ConfigError> {
        let layer = CertificateForwardingLayer::with_header(header_name)?;
        tracing::info!(header = %layer.header_name(), "registered client certificate forwarding");
        Ok(self.with_cert_forwarding_layer(layer))
    }

    #[cfg(feature = "cert-forwarding")]
    pub fn with_cert_forwarding_layer(mut self, layer: CertificateForwardingLayer) -> Self {
        self.cert_forwarding = Some(layer);
        self
    }

    /// Install the configured layers on `router`.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        #[cfg(feature = "cert-forwarding")]
        let router = match self.cert_forwarding {
            Some(layer) => router.layer(layer),
            None => router,
        };
        #[cfg(feature = "versioning")]
        let router = match self.versioning {
            Some(layer) => router.layer(layer),
            None => router,
        };
        #[cfg(feature = "cors")]
        let router = match self.cors {
            Some(policy) => router.layer(policy.to_layer()),
            None => router,
        };
        router
    }
}

#[cfg(all(
    test,
    feature = "cors",
    feature = "versioning",
    feature = "cert-forwarding",
    feature = "json"
))]
mod tests {
    use super::*;
    use crate::cert::ClientCertificate;
    use crate::config::MapConfig;
    use crate::json::DefaultJson;
    use crate::test_utils::self_signed_der;
    use crate::versioning::ApiVersion;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        routing::get,
        Extension,
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::Serialize;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    #[derive(Serialize)]
    struct Caller {
        version: String,
        subject: Option<String>,
    }

    async fn caller(
        version: ApiVersion,
        cert: Option<Extension<ClientCertificate>>,
    ) -> DefaultJson<Caller> {
        DefaultJson(Caller {
            version: version.to_string(),
            subject: cert.map(|Extension(cert)| cert.subject()),
        })
    }

    fn app(source: &MapConfig, signal_r: bool) -> Router {
        let config = PipelineConfig::from_source(source);
        ServerDefaults::from_config(&config, signal_r)
            .unwrap()
            .apply(Router::new().route("/caller", get(caller)))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_signal_r_without_origins_fails_at_startup() {
        let config = PipelineConfig::from_source(&MapConfig::new());
        assert!(matches!(
            ServerDefaults::from_config(&config, true),
            Err(ConfigError::CredentialsRequireOrigins)
        ));
    }

    #[test]
    fn test_invalid_cert_header_fails_at_startup() {
        let config = PipelineConfig {
            client_cert_header: "not a header".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            ServerDefaults::from_config(&config, false),
            Err(ConfigError::InvalidHeaderName(_))
        ));
    }

    #[tokio::test]
    async fn test_plain_request_gets_defaults() {
        let app = app(&MapConfig::new(), false);

        let request = Request::builder()
            .uri("/caller")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "version": "1.0" }));
    }

    #[tokio::test]
    async fn test_full_request_through_pipeline() {
        let source = MapConfig::new()
            .with("CorsPolicy:Origins", "https://app.example")
            .with("CorsPolicy:Methods", "GET,POST")
            .with("CertificateForwarding:HeaderName", "X-Client-Cert");
        let app = app(&source, true);
        let cert = STANDARD.encode(self_signed_der("client.example"));

        let request = Request::builder()
            .uri("/caller")
            .header(header::ORIGIN, "https://app.example")
            .header("api-version", "2.0")
            .header("X-Client-Cert", cert)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
        assert_eq!(
            json_body(response).await,
            json!({
                "version": "2.0",
                "subject": "CN=client.example, O=Pipeline Tests"
            })
        );
    }

    #[tokio::test]
    async fn test_preflight_short_circuits_version_check() {
        let source = MapConfig::new().with("CorsPolicy:Origins", "https://app.example");
        let app = app(&source, false);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/caller")
            .header(header::ORIGIN, "https://app.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header("api-version", "garbage")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://app.example"
        );
    }

    #[tokio::test]
    async fn test_version_rejection_still_carries_cors_headers() {
        let app = app(&MapConfig::new(), false);

        let request = Request::builder()
            .uri("/caller")
            .header(header::ORIGIN, "https://any.example")
            .header("api-version", "garbage")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_empty_defaults_leave_router_untouched() {
        let router: Router = Router::new().route("/caller", get(caller));
        let app = ServerDefaults::new().apply(router);

        // Nothing is negotiated, decoded or answered for CORS without a step.
        let request = Request::builder()
            .method(Method::GET)
            .uri("/caller")
            .header(header::ORIGIN, "https://app.example")
            .header("api-version", "5.0")
            .header("X-ARR-ClientCert", STANDARD.encode(self_signed_der("ignored.example")))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
        assert!(response.headers().get("api-supported-versions").is_none());
        assert_eq!(json_body(response).await, json!({ "version": "1.0" }));
    }
}
