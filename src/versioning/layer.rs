//! Header-based API version negotiation middleware.

use super::version::{ApiVersion, ApiVersionError};
use crate::config::split_list;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};

/// Request header naming the requested version.
pub const API_VERSION_HEADER: HeaderName = HeaderName::from_static("api-version");
/// Response header listing the served versions.
pub const API_SUPPORTED_VERSIONS_HEADER: HeaderName =
    HeaderName::from_static("api-supported-versions");

/// Layer that negotiates the API version from the `api-version` header.
///
/// Requests without the header get the default version (`1.0` unless
/// changed). The negotiated [`ApiVersion`] is stored in the request
/// extensions, where the `ApiVersion` extractor picks it up.
///
/// # Example
///
/// ```rust,ignore
/// use pipeline_defaults::{ApiVersion, ApiVersioningLayer};
///
/// async fn handler(version: ApiVersion) -> String {
///     format!("served {version}")
/// }
///
/// let router = Router::new()
///     .route("/items", get(handler))
///     .layer(ApiVersioningLayer::new());
/// ```
#[derive(Clone, Debug)]
pub struct ApiVersioningLayer {
    options: Arc<VersioningOptions>,
}

#[derive(Debug)]
struct VersioningOptions {
    default_version: ApiVersion,
    supported: Vec<ApiVersion>,
}

impl ApiVersioningLayer {
    /// Negotiate with a default of `1.0` and no restriction on versions.
    pub fn new() -> Self {
        Self::with_default_version(ApiVersion::DEFAULT)
    }

    pub fn with_default_version(default_version: ApiVersion) -> Self {
        Self {
            options: Arc::new(VersioningOptions {
                default_version,
                supported: Vec::new(),
            }),
        }
    }

    /// Reject versions outside `supported` and advertise them on responses.
    pub fn supported_versions(self, supported: impl IntoIterator<Item = ApiVersion>) -> Self {
        let mut supported: Vec<ApiVersion> = supported.into_iter().collect();
        supported.sort_unstable();
        supported.dedup();
        Self {
            options: Arc::new(VersioningOptions {
                default_version: self.options.default_version,
                supported,
            }),
        }
    }

    pub fn default_version(&self) -> ApiVersion {
        self.options.default_version
    }
}

impl Default for ApiVersioningLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl VersioningOptions {
    fn negotiate(&self, headers: &HeaderMap) -> Result<ApiVersion, ApiVersionError> {
        let mut requested: Vec<ApiVersion> = Vec::new();
        for value in headers.get_all(&API_VERSION_HEADER) {
            let text = value.to_str().map_err(|_| {
                ApiVersionError::Invalid(String::from_utf8_lossy(value.as_bytes()).into_owned())
            })?;
            for token in split_list(Some(text), ',') {
                let version = token.parse()?;
                if !requested.contains(&version) {
                    requested.push(version);
                }
            }
        }

        let version = match requested.len() {
            0 => self.default_version,
            1 => requested[0],
            _ => return Err(ApiVersionError::Ambiguous(requested)),
        };

        if !self.supported.is_empty() && !self.supported.contains(&version) {
            return Err(ApiVersionError::Unsupported(version));
        }
        Ok(version)
    }

    fn advertise(&self, response: &mut Response) {
        if self.supported.is_empty() {
            return;
        }
        let list = self
            .supported
            .iter()
            .map(ApiVersion::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&list) {
            response
                .headers_mut()
                .insert(API_SUPPORTED_VERSIONS_HEADER, value);
        }
    }
}

impl<S> Layer<S> for ApiVersioningLayer {
    type Service = ApiVersioningService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiVersioningService {
            inner,
            options: self.options.clone(),
        }
    }
}

/// Service produced by [`ApiVersioningLayer`].
#[derive(Clone, Debug)]
pub struct ApiVersioningService<S> {
    inner: S,
    options: Arc<VersioningOptions>,
}

impl<S> Service<Request<Body>> for ApiVersioningService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let options = self.options.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = match options.negotiate(req.headers()) {
                Ok(version) => {
                    tracing::debug!(api_version = %version, "negotiated api version");
                    req.extensions_mut().insert(version);
                    inner.call(req).await?
                }
                Err(e) => {
                    tracing::debug!(error = %e, "rejected api version");
                    e.into_response()
                }
            };

            options.advertise(&mut response);
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tower::util::ServiceExt;

    async fn version_handler(version: ApiVersion) -> String {
        version.to_string()
    }

    fn create_test_router(layer: ApiVersioningLayer) -> Router {
        Router::new()
            .route("/test", get(version_handler))
            .layer(layer)
    }

    fn request(versions: &[&str]) -> Request<Body> {
        let mut builder = Request::builder().uri("/test");
        for version in versions {
            builder = builder.header("api-version", *version);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_header_uses_default() {
        let app = create_test_router(ApiVersioningLayer::new());

        let response = app.oneshot(request(&[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "1.0");
    }

    #[tokio::test]
    async fn test_custom_default_version() {
        let app = create_test_router(ApiVersioningLayer::with_default_version(ApiVersion::new(
            2, 0,
        )));

        let response = app.oneshot(request(&[])).await.unwrap();
        assert_eq!(body_text(response).await, "2.0");
    }

    #[tokio::test]
    async fn test_header_selects_version() {
        let app = create_test_router(ApiVersioningLayer::new());

        let response = app.oneshot(request(&["2.1"])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "2.1");
    }

    #[tokio::test]
    async fn test_invalid_header_is_bad_request() {
        let app = create_test_router(ApiVersioningLayer::new());

        let response = app.oneshot(request(&["latest"])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("invalid api-version"));
    }

    #[tokio::test]
    async fn test_repeated_equal_versions_are_accepted() {
        let app = create_test_router(ApiVersioningLayer::new());

        let response = app.oneshot(request(&["2", "2.0"])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "2.0");
    }

    #[tokio::test]
    async fn test_conflicting_versions_are_ambiguous() {
        let app = create_test_router(ApiVersioningLayer::new());

        let response = app.oneshot(request(&["1.0, 2.0"])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("ambiguous"));
    }

    #[tokio::test]
    async fn test_unsupported_version_rejected_and_advertised() {
        let layer = ApiVersioningLayer::new()
            .supported_versions([ApiVersion::new(2, 0), ApiVersion::new(1, 0)]);
        let app = create_test_router(layer);

        let response = app.oneshot(request(&["3.0"])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response
                .headers()
                .get(API_SUPPORTED_VERSIONS_HEADER)
                .unwrap()
                .to_str()
                .unwrap(),
            "1.0, 2.0"
        );
    }

    #[tokio::test]
    async fn test_supported_version_is_advertised_on_success() {
        let layer = ApiVersioningLayer::new().supported_versions([ApiVersion::new(1, 0)]);
        let app = create_test_router(layer);

        let response = app.oneshot(request(&[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(API_SUPPORTED_VERSIONS_HEADER));
    }

    #[tokio::test]
    async fn test_extractor_without_layer_defaults() {
        let app = Router::new().route("/test", get(version_handler));

        let response = app.oneshot(request(&["5.0"])).await.unwrap();
        assert_eq!(body_text(response).await, "1.0");
    }
}
