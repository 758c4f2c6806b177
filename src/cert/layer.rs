//! Middleware attaching forwarded client certificates to requests.

use super::certificate::ClientCertificate;
use super::decode::decode_certificate_header;
use crate::config::ConfigError;
use axum::{
    body::Body,
    http::{HeaderName, Request},
    response::Response,
};
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};

type HeaderConverter = dyn Fn(&str) -> Option<ClientCertificate> + Send + Sync;

/// Layer that reads a proxy-forwarded client certificate from a header.
///
/// When the header converts to a certificate, the [`ClientCertificate`] is
/// inserted into the request extensions. Requests without one pass through
/// untouched; deciding what a missing certificate means is left to the
/// handlers.
///
/// # Example
///
/// ```rust,ignore
/// use axum::Extension;
/// use pipeline_defaults::{CertificateForwardingLayer, ClientCertificate};
///
/// async fn whoami(cert: Option<Extension<ClientCertificate>>) -> String {
///     cert.map(|Extension(c)| c.subject()).unwrap_or_default()
/// }
///
/// let router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(CertificateForwardingLayer::new());
/// ```
#[derive(Clone)]
pub struct CertificateForwardingLayer {
    header: HeaderName,
    converter: Arc<HeaderConverter>,
}

impl CertificateForwardingLayer {
    /// Read base64 DER from `X-ARR-ClientCert`.
    pub fn new() -> Self {
        Self {
            header: HeaderName::from_static("x-arr-clientcert"),
            converter: Arc::new(decode_certificate_header),
        }
    }

    /// Read base64 DER from a custom header.
    pub fn with_header(header_name: &str) -> Result<Self, ConfigError> {
        let header = HeaderName::from_bytes(header_name.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(header_name.to_string()))?;
        Ok(Self {
            header,
            ..Self::new()
        })
    }

    /// Replace the header-to-certificate conversion.
    pub fn converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(&str) -> Option<ClientCertificate> + Send + Sync + 'static,
    {
        self.converter = Arc::new(converter);
        self
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }
}

impl Default for CertificateForwardingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CertificateForwardingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateForwardingLayer")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for CertificateForwardingLayer {
    type Service = CertificateForwardingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CertificateForwardingService {
            inner,
            header: self.header.clone(),
            converter: self.converter.clone(),
        }
    }
}

/// Service produced by [`CertificateForwardingLayer`].
#[derive(Clone)]
pub struct CertificateForwardingService<S> {
    inner: S,
    header: HeaderName,
    converter: Arc<HeaderConverter>,
}

impl<S> Service<Request<Body>> for CertificateForwardingService<S>
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
        let forwarded = req
            .headers()
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| (self.converter)(value));

        if let Some(cert) = forwarded {
            tracing::debug!(
                subject = %cert.subject(),
                thumbprint = cert.thumbprint(),
                "attached forwarded client certificate"
            );
            req.extensions_mut().insert(cert);
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}
