//! Default CORS policy resolution.

use crate::config::{split_list, ConfigError, PipelineConfig};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Origins a policy accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    /// Normalized origins (lowercase, no trailing `/`).
    List(Vec<String>),
}

/// Methods a policy accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedMethods {
    Any,
    List(Vec<Method>),
}

/// The resolved default CORS policy.
///
/// Every policy allows any request header. A policy that allows credentials
/// always carries an explicit origin list.
///
/// # Example
///
/// ```rust,ignore
/// use pipeline_defaults::{CorsPolicy, PipelineConfig};
///
/// let config = PipelineConfig::from_env()?;
/// let policy = CorsPolicy::from_config(&config, false)?;
/// let router = my_routes().layer(policy.to_layer());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsPolicy {
    pub origins: AllowedOrigins,
    pub methods: AllowedMethods,
    pub allow_credentials: bool,
}

impl CorsPolicy {
    /// Resolve the policy from the `CorsPolicy:*` values of `config`.
    ///
    /// `signal_r` enables credentialed requests (cookies, auth headers) as
    /// long-lived bidirectional connections need them.
    pub fn from_config(config: &PipelineConfig, signal_r: bool) -> Result<Self, ConfigError> {
        Self::resolve(
            config.cors_origins.as_deref(),
            config.cors_methods.as_deref(),
            signal_r,
        )
    }

    /// Resolve the policy from raw `;`-separated origins and `,`-separated
    /// methods.
    ///
    /// Missing origins or methods fall back to "any" with a warning, except
    /// that credentials without explicit origins is rejected with
    /// [`ConfigError::CredentialsRequireOrigins`].
    pub fn resolve(
        origins: Option<&str>,
        methods: Option<&str>,
        signal_r: bool,
    ) -> Result<Self, ConfigError> {
        let origins = resolve_origins(origins, signal_r)?;
        let methods = resolve_methods(methods)?;

        Ok(Self {
            origins,
            methods,
            allow_credentials: signal_r,
        })
    }

    /// Build the `tower-http` layer enforcing this policy.
    pub fn to_layer(&self) -> CorsLayer {
        let allow_origin = match &self.origins {
            AllowedOrigins::Any => AllowOrigin::any(),
            AllowedOrigins::List(origins) => AllowOrigin::list(
                origins
                    .iter()
                    .filter_map(|origin| HeaderValue::from_str(origin).ok()),
            ),
        };

        // Wildcards cannot be combined with credentials, so mirroring the
        // preflight request stands in for "any" in that mode.
        let allow_methods = match (&self.methods, self.allow_credentials) {
            (AllowedMethods::List(methods), _) => AllowMethods::list(methods.iter().cloned()),
            (AllowedMethods::Any, false) => AllowMethods::any(),
            (AllowedMethods::Any, true) => AllowMethods::mirror_request(),
        };
        let allow_headers = if self.allow_credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::any()
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(allow_methods)
            .allow_headers(allow_headers)
            .allow_credentials(self.allow_credentials)
    }
}

fn resolve_origins(raw: Option<&str>, signal_r: bool) -> Result<AllowedOrigins, ConfigError> {
    let origins = split_list(raw, ';');

    // The wildcard check runs on normalized values so `*/` counts as `*`.
    let mut normalized = Vec::with_capacity(origins.len());
    let mut wildcard = false;
    for origin in &origins {
        let value = normalize_origin(origin);
        if value == "*" {
            wildcard = true;
            continue;
        }
        if value.chars().any(char::is_whitespace) || HeaderValue::from_str(&value).is_err() {
            return Err(ConfigError::InvalidOrigin(origin.clone()));
        }
        if !normalized.contains(&value) {
            normalized.push(value);
        }
    }

    if wildcard || normalized.is_empty() {
        if signal_r {
            return Err(ConfigError::CredentialsRequireOrigins);
        }
        tracing::warn!(
            configured = origins.len(),
            "CorsPolicy Origins was not restricted, allowing any origin (insecure!)"
        );
        return Ok(AllowedOrigins::Any);
    }

    Ok(AllowedOrigins::List(normalized))
}

fn resolve_methods(raw: Option<&str>) -> Result<AllowedMethods, ConfigError> {
    let methods = split_list(raw, ',');

    if methods.is_empty() || methods.iter().any(|method| method == "*") {
        tracing::warn!(
            configured = methods.len(),
            "CorsPolicy Methods was not restricted, allowing any method (insecure!)"
        );
        return Ok(AllowedMethods::Any);
    }

    let mut parsed = Vec::with_capacity(methods.len());
    for method in methods {
        let value = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ConfigError::InvalidMethod(method.clone()))?;
        if !parsed.contains(&value) {
            parsed.push(value);
        }
    }
    Ok(AllowedMethods::List(parsed))
}

/// Browsers send origins as `scheme://host[:port]`, lowercase, no path.
fn normalize_origin(origin: &str) -> String {
    origin.trim_end_matches('/').to_ascii_lowercase()
}
