//! Startup configuration errors.

use std::fmt;

/// Error returned when the pipeline cannot be configured.
///
/// These surface at startup; nothing here is produced per request.
#[derive(Debug)]
pub enum ConfigError {
    /// Credentialed CORS was requested without an explicit origin list.
    CredentialsRequireOrigins,
    /// A configured origin is not a usable `Origin` header value.
    InvalidOrigin(String),
    /// A configured method is not a valid HTTP method token.
    InvalidMethod(String),
    /// A configured header name is not a valid HTTP header name.
    InvalidHeaderName(String),
    /// A configuration provider failed to load (unreadable file, bad JSON).
    Load(Box<figment::Error>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsRequireOrigins => write!(
                f,
                "CorsPolicy:Origins must list explicit origins when credentials are allowed"
            ),
            Self::InvalidOrigin(origin) => write!(f, "invalid CORS origin: {origin:?}"),
            Self::InvalidMethod(method) => write!(f, "invalid CORS method: {method:?}"),
            Self::InvalidHeaderName(name) => write!(f, "invalid header name: {name:?}"),
            Self::Load(e) => write!(f, "failed to load configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}
