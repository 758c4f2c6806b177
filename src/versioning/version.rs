//! API version value, negotiation errors and the handler extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use std::{convert::Infallible, fmt, str::FromStr};

/// A `major.minor` API version.
///
/// ```rust
/// use pipeline_defaults::ApiVersion;
///
/// let version: ApiVersion = "2.1".parse().unwrap();
/// assert_eq!(version, ApiVersion::new(2, 1));
/// assert_eq!("2".parse::<ApiVersion>().unwrap().to_string(), "2.0");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    /// Version assumed when a request does not name one.
    pub const DEFAULT: Self = Self::new(1, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = ApiVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || ApiVersionError::Invalid(text.to_string());

        let (major, minor) = match text.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (text, None),
        };
        let number = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u32>().map_err(|_| invalid())
        };

        Ok(Self {
            major: number(major)?,
            minor: minor.map(number).transpose()?.unwrap_or(0),
        })
    }
}

/// Why a request's `api-version` could not be negotiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiVersionError {
    /// The header value is not a `major[.minor]` version.
    Invalid(String),
    /// The request names more than one distinct version.
    Ambiguous(Vec<ApiVersion>),
    /// The version is well-formed but not served.
    Unsupported(ApiVersion),
}

impl fmt::Display for ApiVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(value) => write!(f, "invalid api-version: {value:?}"),
            Self::Ambiguous(versions) => {
                write!(f, "ambiguous api-version:")?;
                for version in versions {
                    write!(f, " {version}")?;
                }
                Ok(())
            }
            Self::Unsupported(version) => write!(f, "unsupported api-version: {version}"),
        }
    }
}

impl std::error::Error for ApiVersionError {}

impl IntoResponse for ApiVersionError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Extracts the negotiated version.
///
/// Without the versioning layer installed this is always [`ApiVersion::DEFAULT`].
#[async_trait]
impl<S> FromRequestParts<S> for ApiVersion
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ApiVersion>()
            .copied()
            .unwrap_or_default())
    }
}
