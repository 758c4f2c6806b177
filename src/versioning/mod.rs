//! API version negotiation via the `api-version` request header.
//!
//! Only the header is consulted; URL segments and query strings are ignored.

mod layer;
mod version;

pub use layer::{
    ApiVersioningLayer, ApiVersioningService, API_SUPPORTED_VERSIONS_HEADER, API_VERSION_HEADER,
};
pub use version::{ApiVersion, ApiVersionError};
