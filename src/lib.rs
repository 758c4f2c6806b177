//! Pipeline Defaults - request pipeline setup for axum web servers.
//!
//! This crate bundles the startup configuration most HTTP APIs repeat:
//!
//! - **cors**: Default CORS policy from `CorsPolicy:Origins` / `CorsPolicy:Methods`
//! - **versioning**: API version negotiation via the `api-version` header (default `1.0`)
//! - **json**: JSON responses that omit null properties
//! - **cert**: Client certificate forwarding from a TLS-terminating proxy
//! - **config**: Layered configuration (settings file plus environment) and [`PipelineConfig`]
//! - **bootstrap**: Tracing initialization utilities
//!
//! # Features
//!
//! - `cors` - CORS policy via `tower-http` (enabled by default)
//! - `versioning` - Header-based API versioning (enabled by default)
//! - `json` - Null-omitting JSON responder (enabled by default)
//! - `cert-forwarding` - Forwarded client certificates (enabled by default)
//! - `bootstrap` - Tracing setup (enabled by default)
//! - `full` - All features
//!
//! # Example
//!
//! ```rust,ignore
//! use pipeline_defaults::{init_tracing, PipelineConfig, ServerDefaults};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_tracing("myserver=debug,info");
//!     let config = PipelineConfig::load("settings.json")?;
//!
//!     let router = ServerDefaults::new()
//!         .with_default_cors_policy(&config, false)?
//!         .with_api_versioning()
//!         .with_client_cert_forwarding(&config.client_cert_header)?
//!         .apply(my_routes());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod pipeline;

#[cfg(feature = "cors")]
pub mod cors;

#[cfg(feature = "versioning")]
pub mod versioning;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "cert-forwarding")]
pub mod cert;

#[cfg(feature = "bootstrap")]
pub mod bootstrap;

#[cfg(test)]
mod test_utils;

// Re-exports for convenience
pub use config::{
    split_list, ConfigError, ConfigSource, FigmentConfig, MapConfig, PipelineConfig,
};
pub use pipeline::ServerDefaults;

#[cfg(feature = "cors")]
pub use cors::CorsPolicy;

#[cfg(feature = "versioning")]
pub use versioning::{ApiVersion, ApiVersionError, ApiVersioningLayer};

#[cfg(feature = "json")]
pub use json::DefaultJson;

#[cfg(feature = "cert-forwarding")]
pub use cert::{
    decode_certificate_header, BufferPool, CertificateForwardingLayer, ClientCertificate,
};

#[cfg(feature = "bootstrap")]
pub use bootstrap::{init_tracing, LogFormat};
