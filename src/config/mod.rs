//! Configuration lookup and the explicit pipeline configuration struct.

mod base;
mod error;
mod list;
mod source;

pub use base::{
    PipelineConfig, CERT_HEADER_KEY, CORS_METHODS_KEY, CORS_ORIGINS_KEY, DEFAULT_CERT_HEADER,
};
pub use error::ConfigError;
pub use list::split_list;
pub use source::{ConfigSource, FigmentConfig, MapConfig};
