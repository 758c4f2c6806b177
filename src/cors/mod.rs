//! Default CORS policy built from `CorsPolicy:*` configuration.

mod policy;

pub use policy::{AllowedMethods, AllowedOrigins, CorsPolicy};
