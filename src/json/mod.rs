//! JSON serialization defaults for handler responses.
//!
//! axum has no process-wide serializer setting, so null omission is opt-in
//! per handler: it applies to handlers returning [`DefaultJson`] (or bodies
//! built with [`to_vec`]). Handlers returning `axum::Json` still write
//! `null`. For the same reason `ServerDefaults` has no JSON step.

mod response;

pub use response::{omit_nulls, to_value, to_vec, DefaultJson};
