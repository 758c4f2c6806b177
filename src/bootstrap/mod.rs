//! Process startup helpers.

mod tracing_init;

pub use tracing_init::{init_tracing, init_tracing_with, try_init_tracing, LogFormat, UnknownLogFormat};
