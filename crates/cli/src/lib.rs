//! Library side of the `chatmap` binary: configuration and the annotation HTTP service.

pub mod config;
pub mod server;

pub use config::{ChatmapConfig, ServerConfig, DATA_DIR_ENV, DEFAULT_BIND};
pub use server::{router, serve, AppState, VIEW_ENDPOINT};
