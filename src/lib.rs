pub mod broadcast;
pub mod bus;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod server;
pub mod signals;
pub mod storage;
pub mod topic;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize tracing/logging
///
/// `RUST_LOG` takes precedence over the configured level. This function can
/// only be called once per process.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
