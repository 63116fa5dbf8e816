// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod identity;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod store;

pub use crate::api::router;
pub use crate::config::AppConfig;
pub use crate::error::PipelineError;
pub use crate::pipeline::{run_cycle, RunSummary};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` filters (default `info`);
/// JSON output with `json` or `LOG_FORMAT=json`.
pub fn init_tracing(json: bool) {
    let json = json
        || std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    // A subscriber may already be set (tests); keep it.
    let _ = result;
}
