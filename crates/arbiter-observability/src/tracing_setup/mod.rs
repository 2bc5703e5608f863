//! Subscriber initialization.
//!
//! Filter comes from `ARBITER_LOG` (same syntax as `RUST_LOG`), falling back
//! to the configured level. Initialization is idempotent: a second call is a
//! no-op.

pub mod events;
pub mod spans;

use arbiter_core::config::ObservabilityConfig;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV_VAR: &str = "ARBITER_LOG";

/// Install the global subscriber from config. Returns false when a
/// subscriber was already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    install(filter, config.json)
}

/// Install the global subscriber with an explicit filter directive,
/// ignoring the environment.
pub fn init_tracing_with_filter(directive: &str, json: bool) -> bool {
    install(EnvFilter::new(directive), json)
}

fn install(filter: EnvFilter, json: bool) -> bool {
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    result.is_ok()
}
