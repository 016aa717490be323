//! Tracing/logging initialization.
//!
//! The access crates log decisions (denials, dropped query input, tenant
//! switches and auto-selection) as events with structured fields such as
//! `user_id`, `kind`, `tenant_id` and `entity`; they open no spans.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Filter used by [`init_for_tests`] when `RUST_LOG` is unset. Includes the
/// per-request `debug!` events (aggregation, auto-selected tenants).
pub const TEST_FILTER: &str = "debug";

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// One JSON object per event, with event fields flattened to the top level
/// so `user_id`/`tenant_id` can be queried directly. The target is kept to
/// tell authorization, tenancy and query events apart.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}

/// Human-readable output captured by the test harness.
///
/// Intended for `#[test]` functions; repeated calls are no-ops.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(TEST_FILTER))
        .with_test_writer()
        .try_init();
}
