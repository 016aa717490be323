//! `stockwise-access` — per-request access pipeline.
//!
//! Wires permission aggregation, the authorization gate, tenant context
//! resolution and scoped listing queries into the order a request needs
//! them: aggregate once, ensure the tenant context once, gate every action,
//! pass the tenant explicitly to every listing.

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;

pub use config::AccessConfig;
pub use context::RequestContext;
pub use error::AccessError;
pub use pipeline::AccessPipeline;
