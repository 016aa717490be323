//! `stockwise-core` — shared primitives for the access-control subsystem.
//!
//! This crate contains **pure** types only (no storage, no transport).

pub mod error;
pub mod id;
pub mod tenant;

pub use error::{SourceError, SourceResult};
pub use id::{TenantId, UserId};
pub use tenant::TenantKind;
