//! # tether-core
//!
//! Foundation types shared by every tether crate.
//!
//! - **Branded IDs**: [`LogicalEndpoint`] and [`PhysicalAddress`] as newtypes so a
//!   logical peer name can never be passed where a transport URL is expected
//! - **Constants**: protocol tag, JSON-RPC version, default limits
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;

pub use ids::{LogicalEndpoint, PhysicalAddress};
