//! Node connections.
//!
//! Plumbing used by the cluster backend to talk to individual Redis nodes.
//!
//! ## Modules
//!
//! - [`connection`] - Framed connection to a single node
//! - [`command`] - Command builders
//! - [`multiplexed`] - Shared handle that pipelines requests over one connection

pub use crate::proto::error::{Error, Result};

/// Command construction helpers.
pub mod command;
/// Low-level connection management.
pub mod connection;
/// Multiplexing logic.
pub mod multiplexed;
