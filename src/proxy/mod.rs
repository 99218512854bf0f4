//! The proxy core: per-connection queueing, cluster fan-out and the TCP
//! front end.
//!
//! - [`backend`] - the contract a cluster session fulfils
//! - [`aggregate`] - cluster-wide `KEYS`, `SCAN`, `MGET`, `MSET`, `DEL`, `FLUSHALL`, `SELECT`
//! - [`queue`] - in-order dispatch for one connection
//! - [`session`] - one client connection
//! - [`server`] - the listener

pub mod aggregate;
pub mod backend;
pub mod queue;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use aggregate::{ClusterAggregator, Verb};
pub use backend::{Backend, BackendEvent, BackendState, Shard};
pub use queue::{ClientHandle, CommandQueue, Job};
pub use server::{Server, SessionIds};
pub use session::serve;
