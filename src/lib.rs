//! # Shardgate
//!
//! A RESP proxy that makes a Redis Cluster look like a single Redis node.
//!
//! Clients speak plain RESP2 to the proxy. Each client connection gets its
//! own cluster session that routes commands by hash slot, follows
//! `MOVED`/`ASK` redirects and fans multi-key commands (`KEYS`, `SCAN`,
//! `MGET`, `MSET`, `DEL`, `FLUSHALL`) out over every master. Replies come back
//! in request order.
//!
//! ## Modules
//!
//! - [`proto`] - RESP2 frames, decoder and encoder
//! - [`core`] - connections to individual nodes
//! - [`cluster`] - slot map, routing and redirects
//! - [`proxy`] - per-client sessions and the listener
//! - [`config`] - runtime configuration
//!
//! ## Example
//!
//! ```no_run
//! use shardgate::config::ProxyConfig;
//! use shardgate::proxy::Server;
//!
//! #[tokio::main]
//! async fn main() -> shardgate::Result<()> {
//!     let config = ProxyConfig::builder()
//!         .listen("127.0.0.1:6380")
//!         .upstreams("redis://127.0.0.1:7000")
//!         .build()?;
//!     Server::bind(config).await?.run().await
//! }
//! ```

#![warn(missing_docs)]

pub mod cluster;
pub mod config;
pub mod core;
pub mod proto;
pub mod proxy;

pub use crate::config::ProxyConfig;
pub use crate::proto::error::{Error, Result};
pub use crate::proxy::Server;
