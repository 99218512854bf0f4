//! The contract between a proxy session and the cluster it fronts.
//!
//! The queue and the aggregator only see these traits, which keeps them
//! testable against in-memory mocks.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::{broadcast, watch};

use crate::proto::error::Result;
use crate::proto::frame::Frame;

/// Lifecycle of a backend session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendState {
    /// Topology discovery is still running.
    Connecting,
    /// Commands can be dispatched.
    Ready,
    /// Discovery failed; every command will be answered with this message.
    Failed(String),
    /// The session was shut down.
    Closed,
}

impl BackendState {
    /// True once the session can route commands.
    pub fn is_ready(&self) -> bool {
        matches!(self, BackendState::Ready)
    }

    /// True unless the session is still connecting.
    ///
    /// A failed or closed session still accepts commands so each one gets
    /// its error reply.
    pub fn accepts_commands(&self) -> bool {
        !matches!(self, BackendState::Connecting)
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendState::Connecting => f.write_str("connecting"),
            BackendState::Ready => f.write_str("ready"),
            BackendState::Failed(reason) => write!(f, "failed: {}", reason),
            BackendState::Closed => f.write_str("closed"),
        }
    }
}

/// Out-of-band notification from a backend session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A failure that is not tied to a single command reply.
    Error(String),
}

/// A single shard master.
pub trait Shard: Send + Sync {
    /// Address of the master, `host:port`.
    fn address(&self) -> &str;

    /// Runs one command on this master, without any routing.
    fn call<'a>(&'a self, verb: &'a str, args: Vec<Bytes>) -> BoxFuture<'a, Result<Frame>>;
}

/// A cluster-aware command executor.
pub trait Backend: Send + Sync + 'static {
    /// Runs one command, routed to the shard owning its key.
    ///
    /// `verb` is lowercase. Error replies from the node are returned as `Err`.
    fn call<'a>(&'a self, verb: &'a str, args: Vec<Bytes>) -> BoxFuture<'a, Result<Frame>>;

    /// Lists the current masters, one handle per shard, in a stable order.
    fn masters(&self) -> BoxFuture<'_, Result<Vec<Arc<dyn Shard>>>>;

    /// Subscribes to session state changes.
    fn state(&self) -> watch::Receiver<BackendState>;

    /// Subscribes to out-of-band error events.
    fn events(&self) -> broadcast::Receiver<BackendEvent>;

    /// Shuts the session down. In-flight calls are allowed to finish.
    fn quit(&self);
}
