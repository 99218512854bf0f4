//! TCP front end: accepts clients and gives each one a session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cluster::{ClusterClient, ClusterOptions};
use crate::config::ProxyConfig;
use crate::proto::error::Result;
use crate::proxy::aggregate::ClusterAggregator;
use crate::proxy::session::serve;

/// Pause after a failed accept, so running out of descriptors does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of session ids, unique within the process.
#[derive(Debug, Default)]
pub struct SessionIds(AtomicU64);

impl SessionIds {
    /// Creates a counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next id.
    pub fn next_id(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// The proxy server.
///
/// # Example
///
/// ```no_run
/// use shardgate::config::ProxyConfig;
/// use shardgate::proxy::Server;
///
/// # async fn run() -> shardgate::Result<()> {
/// let server = Server::bind(ProxyConfig::default()).await?;
/// server.run().await
/// # }
/// ```
pub struct Server {
    listener: TcpListener,
    config: Arc<ProxyConfig>,
    ids: Arc<SessionIds>,
}

impl Server {
    /// Binds the listen address from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the address cannot be bound.
    pub async fn bind(config: ProxyConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen).await?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            ids: Arc::new(SessionIds::new()),
        })
    }

    /// The address actually bound, useful with port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts clients until the task is dropped.
    ///
    /// Each client gets its own cluster session wrapped in the aggregator;
    /// nothing is shared between clients.
    pub async fn run(self) -> Result<()> {
        info!(
            address = %self.local_addr()?,
            upstreams = ?self.config.upstreams,
            "proxy listening"
        );

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                warn!(%peer, error = %e, "failed to set TCP_NODELAY");
            }

            let id = self.ids.next_id();
            let config = self.config.clone();
            tokio::spawn(async move {
                info!(session = id, %peer, "client connected");
                let cluster = ClusterClient::start(ClusterOptions::from(config.as_ref()));
                let backend = Arc::new(ClusterAggregator::new(cluster));
                match serve(id, stream, backend, config.max_frame_size).await {
                    Ok(()) => info!(session = id, %peer, "client disconnected"),
                    Err(e) => warn!(session = id, %peer, error = %e, "client session ended with error"),
                }
            });
        }
    }
}
