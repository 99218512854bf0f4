//! Redis Cluster backend session.
//!
//! One [`ClusterClient`] is created per proxied client connection. It
//! discovers the slot map, routes every command to the master owning its key
//! and follows `MOVED`/`ASK` redirects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::ProxyConfig;
use crate::core::command::{auth, auth_with_username, Cmd};
use crate::core::connection::Connection;
use crate::core::multiplexed::MultiplexedConnection;
use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;
use crate::proxy::backend::{Backend, BackendEvent, BackendState, Shard};

use super::commands::{asking, cluster_slots};
use super::errors::check_reply;
use super::pool::ConnectionPool;
use super::slot::key_slot;
use super::topology::ClusterTopology;

/// Default queue size for multiplexed connections.
const DEFAULT_QUEUE_SIZE: usize = 1024;

const EVENT_CAPACITY: usize = 16;

/// Commands that carry no key and may run on any master.
const KEYLESS: &[&str] = &[
    "acl", "bgrewriteaof", "bgsave", "client", "cluster", "command", "config", "dbsize", "echo",
    "flushall", "flushdb", "function", "hello", "info", "keys", "lastsave", "latency", "lolwut",
    "memory", "module", "ping", "randomkey", "readonly", "readwrite", "role", "save", "scan",
    "script", "select", "slowlog", "time", "wait",
];

/// Settings of a backend session.
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Seed nodes, `host:port`.
    pub seeds: Vec<String>,
    /// ACL username for node connections.
    pub username: Option<String>,
    /// Password for node connections.
    pub password: Option<String>,
    /// Limit for establishing one node connection.
    pub connect_timeout: Duration,
    /// Redirects one command may follow.
    pub max_redirects: usize,
    /// Pending request limit per node connection.
    pub queue_size: usize,
}

impl ClusterOptions {
    /// Options for the given seed nodes with default limits.
    pub fn new(seeds: Vec<String>) -> Self {
        Self::from(&ProxyConfig {
            upstreams: seeds,
            ..ProxyConfig::default()
        })
    }
}

impl From<&ProxyConfig> for ClusterOptions {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            seeds: config.upstreams.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            connect_timeout: config.connect_timeout,
            max_redirects: config.max_redirects,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

struct Inner {
    options: ClusterOptions,
    credentials: RwLock<Credentials>,
    topology: RwLock<ClusterTopology>,
    pool: ConnectionPool,
    refreshing: AtomicBool,
    state: watch::Sender<BackendState>,
    events: broadcast::Sender<BackendEvent>,
}

/// Redis Cluster client session.
///
/// Cheap to clone; clones share topology, connections and state.
///
/// # Example
///
/// ```no_run
/// use shardgate::cluster::{ClusterClient, ClusterOptions};
///
/// # async fn run() -> shardgate::Result<()> {
/// let client = ClusterClient::connect(ClusterOptions::new(vec!["127.0.0.1:7000".into()])).await?;
/// let reply = client.execute("get", vec!["key".into()]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClusterClient {
    inner: Arc<Inner>,
}

impl ClusterClient {
    fn new(options: ClusterOptions) -> Self {
        let (state, _) = watch::channel(BackendState::Connecting);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let credentials = Credentials {
            username: options.username.clone(),
            password: options.password.clone(),
        };

        Self {
            inner: Arc::new(Inner {
                options,
                credentials: RwLock::new(credentials),
                topology: RwLock::new(ClusterTopology::new()),
                pool: ConnectionPool::new(),
                refreshing: AtomicBool::new(false),
                state,
                events,
            }),
        }
    }

    /// Creates a session and discovers the topology in the background.
    ///
    /// The session starts in [`BackendState::Connecting`] and moves to
    /// `Ready` or `Failed` once discovery finishes. Must be called from
    /// within a Tokio runtime.
    pub fn start(options: ClusterOptions) -> Self {
        let client = Self::new(options);
        let session = client.clone();
        tokio::spawn(async move {
            match session.refresh_topology().await {
                Ok(()) => {
                    info!("cluster topology loaded");
                    session.set_state(BackendState::Ready);
                }
                Err(e) => {
                    let reason = match e {
                        Error::Unavailable { message } => message,
                        other => other.to_string(),
                    };
                    warn!(error = %reason, "cluster session failed");
                    let _ = session
                        .inner
                        .events
                        .send(BackendEvent::Error(reason.clone()));
                    session.set_state(BackendState::Failed(reason));
                }
            }
        });
        client
    }

    /// Creates a session and waits for topology discovery.
    ///
    /// # Errors
    ///
    /// Returns an error if no seed node returns a usable slot map.
    pub async fn connect(options: ClusterOptions) -> Result<Self> {
        let client = Self::new(options);
        client.refresh_topology().await?;
        client.set_state(BackendState::Ready);
        Ok(client)
    }

    fn set_state(&self, next: BackendState) {
        self.inner.state.send_if_modified(|state| {
            // quit wins over a late discovery result
            if *state == BackendState::Closed || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// Reloads the slot map from the seed nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if no seed node answers `CLUSTER SLOTS`
    /// with at least one slot range.
    pub async fn refresh_topology(&self) -> Result<()> {
        let mut last_error = None;
        for seed in &self.inner.options.seeds {
            match self.fetch_topology_from_node(seed).await {
                Ok(topology) => {
                    debug!(seed = %seed, ranges = topology.slot_ranges.len(), "topology fetched");
                    *self.inner.topology.write().await = topology;
                    return Ok(());
                }
                Err(e) => {
                    debug!(seed = %seed, error = %e, "seed node did not return topology");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Unavailable {
            message: match last_error {
                Some(e) => format!("failed to refresh topology from any seed node: {}", e),
                None => "no seed nodes configured".to_string(),
            },
        })
    }

    /// Asks one node for the slot map. Connecting, `AUTH` and the reply all
    /// have to fit in the connect timeout, so a node that accepts but never
    /// answers cannot hold the session in `Connecting`.
    async fn fetch_topology_from_node(&self, address: &str) -> Result<ClusterTopology> {
        let request = self.send_to(address, cluster_slots().into_frame(), false);
        let response = match tokio::time::timeout(self.inner.options.connect_timeout, request).await {
            Ok(response) => response?,
            Err(_) => {
                self.inner.pool.remove(address).await;
                return Err(timed_out(format!("CLUSTER SLOTS from {} timed out", address)));
            }
        };

        let default_host = address.rsplit_once(':').map_or(address, |(host, _)| host);
        let topology = ClusterTopology::from_cluster_slots(response, default_host)?;
        if topology.is_empty() {
            return Err(Error::ClusterDown);
        }
        Ok(topology)
    }

    /// Refreshes the slot map in the background unless a refresh is running.
    fn spawn_refresh(&self) {
        if self.inner.refreshing.swap(true, Ordering::AcqRel) {
            return;
        }
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.refresh_topology().await {
                warn!(error = %e, "topology refresh after MOVED failed");
            }
            client.inner.refreshing.store(false, Ordering::Release);
        });
    }

    /// Returns the pooled connection to `address`, connecting if needed.
    async fn connection(&self, address: &str) -> Result<MultiplexedConnection> {
        if let Some(conn) = self.inner.pool.get(address).await {
            return Ok(conn);
        }
        let conn = self.open(address).await?;
        Ok(self.inner.pool.insert(address, conn).await)
    }

    async fn open(&self, address: &str) -> Result<MultiplexedConnection> {
        let options = &self.inner.options;
        let stream = tokio::time::timeout(options.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| timed_out(format!("connecting to {} timed out", address)))??;
        stream.set_nodelay(true)?;

        let conn = MultiplexedConnection::new(Connection::new(stream), options.queue_size);

        let credentials = self.inner.credentials.read().await.clone();
        if let Some(password) = credentials.password {
            let login = match credentials.username {
                Some(username) => auth_with_username(username, password),
                None => auth(password),
            };
            check_reply(conn.send_command(login.into_frame()).await?)?;
        }

        debug!(address = %address, "node connection established");
        Ok(conn)
    }

    /// Sends one frame to a node, optionally preceded by `ASKING`.
    async fn send_to(&self, address: &str, frame: Frame, asking_first: bool) -> Result<Frame> {
        let conn = self.connection(address).await?;

        let sent = if asking_first {
            conn.send_pipeline(vec![asking().into_frame(), frame]).await
        } else {
            conn.send_command(frame).await.map(|reply| vec![reply])
        };

        let mut replies = match sent {
            Ok(replies) => replies,
            Err(e) => {
                // the connection is unusable once a read or write failed
                self.inner.pool.remove(address).await;
                return Err(e);
            }
        };

        let reply = replies.pop().ok_or(Error::Closed)?;
        if let Some(asking_reply) = replies.pop() {
            check_reply(asking_reply)?;
        }
        check_reply(reply)
    }

    fn check_open(&self) -> Result<()> {
        match &*self.inner.state.borrow() {
            BackendState::Failed(reason) => Err(Error::Unavailable {
                message: reason.clone(),
            }),
            BackendState::Closed => Err(Error::Closed),
            BackendState::Connecting | BackendState::Ready => Ok(()),
        }
    }

    /// Executes a command on the master owning its key.
    ///
    /// `verb` must be lowercase. Redirects are followed up to the configured
    /// limit; the last redirect error is returned when the limit is hit.
    #[instrument(skip(self, args), level = "debug")]
    pub async fn execute(&self, verb: &str, args: Vec<Bytes>) -> Result<Frame> {
        self.check_open()?;

        if verb == "auth" {
            return self.authenticate(args).await;
        }

        let mut address = self.address_for(routing_key(verb, &args)).await?;
        let frame = Cmd::from_parts(verb, &args).into_frame();
        let mut asking_first = false;
        let mut redirects = 0;

        loop {
            let err = match self.send_to(&address, frame.clone(), asking_first).await {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };

            if redirects >= self.inner.options.max_redirects {
                return Err(err);
            }
            redirects += 1;

            match err {
                Error::Moved {
                    slot,
                    address: target,
                } => {
                    debug!(slot, target = %target, "MOVED redirect");
                    self.inner.topology.write().await.update_slot(slot, &target);
                    self.spawn_refresh();
                    address = target;
                    asking_first = false;
                }
                Error::Ask {
                    slot,
                    address: target,
                } => {
                    debug!(slot, target = %target, "ASK redirect");
                    address = target;
                    asking_first = true;
                }
                other => return Err(other),
            }
        }
    }

    async fn address_for(&self, key: Option<&[u8]>) -> Result<String> {
        let topology = self.inner.topology.read().await;
        let master = match key {
            Some(key) => topology.get_master_for_slot(key_slot(key)),
            None => topology.slot_ranges.first().map(|range| &range.master),
        };
        match master {
            Some(node) => Ok(node.address.clone()),
            None if topology.is_empty() => Err(Error::Unavailable {
                message: "cluster topology is not loaded".to_string(),
            }),
            None => Err(Error::ClusterDown),
        }
    }

    /// Handles a client `AUTH`: stores the credentials for this session and
    /// reconnects to a master with them.
    async fn authenticate(&self, args: Vec<Bytes>) -> Result<Frame> {
        let credentials = match args.as_slice() {
            [password] => Credentials {
                username: None,
                password: Some(String::from_utf8_lossy(password).into_owned()),
            },
            [username, password] => Credentials {
                username: Some(String::from_utf8_lossy(username).into_owned()),
                password: Some(String::from_utf8_lossy(password).into_owned()),
            },
            _ => return Err(Error::wrong_arity("auth")),
        };

        *self.inner.credentials.write().await = credentials;
        self.inner.pool.clear().await;

        let address = match self.address_for(None).await {
            Ok(address) => address,
            Err(_) => self
                .inner
                .options
                .seeds
                .first()
                .cloned()
                .ok_or(Error::ClusterDown)?,
        };
        self.connection(&address).await?;
        info!("session credentials updated");
        Ok(Frame::ok())
    }

    /// Handles for the current masters, in slot order.
    pub async fn master_nodes(&self) -> Result<Vec<NodeHandle>> {
        self.check_open()?;
        let topology = self.inner.topology.read().await;
        if topology.is_empty() {
            return Err(Error::Unavailable {
                message: "cluster topology is not loaded".to_string(),
            });
        }
        Ok(topology
            .masters()
            .into_iter()
            .map(|node| NodeHandle {
                address: node.address,
                client: self.clone(),
            })
            .collect())
    }

    /// Marks the session closed and drops node connections.
    pub fn close(&self) {
        self.inner.state.send_replace(BackendState::Closed);
        let client = self.clone();
        tokio::spawn(async move {
            client.inner.pool.clear().await;
        });
    }
}

/// Picks the key that decides where a command is routed.
///
/// `None` means the command may run on any master.
fn timed_out(message: String) -> Error {
    Error::Io {
        source: std::io::Error::new(std::io::ErrorKind::TimedOut, message),
    }
}

fn routing_key<'a>(verb: &str, args: &'a [Bytes]) -> Option<&'a [u8]> {
    match verb {
        "eval" | "evalsha" | "eval_ro" | "evalsha_ro" | "fcall" | "fcall_ro" => {
            let numkeys: usize = std::str::from_utf8(args.get(1)?).ok()?.parse().ok()?;
            if numkeys == 0 {
                return None;
            }
            args.get(2).map(|key| key.as_ref())
        }
        "object" | "xinfo" | "xgroup" => args.get(1).map(|key| key.as_ref()),
        _ if KEYLESS.contains(&verb) => None,
        _ => args.first().map(|key| key.as_ref()),
    }
}

/// One master of a [`ClusterClient`] session.
#[derive(Clone)]
pub struct NodeHandle {
    address: String,
    client: ClusterClient,
}

impl Shard for NodeHandle {
    fn address(&self) -> &str {
        &self.address
    }

    fn call<'a>(&'a self, verb: &'a str, args: Vec<Bytes>) -> BoxFuture<'a, Result<Frame>> {
        Box::pin(async move {
            self.client.check_open()?;
            let frame = Cmd::from_parts(verb, &args).into_frame();
            self.client.send_to(&self.address, frame, false).await
        })
    }
}

impl Backend for ClusterClient {
    fn call<'a>(&'a self, verb: &'a str, args: Vec<Bytes>) -> BoxFuture<'a, Result<Frame>> {
        Box::pin(self.execute(verb, args))
    }

    fn masters(&self) -> BoxFuture<'_, Result<Vec<Arc<dyn Shard>>>> {
        Box::pin(async move {
            let nodes = self.master_nodes().await?;
            Ok(nodes
                .into_iter()
                .map(|node| Arc::new(node) as Arc<dyn Shard>)
                .collect())
        })
    }

    fn state(&self) -> watch::Receiver<BackendState> {
        self.inner.state.subscribe()
    }

    fn events(&self) -> broadcast::Receiver<BackendEvent> {
        self.inner.events.subscribe()
    }

    fn quit(&self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::codec::{Decoder, Encoder};
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Handler = Arc<dyn Fn(&[String]) -> Frame + Send + Sync>;

    /// Fake cluster node answering every command through `handler`.
    async fn spawn_node(handler: Handler) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut decoder = Decoder::new();
                    let mut encoder = Encoder::new();
                    let mut buf = [0u8; 4096];
                    loop {
                        let n = match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        decoder.append(&buf[..n]);
                        while let Ok(Some(Frame::Array(parts))) = decoder.decode() {
                            let args: Vec<String> = parts
                                .iter()
                                .filter_map(|p| p.string_payload())
                                .map(|b| String::from_utf8_lossy(&b).to_uppercase())
                                .collect();
                            encoder.encode(&handler(args.as_slice()));
                        }
                        if socket.write_all(&encoder.take()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        addr
    }

    fn slots_reply(port: u16) -> Frame {
        Frame::Array(vec![Frame::Array(vec![
            Frame::Integer(0),
            Frame::Integer(16383),
            Frame::Array(vec![
                Frame::bulk("127.0.0.1"),
                Frame::Integer(port as i64),
                Frame::bulk("node-id"),
            ]),
        ])])
    }

    fn is_cluster_slots(args: &[String]) -> bool {
        args.first().map(String::as_str) == Some("CLUSTER")
    }

    #[test]
    fn test_routing_key() {
        let args = |v: &[&str]| v.iter().map(|s| Bytes::from(s.to_string())).collect::<Vec<_>>();

        assert_eq!(routing_key("get", &args(&["foo"])), Some(&b"foo"[..]));
        assert_eq!(routing_key("ping", &args(&[])), None);
        assert_eq!(routing_key("info", &args(&["server"])), None);
        assert_eq!(
            routing_key("eval", &args(&["return 1", "1", "k1", "a"])),
            Some(&b"k1"[..])
        );
        assert_eq!(routing_key("evalsha", &args(&["abc", "0"])), None);
        assert_eq!(
            routing_key("object", &args(&["encoding", "mykey"])),
            Some(&b"mykey"[..])
        );
    }

    #[tokio::test]
    async fn test_start_becomes_ready_and_routes() {
        let port = Arc::new(Mutex::new(0u16));
        let node_port = port.clone();
        let addr = spawn_node(Arc::new(move |args: &[String]| {
            if is_cluster_slots(args) {
                slots_reply(*node_port.lock().unwrap())
            } else if args[0] == "GET" {
                Frame::bulk(format!("value-of-{}", args[1].to_lowercase()))
            } else {
                Frame::Error(b"ERR unknown command".to_vec())
            }
        }))
        .await;
        *port.lock().unwrap() = addr.port();

        let client = ClusterClient::start(ClusterOptions::new(vec![addr.to_string()]));
        let mut state = client.state();
        state.wait_for(|s| s.is_ready()).await.unwrap();

        let reply = client.execute("get", vec![Bytes::from("foo")]).await.unwrap();
        assert_eq!(reply, Frame::bulk("value-of-foo"));

        match client.execute("nope", vec![]).await {
            Err(Error::Server { message }) => assert_eq!(message, "ERR unknown command"),
            other => panic!("expected server error, got {:?}", other),
        }

        let masters = client.master_nodes().await.unwrap();
        assert_eq!(masters.len(), 1);
        assert_eq!(masters[0].address(), addr.to_string());
    }

    #[tokio::test]
    async fn test_moved_and_ask_redirects() {
        let target_log = Arc::new(Mutex::new(Vec::new()));
        let log = target_log.clone();
        let target = spawn_node(Arc::new(move |args: &[String]| {
            log.lock().unwrap().push(args[0].clone());
            match args[0].as_str() {
                "ASKING" => Frame::ok(),
                _ => Frame::bulk("from-target"),
            }
        }))
        .await;

        let owner_port = Arc::new(Mutex::new(0u16));
        let node_port = owner_port.clone();
        let owner = spawn_node(Arc::new(move |args: &[String]| {
            if is_cluster_slots(args) {
                return slots_reply(*node_port.lock().unwrap());
            }
            let slot = key_slot(args[1].to_lowercase().as_bytes());
            if args[1] == "MOVEDKEY" {
                Frame::Error(format!("MOVED {} {}", slot, target).into_bytes())
            } else {
                Frame::Error(format!("ASK {} {}", slot, target).into_bytes())
            }
        }))
        .await;
        *owner_port.lock().unwrap() = owner.port();

        let client = ClusterClient::connect(ClusterOptions::new(vec![owner.to_string()]))
            .await
            .unwrap();

        let reply = client
            .execute("get", vec![Bytes::from("movedkey")])
            .await
            .unwrap();
        assert_eq!(reply, Frame::bulk("from-target"));

        let reply = client
            .execute("get", vec![Bytes::from("askkey")])
            .await
            .unwrap();
        assert_eq!(reply, Frame::bulk("from-target"));

        let log = target_log.lock().unwrap().clone();
        assert_eq!(log, vec!["GET", "ASKING", "GET"]);
    }

    #[tokio::test]
    async fn test_redirect_limit() {
        let own_port = Arc::new(Mutex::new(0u16));
        let node_port = own_port.clone();
        let node = spawn_node(Arc::new(move |args: &[String]| {
            let port = *node_port.lock().unwrap();
            if is_cluster_slots(args) {
                slots_reply(port)
            } else {
                Frame::Error(format!("ASK 1 127.0.0.1:{}", port).into_bytes())
            }
        }))
        .await;
        *own_port.lock().unwrap() = node.port();

        let mut options = ClusterOptions::new(vec![node.to_string()]);
        options.max_redirects = 2;
        let client = ClusterClient::connect(options).await.unwrap();

        assert!(matches!(
            client.execute("get", vec![Bytes::from("k")]).await,
            Err(Error::Ask { slot: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_seed_fails_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ClusterClient::start(ClusterOptions::new(vec![addr.to_string()]));
        let mut events = client.events();
        let mut state = client.state();
        let failed = state
            .wait_for(|s| matches!(s, BackendState::Failed(_)))
            .await
            .unwrap()
            .clone();
        assert!(matches!(failed, BackendState::Failed(_)));
        assert!(matches!(events.recv().await, Ok(BackendEvent::Error(_))));

        assert!(matches!(
            client.execute("get", vec![Bytes::from("k")]).await,
            Err(Error::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_silent_seed_fails_after_connect_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accepts connections and never answers
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut options = ClusterOptions::new(vec![addr.to_string()]);
        options.connect_timeout = Duration::from_millis(100);
        let client = ClusterClient::start(options);

        let mut state = client.state();
        let failed = tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| matches!(s, BackendState::Failed(_))),
        )
        .await
        .expect("session stayed in Connecting")
        .unwrap()
        .clone();
        match failed {
            BackendState::Failed(reason) => assert!(reason.contains("timed out"), "got {}", reason),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_quit_closes_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ClusterClient::new(ClusterOptions::new(vec![addr.to_string()]));
        client.quit();
        assert_eq!(*client.state().borrow(), BackendState::Closed);
        assert!(matches!(
            client.execute("get", vec![Bytes::from("k")]).await,
            Err(Error::Closed)
        ));
        assert!(client.master_nodes().await.is_err());
    }
}
