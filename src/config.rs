//! Proxy configuration.
//!
//! Values are layered: built-in defaults, then `SHARDGATE_*` environment
//! variables, then command line flags. [`Args`] reads the last two and
//! feeds them into a [`ProxyConfigBuilder`].

use std::time::Duration;

use clap::Parser;

use crate::proto::codec::decoder::DEFAULT_MAX_FRAME_SIZE;
use crate::proto::error::{Error, Result};

/// Default client-facing listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:6379";

/// Default cluster seed node.
pub const DEFAULT_UPSTREAM: &str = "127.0.0.1:7000";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_REDIRECTS: usize = 5;
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Runtime configuration of the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Address the proxy listens on, `host:port`.
    pub listen: String,
    /// Cluster seed nodes, `host:port`.
    pub upstreams: Vec<String>,
    /// ACL username sent with `AUTH` on every node connection.
    pub username: Option<String>,
    /// Password sent with `AUTH` on every node connection.
    pub password: Option<String>,
    /// Limit for establishing one node connection.
    pub connect_timeout: Duration,
    /// How many `MOVED`/`ASK` redirects one command may follow.
    pub max_redirects: usize,
    /// Largest client request frame accepted, in bytes.
    pub max_frame_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            upstreams: vec![DEFAULT_UPSTREAM.to_string()],
            username: None,
            password: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ProxyConfig {
    /// Starts a [`ProxyConfigBuilder`].
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::new()
    }
}

/// Builder for [`ProxyConfig`].
///
/// # Example
///
/// ```
/// use shardgate::config::ProxyConfig;
///
/// let config = ProxyConfig::builder()
///     .port(6380)
///     .upstreams("redis://10.0.0.1:7000,10.0.0.2:7000")
///     .password("secret")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.listen, "127.0.0.1:6380");
/// assert_eq!(config.upstreams, vec!["10.0.0.1:7000", "10.0.0.2:7000"]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ProxyConfigBuilder {
    listen: Option<String>,
    port: Option<u16>,
    upstreams: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connect_timeout: Option<Duration>,
    max_redirects: Option<usize>,
    max_frame_size: Option<usize>,
}

impl ProxyConfigBuilder {
    /// Creates a new [`ProxyConfigBuilder`] instance.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listen address, `host:port`.
    #[inline]
    pub fn listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = Some(listen.into());
        self
    }

    /// Overrides the port of the listen address.
    #[inline]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the seed nodes as a comma-separated list.
    ///
    /// Entries may be plain `host:port` or `redis://host:port` URLs.
    #[inline]
    pub fn upstreams(mut self, upstreams: impl Into<String>) -> Self {
        self.upstreams = Some(upstreams.into());
        self
    }

    /// Sets the username for ACL authentication.
    #[inline]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for authentication.
    #[inline]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the node connection timeout.
    #[inline]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the redirect limit per command.
    #[inline]
    pub fn max_redirects(mut self, redirects: usize) -> Self {
        self.max_redirects = Some(redirects);
        self
    }

    /// Sets the largest accepted request frame.
    #[inline]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = Some(size);
        self
    }

    /// Validates the settings and builds the [`ProxyConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a malformed listen address or
    /// seed node list.
    pub fn build(self) -> Result<ProxyConfig> {
        let defaults = ProxyConfig::default();

        let listen = self.listen.unwrap_or(defaults.listen);
        let (host, listen_port) = split_host_port(&listen).ok_or_else(|| Error::InvalidArgument {
            message: format!("invalid listen address '{}'", listen),
        })?;
        let listen = format!("{}:{}", host, self.port.unwrap_or(listen_port));

        let upstreams = match self.upstreams {
            Some(list) => parse_upstreams(&list)?,
            None => defaults.upstreams,
        };

        Ok(ProxyConfig {
            listen,
            upstreams,
            username: self.username,
            password: self.password,
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            max_redirects: self.max_redirects.unwrap_or(defaults.max_redirects),
            max_frame_size: self.max_frame_size.unwrap_or(defaults.max_frame_size),
        })
    }
}

/// Command line of the `shardgate` binary.
///
/// Every option can also come from its `SHARDGATE_*` environment variable;
/// a flag wins over the variable.
#[derive(Parser, Debug, Default)]
#[command(
    name = "shardgate",
    version,
    about = "Present a Redis Cluster as a single Redis node",
    after_help = "Logging is controlled with RUST_LOG (default: info)."
)]
pub struct Args {
    /// Address to listen on [default: 127.0.0.1:6379]
    #[arg(short, long, env = "SHARDGATE_LISTEN", value_name = "ADDR")]
    pub listen: Option<String>,

    /// Port to listen on, overrides the port of --listen
    #[arg(short, long, env = "SHARDGATE_PORT")]
    pub port: Option<u16>,

    /// Comma-separated cluster seed nodes [default: 127.0.0.1:7000]
    #[arg(short, long, env = "SHARDGATE_UPSTREAMS", value_name = "NODES")]
    pub upstreams: Option<String>,

    /// ACL username forwarded to the cluster
    #[arg(long, env = "SHARDGATE_USERNAME")]
    pub username: Option<String>,

    /// Password forwarded to the cluster
    #[arg(long, env = "SHARDGATE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Node connect timeout in milliseconds [default: 5000]
    #[arg(long, env = "SHARDGATE_CONNECT_TIMEOUT_MS", value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Redirects one command may follow [default: 5]
    #[arg(long, env = "SHARDGATE_MAX_REDIRECTS")]
    pub max_redirects: Option<usize>,
}

impl Args {
    /// Layers the parsed options over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a malformed listen address or
    /// seed node list.
    pub fn into_config(self) -> Result<ProxyConfig> {
        let mut builder = ProxyConfigBuilder::new();
        if let Some(listen) = self.listen {
            builder = builder.listen(listen);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(upstreams) = self.upstreams {
            builder = builder.upstreams(upstreams);
        }
        if let Some(username) = self.username {
            builder = builder.username(username);
        }
        if let Some(password) = self.password {
            builder = builder.password(password);
        }
        if let Some(ms) = self.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(redirects) = self.max_redirects {
            builder = builder.max_redirects(redirects);
        }
        builder.build()
    }
}

fn split_host_port(address: &str) -> Option<(&str, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    Some((host, port.parse().ok()?))
}

/// Parses a comma-separated seed list into `host:port` addresses.
fn parse_upstreams(list: &str) -> Result<Vec<String>> {
    let mut parsed = Vec::new();
    for entry in list.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let with_scheme = if entry.contains("://") {
            entry.to_string()
        } else {
            format!("redis://{}", entry)
        };

        let url = url::Url::parse(&with_scheme).map_err(|_| Error::InvalidArgument {
            message: format!("invalid upstream address '{}'", entry),
        })?;
        if url.scheme() != "redis" {
            return Err(Error::InvalidArgument {
                message: format!("invalid scheme in '{}', expected redis://", entry),
            });
        }
        let host = url.host_str().ok_or_else(|| Error::InvalidArgument {
            message: format!("missing host in '{}'", entry),
        })?;
        let port = url.port().unwrap_or(DEFAULT_REDIS_PORT);

        parsed.push(format!("{}:{}", host, port));
    }

    if parsed.is_empty() {
        return Err(Error::InvalidArgument {
            message: "no upstream addresses provided".to_string(),
        });
    }

    Ok(parsed)
}
