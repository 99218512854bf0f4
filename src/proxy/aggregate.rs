//! Cluster-wide versions of commands that have no single-shard meaning.
//!
//! [`ClusterAggregator`] wraps any [`Backend`], intercepts the verbs listed in
//! [`Verb`] and forwards everything else unchanged.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{try_join_all, BoxFuture};
use tokio::sync::{broadcast, watch};
use tracing::{error, instrument, warn};

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;
use crate::proxy::backend::{Backend, BackendEvent, BackendState, Shard};

/// Verbs the aggregator handles itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `KEYS pattern`, merged across masters.
    Keys,
    /// `SCAN cursor [MATCH p] [COUNT n] [TYPE t]`, flattened to one pass.
    Scan,
    /// `MGET key...`, one lookup per key.
    Mget,
    /// `MSET key value...`, one write per pair.
    Mset,
    /// `DEL key...`, one delete per key.
    Del,
    /// `FLUSHALL`, sent to every master.
    Flushall,
    /// `SELECT db`, pinned to database 0.
    Select,
    /// Anything else.
    Passthrough,
}

impl Verb {
    /// Maps a lowercase verb to its handler.
    pub fn parse(verb: &str) -> Self {
        match verb {
            "keys" => Verb::Keys,
            "scan" => Verb::Scan,
            "mget" => Verb::Mget,
            "mset" => Verb::Mset,
            "del" => Verb::Del,
            "flushall" => Verb::Flushall,
            "select" => Verb::Select,
            _ => Verb::Passthrough,
        }
    }
}

/// Fan-out layer over a single-shard backend.
///
/// Every aggregate call fetches the current master list, so topology
/// changes between calls are picked up.
pub struct ClusterAggregator<B> {
    backend: B,
}

impl<B: Backend> ClusterAggregator<B> {
    /// Wraps `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.backend
    }

    /// Runs one client command.
    #[instrument(skip(self, args), level = "debug")]
    pub async fn dispatch(&self, verb: &str, args: Vec<Bytes>) -> Result<Frame> {
        match Verb::parse(verb) {
            Verb::Keys => {
                let [pattern] = <[Bytes; 1]>::try_from(args).map_err(|_| Error::wrong_arity("keys"))?;
                Ok(key_list(self.keys(pattern).await?))
            }
            Verb::Scan => self.scan(args).await,
            Verb::Mget => self.mget(args).await,
            Verb::Mset => self.mset(args).await,
            Verb::Del => self.del(args).await.map(Frame::Integer),
            Verb::Flushall => self.flushall(args).await,
            Verb::Select => self.select().await,
            Verb::Passthrough => self.backend.call(verb, args).await,
        }
    }

    /// Collects the keys matching `pattern` from every master.
    ///
    /// Keys are deduplicated, keeping the first occurrence in master order;
    /// during resharding one key can briefly be reported by two masters.
    /// Any failing master fails the whole call.
    pub async fn keys(&self, pattern: Bytes) -> Result<Vec<Bytes>> {
        let masters = self.backend.masters().await?;
        let replies = fan_out(&masters, "keys", &[pattern]).await?;

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for (shard, reply) in masters.iter().zip(replies) {
            let items = match reply {
                Frame::Array(items) => items,
                other => {
                    return Err(Error::Protocol {
                        message: format!(
                            "unexpected KEYS reply from {}: {:?}",
                            shard.address(),
                            other
                        ),
                    })
                }
            };
            for key in items.iter().filter_map(Frame::string_payload) {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// Single-pass `SCAN`: always returns cursor `0` and every matching key.
    ///
    /// `COUNT` and `TYPE` are validated but have no effect.
    pub async fn scan(&self, args: Vec<Bytes>) -> Result<Frame> {
        let Some((_cursor, options)) = args.split_first() else {
            return Err(Error::wrong_arity("scan"));
        };

        let mut pattern = Bytes::from_static(b"*");
        for pair in options.chunks(2) {
            let [name, value] = pair else {
                return Err(Error::syntax());
            };
            match name.to_ascii_lowercase().as_slice() {
                b"match" => pattern = value.clone(),
                b"count" => {
                    let valid = std::str::from_utf8(value)
                        .ok()
                        .and_then(|v| v.parse::<i64>().ok())
                        .is_some();
                    if !valid {
                        return Err(Error::InvalidArgument {
                            message: "value is not an integer or out of range".to_string(),
                        });
                    }
                }
                b"type" => {}
                _ => return Err(Error::syntax()),
            }
        }

        let keys = self.keys(pattern).await?;
        Ok(Frame::Array(vec![Frame::bulk("0"), key_list(keys)]))
    }

    /// Looks up each key on its own shard, keeping input order.
    pub async fn mget(&self, keys: Vec<Bytes>) -> Result<Frame> {
        if keys.is_empty() {
            return Err(Error::wrong_arity("mget"));
        }

        let lookups = keys.into_iter().map(|key| self.backend.call("mget", vec![key]));
        let replies = try_join_all(lookups).await?;

        let mut values = Vec::with_capacity(replies.len());
        for reply in replies {
            match reply {
                Frame::Array(items) => values.extend(items),
                other => values.push(other),
            }
        }
        Ok(Frame::Array(values))
    }

    /// Writes each pair on its own shard.
    ///
    /// A failed write does not fail the command: it is logged and the reply
    /// is one null per argument.
    pub async fn mset(&self, args: Vec<Bytes>) -> Result<Frame> {
        if args.is_empty() || args.len() % 2 != 0 {
            return Err(Error::wrong_arity("mset"));
        }

        let writes = args
            .chunks(2)
            .map(|pair| self.backend.call("mset", pair.to_vec()));
        match try_join_all(writes).await {
            Ok(_) => Ok(Frame::ok()),
            Err(e) => {
                error!(error = %e, pairs = args.len() / 2, "MSET partially failed");
                Ok(Frame::Array(vec![Frame::Null; args.len()]))
            }
        }
    }

    /// Deletes each key on its own shard and sums the counts.
    pub async fn del(&self, keys: Vec<Bytes>) -> Result<i64> {
        if keys.is_empty() {
            return Err(Error::wrong_arity("del"));
        }

        let deletes = keys.into_iter().map(|key| self.backend.call("del", vec![key]));
        let mut total = 0;
        for reply in try_join_all(deletes).await? {
            match reply {
                Frame::Integer(n) => total += n,
                other => {
                    return Err(Error::Protocol {
                        message: format!("unexpected DEL reply: {:?}", other),
                    })
                }
            }
        }
        Ok(total)
    }

    /// Flushes every master, forwarding options such as `ASYNC`.
    pub async fn flushall(&self, args: Vec<Bytes>) -> Result<Frame> {
        let masters = self.backend.masters().await?;
        if let Err(e) = fan_out(&masters, "flushall", &args).await {
            error!(error = %e, "FLUSHALL failed");
            return Err(e);
        }
        Ok(Frame::ok())
    }

    /// Clusters only have database 0, so that is what gets selected.
    pub async fn select(&self) -> Result<Frame> {
        self.backend
            .call("select", vec![Bytes::from_static(b"0")])
            .await
    }
}

/// Sends the same command to every master and waits for all replies.
async fn fan_out(masters: &[Arc<dyn Shard>], verb: &str, args: &[Bytes]) -> Result<Vec<Frame>> {
    let calls = masters.iter().map(|shard| async move {
        shard.call(verb, args.to_vec()).await.map_err(|e| {
            warn!(shard = shard.address(), verb, error = %e, "shard call failed");
            e
        })
    });
    try_join_all(calls).await
}

fn key_list(keys: Vec<Bytes>) -> Frame {
    Frame::Array(keys.into_iter().map(Frame::bulk).collect())
}

impl<B: Backend> Backend for ClusterAggregator<B> {
    fn call<'a>(&'a self, verb: &'a str, args: Vec<Bytes>) -> BoxFuture<'a, Result<Frame>> {
        Box::pin(self.dispatch(verb, args))
    }

    fn masters(&self) -> BoxFuture<'_, Result<Vec<Arc<dyn Shard>>>> {
        self.backend.masters()
    }

    fn state(&self) -> watch::Receiver<BackendState> {
        self.backend.state()
    }

    fn events(&self) -> broadcast::Receiver<BackendEvent> {
        self.backend.events()
    }

    fn quit(&self) {
        self.backend.quit()
    }
}
