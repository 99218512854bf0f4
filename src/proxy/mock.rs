//! In-memory backends for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::{broadcast, watch};

use crate::proto::error::Result;
use crate::proto::frame::Frame;
use crate::proxy::backend::{Backend, BackendEvent, BackendState, Shard};

pub(crate) type Responder = Arc<dyn Fn(&str, &[Bytes]) -> Result<Frame> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub verb: String,
    pub args: Vec<Bytes>,
}

fn record(calls: &Mutex<Vec<Call>>, verb: &str, args: &[Bytes]) {
    calls.lock().unwrap().push(Call {
        verb: verb.to_string(),
        args: args.to_vec(),
    });
}

pub(crate) fn bulk_list(items: &[&str]) -> Frame {
    Frame::Array(items.iter().map(|s| Frame::bulk(s.to_string())).collect())
}

pub(crate) fn args(items: &[&str]) -> Vec<Bytes> {
    items.iter().map(|s| Bytes::from(s.to_string())).collect()
}

pub(crate) struct MockShard {
    address: String,
    responder: Responder,
    calls: Mutex<Vec<Call>>,
}

impl MockShard {
    pub fn new(
        address: &str,
        responder: impl Fn(&str, &[Bytes]) -> Result<Frame> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            responder: Arc::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Shard for MockShard {
    fn address(&self) -> &str {
        &self.address
    }

    fn call<'a>(&'a self, verb: &'a str, args: Vec<Bytes>) -> BoxFuture<'a, Result<Frame>> {
        Box::pin(async move {
            record(&self.calls, verb, &args);
            tokio::task::yield_now().await;
            (self.responder)(verb, &args)
        })
    }
}

pub(crate) struct MockBackend {
    responder: Responder,
    shards: Vec<Arc<MockShard>>,
    calls: Mutex<Vec<Call>>,
    journal: Arc<Mutex<Vec<String>>>,
    latency: Duration,
    quits: AtomicUsize,
    state: watch::Sender<BackendState>,
    events: broadcast::Sender<BackendEvent>,
}

impl MockBackend {
    pub fn new(
        responder: impl Fn(&str, &[Bytes]) -> Result<Frame> + Send + Sync + 'static,
    ) -> Self {
        let (state, _) = watch::channel(BackendState::Ready);
        let (events, _) = broadcast::channel(8);
        Self {
            responder: Arc::new(responder),
            shards: Vec::new(),
            calls: Mutex::new(Vec::new()),
            journal: Arc::new(Mutex::new(Vec::new())),
            latency: Duration::ZERO,
            quits: AtomicUsize::new(0),
            state,
            events,
        }
    }

    pub fn with_shards(mut self, shards: Vec<Arc<MockShard>>) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Shares a log that receives `dispatch <verb> <first arg>` entries.
    pub fn with_journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_state(self, state: BackendState) -> Self {
        self.state.send_replace(state);
        self
    }

    pub fn set_state(&self, state: BackendState) {
        self.state.send_replace(state);
    }

    pub fn emit(&self, event: BackendEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

impl Backend for MockBackend {
    fn call<'a>(&'a self, verb: &'a str, args: Vec<Bytes>) -> BoxFuture<'a, Result<Frame>> {
        Box::pin(async move {
            record(&self.calls, verb, &args);
            let first = args
                .first()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .unwrap_or_default();
            self.journal
                .lock()
                .unwrap()
                .push(format!("dispatch {} {}", verb, first));
            if self.latency.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.latency).await;
            }
            (self.responder)(verb, &args)
        })
    }

    fn masters(&self) -> BoxFuture<'_, Result<Vec<Arc<dyn Shard>>>> {
        Box::pin(async move {
            Ok(self
                .shards
                .iter()
                .map(|shard| shard.clone() as Arc<dyn Shard>)
                .collect())
        })
    }

    fn state(&self) -> watch::Receiver<BackendState> {
        self.state.subscribe()
    }

    fn events(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }

    fn quit(&self) {
        self.quits.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(BackendState::Closed);
    }
}
