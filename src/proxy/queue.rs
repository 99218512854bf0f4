//! Per-connection command queue.
//!
//! Replies must come back in request order, but backend calls are
//! asynchronous. The queue dispatches one job at a time and only moves on
//! once the reply of the previous job has been written to the client.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Notify};
use tracing::{debug, trace};

use crate::proto::codec::encode_reply;
use crate::proto::error::Result;
use crate::proto::frame::Frame;
use crate::proxy::backend::{Backend, BackendState};

/// Write side of a client connection, shared by the jobs it produced.
pub struct ClientHandle<W> {
    writer: Arc<tokio::sync::Mutex<W>>,
}

impl<W> Clone for ClientHandle<W> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<W> ClientHandle<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps the write half of a client socket.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
        }
    }

    /// Encodes `reply` for the client and writes it out.
    pub async fn write_reply(&self, reply: &Frame) -> Result<()> {
        let data = encode_reply(reply);
        let mut writer = self.writer.lock().await;
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Shuts the write half down.
    pub async fn shutdown(&self) -> Result<()> {
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

/// One decoded client command waiting for its reply.
pub struct Job<W> {
    client: ClientHandle<W>,
    verb: String,
    args: Vec<Bytes>,
}

impl<W> Job<W> {
    /// Creates a job; the verb is lowercased.
    pub fn new(client: ClientHandle<W>, verb: &str, args: Vec<Bytes>) -> Self {
        Self {
            client,
            verb: verb.to_ascii_lowercase(),
            args,
        }
    }

    /// The lowercase verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The arguments, verb excluded.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }
}

impl<W> fmt::Debug for Job<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("verb", &self.verb)
            .field("args", &self.args.len())
            .finish()
    }
}

struct QueueState<W> {
    pending: VecDeque<Job<W>>,
    busy: bool,
    closed: bool,
}

struct Shared<B, W> {
    id: u64,
    backend: Arc<B>,
    backend_state: watch::Receiver<BackendState>,
    state: Mutex<QueueState<W>>,
    idle: Notify,
}

/// FIFO of jobs for one client connection.
///
/// At most one job is in flight at a time. Jobs wait while the backend is
/// still connecting and start draining once it leaves that state.
pub struct CommandQueue<B, W> {
    shared: Arc<Shared<B, W>>,
}

impl<B, W> CommandQueue<B, W>
where
    B: Backend,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Creates the queue of session `id` and starts watching the backend
    /// state.
    pub fn new(id: u64, backend: Arc<B>) -> Self {
        let backend_state = backend.state();
        let shared = Arc::new(Shared {
            id,
            backend,
            backend_state: backend_state.clone(),
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                busy: false,
                closed: false,
            }),
            idle: Notify::new(),
        });

        tokio::spawn(watch_backend(Arc::downgrade(&shared), backend_state));

        Self { shared }
    }

    /// Session id this queue belongs to.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Appends a job and starts draining if the backend can take it.
    pub fn enqueue(&self, job: Job<W>) {
        {
            let mut state = self.shared.lock();
            if state.closed {
                debug!(queue = self.shared.id, verb = %job.verb, "queue closed, job dropped");
                return;
            }
            trace!(queue = self.shared.id, verb = %job.verb, "job enqueued");
            state.pending.push_back(job);
        }
        Shared::schedule(&self.shared);
    }

    /// Number of jobs not yet dispatched.
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Waits until every enqueued job has been answered.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.shared.lock();
                if state.closed || (!state.busy && state.pending.is_empty()) {
                    return;
                }
            }
            notified.await;
        }
    }

    /// Discards pending jobs and stops accepting new ones.
    ///
    /// A job already handed to the backend runs to completion.
    pub fn close(&self) {
        let discarded = {
            let mut state = self.shared.lock();
            state.closed = true;
            let discarded = state.pending.len();
            state.pending.clear();
            discarded
        };
        if discarded > 0 {
            debug!(queue = self.shared.id, discarded, "queue closed with pending jobs");
        }
        self.shared.idle.notify_waiters();
    }
}

impl<B, W> Drop for CommandQueue<B, W> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        state.pending.clear();
    }
}

impl<B, W> Shared<B, W>
where
    B: Backend,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn lock(&self) -> MutexGuard<'_, QueueState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn backend_accepts_commands(&self) -> bool {
        self.backend_state.borrow().accepts_commands()
    }

    /// Starts a drain task unless one is running or there is nothing to do.
    fn schedule(shared: &Arc<Self>) {
        {
            let mut state = shared.lock();
            if state.busy || state.closed || state.pending.is_empty() {
                return;
            }
            if !shared.backend_accepts_commands() {
                return;
            }
            state.busy = true;
        }
        tokio::spawn(Self::drain(shared.clone()));
    }

    /// Dispatches jobs one after another until the queue is empty.
    ///
    /// Runs as a loop inside a single task, yielding between jobs, so queue
    /// depth never turns into stack depth.
    async fn drain(shared: Arc<Self>) {
        loop {
            let job = {
                let mut state = shared.lock();
                let next = if state.closed || !shared.backend_accepts_commands() {
                    None
                } else {
                    state.pending.pop_front()
                };
                match next {
                    Some(job) => job,
                    None => {
                        state.busy = false;
                        drop(state);
                        shared.idle.notify_waiters();
                        return;
                    }
                }
            };

            let Job { client, verb, args } = job;
            let reply = match shared.backend.call(&verb, args).await {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(queue = shared.id, verb = %verb, error = %e, "command failed");
                    e.to_frame()
                }
            };

            if let Err(e) = client.write_reply(&reply).await {
                debug!(queue = shared.id, verb = %verb, error = %e, "failed to write reply");
            }

            tokio::task::yield_now().await;
        }
    }
}

/// Restarts draining whenever the backend state changes.
async fn watch_backend<B, W>(shared: Weak<Shared<B, W>>, mut backend_state: watch::Receiver<BackendState>)
where
    B: Backend,
    W: AsyncWrite + Unpin + Send + 'static,
{
    while backend_state.changed().await.is_ok() {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let current = backend_state.borrow_and_update().clone();
        debug!(queue = shared.id, state = %current, "backend state changed");
        if shared.lock().closed {
            return;
        }
        Shared::schedule(&shared);
    }
}
