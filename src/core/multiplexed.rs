use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, instrument};

use crate::core::connection::{Connection, ConnectionReader, ConnectionWriter};
use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

/// A request sent to the multiplexer.
///
/// All frames of one request are written back to back, so no other caller's
/// command can land between them.
struct Request {
    frames: Vec<Frame>,
    response_tx: oneshot::Sender<Result<Vec<Frame>>>,
}

/// Reply slot handed from the writer to the reader task.
struct Waiter {
    expected: usize,
    response_tx: oneshot::Sender<Result<Vec<Frame>>>,
}

/// A handle to a multiplexed node connection.
///
/// This handle is cheap to clone and can be shared across the concurrent
/// sub-calls of a fan-out. Requests are written in submission order and
/// replies are matched to them in the same order. A caller that stops
/// waiting does not desynchronize the connection: its reply is read and
/// dropped.
#[derive(Clone)]
pub struct MultiplexedConnection {
    sender: mpsc::Sender<Request>,
}

impl MultiplexedConnection {
    /// Creates a new multiplexed connection.
    ///
    /// # Arguments
    ///
    /// * `connection` - The underlying connection to multiplex.
    /// * `queue_size` - The maximum number of pending requests.
    pub fn new<S>(connection: Connection<S>, queue_size: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = connection.split();
        let (request_tx, request_rx) = mpsc::channel(queue_size);
        let (waiter_tx, waiter_rx) = mpsc::channel(queue_size);

        tokio::spawn(async move {
            run_writer(writer, request_rx, waiter_tx).await;
        });

        tokio::spawn(async move {
            run_reader(reader, waiter_rx).await;
        });

        Self { sender: request_tx }
    }

    /// Sends a command to the node and awaits the response.
    #[instrument(skip(self), level = "debug")]
    pub async fn send_command(&self, frame: Frame) -> Result<Frame> {
        let mut replies = self.send_pipeline(vec![frame]).await?;
        replies.pop().ok_or_else(connection_closed)
    }

    /// Sends several commands as one uninterrupted batch and returns their
    /// replies in order.
    pub async fn send_pipeline(&self, frames: Vec<Frame>) -> Result<Vec<Frame>> {
        let (response_tx, response_rx) = oneshot::channel();
        let request = Request {
            frames,
            response_tx,
        };

        self.sender
            .send(request)
            .await
            .map_err(|_| connection_closed())?;

        response_rx.await.map_err(|_| connection_closed())?
    }

    /// Returns true once the writer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for MultiplexedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiplexedConnection")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

fn connection_closed() -> Error {
    Error::Io {
        source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection closed"),
    }
}

async fn run_writer<S>(
    mut writer: ConnectionWriter<WriteHalf<S>>,
    mut request_rx: mpsc::Receiver<Request>,
    waiter_tx: mpsc::Sender<Waiter>,
) where
    S: AsyncRead + AsyncWrite,
{
    while let Some(req) = request_rx.recv().await {
        debug!(frames = req.frames.len(), "sending frames");
        if let Err(e) = writer.write_frames(&req.frames).await {
            error!(error = ?e, "failed to write frame");
            let _ = req.response_tx.send(Err(e));
            return;
        }

        let waiter = Waiter {
            expected: req.frames.len(),
            response_tx: req.response_tx,
        };
        // reader task is gone
        if waiter_tx.send(waiter).await.is_err() {
            return;
        }
    }
}

async fn run_reader<S>(
    mut reader: ConnectionReader<ReadHalf<S>>,
    mut waiter_rx: mpsc::Receiver<Waiter>,
) where
    S: AsyncRead + AsyncWrite,
{
    while let Some(waiter) = waiter_rx.recv().await {
        let mut replies = Vec::with_capacity(waiter.expected);
        while replies.len() < waiter.expected {
            match reader.read_frame().await {
                Ok(frame) => {
                    debug!(?frame, "received frame");
                    replies.push(frame);
                }
                Err(e) => {
                    error!(error = ?e, "failed to read frame");
                    let _ = waiter.response_tx.send(Err(e));
                    return;
                }
            }
        }
        let _ = waiter.response_tx.send(Ok(replies));
    }
}
