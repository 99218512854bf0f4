//! One proxied client connection.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::proto::codec::CommandReader;
use crate::proto::command::Command;
use crate::proto::error::Result;
use crate::proto::frame::Frame;
use crate::proxy::backend::{Backend, BackendEvent};
use crate::proxy::queue::{ClientHandle, CommandQueue, Job};

/// Serves one client connection until it closes.
///
/// Commands are decoded from `stream` and answered in order through a
/// [`CommandQueue`] bound to `backend`. `QUIT` is answered after all earlier
/// replies and ends the session. A malformed request is answered with a
/// protocol error and ends the session too. On exit the queue is closed
/// and the backend session told to quit.
///
/// # Errors
///
/// Returns the read or decode error that ended the session.
pub async fn serve<S, B>(id: u64, stream: S, backend: Arc<B>, max_frame_size: usize) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    B: Backend,
{
    let (read, write) = tokio::io::split(stream);
    let client = ClientHandle::new(write);
    let queue = CommandQueue::new(id, backend.clone());
    let mut reader = CommandReader::new(read, max_frame_size);
    let mut events = backend.events();
    let mut events_open = true;

    let result = loop {
        tokio::select! {
            command = reader.next_command() => match command {
                Ok(Some(command)) => {
                    if let Flow::Quit = submit(&queue, &client, command) {
                        queue.wait_idle().await;
                        if let Err(e) = client.write_reply(&Frame::ok()).await {
                            debug!(session = id, error = %e, "failed to answer QUIT");
                        }
                        let _ = client.shutdown().await;
                        break Ok(());
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => {
                    warn!(session = id, error = %e, "closing connection after protocol error");
                    queue.wait_idle().await;
                    let _ = client.write_reply(&e.to_frame()).await;
                    break Err(e);
                }
            },
            event = events.recv(), if events_open => match event {
                Ok(BackendEvent::Error(message)) => {
                    warn!(session = id, error = %message, "backend error");
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(session = id, skipped, "backend events lagged");
                }
                Err(RecvError::Closed) => events_open = false,
            },
        }
    };

    queue.close();
    backend.quit();
    result
}

enum Flow {
    Continue,
    Quit,
}

fn submit<B, W>(queue: &CommandQueue<B, W>, client: &ClientHandle<W>, command: Command) -> Flow
where
    B: Backend,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let Some(verb) = command.normalized_verb() else {
        return Flow::Continue;
    };
    if verb == "quit" {
        return Flow::Quit;
    }

    let mut parts = command.into_parts();
    parts.remove(0);
    queue.enqueue(Job::new(client.clone(), &verb, parts));
    Flow::Continue
}
