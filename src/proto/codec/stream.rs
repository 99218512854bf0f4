//! Command reader over a client socket.

use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::proto::codec::Decoder;
use crate::proto::command::Command;
use crate::proto::error::Result;

const READ_CHUNK_SIZE: usize = 4096;

/// Reads client commands off a byte stream.
///
/// Bytes are consumed as they arrive and one [`Command`] is produced per
/// complete RESP array. A malformed frame ends the stream with an error;
/// the connection must then be closed since no resynchronization is tried.
#[derive(Debug)]
pub struct CommandReader<R> {
    reader: R,
    decoder: Decoder,
    chunk: Vec<u8>,
}

impl<R> CommandReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader with the given maximum frame size.
    pub fn new(reader: R, max_frame_size: usize) -> Self {
        Self {
            reader,
            decoder: Decoder::with_max_frame_size(max_frame_size),
            chunk: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// Waits for the next complete command.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream.
    pub async fn next_command(&mut self) -> Result<Option<Command>> {
        loop {
            if let Some(frame) = self.decoder.decode()? {
                return Ok(Some(Command::try_from(frame)?));
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                if self.decoder.buffered() > 0 {
                    debug!(
                        pending = self.decoder.buffered(),
                        "peer closed with an incomplete frame"
                    );
                }
                return Ok(None);
            }
            self.decoder.append(&self.chunk[..n]);
        }
    }

    /// Turns the reader into a stream of commands that ends at end of input
    /// or right after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Command>> {
        stream::unfold(Some(self), |state| async move {
            let mut reader = state?;
            match reader.next_command().await {
                Ok(Some(command)) => Some((Ok(command), Some(reader))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
