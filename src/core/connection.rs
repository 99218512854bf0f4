use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::proto::codec::{Decoder, Encoder};
use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

const READ_CHUNK_SIZE: usize = 4096;

/// A connection to a single Redis node.
///
/// Wraps an underlying stream and handles RESP frame encoding and decoding.
/// [`split`](Connection::split) hands out independent read and write halves
/// so replies can be read while further requests are written.
///
/// # Example
///
/// ```no_run
/// use shardgate::core::connection::Connection;
/// use shardgate::proto::frame::Frame;
/// use tokio::net::TcpStream;
///
/// # async fn run() -> shardgate::Result<()> {
/// let stream = TcpStream::connect("127.0.0.1:7000").await?;
/// let mut conn = Connection::new(stream);
/// conn.write_frame(&Frame::Array(vec![Frame::bulk("PING")])).await?;
/// let pong = conn.read_frame().await?;
/// # Ok(())
/// # }
/// ```
pub struct Connection<S> {
    reader: ConnectionReader<ReadHalf<S>>,
    writer: ConnectionWriter<WriteHalf<S>>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Creates a new connection with the given stream.
    pub fn new(stream: S) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: ConnectionReader::new(read),
            writer: ConnectionWriter::new(write),
        }
    }

    /// Writes a frame to the connection.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_frame(frame).await
    }

    /// Reads a frame from the connection.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        self.reader.read_frame().await
    }

    /// Splits the connection into its read and write halves.
    pub fn split(self) -> (ConnectionReader<ReadHalf<S>>, ConnectionWriter<WriteHalf<S>>) {
        (self.reader, self.writer)
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("buffered", &self.reader.decoder.buffered())
            .finish()
    }
}

/// Read half of a [`Connection`].
pub struct ConnectionReader<R> {
    reader: R,
    decoder: Decoder,
    chunk: Vec<u8>,
}

impl<R> ConnectionReader<R>
where
    R: AsyncRead + Unpin,
{
    fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: Decoder::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// Reads a frame from the connection.
    ///
    /// Handles partial reads internally and keeps reading until a complete
    /// frame is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or a protocol error occurs
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.decoder.decode()? {
                return Ok(frame);
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                return Err(Error::Protocol {
                    message: "connection closed".to_string(),
                });
            }
            self.decoder.append(&self.chunk[..n]);
        }
    }
}

/// Write half of a [`Connection`].
pub struct ConnectionWriter<W> {
    writer: W,
    encoder: Encoder,
}

impl<W> ConnectionWriter<W>
where
    W: AsyncWrite + Unpin,
{
    fn new(writer: W) -> Self {
        Self {
            writer,
            encoder: Encoder::new(),
        }
    }

    /// Encodes the frame and sends it to the node.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.encoder.encode(frame);
        let data = self.encoder.take();
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Encodes several frames and sends them with a single flush.
    pub async fn write_frames(&mut self, frames: &[Frame]) -> Result<()> {
        for frame in frames {
            self.encoder.encode(frame);
        }
        let data = self.encoder.take();
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connection_ping_pong() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream);
            let frame = conn.read_frame().await.unwrap();
            assert_eq!(frame, Frame::Array(vec![Frame::bulk("PING")]));
            conn.write_frame(&Frame::SimpleString(b"PONG".to_vec()))
                .await
                .unwrap();
        });

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let mut conn = Connection::new(stream);
        conn.write_frame(&Frame::Array(vec![Frame::bulk("PING")]))
            .await
            .unwrap();
        let frame = conn.read_frame().await.unwrap();
        assert_eq!(frame, Frame::SimpleString(b"PONG".to_vec()));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_frame_on_closed_stream() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut conn = Connection::new(server);
        assert!(matches!(
            conn.read_frame().await,
            Err(Error::Protocol { .. })
        ));
    }
}
