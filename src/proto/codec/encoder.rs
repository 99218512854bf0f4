//! RESP2 encoder for node requests and client replies.

use bytes::{BufMut, Bytes, BytesMut};

use crate::proto::frame::Frame;

/// A RESP encoder that converts [`Frame`] types to bytes.
///
/// The encoder accumulates data in an internal buffer and can be used
/// to encode multiple frames sequentially. [`encode`](Encoder::encode) keeps
/// every frame type as given and is used for requests sent to cluster nodes;
/// [`encode_reply`](Encoder::encode_reply) applies the client reply rules.
///
/// # Example
///
/// ```
/// use shardgate::proto::codec::Encoder;
/// use shardgate::proto::frame::Frame;
///
/// let mut encoder = Encoder::new();
/// encoder.encode(&Frame::SimpleString(b"OK".to_vec()));
/// let data = encoder.take();
/// assert!(!data.is_empty());
/// ```
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Creates a new encoder with an empty buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Encodes a frame into the internal buffer using RESP protocol.
    ///
    /// # Arguments
    ///
    /// * `frame` - The frame to encode
    pub fn encode(&mut self, frame: &Frame) {
        match frame {
            Frame::SimpleString(s) => self.put_simple(s),
            Frame::Error(e) => self.put_line(b'-', e),
            Frame::Integer(n) => self.put_line(b':', n.to_string().as_bytes()),
            Frame::BulkString(Some(data)) => self.put_bulk(data),
            Frame::BulkString(None) | Frame::Null => self.put_null(),
            Frame::Array(a) => {
                self.put_line(b'*', a.len().to_string().as_bytes());
                for item in a {
                    self.encode(item);
                }
            }
        }
    }

    /// Encodes a reply for a client connection.
    ///
    /// Strings carry no framing guarantee: a string payload without control
    /// bytes (0x00-0x1F, 0x7F) is written as a simple string, anything else as
    /// a bulk string. Both nulls become `$-1`. Arrays are encoded element by
    /// element with the same rules, at any depth.
    pub fn encode_reply(&mut self, frame: &Frame) {
        match frame {
            Frame::SimpleString(s) => self.put_string(s),
            Frame::BulkString(Some(data)) => self.put_string(data),
            Frame::Array(a) => {
                self.put_line(b'*', a.len().to_string().as_bytes());
                for item in a {
                    self.encode_reply(item);
                }
            }
            other => self.encode(other),
        }
    }

    /// Takes the encoded data from the buffer, leaving it empty.
    pub fn take(&mut self) -> BytesMut {
        std::mem::replace(&mut self.buf, BytesMut::new())
    }

    fn put_string(&mut self, data: &[u8]) {
        if has_control_bytes(data) {
            self.put_bulk(data);
        } else {
            self.put_simple(data);
        }
    }

    fn put_simple(&mut self, data: &[u8]) {
        self.put_line(b'+', data);
    }

    fn put_bulk(&mut self, data: &[u8]) {
        self.put_line(b'$', data.len().to_string().as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
    }

    fn put_null(&mut self) {
        self.buf.extend_from_slice(b"$-1\r\n");
    }

    fn put_line(&mut self, prefix: u8, line: &[u8]) {
        self.buf.put_u8(prefix);
        self.buf.extend_from_slice(line);
        self.buf.extend_from_slice(b"\r\n");
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a single client reply into a fresh buffer.
///
/// # Example
///
/// ```
/// use shardgate::proto::codec::encode_reply;
/// use shardgate::proto::frame::Frame;
///
/// assert_eq!(&encode_reply(&Frame::bulk("test"))[..], b"+test\r\n");
/// ```
pub fn encode_reply(frame: &Frame) -> Bytes {
    let mut encoder = Encoder::new();
    encoder.encode_reply(frame);
    encoder.take().freeze()
}

fn has_control_bytes(data: &[u8]) -> bool {
    data.iter().any(|&b| b < 0x20 || b == 0x7f)
}
