//! Streaming RESP2 decoder.

use bytes::Buf;
use bytes::BytesMut;

use crate::proto::error::DecodeError;
use crate::proto::frame::Frame;

/// Default maximum frame size (512 MB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted. Node replies nest a few levels at most
/// and client commands not at all.
pub const MAX_NESTING_DEPTH: usize = 32;

/// A RESP decoder that converts bytes to [`Frame`] types.
///
/// The decoder handles streaming input and can decode frames incrementally.
/// Call [`append`](Decoder::append) to add data, then [`decode`](Decoder::decode)
/// to parse frames. Returns `Ok(None)` when more data is needed; no bytes are
/// consumed until a whole frame, nested arrays included, is available.
///
/// # Example
///
/// ```
/// use shardgate::proto::codec::Decoder;
/// use shardgate::proto::frame::Frame;
///
/// let mut decoder = Decoder::new();
/// decoder.append(b"+OK\r\n");
/// let frame = decoder.decode().unwrap().unwrap();
/// assert_eq!(frame, Frame::SimpleString(b"OK".to_vec()));
/// ```
#[derive(Debug)]
pub struct Decoder {
    buf: BytesMut,
    max_frame_size: usize,
    partial: Option<PartialArray>,
}

/// Elements of an incomplete top-level array decoded so far. Offsets stay
/// valid because the buffer only grows until the frame is consumed.
#[derive(Debug)]
struct PartialArray {
    len: usize,
    items: Vec<Frame>,
    cursor: usize,
}

enum ArrayHeader {
    Null(usize),
    Items { len: usize, start: usize },
}

impl Decoder {
    /// Creates a new decoder with an empty buffer.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a new decoder with a custom maximum frame size.
    ///
    /// # Arguments
    ///
    /// * `max_frame_size` - Maximum size in bytes for a single frame
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_size,
            partial: None,
        }
    }

    /// Appends raw bytes to the internal buffer.
    ///
    /// Call this method when new data arrives from the network.
    /// Buffer size limits are checked during decode, not append.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Attempts to decode a frame from the buffer.
    ///
    /// Returns `Ok(Some(Frame))` if a complete frame was decoded.
    /// Returns `Ok(None)` if more data is needed.
    /// Returns `Err(...)` if the data is malformed.
    pub fn decode(&mut self) -> Result<Option<Frame>, DecodeError> {
        if self.buf.is_empty() {
            return Ok(None);
        }

        let mut partial = match self.partial.take() {
            Some(partial) => partial,
            None if self.buf[0] == b'*' => match self.array_header(0)? {
                None => return self.incomplete(),
                Some(ArrayHeader::Null(end)) => return Ok(Some(self.consume(Frame::Null, end))),
                Some(ArrayHeader::Items { len, start }) => PartialArray {
                    len,
                    items: Vec::with_capacity(len.min(1024)),
                    cursor: start,
                },
            },
            None => {
                return match self.parse(0, 0)? {
                    Some((frame, end)) => Ok(Some(self.consume(frame, end))),
                    None => self.incomplete(),
                }
            }
        };

        // Resume a top-level array at its first undecoded element, so a large
        // command arriving in many reads is only parsed once.
        while partial.items.len() < partial.len {
            match self.parse(partial.cursor, 1)? {
                Some((frame, next)) => {
                    partial.items.push(frame);
                    partial.cursor = next;
                }
                None => {
                    self.partial = Some(partial);
                    return self.incomplete();
                }
            }
        }

        Ok(Some(self.consume(Frame::Array(partial.items), partial.cursor)))
    }

    fn consume(&mut self, frame: Frame, end: usize) -> Frame {
        self.buf.advance(end);
        frame
    }

    fn incomplete(&self) -> Result<Option<Frame>, DecodeError> {
        if self.buf.len() > self.max_frame_size {
            return Err(DecodeError::new(
                "Buffer size exceeded maximum frame size",
            ));
        }
        Ok(None)
    }

    /// Parses one frame starting at `pos`, returning it with the offset just
    /// past its last byte.
    fn parse(&self, pos: usize, depth: usize) -> Result<Option<(Frame, usize)>, DecodeError> {
        if pos >= self.buf.len() {
            return Ok(None);
        }

        match self.buf[pos] {
            b'+' => Ok(self
                .line(pos)
                .map(|(line, end)| (Frame::SimpleString(line.to_vec()), end))),
            b'-' => Ok(self
                .line(pos)
                .map(|(line, end)| (Frame::Error(line.to_vec()), end))),
            b':' => match self.line(pos) {
                Some((line, end)) => Ok(Some((Frame::Integer(parse_int(line)?), end))),
                None => Ok(None),
            },
            b'$' => self.parse_bulk_string(pos),
            b'*' => self.parse_array(pos, depth),
            other => Err(DecodeError::new(format!(
                "unknown frame type: {}",
                other as char
            ))),
        }
    }

    fn parse_bulk_string(&self, pos: usize) -> Result<Option<(Frame, usize)>, DecodeError> {
        let (line, start) = match self.line(pos) {
            Some(found) => found,
            None => return Ok(None),
        };
        let len = parse_int(line)?;

        if len == -1 {
            return Ok(Some((Frame::BulkString(None), start)));
        }
        if len < 0 {
            return Err(DecodeError::new("invalid bulk string length"));
        }

        let len = len as usize;
        if len > self.max_frame_size {
            return Err(DecodeError::new(
                "Bulk string length exceeds maximum frame size",
            ));
        }

        let end = start + len;
        if self.buf.len() < end + 2 {
            return Ok(None);
        }
        if &self.buf[end..end + 2] != b"\r\n" {
            return Err(DecodeError::new("bulk string is not terminated by CRLF"));
        }

        let data = BytesMut::from(&self.buf[start..end]).freeze();
        Ok(Some((Frame::BulkString(Some(data)), end + 2)))
    }

    fn parse_array(&self, pos: usize, depth: usize) -> Result<Option<(Frame, usize)>, DecodeError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(DecodeError::new("array nesting exceeds maximum depth"));
        }

        let (len, mut cursor) = match self.array_header(pos)? {
            None => return Ok(None),
            Some(ArrayHeader::Null(end)) => return Ok(Some((Frame::Null, end))),
            Some(ArrayHeader::Items { len, start }) => (len, start),
        };

        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            match self.parse(cursor, depth + 1)? {
                Some((frame, next)) => {
                    items.push(frame);
                    cursor = next;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((Frame::Array(items), cursor)))
    }

    fn array_header(&self, pos: usize) -> Result<Option<ArrayHeader>, DecodeError> {
        let (line, start) = match self.line(pos) {
            Some(found) => found,
            None => return Ok(None),
        };
        let len = parse_int(line)?;

        if len == -1 {
            return Ok(Some(ArrayHeader::Null(start)));
        }
        if len < 0 {
            return Err(DecodeError::new("invalid array length"));
        }

        let len = len as usize;
        // Assume minimum 16 bytes per item
        if len > self.max_frame_size / 16 {
            return Err(DecodeError::new("Array length exceeds reasonable maximum"));
        }
        Ok(Some(ArrayHeader::Items { len, start }))
    }

    /// Returns the line following the type byte at `pos` and the offset
    /// after its CRLF, or None if the line is incomplete.
    fn line(&self, pos: usize) -> Option<(&[u8], usize)> {
        let start = pos + 1;
        let end = find_crlf(&self.buf, start)?;
        Some((&self.buf[start..end], end + 2))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Searches for the next CRLF sequence at or after `from`.
fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

fn parse_int(line: &[u8]) -> Result<i64, DecodeError> {
    std::str::from_utf8(line)
        .map_err(|e| DecodeError::new(e.to_string()))?
        .parse::<i64>()
        .map_err(|e| DecodeError::new(format!("invalid integer: {}", e)))
}
