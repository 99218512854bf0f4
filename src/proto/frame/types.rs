use bytes::Bytes;

/// A RESP (Redis Serialization Protocol) frame.
///
/// This enum represents all frame types defined in the RESP protocol:
/// - SimpleString: Status responses like "OK"
/// - Error: Error responses from the server
/// - Integer: Numeric responses
/// - BulkString: Binary-safe string data
/// - Array: Command arguments and array responses
/// - Null: NULL value
///
/// Replies produced by the cluster backend, or synthesized while merging
/// fan-out results, are plain frames as well.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simple string (+OK).
    SimpleString(Vec<u8>),
    /// Error (-ERR).
    Error(Vec<u8>),
    /// Integer (:1000).
    Integer(i64),
    /// Bulk string ($6\r\nfoobar).
    BulkString(Option<Bytes>),
    /// Array (*2\r\n...).
    Array(Vec<Frame>),
    /// Null ($-1 or *-1).
    Null,
}

impl Frame {
    /// The `+OK` status reply.
    pub fn ok() -> Self {
        Frame::SimpleString(b"OK".to_vec())
    }

    /// Builds a non-null bulk string frame.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::BulkString(Some(data.into()))
    }

    /// Returns the payload of a simple or non-null bulk string.
    pub fn string_payload(&self) -> Option<Bytes> {
        match self {
            Frame::SimpleString(s) => Some(Bytes::copy_from_slice(s)),
            Frame::BulkString(Some(b)) => Some(b.clone()),
            _ => None,
        }
    }

    /// Returns true if this frame is Null or a null bulk string.
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Null | Frame::BulkString(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_string_payload() {
        assert_eq!(
            Frame::bulk("hello").string_payload(),
            Some(Bytes::from("hello"))
        );
        assert_eq!(Frame::ok().string_payload(), Some(Bytes::from("OK")));
        assert_eq!(Frame::Integer(1).string_payload(), None);
        assert_eq!(Frame::BulkString(None).string_payload(), None);
    }

    #[test]
    fn test_frame_is_null() {
        assert!(Frame::Null.is_null());
        assert!(Frame::BulkString(None).is_null());
        assert!(!Frame::Integer(42).is_null());
    }
}
