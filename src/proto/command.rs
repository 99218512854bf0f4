//! Commands decoded from client request arrays.

use bytes::Bytes;

use crate::proto::error::DecodeError;
use crate::proto::frame::Frame;

/// A client command: the byte strings of one RESP array, in order.
///
/// Element 0 is the verb. A command cannot be modified once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    parts: Vec<Bytes>,
}

impl Command {
    /// Creates a command from its parts, verb first.
    pub fn new(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }

    /// The verb as sent by the client.
    pub fn verb(&self) -> Option<&Bytes> {
        self.parts.first()
    }

    /// Returns the verb lowercased for dispatch.
    pub fn normalized_verb(&self) -> Option<String> {
        let verb = self.verb()?;
        Some(String::from_utf8_lossy(verb).to_ascii_lowercase())
    }

    /// All parts, verb included.
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Returns true if the array carried no elements.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Consumes the command, returning its parts.
    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }
}

impl TryFrom<Frame> for Command {
    type Error = DecodeError;

    /// Accepts an array whose elements are bulk strings, simple strings or
    /// integers. A null element becomes an empty argument.
    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let items = match frame {
            Frame::Array(items) => items,
            _ => return Err(DecodeError::new("expected an array of bulk strings")),
        };

        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let part = match item {
                Frame::BulkString(Some(data)) => data,
                Frame::BulkString(None) | Frame::Null => Bytes::new(),
                Frame::SimpleString(s) => Bytes::from(s),
                Frame::Integer(n) => Bytes::from(n.to_string()),
                Frame::Error(_) | Frame::Array(_) => {
                    return Err(DecodeError::new("invalid command argument type"))
                }
            };
            parts.push(part);
        }

        Ok(Self { parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_bulk_array() {
        let frame = Frame::Array(vec![Frame::bulk("GET"), Frame::bulk("foo")]);
        let cmd = Command::try_from(frame).unwrap();
        assert_eq!(cmd.verb(), Some(&Bytes::from("GET")));
        assert_eq!(cmd.normalized_verb().as_deref(), Some("get"));
        assert_eq!(cmd.parts().len(), 2);
    }

    #[test]
    fn test_command_mixed_element_types() {
        let frame = Frame::Array(vec![
            Frame::SimpleString(b"EXPIRE".to_vec()),
            Frame::bulk("key"),
            Frame::Integer(10),
            Frame::BulkString(None),
        ]);
        let cmd = Command::try_from(frame).unwrap();
        assert_eq!(
            cmd.into_parts(),
            vec![
                Bytes::from("EXPIRE"),
                Bytes::from("key"),
                Bytes::from("10"),
                Bytes::new()
            ]
        );
    }

    #[test]
    fn test_command_rejects_non_array() {
        assert!(Command::try_from(Frame::SimpleString(b"PING".to_vec())).is_err());
    }

    #[test]
    fn test_command_rejects_nested_array() {
        let frame = Frame::Array(vec![Frame::bulk("GET"), Frame::Array(vec![])]);
        assert!(Command::try_from(frame).is_err());
    }

    #[test]
    fn test_empty_command() {
        let cmd = Command::try_from(Frame::Array(vec![])).unwrap();
        assert!(cmd.is_empty());
        assert!(cmd.verb().is_none());
        assert!(cmd.normalized_verb().is_none());
    }
}
