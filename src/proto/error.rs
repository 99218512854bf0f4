use std::io;

use thiserror::Error;

use crate::proto::frame::Frame;

/// Result type alias for shardgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while proxying commands to a Redis Cluster.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An IO error occurred on a client or node socket.
    #[error("IO error: {source}")]
    Io {
        /// The underlying IO error.
        #[from]
        source: io::Error,
    },

    /// A protocol error occurred.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error.
        message: String,
    },

    /// A cluster node returned an error reply.
    #[error("server error: {message}")]
    Server {
        /// Error message from the node, verbatim.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of invalid argument.
        message: String,
    },

    /// Decoding failed.
    #[error("decode error: {source}")]
    Decode {
        /// Underlying decode error.
        #[from]
        source: DecodeError,
    },

    /// Redis Cluster: key moved to another node (permanent redirect).
    ///
    /// The slot for the requested key has been migrated to a different node.
    /// The slot map should be refreshed and the command retried there.
    #[error("MOVED to slot {slot} at {address}")]
    Moved {
        /// The slot number (0-16383).
        slot: u16,
        /// The address of the node owning this slot (e.g., "127.0.0.1:7001").
        address: String,
    },

    /// Redis Cluster: temporary redirect during migration (ASK redirect).
    ///
    /// The command is retried once on the target node after `ASKING`;
    /// the slot map is not updated.
    #[error("ASK to slot {slot} at {address}")]
    Ask {
        /// The slot number (0-16383).
        slot: u16,
        /// The address of the node temporarily handling this slot.
        address: String,
    },

    /// Redis Cluster is down or unavailable.
    #[error("CLUSTERDOWN cluster is down")]
    ClusterDown,

    /// Multi-key operation with keys in different slots.
    #[error("CROSSSLOT keys in multi-key operation map to different slots")]
    CrossSlot,

    /// The backend session could not reach the cluster.
    #[error("cluster unavailable: {message}")]
    Unavailable {
        /// Why the session failed.
        message: String,
    },

    /// The backend session was closed.
    #[error("backend session closed")]
    Closed,
}

impl Error {
    /// Error for a command called with the wrong number of arguments.
    pub fn wrong_arity(verb: &str) -> Self {
        Error::InvalidArgument {
            message: format!("wrong number of arguments for '{}' command", verb),
        }
    }

    /// Error for malformed command options.
    pub fn syntax() -> Self {
        Error::InvalidArgument {
            message: "syntax error".to_string(),
        }
    }

    /// Renders the message carried by the RESP error reply for this error.
    ///
    /// Node replies pass through verbatim. Errors raised by the proxy itself
    /// get the `ERR` prefix clients expect.
    pub fn reply_message(&self) -> String {
        let message = match self {
            Error::Server { message } => message.clone(),
            Error::Moved { slot, address } => format!("MOVED {} {}", slot, address),
            Error::Ask { slot, address } => format!("ASK {} {}", slot, address),
            Error::ClusterDown => "CLUSTERDOWN The cluster is down".to_string(),
            Error::CrossSlot => {
                "CROSSSLOT Keys in request don't hash to the same slot".to_string()
            }
            Error::InvalidArgument { message } => format!("ERR {}", message),
            Error::Protocol { message } => format!("ERR Protocol error: {}", message),
            Error::Decode { source } => format!("ERR Protocol error: {}", source.message()),
            Error::Io { source } => format!("ERR {}", source),
            Error::Unavailable { message } => format!("ERR cluster unavailable: {}", message),
            Error::Closed => "ERR backend session closed".to_string(),
        };
        // an error frame is a single line
        message.replace(['\r', '\n'], " ")
    }

    /// Converts this error into the RESP error frame sent to the client.
    pub fn to_frame(&self) -> Frame {
        Frame::Error(self.reply_message().into_bytes())
    }
}

/// Error returned when frame decoding fails.
///
/// The byte stream cannot be resynchronized after this error; the owning
/// connection has to be closed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Creates a new decode error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Describes what was malformed.
    pub fn message(&self) -> &str {
        &self.message
    }
}
