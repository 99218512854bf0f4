//! Parsing utilities for Redis Cluster error replies.
//!
//! Cluster nodes use special error replies for redirects:
//! - `MOVED <slot> <host>:<port>` - Permanent redirect
//! - `ASK <slot> <host>:<port>` - Temporary redirect during migration
//! - `CLUSTERDOWN` - Cluster is unavailable

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

/// Converts a node reply into a result, turning error replies into typed errors.
pub fn check_reply(frame: Frame) -> Result<Frame> {
    match frame {
        Frame::Error(message) => Err(parse_redis_error(&message)),
        other => Ok(other),
    }
}

/// Parses a Redis error message and converts cluster redirects to typed errors.
///
/// Anything that is not a recognised cluster reply becomes
/// [`Error::Server`] carrying the message verbatim.
pub fn parse_redis_error(error_msg: &[u8]) -> Error {
    let msg = String::from_utf8_lossy(error_msg);
    let msg = msg.trim();

    if let Some((slot, address)) = msg.strip_prefix("MOVED ").and_then(parse_redirect) {
        return Error::Moved { slot, address };
    }

    if let Some((slot, address)) = msg.strip_prefix("ASK ").and_then(parse_redirect) {
        return Error::Ask { slot, address };
    }

    if msg.starts_with("CLUSTERDOWN") {
        return Error::ClusterDown;
    }

    if msg.starts_with("CROSSSLOT") {
        return Error::CrossSlot;
    }

    Error::Server {
        message: msg.to_string(),
    }
}

/// Parses redirect arguments: "<slot> <host>:<port>"
fn parse_redirect(args: &str) -> Option<(u16, String)> {
    let mut parts = args.split_whitespace();
    let slot: u16 = parts.next()?.parse().ok()?;
    let address = parts.next()?.to_string();
    if parts.next().is_some() {
        return None;
    }
    Some((slot, address))
}
