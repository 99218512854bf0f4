//! Cluster management commands used by the backend session.

use crate::core::command::Cmd;

/// Creates a CLUSTER SLOTS command.
///
/// Returns an array of slot ranges with their master and replica nodes;
/// the backend uses it for topology discovery.
pub fn cluster_slots() -> Cmd {
    Cmd::new("CLUSTER").arg("SLOTS")
}

/// Creates an ASKING command.
///
/// Sent right before retrying a command that received an ASK redirect.
/// The flag only affects the immediately following command.
pub fn asking() -> Cmd {
    Cmd::new("ASKING")
}
