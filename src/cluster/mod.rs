//! Redis Cluster backend.
//!
//! Slot-based routing, topology discovery through `CLUSTER SLOTS` and
//! redirect handling (MOVED/ASK) for one proxied connection.
//!
//! - **Slot-based routing**: keys map to one of 16384 slots via CRC16
//! - **Hash tags**: `{...}` pins related keys to one slot
//! - **Redirects**: MOVED updates the slot map, ASK retries once with ASKING
//! - **Connections**: one multiplexed connection per node and session

mod client;
pub mod commands;
mod errors;
mod pool;
mod slot;
mod topology;

pub use client::{ClusterClient, ClusterOptions, NodeHandle};
pub use errors::{check_reply, parse_redis_error};
pub use slot::{key_slot, SLOT_COUNT};
pub use topology::{ClusterTopology, NodeId, NodeInfo, SlotRange};
