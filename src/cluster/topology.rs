//! Cluster topology data structures and the `CLUSTER SLOTS` parser.

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

/// Unique identifier for a Redis node in the cluster.
///
/// Node IDs are 40-character hex strings assigned by Redis; older servers
/// that omit them get the node address instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new NodeId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the node ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A master node serving one or more slot ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Node ID
    pub id: NodeId,
    /// Network address (host:port)
    pub address: String,
}

/// A range of hash slots assigned to a master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRange {
    /// Start of the slot range (inclusive)
    pub start: u16,
    /// End of the slot range (inclusive)
    pub end: u16,
    /// Master node serving this slot range
    pub master: NodeInfo,
}

impl SlotRange {
    /// Returns true if the given slot is within this range.
    pub fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }
}

/// Slot ownership as last reported by the cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterTopology {
    /// Slot ranges with their master nodes, ordered by first slot
    pub slot_ranges: Vec<SlotRange>,
}

impl ClusterTopology {
    /// Creates a new empty cluster topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true until a topology has been loaded.
    pub fn is_empty(&self) -> bool {
        self.slot_ranges.is_empty()
    }

    /// Finds the master node responsible for a given slot.
    pub fn get_master_for_slot(&self, slot: u16) -> Option<&NodeInfo> {
        self.slot_ranges
            .iter()
            .find(|range| range.contains(slot))
            .map(|range| &range.master)
    }

    /// Lists every master once, in slot order.
    ///
    /// The order is stable for a given topology, which keeps merged fan-out
    /// results reproducible.
    pub fn masters(&self) -> Vec<NodeInfo> {
        let mut masters: Vec<NodeInfo> = Vec::new();
        for range in &self.slot_ranges {
            if !masters.iter().any(|m| m.address == range.master.address) {
                masters.push(range.master.clone());
            }
        }
        masters
    }

    /// Points a single slot at a new master after a `MOVED` reply.
    pub fn update_slot(&mut self, slot: u16, address: &str) {
        let Some(index) = self.slot_ranges.iter().position(|r| r.contains(slot)) else {
            self.slot_ranges.push(SlotRange {
                start: slot,
                end: slot,
                master: node_from_address(address),
            });
            self.slot_ranges.sort_by_key(|r| r.start);
            return;
        };

        if self.slot_ranges[index].master.address == address {
            return;
        }

        let range = self.slot_ranges.remove(index);
        let mut pieces = Vec::with_capacity(3);
        if range.start < slot {
            pieces.push(SlotRange {
                start: range.start,
                end: slot - 1,
                master: range.master.clone(),
            });
        }
        pieces.push(SlotRange {
            start: slot,
            end: slot,
            master: node_from_address(address),
        });
        if slot < range.end {
            pieces.push(SlotRange {
                start: slot + 1,
                end: range.end,
                master: range.master,
            });
        }
        for (offset, piece) in pieces.into_iter().enumerate() {
            self.slot_ranges.insert(index + offset, piece);
        }
    }

    /// Parses cluster topology from a `CLUSTER SLOTS` response.
    ///
    /// `default_host` replaces an empty or `?` node address, which servers
    /// send when the node does not know its own announced IP.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not an array or a master entry is
    /// malformed.
    pub fn from_cluster_slots(frame: Frame, default_host: &str) -> Result<Self> {
        let ranges = match frame {
            Frame::Array(arr) => arr,
            _ => {
                return Err(Error::Protocol {
                    message: "CLUSTER SLOTS response must be an array".to_string(),
                })
            }
        };

        let mut topology = Self::new();
        for range_frame in ranges {
            let range_arr = match range_frame {
                Frame::Array(arr) => arr,
                _ => continue,
            };

            if range_arr.len() < 3 {
                continue;
            }

            let (start, end) = match (&range_arr[0], &range_arr[1]) {
                (Frame::Integer(start), Frame::Integer(end)) => (*start as u16, *end as u16),
                _ => continue,
            };

            let master = Self::parse_node_from_array(&range_arr[2], default_host)?;
            topology.slot_ranges.push(SlotRange { start, end, master });
        }

        topology.slot_ranges.sort_by_key(|r| r.start);
        Ok(topology)
    }

    /// Helper function to parse a node from a Frame array.
    fn parse_node_from_array(frame: &Frame, default_host: &str) -> Result<NodeInfo> {
        let node_arr = match frame {
            Frame::Array(arr) if arr.len() >= 2 => arr,
            _ => {
                return Err(Error::Protocol {
                    message: "Node info must be an array with host and port".to_string(),
                })
            }
        };

        let ip = match node_arr[0].string_payload() {
            Some(data) => String::from_utf8_lossy(&data).into_owned(),
            None => {
                return Err(Error::Protocol {
                    message: "Node IP must be a string".to_string(),
                })
            }
        };
        let ip = if ip.is_empty() || ip == "?" {
            default_host.to_string()
        } else {
            ip
        };

        let port = match &node_arr[1] {
            Frame::Integer(n) => *n,
            _ => {
                return Err(Error::Protocol {
                    message: "Node port must be an integer".to_string(),
                })
            }
        };

        let address = format!("{}:{}", ip, port);
        let id = match node_arr.get(2).and_then(Frame::string_payload) {
            Some(data) => NodeId::new(String::from_utf8_lossy(&data).into_owned()),
            None => NodeId::new(address.clone()),
        };

        Ok(NodeInfo { id, address })
    }
}

fn node_from_address(address: &str) -> NodeInfo {
    NodeInfo {
        id: NodeId::new(address),
        address: address.to_string(),
    }
}
