//! RESP (Redis Serialization Protocol) wire layer.
//!
//! ## Modules
//!
//! - [`codec`] - Encoder, decoder and the client command reader
//! - [`command`] - Commands decoded from client arrays
//! - [`error`] - Error types shared by the whole crate
//! - [`frame`] - Frame types representing RESP data structures

pub mod codec;
pub mod command;
/// Error types.
pub mod error;
pub mod frame;
