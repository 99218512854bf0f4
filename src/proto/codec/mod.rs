//! RESP protocol encoder and decoder.
//!
//! # Modules
//!
//! - [`encoder`] - Frame encoding to bytes, including client reply encoding
//! - [`decoder`] - Streaming frame decoder from bytes
//! - [`stream`] - Command reader turning a client socket into [`Command`](crate::proto::command::Command)s

pub mod decoder;
pub mod encoder;
pub mod stream;

pub use decoder::Decoder;
pub use encoder::{encode_reply, Encoder};
pub use stream::CommandReader;
