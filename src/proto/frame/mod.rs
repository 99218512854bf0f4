//! RESP frame types.
//!
//! This module defines the frame types used in the Redis protocol,
//! including simple strings, errors, integers, bulk strings, and arrays.
//! A [`Frame`] is also the reply value handed from the backend to the
//! client-facing encoder.

/// Frame type definitions.
pub mod types;

pub use types::Frame;
