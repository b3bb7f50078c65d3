//! # Formats
//!
//! Wire formats of the content graph. File and database I/O live elsewhere.

pub mod payload;

#[cfg(feature = "crypto-hash")]
pub use payload::payload_digest;
pub use payload::{Field, Item, Payload, Record, Reference, Scalar};
