//! # Codec Primitives
//!
//! Fixed constants of the content graph and its wire format.
//! They are compiled into the binary and immutable at runtime.

/// Weight of a waypoint destination when none is given.
///
/// Used for path-cost or branch-probability decisions by gameplay code.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Current payload format version.
///
/// Increment this when making breaking changes to the record schema.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum accepted size of a JSON payload.
///
/// Checked BEFORE parsing so oversized input never gets allocated as records.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024; // 64 MB

/// Maximum number of records accepted by the decoder.
pub const MAX_PAYLOAD_RECORDS: usize = 1_000_000;
