//! # Core Type Definitions
//!
//! This module contains the identifiers and the error type shared by every
//! other module of the content graph:
//! - Identities (`Uid`, `GraphKey`) that survive encode/decode round trips
//! - Arena handles (`NodeId`) that are only meaningful inside one `Graph`
//! - The closed set of node kinds (`NodeKind`)
//! - Error types (`MarugotoError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`.
//! Iteration order over a graph therefore never depends on hashing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTITIES
// =============================================================================

/// Stable, opaque identity of a node.
///
/// Assigned once when the node is constructed and carried unchanged through
/// every encode/decode pass. On the wire it is the 32 character lowercase hex
/// form of the underlying UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(Uuid);

impl Uid {
    /// A fresh random (v4) identity.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identity built from a counter value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Raw 128-bit value.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for Uid {
    type Err = uuid::Error;

    /// Accepts both the simple (hex) and the hyphenated form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Membership token of a container graph.
///
/// A Game's waypoints share the game's key, a Dialog's nodes share the
/// dialog's key. Edges may only be drawn between members of the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphKey(pub Uid);

impl fmt::Display for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Arena handle of a node inside one in-memory `Graph`.
///
/// Never serialized; a decoded graph hands out fresh handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

// =============================================================================
// NODE KINDS
// =============================================================================

/// The closed set of node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Waypoint,
    Task,
    Mail,
    Speech,
    Dialog,
    Game,
    NonPlayableCharacter,
    Player,
    GameInstance,
    PlayerState,
}

impl NodeKind {
    /// Every kind, in declaration order.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Waypoint,
        NodeKind::Task,
        NodeKind::Mail,
        NodeKind::Speech,
        NodeKind::Dialog,
        NodeKind::Game,
        NodeKind::NonPlayableCharacter,
        NodeKind::Player,
        NodeKind::GameInstance,
        NodeKind::PlayerState,
    ];

    /// Wire tag of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::Waypoint => "waypoint",
            NodeKind::Task => "task",
            NodeKind::Mail => "mail",
            NodeKind::Speech => "speech",
            NodeKind::Dialog => "dialog",
            NodeKind::Game => "game",
            NodeKind::NonPlayableCharacter => "non_playable_character",
            NodeKind::Player => "player",
            NodeKind::GameInstance => "game_instance",
            NodeKind::PlayerState => "player_state",
        }
    }

    /// Mail, Speech and any other message kind living in a Dialog graph.
    #[must_use]
    pub const fn is_dialog_node(self) -> bool {
        matches!(self, NodeKind::Mail | NodeKind::Speech)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = MarugotoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MarugotoError::UnknownNodeKind(s.to_string()))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building, encoding, decoding or storing graphs.
///
/// - No silent failures, nothing is retried
/// - Use `Result<T, MarugotoError>` for fallible operations
/// - Mutations validate before touching the graph, so a failed call leaves it unchanged
#[derive(Debug, Error)]
pub enum MarugotoError {
    /// A reference names an identity that has no record in the payload.
    #[error("Unresolved reference in record {record}, field {field}: {target}")]
    UnresolvedReference {
        record: String,
        field: String,
        target: String,
    },

    /// A record carries a kind tag this version does not know.
    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(String),

    /// A record's fields do not match the shape its kind expects.
    #[error("Schema violation in record {record}: {reason}")]
    SchemaViolation { record: String, reason: String },

    /// An edit would connect nodes of incompatible graphs.
    #[error("Graph consistency violation: {0}")]
    GraphConsistency(String),

    /// A play-through window whose start is not before its end.
    #[error("Invalid time window: start must be before end")]
    InvalidTimeWindow,

    /// The requested node does not exist in the graph.
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// A stored document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored document already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl MarugotoError {
    /// Shorthand for a schema violation on a given record.
    pub fn schema(record: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            record: record.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a consistency violation.
    pub fn consistency(reason: impl Into<String>) -> Self {
        Self::GraphConsistency(reason.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================
