//! # marugoto-core
//!
//! The content graph engine for Marugoto - THE MODEL.
//!
//! Marugoto games are interactive narratives: a Game is a graph of
//! Waypoints holding Tasks, characters speak through Dialog graphs of Mail
//! and Speech nodes, and a GameInstance is one time-bounded play-through
//! with its own players and progression.
//!
//! These graphs are cyclic and share sub-nodes, so this crate stores them
//! in an arena (`Graph`) and serializes them with an identity-preserving,
//! cycle-safe codec:
//! - `encode` flattens whatever is reachable from some roots into a
//!   `Payload` of flat records with `{"ref": id}` edges
//! - `decode` rebuilds a fresh `Graph` from a payload in two passes
//!
//! ## Architectural Constraints
//!
//! - Synchronous, NO async, NO network dependencies
//! - Deterministic: `BTreeMap` only, identical graphs encode to identical bytes
//! - Stores (`ContentStore`) only ever see payloads, never a live graph

// =============================================================================
// MODULES
// =============================================================================

pub mod decoder;
pub mod encoder;
pub mod equality;
pub mod formats;
pub mod graph;
mod instance;
pub mod node;
pub mod primitives;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod traversal;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{GraphKey, MarugotoError, NodeId, NodeKind, Uid};

// =============================================================================
// RE-EXPORTS: Graph Model
// =============================================================================

pub use graph::Graph;
pub use node::{
    Destination, Dialog, DialogLinks, FollowUp, Game, GameInstance, Link, Mail, Node, NodeData,
    NonPlayableCharacter, Player, PlayerState, Speech, Strength, Task, Waypoint,
};
pub use registry::{IdAllocator, IdStrategy, IdentityRegistry};

// =============================================================================
// RE-EXPORTS: Codec
// =============================================================================

pub use decoder::{Decoded, decode, decode_with};
pub use encoder::{encode, encode_roots};
pub use equality::{identity_equal, structurally_equal};
#[cfg(feature = "crypto-hash")]
pub use formats::payload_digest;
pub use formats::{Field, Item, Payload, Record, Reference, Scalar};
pub use traversal::{Follow, dialog_nodes, reachable_tasks, reachable_waypoints, walk};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{ContentStore, InstanceSummary, MemoryStore, RedbStore};
