//! # Identity Registry
//!
//! Identity allocation and the pass-scoped mapping between arena handles and
//! stable identities.
//!
//! Allocation happens once, when a node is constructed (`IdAllocator`). A
//! registry (`IdentityRegistry`) lives for exactly one encode or decode pass
//! and is dropped with it, so independent passes share no mutable state.

use crate::{MarugotoError, NodeId, Uid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ALLOCATION
// =============================================================================

/// How new identities are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// UUID v4.
    #[default]
    Random,
    /// Counter-based UUIDs starting at 1. Reproducible across runs.
    Sequential,
}

/// Produces identities for new nodes and container graphs.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    strategy: IdStrategy,
    next: u128,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}

impl IdAllocator {
    #[must_use]
    pub fn new(strategy: IdStrategy) -> Self {
        Self { strategy, next: 1 }
    }

    #[must_use]
    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Allocate a new identity.
    pub fn allocate(&mut self) -> Uid {
        match self.strategy {
            IdStrategy::Random => Uid::random(),
            IdStrategy::Sequential => {
                let uid = Uid::from_u128(self.next);
                self.next = self.next.saturating_add(1);
                uid
            }
        }
    }

    /// Record an identity that entered the graph from outside (decode).
    ///
    /// A sequential allocator moves past it so it is never handed out again.
    pub fn observe(&mut self, uid: Uid) {
        if uid.as_u128() >= self.next {
            self.next = uid.as_u128().saturating_add(1);
        }
    }
}

// =============================================================================
// PASS-SCOPED REGISTRY
// =============================================================================

/// Result of assigning an identity during an encode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// First time this pass meets the node.
    New(Uid),
    /// The node was already assigned earlier in this pass.
    Known(Uid),
}

impl Assignment {
    #[must_use]
    pub fn uid(self) -> Uid {
        match self {
            Assignment::New(uid) | Assignment::Known(uid) => uid,
        }
    }
}

/// Result of resolving an identity during a decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A node is registered under the identity.
    Resolved(NodeId),
    /// Nothing registered (yet).
    Pending,
}

/// Bidirectional map between arena handles and identities for one pass.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_node: BTreeMap<NodeId, Uid>,
    by_uid: BTreeMap<Uid, NodeId>,
}

impl IdentityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `uid` to `node` for this pass.
    ///
    /// The same node always yields the same identity. Two distinct nodes
    /// carrying one identity would encode as a single record, so that is a
    /// consistency error.
    pub fn assign(&mut self, node: NodeId, uid: Uid) -> Result<Assignment, MarugotoError> {
        if let Some(&known) = self.by_node.get(&node) {
            return Ok(Assignment::Known(known));
        }
        if let Some(&other) = self.by_uid.get(&uid) {
            return Err(MarugotoError::consistency(format!(
                "identity {} is carried by both {:?} and {:?}",
                uid, other, node
            )));
        }
        self.by_node.insert(node, uid);
        self.by_uid.insert(uid, node);
        Ok(Assignment::New(uid))
    }

    /// Register a decoded node under its record identity.
    pub fn register(&mut self, uid: Uid, node: NodeId) -> Result<(), MarugotoError> {
        if self.by_uid.contains_key(&uid) {
            return Err(MarugotoError::schema(uid, "duplicate record identity"));
        }
        self.by_uid.insert(uid, node);
        self.by_node.insert(node, uid);
        Ok(())
    }

    /// Look up the node registered under `uid`.
    #[must_use]
    pub fn resolve(&self, uid: &Uid) -> Resolution {
        self.by_uid
            .get(uid)
            .map_or(Resolution::Pending, |&node| Resolution::Resolved(node))
    }

    /// Identity assigned to `node` in this pass, if any.
    #[must_use]
    pub fn identity_of(&self, node: NodeId) -> Option<Uid> {
        self.by_node.get(&node).copied()
    }

    /// Number of distinct identities seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_uid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_uid.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
