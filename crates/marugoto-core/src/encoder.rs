//! # Graph Encoder
//!
//! Flattens the part of a graph reachable from some roots into a `Payload`.
//!
//! The walk is a depth-first preorder over every link (weak ones included),
//! so each reachable node is emitted exactly once, in first-visit order, and
//! every node-valued field becomes a `{"ref": id}`. Identical graphs encode
//! to identical payloads.

use crate::formats::{Payload, Record, Reference};
use crate::graph::Graph;
use crate::registry::{Assignment, IdentityRegistry};
use crate::traversal::{Follow, walk};
use crate::{MarugotoError, NodeId};
use std::collections::BTreeMap;

/// Encode everything reachable from `root`. No root yields an empty payload.
pub fn encode(graph: &Graph, root: Option<NodeId>) -> Result<Payload, MarugotoError> {
    match root {
        Some(root) => encode_roots(graph, &[root]),
        None => Ok(Payload::empty()),
    }
}

/// Encode everything reachable from any of `roots`.
pub fn encode_roots(graph: &Graph, roots: &[NodeId]) -> Result<Payload, MarugotoError> {
    if roots.is_empty() {
        return Ok(Payload::empty());
    }

    let order = walk(graph, roots, Follow::All)?;
    let mut registry = IdentityRegistry::new();
    let mut records = Vec::with_capacity(order.len());

    for id in order {
        let node = graph.node(id)?;
        if let Assignment::Known(_) = registry.assign(id, node.uid)? {
            continue;
        }
        records.push((id, node));
    }

    let records = records
        .into_iter()
        .map(|(id, node)| {
            let mut fields = BTreeMap::new();
            for (name, field) in node.fields() {
                let field = field.try_map(|target| {
                    registry
                        .identity_of(target)
                        .map(|uid| Reference::new(uid.to_string()))
                        .ok_or(MarugotoError::NodeNotFound(target))
                })?;
                fields.insert(name.to_string(), field);
            }
            tracing::trace!(node = ?id, kind = %node.kind(), "record emitted");
            Ok(Record {
                id: node.uid.to_string(),
                kind: node.kind().as_str().to_string(),
                fields,
            })
        })
        .collect::<Result<Vec<_>, MarugotoError>>()?;

    let roots = roots
        .iter()
        .map(|&root| graph.uid(root).map(|uid| uid.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        roots = roots.len(),
        records = records.len(),
        identities = registry.len(),
        "graph encoded"
    );

    Ok(Payload {
        version: crate::primitives::FORMAT_VERSION,
        roots,
        records,
    })
}

// =============================================================================
// TESTS
// =============================================================================
