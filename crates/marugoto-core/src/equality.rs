//! # Structural Equality
//!
//! Compares nodes of two graphs (or two nodes of one graph) by content.
//!
//! Two nodes are structurally equal when their kinds and scalar fields match
//! and their references are structurally equal pairwise. Node identities are
//! not compared. The comparison keeps a set of pairs already assumed equal,
//! which makes it terminate on cycles, and an explicit work stack, which
//! keeps deep chains off the call stack.

use crate::formats::{Field, Item};
use crate::graph::Graph;
use crate::{MarugotoError, NodeId};
use std::collections::BTreeSet;

/// Structural equality of `a` in `left` and `b` in `right`.
pub fn structurally_equal(
    left: &Graph,
    a: NodeId,
    right: &Graph,
    b: NodeId,
) -> Result<bool, MarugotoError> {
    let mut seen: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    let mut pending = vec![(a, b)];

    while let Some((x, y)) = pending.pop() {
        if !seen.insert((x, y)) {
            continue;
        }
        let (lx, ry) = (left.node(x)?, right.node(y)?);
        if lx.kind() != ry.kind() {
            return Ok(false);
        }
        for ((_, fx), (_, fy)) in lx.fields().into_iter().zip(ry.fields()) {
            if !fields_match(&fx, &fy, &mut pending) {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

/// Scalars must be equal, references are queued for comparison.
fn fields_match(x: &Field<NodeId>, y: &Field<NodeId>, pending: &mut Vec<(NodeId, NodeId)>) -> bool {
    match (x, y) {
        (Field::Scalar(sx), Field::Scalar(sy)) => sx == sy,
        (Field::Ref(rx), Field::Ref(ry)) => {
            pending.push((*rx, *ry));
            true
        }
        (Field::List(ix), Field::List(iy)) => {
            ix.len() == iy.len()
                && ix.iter().zip(iy).all(|pair| match pair {
                    (Item::Scalar(sx), Item::Scalar(sy)) => sx == sy,
                    (Item::Ref(rx), Item::Ref(ry)) => {
                        pending.push((*rx, *ry));
                        true
                    }
                    _ => false,
                })
        }
        _ => false,
    }
}

/// Whether `a` in `left` and `b` in `right` carry the same identity.
pub fn identity_equal(left: &Graph, a: NodeId, right: &Graph, b: NodeId) -> Result<bool, MarugotoError> {
    Ok(left.uid(a)? == right.uid(b)?)
}

// =============================================================================
// TESTS
// =============================================================================
