//! # Traversal
//!
//! Cycle-safe depth-first walks over a content graph.
//!
//! Walks are iterative (explicit stack), visit every reachable node exactly
//! once and follow links in declared field order, so the visit order is a
//! pure function of the graph. The encoder emits records in this order.

use crate::graph::Graph;
use crate::node::{Link, Strength};
use crate::{MarugotoError, NodeId, NodeKind};
use std::collections::BTreeSet;

/// Which links a walk follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Follow {
    /// Every reference, weak back-references included.
    All,
    /// Ownership links only.
    Strong,
}

impl Follow {
    fn accepts(self, link: &Link) -> bool {
        match self {
            Follow::All => true,
            Follow::Strong => link.strength == Strength::Strong,
        }
    }
}

/// Depth-first preorder from `roots`, following links accepted by `follow`.
pub fn walk(graph: &Graph, roots: &[NodeId], follow: Follow) -> Result<Vec<NodeId>, MarugotoError> {
    walk_where(graph, roots, |link| follow.accepts(link))
}

/// Depth-first preorder from `roots`, following links accepted by `accept`.
pub fn walk_where(
    graph: &Graph,
    roots: &[NodeId],
    accept: impl Fn(&Link) -> bool,
) -> Result<Vec<NodeId>, MarugotoError> {
    let mut visited = BTreeSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let node = graph.node(id)?;
        order.push(id);
        stack.extend(
            node.links()
                .iter()
                .rev()
                .filter(|link| accept(link))
                .map(|link| link.target),
        );
    }

    Ok(order)
}

fn of_kind(
    graph: &Graph,
    order: Vec<NodeId>,
    keep: impl Fn(NodeKind) -> bool,
) -> Result<Vec<NodeId>, MarugotoError> {
    let mut kept = Vec::new();
    for id in order {
        if keep(graph.kind(id)?) {
            kept.push(id);
        }
    }
    Ok(kept)
}

/// Every Task reachable from `game` over ownership links: waypoint tasks
/// plus the guards of its characters' dialogs.
///
/// The walk never enters a waypoint of another game, even when a dialog
/// sends the player there.
pub fn reachable_tasks(graph: &Graph, game: NodeId) -> Result<Vec<NodeId>, MarugotoError> {
    let key = graph.game(game)?.graph;
    let order = walk_where(graph, &[game], |link| {
        Follow::Strong.accepts(link)
            && graph.waypoint(link.target).map_or(true, |w| w.graph == key)
    })?;
    of_kind(graph, order, |kind| kind == NodeKind::Task)
}

/// Waypoints reachable from the start of `game` along destinations.
pub fn reachable_waypoints(graph: &Graph, game: NodeId) -> Result<Vec<NodeId>, MarugotoError> {
    graph.game(game)?;
    let order = walk_where(graph, &[game], |link| {
        matches!(link.field, "start" | "destinations")
    })?;
    of_kind(graph, order, |kind| kind == NodeKind::Waypoint)
}

/// Dialog nodes reachable from the start of `dialog` along follow-ups.
pub fn dialog_nodes(graph: &Graph, dialog: NodeId) -> Result<Vec<NodeId>, MarugotoError> {
    graph.dialog(dialog)?;
    let order = walk_where(graph, &[dialog], |link| {
        matches!(link.field, "start" | "follow_ups")
    })?;
    of_kind(graph, order, NodeKind::is_dialog_node)
}

// =============================================================================
// TESTS
// =============================================================================
