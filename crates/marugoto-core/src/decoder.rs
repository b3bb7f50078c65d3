//! # Graph Decoder
//!
//! Rebuilds a live graph from a `Payload`.
//!
//! ## Two passes
//!
//! 1. Construct: every record becomes a node built from its kind and scalar
//!    fields, registered under its identity right away.
//! 2. Bind: every `{"ref": id}` is resolved against the registry and written
//!    into the node's reference fields.
//!
//! No reference is resolved before every node exists, so record order does
//! not matter and cycles or forward references need no special handling.
//! Decoding happens into a fresh `Graph` that is only handed out once every
//! reference resolved and the membership rules hold; a failure never leaves
//! a partial graph behind.

use crate::formats::{Payload, Record};
use crate::graph::Graph;
use crate::node::{Node, NodeData};
use crate::registry::{IdStrategy, IdentityRegistry, Resolution};
use crate::schema::{Bindings, RecordReader};
use crate::{MarugotoError, NodeId, NodeKind, Uid};
use std::collections::BTreeMap;

/// A decoded graph and the handles of the payload's roots.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub graph: Graph,
    /// First root of the payload.
    pub root: NodeId,
    /// Every root, in payload order.
    pub roots: Vec<NodeId>,
}

/// Decode `payload` with random identities for nodes created afterwards.
pub fn decode(payload: &Payload) -> Result<Option<Decoded>, MarugotoError> {
    decode_with(payload, IdStrategy::default())
}

/// Decode `payload`; nodes created in the decoded graph later use `strategy`.
pub fn decode_with(payload: &Payload, strategy: IdStrategy) -> Result<Option<Decoded>, MarugotoError> {
    decode_pass(payload, strategy).inspect_err(|e| {
        tracing::warn!(records = payload.records.len(), error = %e, "payload rejected");
    })
}

fn decode_pass(payload: &Payload, strategy: IdStrategy) -> Result<Option<Decoded>, MarugotoError> {
    payload.validate()?;
    if payload.is_empty() {
        return Ok(None);
    }
    if payload.roots.is_empty() {
        return Err(MarugotoError::schema("<payload>", "records present but no root"));
    }

    let mut graph = Graph::with_strategy(strategy);
    let mut registry = IdentityRegistry::new();

    // Pass 1: construct
    let mut handles = Vec::with_capacity(payload.records.len());
    for record in &payload.records {
        let uid = parse_uid(record)?;
        let kind: NodeKind = record.kind.parse()?;
        let reader = RecordReader::new(record, kind)?;
        let data = NodeData::from_record(kind, &reader)?;
        if let Some(key) = data.graph_key() {
            graph.observe(key.0);
        }
        let id = graph.insert(Node::new(uid, data));
        registry.register(uid, id)?;
        handles.push(id);
    }

    // Pass 2: bind
    let kinds: BTreeMap<NodeId, NodeKind> = graph.nodes().map(|(id, node)| (id, node.kind())).collect();
    for (record, &id) in payload.records.iter().zip(&handles) {
        let mut fields = BTreeMap::new();
        for (name, field) in &record.fields {
            let field = field.clone().try_map(|reference| {
                lookup(&registry, &reference.target).ok_or_else(|| MarugotoError::UnresolvedReference {
                    record: record.id.clone(),
                    field: name.clone(),
                    target: reference.target.clone(),
                })
            })?;
            fields.insert(name.clone(), field);
        }
        let bindings = Bindings::new(&record.id, fields, &kinds);
        graph.node_mut(id)?.data.bind(&bindings)?;
    }

    let roots = payload
        .roots
        .iter()
        .map(|root| {
            lookup(&registry, root).ok_or_else(|| MarugotoError::UnresolvedReference {
                record: "<payload>".to_string(),
                field: "roots".to_string(),
                target: root.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    graph.link_task_owners()?;
    graph.check_consistency()?;

    tracing::debug!(
        records = payload.records.len(),
        roots = roots.len(),
        "payload decoded"
    );

    let root = *roots
        .first()
        .ok_or_else(|| MarugotoError::schema("<payload>", "records present but no root"))?;
    Ok(Some(Decoded { graph, root, roots }))
}

fn parse_uid(record: &Record) -> Result<Uid, MarugotoError> {
    record
        .id
        .parse()
        .map_err(|_| MarugotoError::schema(&record.id, "record id is not a valid identity"))
}

fn lookup(registry: &IdentityRegistry, target: &str) -> Option<NodeId> {
    let uid = target.parse::<Uid>().ok()?;
    match registry.resolve(&uid) {
        Resolution::Resolved(id) => Some(id),
        Resolution::Pending => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
