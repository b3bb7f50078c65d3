//! # Record Schema
//!
//! Reading wire records back into node data.
//!
//! Decoding a record happens in two steps that mirror the decoder's two
//! passes:
//! 1. `NodeData::from_record` builds the node from its kind and scalar
//!    fields, with every reference left empty.
//! 2. `NodeData::bind` fills the references once every record of the
//!    payload has a node, checking the kind of each target.

use crate::formats::{Field, Item, Record, Reference, Scalar};
use crate::node::{
    Destination, Dialog, DialogLinks, FollowUp, Game, GameInstance, Mail, NodeData,
    NonPlayableCharacter, Player, PlayerState, Speech, Task, Waypoint, declared_fields,
};
use crate::{GraphKey, MarugotoError, NodeId, NodeKind, Uid};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const DIALOG_NODES: &[NodeKind] = &[NodeKind::Mail, NodeKind::Speech];

fn describe(kinds: &[NodeKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

// =============================================================================
// SCALAR READER (pass 1)
// =============================================================================

/// Typed access to the scalar fields of one wire record.
#[derive(Debug)]
pub struct RecordReader<'a> {
    record: &'a Record,
}

impl<'a> RecordReader<'a> {
    /// Wrap `record`, rejecting undeclared and missing fields.
    pub fn new(record: &'a Record, kind: NodeKind) -> Result<Self, MarugotoError> {
        let declared = declared_fields(kind);
        if let Some(extra) = record
            .fields
            .keys()
            .find(|name| !declared.contains(&name.as_str()))
        {
            return Err(MarugotoError::schema(
                &record.id,
                format!("{} has no field {}", kind, extra),
            ));
        }
        if let Some(missing) = declared
            .iter()
            .find(|name| !record.fields.contains_key(**name))
        {
            return Err(MarugotoError::schema(
                &record.id,
                format!("missing field {}", missing),
            ));
        }
        Ok(Self { record })
    }

    fn field(&self, name: &str) -> Result<&'a Field<Reference>, MarugotoError> {
        self.record
            .fields
            .get(name)
            .ok_or_else(|| MarugotoError::schema(&self.record.id, format!("missing field {}", name)))
    }

    fn violation(&self, name: &str, expected: &str) -> MarugotoError {
        MarugotoError::schema(&self.record.id, format!("field {} must be {}", name, expected))
    }

    pub fn text(&self, name: &str) -> Result<String, MarugotoError> {
        match self.field(name)? {
            Field::Scalar(Scalar::Text(value)) => Ok(value.clone()),
            _ => Err(self.violation(name, "text")),
        }
    }

    pub fn optional_text(&self, name: &str) -> Result<Option<String>, MarugotoError> {
        match self.field(name)? {
            Field::Scalar(Scalar::Text(value)) => Ok(Some(value.clone())),
            Field::Scalar(Scalar::Null) => Ok(None),
            _ => Err(self.violation(name, "text or null")),
        }
    }

    /// A membership key, written as an identity string.
    pub fn key(&self, name: &str) -> Result<GraphKey, MarugotoError> {
        self.text(name)?
            .parse::<Uid>()
            .map(GraphKey)
            .map_err(|_| self.violation(name, "a graph identity"))
    }

    /// An RFC 3339 timestamp, normalized to UTC.
    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, MarugotoError> {
        DateTime::parse_from_rfc3339(&self.text(name)?)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|_| self.violation(name, "an RFC 3339 timestamp"))
    }
}

// =============================================================================
// REFERENCE BINDINGS (pass 2)
// =============================================================================

/// The resolved fields of one record plus the kind of every decoded node.
#[derive(Debug)]
pub struct Bindings<'a> {
    record: &'a str,
    fields: BTreeMap<String, Field<NodeId>>,
    kinds: &'a BTreeMap<NodeId, NodeKind>,
}

impl<'a> Bindings<'a> {
    pub fn new(
        record: &'a str,
        fields: BTreeMap<String, Field<NodeId>>,
        kinds: &'a BTreeMap<NodeId, NodeKind>,
    ) -> Self {
        Self {
            record,
            fields,
            kinds,
        }
    }

    fn field(&self, name: &str) -> Result<&Field<NodeId>, MarugotoError> {
        self.fields
            .get(name)
            .ok_or_else(|| MarugotoError::schema(self.record, format!("missing field {}", name)))
    }

    fn violation(&self, name: &str, expected: &str) -> MarugotoError {
        MarugotoError::schema(self.record, format!("field {} must be {}", name, expected))
    }

    fn target(&self, name: &str, id: NodeId, kinds: &[NodeKind]) -> Result<NodeId, MarugotoError> {
        match self.kinds.get(&id) {
            Some(kind) if kinds.contains(kind) => Ok(id),
            Some(kind) => Err(MarugotoError::schema(
                self.record,
                format!(
                    "field {} must reference {}, found {}",
                    name,
                    describe(kinds),
                    kind
                ),
            )),
            None => Err(MarugotoError::NodeNotFound(id)),
        }
    }

    /// A single reference or `null`.
    pub fn optional(&self, name: &str, kinds: &[NodeKind]) -> Result<Option<NodeId>, MarugotoError> {
        match self.field(name)? {
            Field::Ref(id) => self.target(name, *id, kinds).map(Some),
            Field::Scalar(Scalar::Null) => Ok(None),
            _ => Err(self.violation(name, "a reference or null")),
        }
    }

    /// A list of references.
    pub fn list(&self, name: &str, kinds: &[NodeKind]) -> Result<Vec<NodeId>, MarugotoError> {
        self.optional_list(name, kinds)?
            .into_iter()
            .map(|item| item.ok_or_else(|| self.violation(name, "a list of references")))
            .collect()
    }

    /// A list whose items are references or `null`.
    pub fn optional_list(
        &self,
        name: &str,
        kinds: &[NodeKind],
    ) -> Result<Vec<Option<NodeId>>, MarugotoError> {
        let Field::List(items) = self.field(name)? else {
            return Err(self.violation(name, "a list"));
        };
        items
            .iter()
            .map(|item| match item {
                Item::Ref(id) => self.target(name, *id, kinds).map(Some),
                Item::Scalar(Scalar::Null) => Ok(None),
                Item::Scalar(_) => Err(self.violation(name, "a list of references")),
            })
            .collect()
    }

    /// A list of finite numbers.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>, MarugotoError> {
        let Field::List(items) = self.field(name)? else {
            return Err(self.violation(name, "a list"));
        };
        items
            .iter()
            .map(|item| match item {
                Item::Scalar(Scalar::Number(n)) if n.is_finite() => Ok(*n),
                Item::Scalar(Scalar::Integer(n)) => Ok(*n as f64),
                _ => Err(self.violation(name, "a list of finite numbers")),
            })
            .collect()
    }

    fn parallel<T>(&self, name: &str, of: &str, values: Vec<T>, len: usize) -> Result<Vec<T>, MarugotoError> {
        if values.len() == len {
            Ok(values)
        } else {
            Err(MarugotoError::schema(
                self.record,
                format!("field {} must have one entry per {}", name, of),
            ))
        }
    }

    fn dialog_links(&self) -> Result<DialogLinks, MarugotoError> {
        let targets = self.list("follow_ups", DIALOG_NODES)?;
        let guards = self.optional_list("guards", &[NodeKind::Task])?;
        let guards = self.parallel("guards", "follow-up", guards, targets.len())?;
        Ok(DialogLinks {
            follow_ups: targets
                .into_iter()
                .zip(guards)
                .map(|(target, guard)| FollowUp { target, guard })
                .collect(),
            destination: self.optional("destination", &[NodeKind::Waypoint])?,
            waypoints: self.list("waypoints", &[NodeKind::Waypoint])?,
        })
    }
}

// =============================================================================
// NODE CONSTRUCTION
// =============================================================================

impl NodeData {
    /// Build a node of `kind` from scalar fields only. References stay empty.
    pub fn from_record(kind: NodeKind, reader: &RecordReader<'_>) -> Result<Self, MarugotoError> {
        Ok(match kind {
            NodeKind::Waypoint => NodeData::Waypoint(Waypoint {
                graph: reader.key("graph")?,
                name: reader.text("name")?,
                destinations: Vec::new(),
                tasks: Vec::new(),
            }),
            NodeKind::Task => NodeData::Task(Task {
                title: reader.text("title")?,
                description: reader.text("description")?,
                solution: reader.optional_text("solution")?,
                owner: None,
            }),
            NodeKind::Mail => NodeData::Mail(Mail {
                dialog: reader.key("dialog")?,
                subject: reader.text("subject")?,
                body: reader.text("body")?,
                links: DialogLinks::default(),
            }),
            NodeKind::Speech => NodeData::Speech(Speech {
                dialog: reader.key("dialog")?,
                content: reader.text("content")?,
                links: DialogLinks::default(),
            }),
            NodeKind::Dialog => NodeData::Dialog(Dialog {
                graph: reader.key("graph")?,
                start: None,
            }),
            NodeKind::Game => NodeData::Game(Game {
                graph: reader.key("graph")?,
                title: reader.text("title")?,
                start: None,
                characters: Vec::new(),
            }),
            NodeKind::NonPlayableCharacter => NodeData::NonPlayableCharacter(NonPlayableCharacter {
                name: reader.text("name")?,
                role: reader.text("role")?,
                dialog: None,
            }),
            NodeKind::Player => NodeData::Player(Player {
                email: reader.text("email")?,
                display_name: reader.text("display_name")?,
            }),
            NodeKind::GameInstance => NodeData::GameInstance(GameInstance {
                name: reader.text("name")?,
                start: reader.timestamp("start")?,
                end: reader.timestamp("end")?,
                game: None,
                host: None,
                player_states: Vec::new(),
            }),
            NodeKind::PlayerState => NodeData::PlayerState(PlayerState {
                first_name: reader.text("first_name")?,
                role: reader.text("role")?,
                player: None,
                current_waypoint: None,
                completed_tasks: Vec::new(),
            }),
        })
    }

    /// Fill every reference of this node from resolved fields.
    pub fn bind(&mut self, bindings: &Bindings<'_>) -> Result<(), MarugotoError> {
        match self {
            NodeData::Waypoint(w) => {
                let targets = bindings.list("destinations", &[NodeKind::Waypoint])?;
                let weights = bindings.numbers("weights")?;
                let weights = bindings.parallel("weights", "destination", weights, targets.len())?;
                w.destinations = targets
                    .into_iter()
                    .zip(weights)
                    .map(|(target, weight)| Destination { target, weight })
                    .collect();
                w.tasks = bindings.list("tasks", &[NodeKind::Task])?;
            }
            NodeData::Task(_) | NodeData::Player(_) => {}
            NodeData::Mail(m) => m.links = bindings.dialog_links()?,
            NodeData::Speech(s) => s.links = bindings.dialog_links()?,
            NodeData::Dialog(d) => d.start = bindings.optional("start", DIALOG_NODES)?,
            NodeData::Game(g) => {
                g.start = bindings.optional("start", &[NodeKind::Waypoint])?;
                g.characters = bindings.list("characters", &[NodeKind::NonPlayableCharacter])?;
            }
            NodeData::NonPlayableCharacter(n) => {
                n.dialog = bindings.optional("dialog", &[NodeKind::Dialog])?;
            }
            NodeData::GameInstance(i) => {
                i.game = bindings.optional("game", &[NodeKind::Game])?;
                i.host = bindings.optional("host", &[NodeKind::Player])?;
                i.player_states = bindings.list("player_states", &[NodeKind::PlayerState])?;
            }
            NodeData::PlayerState(s) => {
                s.player = bindings.optional("player", &[NodeKind::Player])?;
                s.current_waypoint = bindings.optional("current_waypoint", &[NodeKind::Waypoint])?;
                s.completed_tasks = bindings.list("completed_tasks", &[NodeKind::Task])?;
            }
        }
        Ok(())
    }

    /// Membership key carried by this node, if it belongs to or is a container.
    #[must_use]
    pub fn graph_key(&self) -> Option<GraphKey> {
        match self {
            NodeData::Waypoint(w) => Some(w.graph),
            NodeData::Dialog(d) => Some(d.graph),
            NodeData::Game(g) => Some(g.graph),
            NodeData::Mail(m) => Some(m.dialog),
            NodeData::Speech(s) => Some(s.dialog),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
