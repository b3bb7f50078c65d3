//! # Graph Node Model
//!
//! The closed set of content nodes and their uniform field description.
//!
//! Every variant describes itself as an ordered list of `(name, Field)`
//! pairs. The encoder, decoder, equality and traversal code only ever look
//! at that description, so none of them special-case a node type.
//!
//! ## Declared field order
//!
//! | Kind | Fields (in order) |
//! |---|---|
//! | waypoint | graph, name, destinations, weights, tasks |
//! | task | title, description, solution |
//! | mail | dialog, subject, body, follow_ups, guards, destination, waypoints |
//! | speech | dialog, content, follow_ups, guards, destination, waypoints |
//! | dialog | graph, start |
//! | game | graph, title, start, characters |
//! | non_playable_character | name, role, dialog |
//! | player | email, display_name |
//! | game_instance | name, start, end, game, host, player_states |
//! | player_state | first_name, role, player, current_waypoint, completed_tasks |
//!
//! References are followed in this order during traversal, which makes the
//! encoder output deterministic. `weights` runs parallel to `destinations`,
//! `guards` parallel to `follow_ups`.

use crate::formats::{Field, Item, Scalar};
use crate::{GraphKey, NodeId, NodeKind, Uid};
use chrono::{DateTime, SecondsFormat, Utc};

// =============================================================================
// EDGES
// =============================================================================

/// An outgoing waypoint edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destination {
    pub target: NodeId,
    /// Path cost or branch probability, 1.0 unless given.
    pub weight: f64,
}

/// A dialog edge, reachable only once `guard` (if any) is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUp {
    pub target: NodeId,
    pub guard: Option<NodeId>,
}

/// Whether a link implies ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    /// Relation lookup only. Never followed for deletion or lifetime accounting.
    Weak,
}

/// One outgoing reference of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub field: &'static str,
    pub target: NodeId,
    pub strength: Strength,
}

// =============================================================================
// VARIANTS
// =============================================================================

/// A location in a Game's graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub graph: GraphKey,
    pub name: String,
    pub destinations: Vec<Destination>,
    pub tasks: Vec<NodeId>,
}

/// A task; completing it gates progression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub title: String,
    pub description: String,
    pub solution: Option<String>,
    pub(crate) owner: Option<NodeId>,
}

impl Task {
    /// The waypoint holding this task, if attached.
    #[must_use]
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }
}

/// Edges shared by every dialog node kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogLinks {
    pub follow_ups: Vec<FollowUp>,
    /// Waypoint the player is placed at when this node concludes.
    pub destination: Option<NodeId>,
    /// Waypoints offering this dialog. Non-owning back-references.
    pub waypoints: Vec<NodeId>,
}

/// A mail message in a Dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub dialog: GraphKey,
    pub subject: String,
    pub body: String,
    pub links: DialogLinks,
}

/// A spoken line in a Dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speech {
    pub dialog: GraphKey,
    pub content: String,
    pub links: DialogLinks,
}

/// Container of dialog nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub graph: GraphKey,
    pub start: Option<NodeId>,
}

/// Container of waypoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub graph: GraphKey,
    pub title: String,
    pub start: Option<NodeId>,
    pub characters: Vec<NodeId>,
}

/// A scripted character owning one Dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonPlayableCharacter {
    pub name: String,
    pub role: String,
    pub dialog: Option<NodeId>,
}

/// A real user, independent of any game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub email: String,
    pub display_name: String,
}

/// One time-bounded play-through of a Game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInstance {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub game: Option<NodeId>,
    pub host: Option<NodeId>,
    pub player_states: Vec<NodeId>,
}

/// A player's session attributes and progression inside one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub first_name: String,
    pub role: String,
    pub player: Option<NodeId>,
    pub current_waypoint: Option<NodeId>,
    pub completed_tasks: Vec<NodeId>,
}

/// Variant payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Waypoint(Waypoint),
    Task(Task),
    Mail(Mail),
    Speech(Speech),
    Dialog(Dialog),
    Game(Game),
    NonPlayableCharacter(NonPlayableCharacter),
    Player(Player),
    GameInstance(GameInstance),
    PlayerState(PlayerState),
}

/// A node: its stable identity plus its variant data.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub uid: Uid,
    pub data: NodeData,
}

// =============================================================================
// FIELD DESCRIPTION
// =============================================================================

/// Declared field names of a kind, in order.
#[must_use]
pub fn declared_fields(kind: NodeKind) -> &'static [&'static str] {
    match kind {
        NodeKind::Waypoint => &["graph", "name", "destinations", "weights", "tasks"],
        NodeKind::Task => &["title", "description", "solution"],
        NodeKind::Mail => &[
            "dialog",
            "subject",
            "body",
            "follow_ups",
            "guards",
            "destination",
            "waypoints",
        ],
        NodeKind::Speech => &[
            "dialog",
            "content",
            "follow_ups",
            "guards",
            "destination",
            "waypoints",
        ],
        NodeKind::Dialog => &["graph", "start"],
        NodeKind::Game => &["graph", "title", "start", "characters"],
        NodeKind::NonPlayableCharacter => &["name", "role", "dialog"],
        NodeKind::Player => &["email", "display_name"],
        NodeKind::GameInstance => &["name", "start", "end", "game", "host", "player_states"],
        NodeKind::PlayerState => &[
            "first_name",
            "role",
            "player",
            "current_waypoint",
            "completed_tasks",
        ],
    }
}

/// Strength of the links held by a field.
#[must_use]
pub fn field_strength(kind: NodeKind, field: &str) -> Strength {
    if kind.is_dialog_node() && field == "waypoints" {
        Strength::Weak
    } else {
        Strength::Strong
    }
}

/// Wire form of a timestamp: RFC 3339, UTC, with as many fractional digits as needed.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn text(value: &str) -> Field<NodeId> {
    Field::Scalar(Scalar::text(value))
}

fn key(key: GraphKey) -> Field<NodeId> {
    Field::Scalar(Scalar::Text(key.to_string()))
}

fn optional_ref(target: Option<NodeId>) -> Field<NodeId> {
    target.map_or(Field::Scalar(Scalar::Null), Field::Ref)
}

fn refs(targets: impl IntoIterator<Item = NodeId>) -> Field<NodeId> {
    Field::List(targets.into_iter().map(Item::Ref).collect())
}

fn dialog_link_fields(links: &DialogLinks) -> [(&'static str, Field<NodeId>); 4] {
    [
        ("follow_ups", refs(links.follow_ups.iter().map(|f| f.target))),
        (
            "guards",
            Field::List(
                links
                    .follow_ups
                    .iter()
                    .map(|f| f.guard.map_or(Item::Scalar(Scalar::Null), Item::Ref))
                    .collect(),
            ),
        ),
        ("destination", optional_ref(links.destination)),
        ("waypoints", refs(links.waypoints.iter().copied())),
    ]
}

impl NodeData {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Waypoint(_) => NodeKind::Waypoint,
            NodeData::Task(_) => NodeKind::Task,
            NodeData::Mail(_) => NodeKind::Mail,
            NodeData::Speech(_) => NodeKind::Speech,
            NodeData::Dialog(_) => NodeKind::Dialog,
            NodeData::Game(_) => NodeKind::Game,
            NodeData::NonPlayableCharacter(_) => NodeKind::NonPlayableCharacter,
            NodeData::Player(_) => NodeKind::Player,
            NodeData::GameInstance(_) => NodeKind::GameInstance,
            NodeData::PlayerState(_) => NodeKind::PlayerState,
        }
    }

    /// All fields in declared order, references as arena handles.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, Field<NodeId>)> {
        match self {
            NodeData::Waypoint(w) => vec![
                ("graph", key(w.graph)),
                ("name", text(&w.name)),
                ("destinations", refs(w.destinations.iter().map(|d| d.target))),
                (
                    "weights",
                    Field::List(
                        w.destinations
                            .iter()
                            .map(|d| Item::Scalar(Scalar::Number(d.weight)))
                            .collect(),
                    ),
                ),
                ("tasks", refs(w.tasks.iter().copied())),
            ],
            NodeData::Task(t) => vec![
                ("title", text(&t.title)),
                ("description", text(&t.description)),
                (
                    "solution",
                    Field::Scalar(Scalar::optional_text(t.solution.as_deref())),
                ),
            ],
            NodeData::Mail(m) => {
                let mut fields = vec![
                    ("dialog", key(m.dialog)),
                    ("subject", text(&m.subject)),
                    ("body", text(&m.body)),
                ];
                fields.extend(dialog_link_fields(&m.links));
                fields
            }
            NodeData::Speech(s) => {
                let mut fields = vec![("dialog", key(s.dialog)), ("content", text(&s.content))];
                fields.extend(dialog_link_fields(&s.links));
                fields
            }
            NodeData::Dialog(d) => vec![("graph", key(d.graph)), ("start", optional_ref(d.start))],
            NodeData::Game(g) => vec![
                ("graph", key(g.graph)),
                ("title", text(&g.title)),
                ("start", optional_ref(g.start)),
                ("characters", refs(g.characters.iter().copied())),
            ],
            NodeData::NonPlayableCharacter(n) => vec![
                ("name", text(&n.name)),
                ("role", text(&n.role)),
                ("dialog", optional_ref(n.dialog)),
            ],
            NodeData::Player(p) => vec![
                ("email", text(&p.email)),
                ("display_name", text(&p.display_name)),
            ],
            NodeData::GameInstance(i) => vec![
                ("name", text(&i.name)),
                ("start", text(&format_timestamp(&i.start))),
                ("end", text(&format_timestamp(&i.end))),
                ("game", optional_ref(i.game)),
                ("host", optional_ref(i.host)),
                ("player_states", refs(i.player_states.iter().copied())),
            ],
            NodeData::PlayerState(s) => vec![
                ("first_name", text(&s.first_name)),
                ("role", text(&s.role)),
                ("player", optional_ref(s.player)),
                ("current_waypoint", optional_ref(s.current_waypoint)),
                ("completed_tasks", refs(s.completed_tasks.iter().copied())),
            ],
        }
    }

    /// Outgoing references in declared order (duplicates kept).
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        let kind = self.kind();
        let mut links = Vec::new();
        for (field, value) in self.fields() {
            let strength = field_strength(kind, field);
            links.extend(value.references().into_iter().map(|&target| Link {
                field,
                target,
                strength,
            }));
        }
        links
    }

    /// Edges of a dialog node, `None` for every other kind.
    #[must_use]
    pub fn dialog_links(&self) -> Option<&DialogLinks> {
        match self {
            NodeData::Mail(m) => Some(&m.links),
            NodeData::Speech(s) => Some(&s.links),
            _ => None,
        }
    }

    pub(crate) fn dialog_links_mut(&mut self) -> Option<&mut DialogLinks> {
        match self {
            NodeData::Mail(m) => Some(&mut m.links),
            NodeData::Speech(s) => Some(&mut s.links),
            _ => None,
        }
    }

    /// Dialog membership of a dialog node.
    #[must_use]
    pub fn dialog_key(&self) -> Option<GraphKey> {
        match self {
            NodeData::Mail(m) => Some(m.dialog),
            NodeData::Speech(s) => Some(s.dialog),
            _ => None,
        }
    }
}

impl Node {
    #[must_use]
    pub fn new(uid: Uid, data: NodeData) -> Self {
        Self { uid, data }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, Field<NodeId>)> {
        self.data.fields()
    }

    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        self.data.links()
    }
}

// =============================================================================
// TESTS
// =============================================================================
