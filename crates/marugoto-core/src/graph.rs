//! # Content Graph
//!
//! The arena that owns every node of a content graph.
//!
//! Nodes reference each other by `NodeId`; the arena maps handles to nodes
//! in a `BTreeMap`, so every walk over a graph is deterministic. Cycles and
//! shared sub-trees are plain repeated handles.
//!
//! All edit operations validate before they mutate: a call that fails with
//! `GraphConsistency` leaves the graph exactly as it was.

use crate::node::{
    Destination, Dialog, DialogLinks, FollowUp, Game, Mail, Node, NodeData,
    NonPlayableCharacter, Player, Speech, Task, Waypoint,
};
use crate::primitives::DEFAULT_WEIGHT;
use crate::registry::{IdAllocator, IdStrategy};
use crate::{GraphKey, MarugotoError, NodeId, NodeKind, Uid};
use std::collections::BTreeMap;

/// Arena of content nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node storage: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,
    /// Next available NodeId
    next_node_id: u64,
    /// Identity source for new nodes and container graphs
    ids: IdAllocator,
}

fn expected(kind: &str, found: NodeKind, id: NodeId) -> MarugotoError {
    MarugotoError::consistency(format!("expected {} at {:?}, found {}", kind, id, found))
}

impl Graph {
    /// Create a new empty graph with random identities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty graph with the given identity strategy.
    #[must_use]
    pub fn with_strategy(strategy: IdStrategy) -> Self {
        Self {
            ids: IdAllocator::new(strategy),
            ..Self::default()
        }
    }

    /// Identity strategy of this graph.
    #[must_use]
    pub fn strategy(&self) -> IdStrategy {
        self.ids.strategy()
    }

    // =========================================================================
    // ARENA ACCESS
    // =========================================================================

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get all nodes in deterministic order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Lookup a node by handle.
    pub fn node(&self, id: NodeId) -> Result<&Node, MarugotoError> {
        self.nodes.get(&id).ok_or(MarugotoError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, MarugotoError> {
        self.nodes.get_mut(&id).ok_or(MarugotoError::NodeNotFound(id))
    }

    /// Kind of a node.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind, MarugotoError> {
        self.node(id).map(Node::kind)
    }

    /// Stable identity of a node.
    pub fn uid(&self, id: NodeId) -> Result<Uid, MarugotoError> {
        self.node(id).map(|node| node.uid)
    }

    /// Find a node by its stable identity.
    #[must_use]
    pub fn find_by_uid(&self, uid: Uid) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.uid == uid)
            .map(|(id, _)| *id)
    }

    /// Insert a node that already carries its identity.
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id = self.next_node_id.saturating_add(1);
        self.ids.observe(node.uid);
        self.nodes.insert(id, node);
        id
    }

    /// Let the allocator know about an identity that came from a payload.
    pub(crate) fn observe(&mut self, uid: Uid) {
        self.ids.observe(uid);
    }

    pub(crate) fn create_node(&mut self, data: NodeData) -> NodeId {
        let uid = self.ids.allocate();
        self.insert(Node::new(uid, data))
    }

    fn new_key(&mut self) -> GraphKey {
        GraphKey(self.ids.allocate())
    }

    // =========================================================================
    // TYPED ACCESS
    // =========================================================================

    pub fn waypoint(&self, id: NodeId) -> Result<&Waypoint, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::Waypoint(w) => Ok(w),
            other => Err(expected("waypoint", other.kind(), id)),
        }
    }

    pub fn task(&self, id: NodeId) -> Result<&Task, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::Task(t) => Ok(t),
            other => Err(expected("task", other.kind(), id)),
        }
    }

    pub fn dialog(&self, id: NodeId) -> Result<&Dialog, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::Dialog(d) => Ok(d),
            other => Err(expected("dialog", other.kind(), id)),
        }
    }

    pub fn game(&self, id: NodeId) -> Result<&Game, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::Game(g) => Ok(g),
            other => Err(expected("game", other.kind(), id)),
        }
    }

    pub fn npc(&self, id: NodeId) -> Result<&NonPlayableCharacter, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::NonPlayableCharacter(n) => Ok(n),
            other => Err(expected("non_playable_character", other.kind(), id)),
        }
    }

    pub fn player(&self, id: NodeId) -> Result<&Player, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::Player(p) => Ok(p),
            other => Err(expected("player", other.kind(), id)),
        }
    }

    /// Dialog membership and edges of a Mail or Speech node.
    pub fn dialog_node(&self, id: NodeId) -> Result<(GraphKey, &DialogLinks), MarugotoError> {
        let data = &self.node(id)?.data;
        match (data.dialog_key(), data.dialog_links()) {
            (Some(key), Some(links)) => Ok((key, links)),
            _ => Err(expected("dialog node", data.kind(), id)),
        }
    }

    fn dialog_links_mut(&mut self, id: NodeId) -> Result<&mut DialogLinks, MarugotoError> {
        let node = self.node_mut(id)?;
        let kind = node.kind();
        node.data
            .dialog_links_mut()
            .ok_or_else(|| expected("dialog node", kind, id))
    }

    /// Whether `waypoint` is the start of its game.
    pub fn is_start(&self, waypoint: NodeId) -> Result<bool, MarugotoError> {
        let key = self.waypoint(waypoint)?.graph;
        Ok(self.nodes.values().any(|node| match &node.data {
            NodeData::Game(g) => g.graph == key && g.start == Some(waypoint),
            _ => false,
        }))
    }

    /// The Game whose waypoint graph carries `key`.
    #[must_use]
    pub fn game_for_key(&self, key: GraphKey) -> Option<NodeId> {
        self.nodes.iter().find_map(|(id, node)| match &node.data {
            NodeData::Game(g) if g.graph == key => Some(*id),
            _ => None,
        })
    }

    // =========================================================================
    // CONSTRUCTORS
    // =========================================================================

    /// Create a Game with an empty waypoint graph.
    pub fn create_game(&mut self, title: impl Into<String>) -> NodeId {
        let graph = self.new_key();
        self.create_node(NodeData::Game(Game {
            graph,
            title: title.into(),
            start: None,
            characters: Vec::new(),
        }))
    }

    /// Create a Waypoint inside `game`'s graph.
    pub fn create_waypoint(
        &mut self,
        game: NodeId,
        name: impl Into<String>,
    ) -> Result<NodeId, MarugotoError> {
        let graph = self.game(game)?.graph;
        Ok(self.create_node(NodeData::Waypoint(Waypoint {
            graph,
            name: name.into(),
            destinations: Vec::new(),
            tasks: Vec::new(),
        })))
    }

    /// Create an unattached Task.
    pub fn create_task(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        solution: Option<&str>,
    ) -> NodeId {
        self.create_node(NodeData::Task(Task {
            title: title.into(),
            description: description.into(),
            solution: solution.map(str::to_string),
            owner: None,
        }))
    }

    /// Create a Dialog with an empty node graph.
    pub fn create_dialog(&mut self) -> NodeId {
        let graph = self.new_key();
        self.create_node(NodeData::Dialog(Dialog { graph, start: None }))
    }

    /// Create a Mail inside `dialog`'s graph.
    pub fn create_mail(
        &mut self,
        dialog: NodeId,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<NodeId, MarugotoError> {
        let key = self.dialog(dialog)?.graph;
        Ok(self.create_node(NodeData::Mail(Mail {
            dialog: key,
            subject: subject.into(),
            body: body.into(),
            links: DialogLinks::default(),
        })))
    }

    /// Create a Speech inside `dialog`'s graph.
    pub fn create_speech(
        &mut self,
        dialog: NodeId,
        content: impl Into<String>,
    ) -> Result<NodeId, MarugotoError> {
        let key = self.dialog(dialog)?.graph;
        Ok(self.create_node(NodeData::Speech(Speech {
            dialog: key,
            content: content.into(),
            links: DialogLinks::default(),
        })))
    }

    /// Create a NonPlayableCharacter owning `dialog`.
    pub fn create_npc(
        &mut self,
        name: impl Into<String>,
        role: impl Into<String>,
        dialog: NodeId,
    ) -> Result<NodeId, MarugotoError> {
        self.dialog(dialog)?;
        let taken = self.nodes.values().any(|node| match &node.data {
            NodeData::NonPlayableCharacter(n) => n.dialog == Some(dialog),
            _ => false,
        });
        if taken {
            return Err(MarugotoError::consistency(
                "dialog is already owned by another character",
            ));
        }
        Ok(self.create_node(NodeData::NonPlayableCharacter(NonPlayableCharacter {
            name: name.into(),
            role: role.into(),
            dialog: Some(dialog),
        })))
    }

    /// Create a Player.
    pub fn create_player(
        &mut self,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> NodeId {
        self.create_node(NodeData::Player(Player {
            email: email.into(),
            display_name: display_name.into(),
        }))
    }

    // =========================================================================
    // EDIT OPERATIONS
    // =========================================================================

    /// Add an outgoing edge between two waypoints of the same game.
    ///
    /// Re-adding an existing destination updates its weight.
    pub fn add_destination(
        &mut self,
        from: NodeId,
        to: NodeId,
        weight: Option<f64>,
    ) -> Result<(), MarugotoError> {
        let weight = weight.unwrap_or(DEFAULT_WEIGHT);
        if !weight.is_finite() {
            return Err(MarugotoError::consistency("destination weight must be finite"));
        }
        let source = self.waypoint(from)?.graph;
        let target = self.waypoint(to)?.graph;
        if source != target {
            return Err(MarugotoError::consistency(
                "destination must be a waypoint of the same game",
            ));
        }

        if let NodeData::Waypoint(w) = &mut self.node_mut(from)?.data {
            match w.destinations.iter_mut().find(|d| d.target == to) {
                Some(existing) => existing.weight = weight,
                None => w.destinations.push(Destination { target: to, weight }),
            }
        }
        Ok(())
    }

    /// Attach a task to a waypoint. A task is held by at most one waypoint.
    pub fn add_task(&mut self, waypoint: NodeId, task: NodeId) -> Result<(), MarugotoError> {
        self.waypoint(waypoint)?;
        match self.task(task)?.owner {
            Some(owner) if owner == waypoint => return Ok(()),
            Some(_) => {
                return Err(MarugotoError::consistency(
                    "task is already attached to another waypoint",
                ));
            }
            None => {}
        }

        if let NodeData::Waypoint(w) = &mut self.node_mut(waypoint)?.data {
            w.tasks.push(task);
        }
        if let NodeData::Task(t) = &mut self.node_mut(task)?.data {
            t.owner = Some(waypoint);
        }
        Ok(())
    }

    /// Add a follow-up edge between dialog nodes of the same dialog.
    ///
    /// Re-adding an existing follow-up replaces its guard.
    pub fn add_follow_up(
        &mut self,
        node: NodeId,
        target: NodeId,
        guard: Option<NodeId>,
    ) -> Result<(), MarugotoError> {
        let (source, _) = self.dialog_node(node)?;
        let (destination, _) = self.dialog_node(target)?;
        if source != destination {
            return Err(MarugotoError::consistency(
                "follow-up must be a node of the same dialog",
            ));
        }
        if let Some(guard) = guard {
            self.task(guard)?;
        }

        let links = self.dialog_links_mut(node)?;
        match links.follow_ups.iter_mut().find(|f| f.target == target) {
            Some(existing) => existing.guard = guard,
            None => links.follow_ups.push(FollowUp { target, guard }),
        }
        Ok(())
    }

    /// Conclude a dialog node by placing the player at `waypoint`.
    pub fn set_destination(&mut self, node: NodeId, waypoint: NodeId) -> Result<(), MarugotoError> {
        self.dialog_node(node)?;
        self.waypoint(waypoint)?;
        self.dialog_links_mut(node)?.destination = Some(waypoint);
        Ok(())
    }

    /// Record that `waypoint` offers the dialog `node` belongs to.
    ///
    /// This is a relation, not ownership: removing or rewriting the dialog
    /// never touches the waypoint.
    pub fn offer_at(&mut self, node: NodeId, waypoint: NodeId) -> Result<(), MarugotoError> {
        self.dialog_node(node)?;
        self.waypoint(waypoint)?;
        let links = self.dialog_links_mut(node)?;
        if !links.waypoints.contains(&waypoint) {
            links.waypoints.push(waypoint);
        }
        Ok(())
    }

    /// Designate the start node of a Game (a waypoint) or a Dialog (a dialog node).
    pub fn set_start(&mut self, container: NodeId, start: NodeId) -> Result<(), MarugotoError> {
        match self.kind(container)? {
            NodeKind::Game => {
                let key = self.game(container)?.graph;
                if self.waypoint(start)?.graph != key {
                    return Err(MarugotoError::consistency(
                        "game start must be a waypoint of that game",
                    ));
                }
                if let NodeData::Game(g) = &mut self.node_mut(container)?.data {
                    g.start = Some(start);
                }
            }
            NodeKind::Dialog => {
                let key = self.dialog(container)?.graph;
                if self.dialog_node(start)?.0 != key {
                    return Err(MarugotoError::consistency(
                        "dialog start must be a node of that dialog",
                    ));
                }
                if let NodeData::Dialog(d) = &mut self.node_mut(container)?.data {
                    d.start = Some(start);
                }
            }
            other => return Err(expected("game or dialog", other, container)),
        }
        Ok(())
    }

    /// Add a character to a game's cast.
    pub fn add_non_playable_character(
        &mut self,
        game: NodeId,
        npc: NodeId,
    ) -> Result<(), MarugotoError> {
        self.npc(npc)?;
        let owned_elsewhere = self.nodes.iter().any(|(id, node)| match &node.data {
            NodeData::Game(g) => *id != game && g.characters.contains(&npc),
            _ => false,
        });
        if owned_elsewhere {
            return Err(MarugotoError::consistency(
                "character already belongs to another game",
            ));
        }
        if let NodeData::Game(g) = &mut self.node_mut(game)?.data {
            if !g.characters.contains(&npc) {
                g.characters.push(npc);
            }
            return Ok(());
        }
        Err(expected("game", self.kind(game)?, game))
    }

    // =========================================================================
    // CONSISTENCY
    // =========================================================================

    /// Re-derive which waypoint holds each task from `Waypoint::tasks`.
    pub(crate) fn link_task_owners(&mut self) -> Result<(), MarugotoError> {
        let mut owners: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for (id, node) in &self.nodes {
            if let NodeData::Waypoint(w) = &node.data {
                for task in &w.tasks {
                    if owners.insert(*task, *id).is_some_and(|other| other != *id) {
                        return Err(MarugotoError::consistency(format!(
                            "task {} is attached to more than one waypoint",
                            self.uid(*task)?
                        )));
                    }
                }
            }
        }
        for (task, owner) in owners {
            if let NodeData::Task(t) = &mut self.node_mut(task)?.data {
                t.owner = Some(owner);
            }
        }
        Ok(())
    }

    /// Check the membership rules of every edge in the graph.
    ///
    /// These are the same rules the edit operations enforce, applied to a
    /// whole graph at once (e.g. after decoding).
    pub fn check_consistency(&self) -> Result<(), MarugotoError> {
        let mut dialog_owners: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut cast: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for (id, node) in &self.nodes {
            match &node.data {
                NodeData::Waypoint(w) => {
                    for destination in &w.destinations {
                        if !destination.weight.is_finite() {
                            return Err(MarugotoError::consistency("destination weight must be finite"));
                        }
                        if self.waypoint(destination.target)?.graph != w.graph {
                            return Err(MarugotoError::consistency(format!(
                                "waypoint {} leads out of its game",
                                node.uid
                            )));
                        }
                    }
                }
                NodeData::Mail(_) | NodeData::Speech(_) => {
                    let (key, links) = self.dialog_node(*id)?;
                    for follow_up in &links.follow_ups {
                        if self.dialog_node(follow_up.target)?.0 != key {
                            return Err(MarugotoError::consistency(format!(
                                "dialog node {} follows up outside its dialog",
                                node.uid
                            )));
                        }
                    }
                }
                NodeData::Dialog(d) => {
                    if let Some(start) = d.start {
                        if self.dialog_node(start)?.0 != d.graph {
                            return Err(MarugotoError::consistency(format!(
                                "dialog {} starts outside itself",
                                node.uid
                            )));
                        }
                    }
                }
                NodeData::Game(g) => {
                    if let Some(start) = g.start {
                        if self.waypoint(start)?.graph != g.graph {
                            return Err(MarugotoError::consistency(format!(
                                "game {} starts outside itself",
                                node.uid
                            )));
                        }
                    }
                    for npc in &g.characters {
                        self.npc(*npc)?;
                        if cast.insert(*npc, *id).is_some_and(|other| other != *id) {
                            return Err(MarugotoError::consistency(format!(
                                "character {} belongs to more than one game",
                                self.uid(*npc)?
                            )));
                        }
                    }
                }
                NodeData::NonPlayableCharacter(n) => {
                    let Some(dialog) = n.dialog else {
                        return Err(MarugotoError::consistency(format!(
                            "character {} owns no dialog",
                            node.uid
                        )));
                    };
                    if dialog_owners.insert(dialog, *id).is_some() {
                        return Err(MarugotoError::consistency(format!(
                            "dialog {} is owned by more than one character",
                            self.uid(dialog)?
                        )));
                    }
                }
                NodeData::GameInstance(_) => self.check_instance(*id)?,
                NodeData::Task(_) | NodeData::Player(_) | NodeData::PlayerState(_) => {}
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with_two_waypoints() -> (Graph, NodeId, NodeId, NodeId) {
        let mut graph = Graph::with_strategy(IdStrategy::Sequential);
        let game = graph.create_game("test");
        let a = graph.create_waypoint(game, "a").expect("a");
        let b = graph.create_waypoint(game, "b").expect("b");
        (graph, game, a, b)
    }

    #[test]
    fn destination_defaults_to_unit_weight() {
        let (mut graph, _, a, b) = game_with_two_waypoints();
        graph.add_destination(a, b, None).expect("edge");
        let w = graph.waypoint(a).expect("a");
        assert_eq!(w.destinations.len(), 1);
        assert_eq!(w.destinations[0].weight.to_bits(), DEFAULT_WEIGHT.to_bits());
    }

    #[test]
    fn readding_destination_updates_weight() {
        let (mut graph, _, a, b) = game_with_two_waypoints();
        graph.add_destination(a, b, None).expect("edge");
        graph.add_destination(a, b, Some(2.5)).expect("edge");
        let w = graph.waypoint(a).expect("a");
        assert_eq!(w.destinations.len(), 1);
        assert_eq!(w.destinations[0].weight.to_bits(), 2.5f64.to_bits());
    }

    #[test]
    fn cycles_are_allowed() {
        let (mut graph, _, a, b) = game_with_two_waypoints();
        graph.add_destination(a, b, None).expect("a->b");
        graph.add_destination(b, a, None).expect("b->a");
        graph.add_destination(a, a, None).expect("a->a");
        assert!(graph.check_consistency().is_ok());
    }

    #[test]
    fn destination_across_games_rejected() {
        let (mut graph, _, a, _) = game_with_two_waypoints();
        let other = graph.create_game("other");
        let foreign = graph.create_waypoint(other, "x").expect("x");
        let result = graph.add_destination(a, foreign, None);
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));
        assert!(graph.waypoint(a).expect("a").destinations.is_empty());
    }

    #[test]
    fn destination_to_task_rejected() {
        let (mut graph, _, a, _) = game_with_two_waypoints();
        let task = graph.create_task("t", "d", None);
        let result = graph.add_destination(a, task, None);
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));
    }

    #[test]
    fn non_finite_weight_rejected() {
        let (mut graph, _, a, b) = game_with_two_waypoints();
        let result = graph.add_destination(a, b, Some(f64::NAN));
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));
    }

    #[test]
    fn task_has_single_owner() {
        let (mut graph, _, a, b) = game_with_two_waypoints();
        let task = graph.create_task("t", "d", Some("42"));
        graph.add_task(a, task).expect("attach");
        graph.add_task(a, task).expect("re-attach is a no-op");
        assert_eq!(graph.waypoint(a).expect("a").tasks, vec![task]);
        assert_eq!(graph.task(task).expect("task").owner(), Some(a));
        let result = graph.add_task(b, task);
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));
    }

    #[test]
    fn follow_ups_stay_in_dialog() {
        let mut graph = Graph::new();
        let dialog = graph.create_dialog();
        let other = graph.create_dialog();
        let m1 = graph.create_mail(dialog, "sub", "body").expect("m1");
        let s1 = graph.create_speech(dialog, "hello").expect("s1");
        let foreign = graph.create_speech(other, "elsewhere").expect("foreign");
        let guard = graph.create_task("t", "d", None);

        graph.add_follow_up(m1, s1, Some(guard)).expect("follow up");
        graph.add_follow_up(s1, m1, None).expect("cycle back");
        let result = graph.add_follow_up(m1, foreign, None);
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));

        let (_, links) = graph.dialog_node(m1).expect("m1");
        assert_eq!(
            links.follow_ups,
            vec![FollowUp {
                target: s1,
                guard: Some(guard)
            }]
        );
    }

    #[test]
    fn guard_must_be_task() {
        let mut graph = Graph::new();
        let dialog = graph.create_dialog();
        let a = graph.create_speech(dialog, "a").expect("a");
        let b = graph.create_speech(dialog, "b").expect("b");
        let result = graph.add_follow_up(a, b, Some(dialog));
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));
    }

    #[test]
    fn set_start_checks_membership() {
        let (mut graph, game, a, _) = game_with_two_waypoints();
        graph.set_start(game, a).expect("start");
        assert!(graph.is_start(a).expect("is start"));
        let key = graph.waypoint(a).expect("waypoint").graph;
        assert_eq!(graph.game_for_key(key), Some(game));

        let other = graph.create_game("other");
        let result = graph.set_start(other, a);
        assert!(matches!(result, Err(MarugotoError::GraphConsistency(_))));

        let dialog = graph.create_dialog();
        let speech = graph.create_speech(dialog, "hi").expect("speech");
        graph.set_start(dialog, speech).expect("dialog start");
        assert_eq!(graph.dialog(dialog).expect("dialog").start, Some(speech));
        assert!(graph.set_start(a, speech).is_err());
    }

    #[test]
    fn dialog_destination_crosses_into_game() {
        let (mut graph, _, a, _) = game_with_two_waypoints();
        let dialog = graph.create_dialog();
        let speech = graph.create_speech(dialog, "go").expect("speech");
        graph.set_destination(speech, a).expect("destination");
        graph.offer_at(speech, a).expect("offer");
        graph.offer_at(speech, a).expect("offer twice");
        let (_, links) = graph.dialog_node(speech).expect("speech");
        assert_eq!(links.destination, Some(a));
        assert_eq!(links.waypoints, vec![a]);
    }

    #[test]
    fn character_joins_one_game() {
        let mut graph = Graph::new();
        let game = graph.create_game("g");
        let other = graph.create_game("h");
        let dialog = graph.create_dialog();
        let npc = graph.create_npc("bob", "guide", dialog).expect("npc");
        graph.add_non_playable_character(game, npc).expect("cast");
        graph.add_non_playable_character(game, npc).expect("idempotent");
        assert_eq!(graph.game(game).expect("game").characters, vec![npc]);
        assert!(graph.add_non_playable_character(other, npc).is_err());
        assert!(graph.create_npc("eve", "rival", dialog).is_err());
    }

    #[test]
    fn sequential_identities_are_reproducible() {
        let (first, _, a1, _) = game_with_two_waypoints();
        let (second, _, a2, _) = game_with_two_waypoints();
        assert_eq!(first.uid(a1).expect("uid"), second.uid(a2).expect("uid"));
        assert_eq!(first.find_by_uid(first.uid(a1).expect("uid")), Some(a1));
    }

    #[test]
    fn missing_node_reported() {
        let graph = Graph::new();
        assert!(matches!(
            graph.node(NodeId(7)),
            Err(MarugotoError::NodeNotFound(NodeId(7)))
        ));
    }
}
