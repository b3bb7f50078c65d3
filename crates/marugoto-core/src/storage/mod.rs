//! # Content Stores
//!
//! Persistence of games, dialogs and play-through instances as payloads.
//!
//! A store never sees a live graph: writes encode first and hand the store a
//! finished document, reads decode what the store returns. Two backends:
//! - `MemoryStore`: `BTreeMap`s, volatile
//! - `RedbStore`: redb tables on disk, ACID per call

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::decoder::{Decoded, decode};
use crate::encoder::encode;
use crate::formats::Payload;
use crate::graph::Graph;
use crate::{MarugotoError, NodeId};
use serde::{Deserialize, Serialize};

/// Identity and name of a stored instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: String,
    pub name: String,
}

/// Game, dialog and instance persistence.
pub trait ContentStore {
    /// Store a new game and the dialogs of its characters.
    fn create_game(&mut self, graph: &Graph, game: NodeId) -> Result<(), MarugotoError>;

    /// Load the game titled `title`.
    fn read_game(&self, title: &str) -> Result<Option<Decoded>, MarugotoError>;

    /// Replace a stored game (matched by title and identity) and its dialogs.
    fn update_game(&mut self, graph: &Graph, game: NodeId) -> Result<(), MarugotoError>;

    /// Remove a game and the dialogs stored with it.
    fn delete_game(&mut self, title: &str) -> Result<(), MarugotoError>;

    /// Titles of every stored game, sorted.
    fn game_titles(&self) -> Result<Vec<String>, MarugotoError>;

    /// Every stored dialog, ordered by game title then identity.
    fn dialogs(&self) -> Result<Vec<Decoded>, MarugotoError>;

    /// Store (or overwrite) an instance with its players and progression.
    fn save_instance(&mut self, graph: &Graph, instance: NodeId) -> Result<(), MarugotoError>;

    /// Load the instance stored under `id`.
    fn load_instance(&self, id: &str) -> Result<Option<Decoded>, MarugotoError>;

    /// Instances the player with `email` has joined.
    fn saves(&self, email: &str) -> Result<Vec<InstanceSummary>, MarugotoError>;

    /// Instances hosted by the player with `email`.
    fn hosts(&self, email: &str) -> Result<Vec<InstanceSummary>, MarugotoError>;
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// A stored dialog payload, scoped to the title of the game it is stored with.
///
/// Identities are only unique within one graph: two games built separately
/// under `IdStrategy::Sequential` give their dialogs the same uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogDocument {
    pub game: String,
    pub id: String,
    pub payload: String,
}

/// A stored game payload plus the identities of the dialogs stored with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDocument {
    pub id: String,
    pub title: String,
    pub dialogs: Vec<String>,
    pub payload: String,
}

/// A stored instance payload plus what the listings need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDocument {
    pub id: String,
    pub name: String,
    pub host: Option<String>,
    pub players: Vec<String>,
    pub payload: String,
}

impl InstanceDocument {
    #[must_use]
    pub fn summary(&self) -> InstanceSummary {
        InstanceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Encode a game and, separately, each of its characters' dialogs.
pub fn game_documents(
    graph: &Graph,
    game: NodeId,
) -> Result<(GameDocument, Vec<DialogDocument>), MarugotoError> {
    let data = graph.game(game)?;
    let mut dialogs = Vec::new();
    for &npc in &data.characters {
        if let Some(dialog) = graph.npc(npc)?.dialog {
            dialogs.push(DialogDocument {
                game: data.title.clone(),
                id: graph.uid(dialog)?.to_string(),
                payload: encode(graph, Some(dialog))?.to_json()?,
            });
        }
    }
    let document = GameDocument {
        id: graph.uid(game)?.to_string(),
        title: data.title.clone(),
        dialogs: dialogs.iter().map(|d| d.id.clone()).collect(),
        payload: encode(graph, Some(game))?.to_json()?,
    };
    Ok((document, dialogs))
}

/// Encode an instance together with its listing data.
pub fn instance_document(graph: &Graph, instance: NodeId) -> Result<InstanceDocument, MarugotoError> {
    let data = graph.game_instance(instance)?;
    let host = match data.host {
        Some(host) => Some(graph.player(host)?.email.clone()),
        None => None,
    };
    let mut players = Vec::new();
    for &state in &data.player_states {
        if let Some(player) = graph.player_state(state)?.player {
            players.push(graph.player(player)?.email.clone());
        }
    }
    Ok(InstanceDocument {
        id: graph.uid(instance)?.to_string(),
        name: data.name.clone(),
        host,
        players,
        payload: encode(graph, Some(instance))?.to_json()?,
    })
}

/// Decode a stored payload.
pub fn decode_document(payload: &str) -> Result<Option<Decoded>, MarugotoError> {
    decode(&Payload::from_json(payload)?)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn game_document_splits_dialogs() {
        let mut graph = Graph::new();
        let game = graph.create_game("quest");
        let dialog = graph.create_dialog();
        let npc = graph.create_npc("bob", "guide", dialog).expect("npc");
        graph.add_non_playable_character(game, npc).expect("cast");

        let (document, dialogs) = game_documents(&graph, game).expect("documents");
        assert_eq!(document.title, "quest");
        assert_eq!(dialogs.len(), 1);
        assert_eq!(document.dialogs, vec![dialogs[0].id.clone()]);
        assert_eq!(dialogs[0].game, "quest");
        assert!(decode_document(&dialogs[0].payload).expect("decode").is_some());
    }

    #[test]
    fn instance_document_lists_emails() {
        let mut graph = Graph::new();
        let game = graph.create_game("quest");
        let host = graph.create_player("host@x", "");
        let player = graph.create_player("p@x", "");
        let now = Utc::now();
        let instance = graph
            .start_new_instance(game, "run", host, now, now + Duration::hours(1))
            .expect("instance");
        graph.add_player(instance, player, "p", "r").expect("join");

        let document = instance_document(&graph, instance).expect("document");
        assert_eq!(document.host.as_deref(), Some("host@x"));
        assert_eq!(document.players, vec!["p@x".to_string()]);
        assert_eq!(document.summary().name, "run");
    }
}
