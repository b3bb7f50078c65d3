//! # In-memory Content Store
//!
//! Volatile store backed by `BTreeMap`s. Holds the same documents a
//! `RedbStore` writes, so both backends behave identically.

use super::{
    ContentStore, DialogDocument, GameDocument, InstanceDocument, InstanceSummary, decode_document,
    game_documents, instance_document,
};
use crate::decoder::Decoded;
use crate::graph::Graph;
use crate::{MarugotoError, NodeId};
use std::collections::BTreeMap;

/// Volatile content store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    /// Title -> game
    games: BTreeMap<String, GameDocument>,
    /// (Game title, dialog identity) -> dialog
    dialogs: BTreeMap<(String, String), DialogDocument>,
    /// Instance identity -> instance
    instances: BTreeMap<String, InstanceDocument>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write_game(&mut self, document: GameDocument, dialogs: Vec<DialogDocument>) {
        for dialog in dialogs {
            self.dialogs
                .insert((dialog.game.clone(), dialog.id.clone()), dialog);
        }
        self.games.insert(document.title.clone(), document);
    }

    fn listing(&self, keep: impl Fn(&InstanceDocument) -> bool) -> Vec<InstanceSummary> {
        self.instances
            .values()
            .filter(|document| keep(document))
            .map(InstanceDocument::summary)
            .collect()
    }
}

impl ContentStore for MemoryStore {
    fn create_game(&mut self, graph: &Graph, game: NodeId) -> Result<(), MarugotoError> {
        let (document, dialogs) = game_documents(graph, game)?;
        if self.games.contains_key(&document.title) {
            return Err(MarugotoError::AlreadyExists(document.title));
        }
        tracing::debug!(title = %document.title, dialogs = dialogs.len(), "game created");
        self.write_game(document, dialogs);
        Ok(())
    }

    fn read_game(&self, title: &str) -> Result<Option<Decoded>, MarugotoError> {
        match self.games.get(title) {
            Some(document) => decode_document(&document.payload),
            None => Ok(None),
        }
    }

    fn update_game(&mut self, graph: &Graph, game: NodeId) -> Result<(), MarugotoError> {
        let (document, dialogs) = game_documents(graph, game)?;
        let Some(existing) = self.games.get(&document.title) else {
            return Err(MarugotoError::NotFound(document.title));
        };
        if existing.id != document.id {
            return Err(MarugotoError::AlreadyExists(document.title));
        }
        let stale: Vec<String> = existing
            .dialogs
            .iter()
            .filter(|id| !document.dialogs.contains(id))
            .cloned()
            .collect();
        for id in stale {
            self.dialogs.remove(&(document.title.clone(), id));
        }
        tracing::debug!(title = %document.title, "game updated");
        self.write_game(document, dialogs);
        Ok(())
    }

    fn delete_game(&mut self, title: &str) -> Result<(), MarugotoError> {
        let document = self
            .games
            .remove(title)
            .ok_or_else(|| MarugotoError::NotFound(title.to_string()))?;
        for dialog in document.dialogs {
            self.dialogs.remove(&(title.to_string(), dialog));
        }
        tracing::debug!(title, "game deleted");
        Ok(())
    }

    fn game_titles(&self) -> Result<Vec<String>, MarugotoError> {
        Ok(self.games.keys().cloned().collect())
    }

    fn dialogs(&self) -> Result<Vec<Decoded>, MarugotoError> {
        let mut dialogs = Vec::with_capacity(self.dialogs.len());
        for document in self.dialogs.values() {
            if let Some(decoded) = decode_document(&document.payload)? {
                dialogs.push(decoded);
            }
        }
        Ok(dialogs)
    }

    fn save_instance(&mut self, graph: &Graph, instance: NodeId) -> Result<(), MarugotoError> {
        let document = instance_document(graph, instance)?;
        tracing::debug!(instance = %document.id, "instance saved");
        self.instances.insert(document.id.clone(), document);
        Ok(())
    }

    fn load_instance(&self, id: &str) -> Result<Option<Decoded>, MarugotoError> {
        match self.instances.get(id) {
            Some(document) => decode_document(&document.payload),
            None => Ok(None),
        }
    }

    fn saves(&self, email: &str) -> Result<Vec<InstanceSummary>, MarugotoError> {
        Ok(self.listing(|document| document.players.iter().any(|p| p == email)))
    }

    fn hosts(&self, email: &str) -> Result<Vec<InstanceSummary>, MarugotoError> {
        Ok(self.listing(|document| document.host.as_deref() == Some(email)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
