//! # redb-backed Content Store
//!
//! Disk-backed store using the redb embedded database.
//!
//! Each table maps a key to a postcard-encoded document whose `payload` is
//! the JSON text produced by the encoder:
//! - `games`: title -> `GameDocument`
//! - `dialogs`: (game title, dialog identity) -> `DialogDocument`
//! - `instances`: instance identity -> `InstanceDocument`
//!
//! Every mutating call runs in one write transaction, so a game and its
//! dialogs are written or removed together.

use super::{
    ContentStore, DialogDocument, GameDocument, InstanceDocument, InstanceSummary, decode_document,
    game_documents, instance_document,
};
use crate::decoder::Decoded;
use crate::graph::Graph;
use crate::{MarugotoError, NodeId};
use redb::{Database, Key, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for games: title -> serialized GameDocument
const GAMES: TableDefinition<&str, &[u8]> = TableDefinition::new("games");

/// Table for dialogs: (game title, dialog uid) -> serialized DialogDocument
const DIALOGS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("dialogs");

/// Table for instances: instance uid -> serialized InstanceDocument
const INSTANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("instances");

fn to_bytes<T: Serialize>(document: &T) -> Result<Vec<u8>, MarugotoError> {
    postcard::to_allocvec(document).map_err(|e| MarugotoError::SerializationError(e.to_string()))
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, MarugotoError> {
    postcard::from_bytes(bytes).map_err(|e| MarugotoError::SerializationError(e.to_string()))
}

/// A disk-backed content store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MarugotoError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| MarugotoError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(GAMES)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(DIALOGS)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(INSTANCES)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        }

        tracing::debug!(path = %path.as_ref().display(), "content store opened");
        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), MarugotoError> {
        self.db
            .compact()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> Result<Option<T>, MarugotoError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(table)
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        value.map(|v| from_bytes(v.value())).transpose()
    }

    fn all<K: Key + 'static, T: DeserializeOwned>(
        &self,
        table: TableDefinition<K, &[u8]>,
    ) -> Result<Vec<T>, MarugotoError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(table)
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        let mut documents = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| MarugotoError::IoError(e.to_string()))?;
            documents.push(from_bytes(value.value())?);
        }
        Ok(documents)
    }

    /// Write a game and its dialogs, dropping dialogs listed in `stale`.
    fn write_game(
        &mut self,
        document: &GameDocument,
        dialogs: &[DialogDocument],
        stale: &[String],
    ) -> Result<(), MarugotoError> {
        let game_bytes = to_bytes(document)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        {
            let mut games = write_txn
                .open_table(GAMES)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            let mut dialog_table = write_txn
                .open_table(DIALOGS)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            for id in stale {
                dialog_table
                    .remove((document.title.as_str(), id.as_str()))
                    .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            }
            for dialog in dialogs {
                let bytes = to_bytes(dialog)?;
                dialog_table
                    .insert((dialog.game.as_str(), dialog.id.as_str()), bytes.as_slice())
                    .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            }
            games
                .insert(document.title.as_str(), game_bytes.as_slice())
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        Ok(())
    }

    fn listing(
        &self,
        keep: impl Fn(&InstanceDocument) -> bool,
    ) -> Result<Vec<InstanceSummary>, MarugotoError> {
        Ok(self
            .all::<_, InstanceDocument>(INSTANCES)?
            .iter()
            .filter(|document| keep(document))
            .map(InstanceDocument::summary)
            .collect())
    }
}

impl ContentStore for RedbStore {
    fn create_game(&mut self, graph: &Graph, game: NodeId) -> Result<(), MarugotoError> {
        let (document, dialogs) = game_documents(graph, game)?;
        if self.get::<GameDocument>(GAMES, &document.title)?.is_some() {
            return Err(MarugotoError::AlreadyExists(document.title));
        }
        self.write_game(&document, &dialogs, &[])?;
        tracing::debug!(title = %document.title, dialogs = dialogs.len(), "game created");
        Ok(())
    }

    fn read_game(&self, title: &str) -> Result<Option<Decoded>, MarugotoError> {
        match self.get::<GameDocument>(GAMES, title)? {
            Some(document) => decode_document(&document.payload),
            None => Ok(None),
        }
    }

    fn update_game(&mut self, graph: &Graph, game: NodeId) -> Result<(), MarugotoError> {
        let (document, dialogs) = game_documents(graph, game)?;
        let existing = self
            .get::<GameDocument>(GAMES, &document.title)?
            .ok_or_else(|| MarugotoError::NotFound(document.title.clone()))?;
        if existing.id != document.id {
            return Err(MarugotoError::AlreadyExists(document.title));
        }
        let stale: Vec<String> = existing
            .dialogs
            .into_iter()
            .filter(|id| !document.dialogs.contains(id))
            .collect();
        self.write_game(&document, &dialogs, &stale)?;
        tracing::debug!(title = %document.title, "game updated");
        Ok(())
    }

    fn delete_game(&mut self, title: &str) -> Result<(), MarugotoError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        {
            let mut games = write_txn
                .open_table(GAMES)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            let removed = games
                .remove(title)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?
                .map(|v| from_bytes::<GameDocument>(v.value()))
                .transpose()?
                .ok_or_else(|| MarugotoError::NotFound(title.to_string()))?;
            let mut dialogs = write_txn
                .open_table(DIALOGS)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            for id in &removed.dialogs {
                dialogs
                    .remove((title, id.as_str()))
                    .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        tracing::debug!(title, "game deleted");
        Ok(())
    }

    fn game_titles(&self) -> Result<Vec<String>, MarugotoError> {
        Ok(self
            .all::<_, GameDocument>(GAMES)?
            .into_iter()
            .map(|document| document.title)
            .collect())
    }

    fn dialogs(&self) -> Result<Vec<Decoded>, MarugotoError> {
        let mut dialogs = Vec::new();
        for document in self.all::<_, DialogDocument>(DIALOGS)? {
            if let Some(decoded) = decode_document(&document.payload)? {
                dialogs.push(decoded);
            }
        }
        Ok(dialogs)
    }

    fn save_instance(&mut self, graph: &Graph, instance: NodeId) -> Result<(), MarugotoError> {
        let document = instance_document(graph, instance)?;
        let bytes = to_bytes(&document)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        {
            let mut instances = write_txn
                .open_table(INSTANCES)
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
            instances
                .insert(document.id.as_str(), bytes.as_slice())
                .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| MarugotoError::IoError(e.to_string()))?;
        tracing::debug!(instance = %document.id, "instance saved");
        Ok(())
    }

    fn load_instance(&self, id: &str) -> Result<Option<Decoded>, MarugotoError> {
        match self.get::<InstanceDocument>(INSTANCES, id)? {
            Some(document) => decode_document(&document.payload),
            None => Ok(None),
        }
    }

    fn saves(&self, email: &str) -> Result<Vec<InstanceSummary>, MarugotoError> {
        self.listing(|document| document.players.iter().any(|p| p == email))
    }

    fn hosts(&self, email: &str) -> Result<Vec<InstanceSummary>, MarugotoError> {
        self.listing(|document| document.host.as_deref() == Some(email))
    }
}

// =============================================================================
// TESTS
// =============================================================================
