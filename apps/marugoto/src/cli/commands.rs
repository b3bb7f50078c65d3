//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::sample::sample_content;
use crate::config::{Backend, Config};
use marugoto_core::{
    ContentStore, Decoded, InstanceSummary, MarugotoError, MemoryStore, NodeKind, Payload,
    RedbStore, decode, dialog_nodes, encode, payload_digest, reachable_tasks,
    reachable_waypoints,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
///
/// This prevents memory exhaustion from malicious or accidental large files.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), MarugotoError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MarugotoError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(MarugotoError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path: it must resolve to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, MarugotoError> {
    // Canonicalize resolves "..", symlinks, and validates existence
    let canonical = path.canonicalize().map_err(|e| {
        MarugotoError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MarugotoError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, MarugotoError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        MarugotoError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(MarugotoError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| MarugotoError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read and parse a payload file within the configured size limit.
pub fn read_payload(config: &Config, path: &Path) -> Result<Payload, MarugotoError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, config.max_payload_bytes)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| MarugotoError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;
    Payload::from_json(&text)
}

/// Write a payload as indented JSON.
pub fn write_payload(path: &Path, payload: &Payload) -> Result<PathBuf, MarugotoError> {
    let path = validate_output_path(path)?;
    std::fs::write(&path, payload.to_json_pretty()?)
        .map_err(|e| MarugotoError::IoError(format!("Cannot write '{}': {}", path.display(), e)))?;
    Ok(path)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// STORE
// =============================================================================

/// Open the configured store.
pub fn open_store(config: &Config) -> Result<Box<dyn ContentStore>, MarugotoError> {
    match config.backend {
        Backend::Redb => Ok(Box::new(RedbStore::open(&config.database)?)),
        Backend::Memory => {
            tracing::warn!("memory backend: nothing is kept after this command exits");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), MarugotoError> {
    match config.backend {
        Backend::Redb => {
            let db_path = &config.database;
            if db_path.exists() {
                if !force {
                    return Err(MarugotoError::AlreadyExists(format!(
                        "database {:?} (use --force to overwrite)",
                        db_path
                    )));
                }
                std::fs::remove_file(db_path).map_err(|e| {
                    MarugotoError::IoError(format!("Cannot remove {:?}: {}", db_path, e))
                })?;
            }
            RedbStore::open(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        Backend::Memory => {
            println!("Memory backend needs no initialization");
        }
    }

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Decode a payload file and report its contents.
pub fn cmd_check(config: &Config, json_mode: bool, file: &Path) -> Result<(), MarugotoError> {
    let payload = read_payload(config, file)?;
    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &payload.records {
        *kinds.entry(record.kind.as_str()).or_insert(0) += 1;
    }

    let Some(decoded) = decode(&payload)? else {
        if json_mode {
            print_json(&serde_json::json!({ "file": file.to_string_lossy(), "empty": true }));
        } else {
            println!("{}: empty payload (absent root)", file.display());
        }
        return Ok(());
    };

    let root_kind = decoded.graph.kind(decoded.root)?;
    let root_uid = decoded.graph.uid(decoded.root)?.to_string();
    let (waypoints, tasks) = if root_kind == NodeKind::Game {
        (
            Some(reachable_waypoints(&decoded.graph, decoded.root)?.len()),
            Some(reachable_tasks(&decoded.graph, decoded.root)?.len()),
        )
    } else {
        (None, None)
    };

    if json_mode {
        print_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "records": payload.len(),
            "roots": &payload.roots,
            "root_kind": root_kind.as_str(),
            "root_id": root_uid,
            "kinds": kinds,
            "waypoints": waypoints,
            "tasks": tasks,
        }));
        return Ok(());
    }

    println!("Payload Check");
    println!("=============");
    println!("File:    {}", file.display());
    println!("Records: {}", payload.len());
    println!("Root:    {} {}", root_kind, root_uid);
    if let (Some(waypoints), Some(tasks)) = (waypoints, tasks) {
        println!("Route:   {} waypoints, {} tasks", waypoints, tasks);
    }
    println!();
    for (kind, count) in &kinds {
        println!("  {:<24} {}", kind, count);
    }

    Ok(())
}

// =============================================================================
// SAMPLE COMMAND
// =============================================================================

/// Write the sample game (or its running instance) to a payload file.
pub fn cmd_sample(
    config: &Config,
    output: &Path,
    title: &str,
    instance: bool,
) -> Result<(), MarugotoError> {
    let sample = sample_content(title, config.identity)?;
    let root = if instance { sample.instance } else { sample.game };
    let payload = encode(&sample.graph, Some(root))?;
    let path = write_payload(output, &payload)?;

    println!(
        "Wrote {} records ({}) to {:?}",
        payload.len(),
        sample.graph.kind(root)?,
        path
    );
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Store the game or instance held by a payload file.
pub fn cmd_import(
    config: &Config,
    json_mode: bool,
    file: &Path,
    update: bool,
) -> Result<(), MarugotoError> {
    let payload = read_payload(config, file)?;
    let decoded = decode(&payload)?.ok_or_else(|| {
        MarugotoError::schema("<payload>", "nothing to import from an empty payload")
    })?;
    let kind = decoded.graph.kind(decoded.root)?;
    let uid = decoded.graph.uid(decoded.root)?.to_string();
    let mut store = open_store(config)?;

    let name = match kind {
        NodeKind::Game => {
            if update {
                store.update_game(&decoded.graph, decoded.root)?;
            } else {
                store.create_game(&decoded.graph, decoded.root)?;
            }
            decoded.graph.game(decoded.root)?.title.clone()
        }
        NodeKind::GameInstance => {
            store.save_instance(&decoded.graph, decoded.root)?;
            decoded.graph.game_instance(decoded.root)?.name.clone()
        }
        other => {
            return Err(MarugotoError::schema(
                "<payload>",
                format!("cannot import a {} root, expected game or game_instance", other),
            ));
        }
    };
    tracing::info!(kind = kind.as_str(), id = %uid, "imported {}", name);

    if json_mode {
        print_json(&serde_json::json!({ "kind": kind.as_str(), "id": uid, "name": name }));
    } else {
        println!("Imported {} '{}' ({})", kind, name, uid);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write a stored game to a payload file.
pub fn cmd_export(config: &Config, title: &str, output: &Path) -> Result<(), MarugotoError> {
    let store = open_store(config)?;
    let decoded = store
        .read_game(title)?
        .ok_or_else(|| MarugotoError::NotFound(format!("game '{}'", title)))?;
    let payload = encode(&decoded.graph, Some(decoded.root))?;
    let path = write_payload(output, &payload)?;

    println!("Exported '{}' ({} records) to {:?}", title, payload.len(), path);
    Ok(())
}

// =============================================================================
// LISTING COMMANDS
// =============================================================================

/// List stored game titles.
pub fn cmd_games(config: &Config, json_mode: bool) -> Result<(), MarugotoError> {
    let titles = open_store(config)?.game_titles()?;

    if json_mode {
        print_json(&serde_json::json!({ "games": titles }));
    } else if titles.is_empty() {
        println!("No games stored");
    } else {
        for title in &titles {
            println!("{}", title);
        }
    }
    Ok(())
}

/// List stored dialogs with the number of nodes each can reach.
pub fn cmd_dialogs(config: &Config, json_mode: bool) -> Result<(), MarugotoError> {
    let dialogs = open_store(config)?.dialogs()?;
    let mut rows = Vec::with_capacity(dialogs.len());
    for Decoded { graph, root, .. } in &dialogs {
        rows.push((graph.uid(*root)?.to_string(), dialog_nodes(graph, *root)?.len()));
    }

    if json_mode {
        let list: Vec<_> = rows
            .iter()
            .map(|(id, nodes)| serde_json::json!({ "id": id, "nodes": nodes }))
            .collect();
        print_json(&serde_json::json!({ "dialogs": list }));
    } else if rows.is_empty() {
        println!("No dialogs stored");
    } else {
        for (id, nodes) in &rows {
            println!("{}  {} nodes", id, nodes);
        }
    }
    Ok(())
}

fn print_summaries(json_mode: bool, summaries: &[InstanceSummary]) {
    if json_mode {
        print_json(&serde_json::json!(summaries));
    } else if summaries.is_empty() {
        println!("No instances");
    } else {
        for summary in summaries {
            println!("{}  {}", summary.id, summary.name);
        }
    }
}

/// Instances the player has joined.
pub fn cmd_saves(config: &Config, json_mode: bool, player: &str) -> Result<(), MarugotoError> {
    let saves = open_store(config)?.saves(player)?;
    print_summaries(json_mode, &saves);
    Ok(())
}

/// Instances the player hosts.
pub fn cmd_hosts(config: &Config, json_mode: bool, player: &str) -> Result<(), MarugotoError> {
    let hosts = open_store(config)?.hosts(player)?;
    print_summaries(json_mode, &hosts);
    Ok(())
}

// =============================================================================
// DELETE COMMAND
// =============================================================================

/// Remove a game and its dialogs. The redb file is compacted afterwards.
pub fn cmd_delete(config: &Config, title: &str) -> Result<(), MarugotoError> {
    match config.backend {
        Backend::Redb => {
            let mut store = RedbStore::open(&config.database)?;
            store.delete_game(title)?;
            store.compact()?;
        }
        Backend::Memory => open_store(config)?.delete_game(title)?,
    }
    println!("Deleted '{}'", title);
    Ok(())
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// One player's progress in a loaded instance.
#[derive(Debug, Serialize)]
struct PlayerProgress {
    first_name: String,
    role: String,
    email: Option<String>,
    waypoint: Option<String>,
    completed_tasks: usize,
}

/// Show a stored instance: its game, window, host and player progress.
pub fn cmd_load(config: &Config, json_mode: bool, id: &str) -> Result<(), MarugotoError> {
    let decoded = open_store(config)?
        .load_instance(id)?
        .ok_or_else(|| MarugotoError::NotFound(format!("instance '{}'", id)))?;
    let graph = &decoded.graph;
    let instance = graph.game_instance(decoded.root)?;

    let game = match instance.game {
        Some(game) => Some(graph.game(game)?.title.clone()),
        None => None,
    };
    let host = match instance.host {
        Some(host) => Some(graph.player(host)?.email.clone()),
        None => None,
    };
    let mut players = Vec::new();
    for &state in &instance.player_states {
        let state = graph.player_state(state)?;
        let email = match state.player {
            Some(player) => Some(graph.player(player)?.email.clone()),
            None => None,
        };
        let waypoint = match state.current_waypoint {
            Some(waypoint) => Some(graph.waypoint(waypoint)?.name.clone()),
            None => None,
        };
        players.push(PlayerProgress {
            first_name: state.first_name.clone(),
            role: state.role.clone(),
            email,
            waypoint,
            completed_tasks: state.completed_tasks.len(),
        });
    }

    let output = serde_json::json!({
        "id": id,
        "name": instance.name,
        "game": game,
        "start": instance.start.to_rfc3339(),
        "end": instance.end.to_rfc3339(),
        "host": host,
        "players": players,
    });
    if json_mode {
        print_json(&output);
        return Ok(());
    }

    println!("Instance {}", instance.name);
    println!("==========");
    println!("Game:   {}", game.as_deref().unwrap_or("-"));
    println!("Window: {} .. {}", instance.start.to_rfc3339(), instance.end.to_rfc3339());
    println!("Host:   {}", host.as_deref().unwrap_or("-"));
    println!();
    for player in &players {
        println!(
            "  {} ({}) {} at {} - {} tasks done",
            player.first_name,
            player.role,
            player.email.as_deref().unwrap_or("-"),
            player.waypoint.as_deref().unwrap_or("-"),
            player.completed_tasks
        );
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the BLAKE3 digest of a payload file's canonical form.
pub fn cmd_hash(config: &Config, json_mode: bool, file: &Path) -> Result<(), MarugotoError> {
    let payload = read_payload(config, file)?;
    let digest = payload_digest(&payload)?;

    if json_mode {
        print_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "records": payload.len(),
            "blake3": digest,
        }));
    } else {
        println!("{}  {}", digest, file.display());
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
