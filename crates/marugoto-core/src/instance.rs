//! # Play-through Instances
//!
//! A `GameInstance` is one time-bounded session of a Game. It is created
//! only from an existing Game, owns its `PlayerState`s, and is the only
//! place where per-player progression lives; the Game itself never changes
//! while people play it.

use crate::graph::Graph;
use crate::node::{GameInstance, NodeData, PlayerState};
use crate::traversal::reachable_tasks;
use crate::{GraphKey, MarugotoError, NodeId};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

impl Graph {
    pub fn game_instance(&self, id: NodeId) -> Result<&GameInstance, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::GameInstance(i) => Ok(i),
            other => Err(MarugotoError::consistency(format!(
                "expected game_instance at {:?}, found {}",
                id,
                other.kind()
            ))),
        }
    }

    pub fn player_state(&self, id: NodeId) -> Result<&PlayerState, MarugotoError> {
        match &self.node(id)?.data {
            NodeData::PlayerState(s) => Ok(s),
            other => Err(MarugotoError::consistency(format!(
                "expected player_state at {:?}, found {}",
                id,
                other.kind()
            ))),
        }
    }

    /// Start a new play-through of `game`, hosted by `host`.
    pub fn start_new_instance(
        &mut self,
        game: NodeId,
        name: impl Into<String>,
        host: NodeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<NodeId, MarugotoError> {
        self.game(game)?;
        self.player(host)?;
        if start >= end {
            return Err(MarugotoError::InvalidTimeWindow);
        }
        Ok(self.create_node(NodeData::GameInstance(GameInstance {
            name: name.into(),
            start,
            end,
            game: Some(game),
            host: Some(host),
            player_states: Vec::new(),
        })))
    }

    /// The state `player` holds in `instance`, if they joined.
    pub fn state_of(&self, instance: NodeId, player: NodeId) -> Result<Option<NodeId>, MarugotoError> {
        for &state in &self.game_instance(instance)?.player_states {
            if self.player_state(state)?.player == Some(player) {
                return Ok(Some(state));
            }
        }
        Ok(None)
    }

    /// Add `player` to `instance` under a session pseudonym and role.
    ///
    /// The new state starts at the game's start waypoint. A player joins an
    /// instance once.
    pub fn add_player(
        &mut self,
        instance: NodeId,
        player: NodeId,
        first_name: impl Into<String>,
        role: impl Into<String>,
    ) -> Result<NodeId, MarugotoError> {
        self.player(player)?;
        if self.state_of(instance, player)?.is_some() {
            return Err(MarugotoError::consistency("player already joined this instance"));
        }
        let start = match self.game_instance(instance)?.game {
            Some(game) => self.game(game)?.start,
            None => None,
        };

        let state = self.create_node(NodeData::PlayerState(PlayerState {
            first_name: first_name.into(),
            role: role.into(),
            player: Some(player),
            current_waypoint: start,
            completed_tasks: Vec::new(),
        }));
        if let NodeData::GameInstance(i) = &mut self.node_mut(instance)?.data {
            i.player_states.push(state);
        }
        Ok(state)
    }

    /// Move `player` to `waypoint` of the instance's game.
    pub fn advance_player(
        &mut self,
        instance: NodeId,
        player: NodeId,
        waypoint: NodeId,
    ) -> Result<(), MarugotoError> {
        let state = self.joined_state(instance, player)?;
        let key = self.waypoint(waypoint)?.graph;
        if self.instance_game_key(instance)? != Some(key) {
            return Err(MarugotoError::consistency(
                "waypoint does not belong to the instance's game",
            ));
        }
        if let NodeData::PlayerState(s) = &mut self.node_mut(state)?.data {
            s.current_waypoint = Some(waypoint);
        }
        Ok(())
    }

    /// Mark `task` as completed by `player`. Completing twice is a no-op.
    pub fn complete_task(
        &mut self,
        instance: NodeId,
        player: NodeId,
        task: NodeId,
    ) -> Result<(), MarugotoError> {
        let state = self.joined_state(instance, player)?;
        self.task(task)?;
        let in_game = match self.game_instance(instance)?.game {
            Some(game) => reachable_tasks(self, game)?.contains(&task),
            None => false,
        };
        if !in_game {
            return Err(MarugotoError::consistency(
                "task is not reachable from the instance's game",
            ));
        }
        if let NodeData::PlayerState(s) = &mut self.node_mut(state)?.data {
            if !s.completed_tasks.contains(&task) {
                s.completed_tasks.push(task);
            }
        }
        Ok(())
    }

    fn joined_state(&self, instance: NodeId, player: NodeId) -> Result<NodeId, MarugotoError> {
        self.state_of(instance, player)?
            .ok_or_else(|| MarugotoError::consistency("player has not joined this instance"))
    }

    fn instance_game_key(&self, instance: NodeId) -> Result<Option<GraphKey>, MarugotoError> {
        match self.game_instance(instance)?.game {
            Some(game) => Ok(Some(self.game(game)?.graph)),
            None => Ok(None),
        }
    }

    /// Time window, roster and progression rules of one instance.
    pub(crate) fn check_instance(&self, id: NodeId) -> Result<(), MarugotoError> {
        let instance = self.game_instance(id)?;
        if instance.start >= instance.end {
            return Err(MarugotoError::InvalidTimeWindow);
        }
        if instance.game.is_none() {
            return Err(MarugotoError::consistency("game instance has no game"));
        }
        if instance.host.is_none() {
            return Err(MarugotoError::consistency("game instance has no host"));
        }
        let key = self.instance_game_key(id)?;
        let mut players = BTreeSet::new();
        for &state in &instance.player_states {
            let state = self.player_state(state)?;
            if let Some(player) = state.player {
                if !players.insert(player) {
                    return Err(MarugotoError::consistency(
                        "player joined the same instance twice",
                    ));
                }
            }
            if let Some(waypoint) = state.current_waypoint {
                if Some(self.waypoint(waypoint)?.graph) != key {
                    return Err(MarugotoError::consistency(
                        "player stands on a waypoint outside the instance's game",
                    ));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
