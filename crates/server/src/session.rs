//! Session manager: joining, input, leaving and the roster.

use crate::config::Config;
use crate::entity::Player;
use crate::error::{GameError, GameResult};
use crate::field::Field;
use crate::physics;
use crate::world::MatchState;
use glam::Vec2;
use protocol::packets::{PlayerSnapshot, RosterEntry};
use protocol::Team;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-player rules taken from the config.
#[derive(Debug, Clone, Copy)]
pub struct SessionRules {
    pub speed: f32,
    pub kick_range: f32,
    pub max_name_length: usize,
    pub min_players: usize,
}

impl SessionRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            speed: config.player.speed,
            kick_range: config.player.kick_range,
            max_name_length: config.player.max_name_length.max(1),
            min_players: config.game.min_players,
        }
    }
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub player: PlayerSnapshot,
    /// The join brought the population to the threshold and started the clock.
    pub kicked_off: bool,
}

/// Trim a display name and cut it to `max_len` characters.
pub fn sanitize_name(name: &str, max_len: usize) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidName);
    }
    Ok(name.chars().take(max_len).collect())
}

impl MatchState {
    /// Register a player for connection `id` on `team`.
    pub fn join(
        &mut self,
        id: u32,
        name: &str,
        team: Team,
        field: &Field,
        rules: &SessionRules,
    ) -> GameResult<JoinOutcome> {
        let name = sanitize_name(name, rules.max_name_length)?;
        if self.players.contains_key(&id) {
            return Err(GameError::AlreadyJoined);
        }

        let depth: f32 = rand::rng().random();
        let player = Player::new(id, name, team, field.spawn_point(team, depth));
        let snapshot = player.snapshot();
        self.players.insert(id, player);

        let kicked_off = self.clock.try_start(self.players.len(), rules.min_players);
        Ok(JoinOutcome {
            player: snapshot,
            kicked_off,
        })
    }

    /// Move the player of connection `id` and queue a kick if asked.
    ///
    /// Returns false when the connection has no player.
    pub fn apply_input(
        &mut self,
        id: u32,
        movement: Vec2,
        kick: bool,
        field: &Field,
        rules: &SessionRules,
    ) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };

        player.velocity = movement * rules.speed;
        player.position = field.clamp_player_position(player.position + player.velocity);

        if kick {
            match physics::aim_kick(player.position, self.ball.position, rules.kick_range) {
                Some(direction) => player.pending_kick = Some(direction),
                None => debug!("Player {} kicked at nothing", id),
            }
        }
        true
    }

    /// Remove the player of connection `id`, if any.
    pub fn leave(&mut self, id: u32) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Player list keyed by connection ID.
    pub fn roster(&self) -> BTreeMap<u32, RosterEntry> {
        self.players
            .iter()
            .map(|(id, player)| (*id, player.roster_entry()))
            .collect()
    }

    /// Connection IDs of everyone on `team`.
    pub fn team_members(&self, team: Team) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .players
            .values()
            .filter(|p| p.team() == team)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
