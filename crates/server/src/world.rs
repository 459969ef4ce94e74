//! Match state: the single authoritative aggregate of one game.

use crate::entity::{Ball, Player};
use crate::field::Field;
use crate::lifecycle::MatchClock;
use protocol::packets::GameSnapshot;
use protocol::Team;
use std::collections::HashMap;

/// Players, ball, scores and clock of one match.
///
/// A reset builds a new value with the next generation instead of clearing
/// this one; timers compare generations to detect that they are stale.
#[derive(Debug, Clone)]
pub struct MatchState {
    pub generation: u64,
    pub players: HashMap<u32, Player>,
    pub ball: Ball,
    pub team_a_score: u32,
    pub team_b_score: u32,
    pub clock: MatchClock,
}

impl MatchState {
    pub fn new(generation: u64, field: &Field, duration_secs: u32) -> Self {
        Self {
            generation,
            players: HashMap::new(),
            ball: Ball::at_rest(field.center()),
            team_a_score: 0,
            team_b_score: 0,
            clock: MatchClock::new(duration_secs),
        }
    }

    pub fn score(&self, team: Team) -> u32 {
        match team {
            Team::A => self.team_a_score,
            Team::B => self.team_b_score,
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self
                .players
                .iter()
                .map(|(id, player)| (*id, player.snapshot()))
                .collect(),
            ball: self.ball.snapshot(),
            team_a_score: self.team_a_score,
            team_b_score: self.team_b_score,
            game_time: self.clock.remaining(),
            game_started: self.clock.is_started(),
        }
    }
}
