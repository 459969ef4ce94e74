//! Server -> Client message building.

use crate::{ProtocolError, Team};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message sent from the server to one or more clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Sent to the joining connection only.
    PlayerJoined {
        player_id: u32,
        team: Team,
        player: PlayerSnapshot,
    },
    /// Full match snapshot, sent every tick.
    GameState(GameSnapshot),
    /// Roster, sent on every join and leave.
    PlayerList(BTreeMap<u32, RosterEntry>),
    Goal { team: Team },
    GameEnd {
        winner: Winner,
        team_a_score: u32,
        team_b_score: u32,
    },
    /// Clients return to team selection.
    GameReset,
    ChatMessage(ChatLine),
    /// Sent to the offending connection only.
    Error { message: String },
}

impl ServerMessage {
    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a server message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Player as seen on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u32,
    pub name: String,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// The whole match state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub players: BTreeMap<u32, PlayerSnapshot>,
    pub ball: BallSnapshot,
    pub team_a_score: u32,
    pub team_b_score: u32,
    /// Remaining seconds.
    pub game_time: u32,
    pub game_started: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub team: Team,
}

/// Match outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    A,
    B,
    #[serde(rename = "draw")]
    Draw,
}

impl Winner {
    pub fn from_scores(team_a: u32, team_b: u32) -> Self {
        match team_a.cmp(&team_b) {
            std::cmp::Ordering::Greater => Winner::A,
            std::cmp::Ordering::Less => Winner::B,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

/// A chat line. System lines have an empty `player_name` and no team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLine {
    pub player_name: String,
    pub message: String,
    pub team: Option<Team>,
    pub timestamp: u64,
    pub is_team_message: bool,
}

impl ChatLine {
    /// Build a server-originated line.
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            player_name: String::new(),
            message: message.into(),
            team: None,
            timestamp: super::timestamp_millis(),
            is_team_message: false,
        }
    }
}
