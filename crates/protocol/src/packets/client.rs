//! Client -> Server message parsing.

use crate::{Position, ProtocolError, Team};
use serde::{Deserialize, Serialize};

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join a team under a display name.
    JoinTeam { team: Team, name: String },
    /// Movement direction plus kick flag.
    PlayerInput {
        movement: Movement,
        #[serde(default)]
        kick: bool,
    },
    /// Chat line for everyone or for the sender's team.
    ChatMessage {
        message: String,
        #[serde(default)]
        mode: ChatMode,
    },
}

impl ClientMessage {
    /// Parse a client message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Movement direction; each axis is expected in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Movement {
    pub x: f32,
    pub y: f32,
}

impl Movement {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Direction with both axes clamped to [-1, 1].
    pub fn clamped(self) -> Position {
        Position::new(self.x.clamp(-1.0, 1.0), self.y.clamp(-1.0, 1.0))
    }
}

/// Chat audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    All,
    Team,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join() {
        let msg = ClientMessage::parse(r#"{"type":"joinTeam","data":{"team":"B","name":"Ana"}}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinTeam {
                team: Team::B,
                name: "Ana".to_string()
            }
        );
    }

    #[test]
    fn test_parse_input_defaults_kick() {
        let msg =
            ClientMessage::parse(r#"{"type":"playerInput","data":{"movement":{"x":1,"y":-0.5}}}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlayerInput {
                movement: Movement::new(1.0, -0.5),
                kick: false
            }
        );
    }

    #[test]
    fn test_chat_mode_defaults_to_all() {
        let msg = ClientMessage::parse(r#"{"type":"chatMessage","data":{"message":"hi"}}"#).unwrap();
        match msg {
            ClientMessage::ChatMessage { mode, .. } => assert_eq!(mode, ChatMode::All),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_team_and_event() {
        assert!(ClientMessage::parse(r#"{"type":"joinTeam","data":{"team":"C","name":"x"}}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"spectate"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
    }

    #[test]
    fn test_movement_clamped() {
        let v = Movement::new(3.0, -7.5).clamped();
        assert_eq!(v, Position::new(1.0, -1.0));
    }
}
