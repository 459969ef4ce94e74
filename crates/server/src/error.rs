//! Game error types.

use protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while handling a client message.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid player name")]
    InvalidName,

    #[error("Connection already joined a team")]
    AlreadyJoined,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Text sent back to the originating connection.
    pub fn client_message(&self) -> &'static str {
        match self {
            GameError::InvalidName => "Invalid player name",
            GameError::AlreadyJoined => "Already joined",
            GameError::Protocol(_) => "Malformed message",
            GameError::Internal(_) => "Failed to join team",
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
