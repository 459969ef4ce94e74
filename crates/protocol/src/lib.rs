//! Shared protocol crate for kickoff.
//!
//! This crate contains:
//! - Message definitions for both directions (`packets`)
//! - JSON framing helpers
//! - Shared types (Team, Position, etc.)

mod error;
pub mod packets;

pub use error::ProtocolError;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::A => f.write_str("A"),
            Team::B => f.write_str("B"),
        }
    }
}

/// Represents a 2D position using glam's Vec2.
pub type Position = glam::Vec2;
