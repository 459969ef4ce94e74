//! Player entity.

use glam::Vec2;
use protocol::packets::{PlayerSnapshot, RosterEntry};
use protocol::Team;

/// A player controlled by one connection.
#[derive(Debug, Clone)]
pub struct Player {
    /// Connection ID that owns this player.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Team, fixed for the player's lifetime.
    team: Team,
    /// Position in field coordinates.
    pub position: Vec2,
    /// Displacement applied by the latest input.
    pub velocity: Vec2,
    /// Unit direction of a kick waiting for the next tick.
    pub pending_kick: Option<Vec2>,
}

impl Player {
    /// Create a new player at rest.
    pub fn new(id: u32, name: String, team: Team, position: Vec2) -> Self {
        Self {
            id,
            name,
            team,
            position,
            velocity: Vec2::ZERO,
            pending_kick: None,
        }
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            team: self.team,
            x: self.position.x,
            y: self.position.y,
            vx: self.velocity.x,
            vy: self.velocity.y,
        }
    }

    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            name: self.name.clone(),
            team: self.team,
        }
    }
}
