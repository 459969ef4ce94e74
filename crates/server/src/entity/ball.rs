//! The match ball.

use glam::Vec2;
use protocol::packets::BallSnapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Ball {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }

    /// A ball at rest on `spot`.
    pub fn at_rest(spot: Vec2) -> Self {
        Self::new(spot, Vec2::ZERO)
    }

    pub fn snapshot(&self) -> BallSnapshot {
        BallSnapshot {
            x: self.position.x,
            y: self.position.y,
            vx: self.velocity.x,
            vy: self.velocity.y,
        }
    }
}
