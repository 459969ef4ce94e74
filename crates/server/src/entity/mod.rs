//! Match entities.
//!
//! This module defines the players and the ball.

mod ball;
mod player;

pub use ball::Ball;
pub use player::Player;
