//! Ball physics.
//!
//! The ball is the only body integrated per tick. Players move on input
//! receipt; their kicks are queued as directions and turned into impulses here.

use crate::config::Config;
use crate::entity::Ball;
use crate::field::Field;
use crate::world::MatchState;
use glam::Vec2;

/// Tunables of the ball model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    pub friction: f32,
    pub restitution: f32,
    pub stop_epsilon: f32,
    pub kick_range: f32,
    pub kick_power: f32,
}

impl PhysicsParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            friction: config.ball.friction,
            restitution: config.ball.restitution,
            stop_epsilon: config.ball.stop_epsilon,
            kick_range: config.player.kick_range,
            kick_power: config.player.kick_power,
        }
    }
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Advance the match by one tick: queued kicks first, then the ball.
pub fn advance(state: &mut MatchState, field: &Field, params: &PhysicsParams) {
    resolve_kicks(state, params.kick_power);
    state.ball = step_ball(state.ball, field, params);
}

/// Integrate, apply friction, bounce off the walls and snap slow axes to rest.
pub fn step_ball(mut ball: Ball, field: &Field, params: &PhysicsParams) -> Ball {
    ball.position += ball.velocity;
    ball.velocity *= params.friction;

    let mut ball = field.clamp_ball(ball, params.restitution);

    if ball.velocity.x.abs() < params.stop_epsilon {
        ball.velocity.x = 0.0;
    }
    if ball.velocity.y.abs() < params.stop_epsilon {
        ball.velocity.y = 0.0;
    }
    ball
}

/// Direction of a kick from `player` at `ball`, if the ball is within reach.
///
/// Returns `None` outside `kick_range` and when both centers coincide.
pub fn aim_kick(player: Vec2, ball: Vec2, kick_range: f32) -> Option<Vec2> {
    let delta = ball - player;
    let distance = delta.length();
    if distance >= kick_range || distance == 0.0 {
        return None;
    }
    Some(Vec2::from_angle(delta.y.atan2(delta.x)))
}

/// Apply every queued kick. Kicks resolve in player-id order, so the last
/// applied impulse of a tick is deterministic.
fn resolve_kicks(state: &mut MatchState, kick_power: f32) {
    let mut kickers: Vec<(u32, Vec2)> = state
        .players
        .values_mut()
        .filter_map(|p| p.pending_kick.take().map(|dir| (p.id, dir)))
        .collect();
    kickers.sort_unstable_by_key(|(id, _)| *id);

    for (_, direction) in kickers {
        state.ball.velocity = direction * kick_power;
    }
}
