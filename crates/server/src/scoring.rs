//! Goal detection.

use crate::entity::Ball;
use crate::field::{Field, GoalSide};
use crate::world::MatchState;
use protocol::Team;
use tracing::info;

/// Credit a goal if the ball sits in a goal mouth, then re-center it.
///
/// At most one goal per call; the left goal is checked first.
pub fn check_goals(state: &mut MatchState, field: &Field) -> Option<Team> {
    let side = GoalSide::ALL
        .into_iter()
        .find(|side| field.is_in_goal_mouth(state.ball.position, *side))?;

    let team = side.scoring_team();
    match team {
        Team::A => state.team_a_score += 1,
        Team::B => state.team_b_score += 1,
    }
    state.ball = Ball::at_rest(field.center());

    info!(
        "Goal for team {} ({} - {})",
        team, state.team_a_score, state.team_b_score
    );
    Some(team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use glam::Vec2;

    fn setup() -> (Field, MatchState) {
        let field = Field::new(&FieldConfig::default());
        let state = MatchState::new(1, &field, 300);
        (field, state)
    }

    #[test]
    fn test_left_goal_credits_team_b() {
        let (field, mut state) = setup();
        state.ball = Ball::new(Vec2::new(15.0, 300.0), Vec2::new(-6.0, 0.0));
        assert_eq!(check_goals(&mut state, &field), Some(Team::B));
        assert_eq!(state.team_b_score, 1);
        assert_eq!(state.team_a_score, 0);
        assert_eq!(state.ball, Ball::at_rest(Vec2::new(500.0, 300.0)));
    }

    #[test]
    fn test_right_goal_credits_team_a() {
        let (field, mut state) = setup();
        state.ball = Ball::new(Vec2::new(990.0, 250.0), Vec2::new(6.0, 0.0));
        assert_eq!(check_goals(&mut state, &field), Some(Team::A));
        assert_eq!(state.score(Team::A), 1);
    }

    #[test]
    fn test_no_goal_outside_mouth() {
        let (field, mut state) = setup();
        state.ball = Ball::new(Vec2::new(20.0, 100.0), Vec2::ZERO);
        assert_eq!(check_goals(&mut state, &field), None);
        state.ball = Ball::new(Vec2::new(500.0, 300.0), Vec2::new(3.0, 0.0));
        assert_eq!(check_goals(&mut state, &field), None);
        assert_eq!(state.team_a_score + state.team_b_score, 0);
    }

    #[test]
    fn test_lingering_ball_counts_once() {
        let (field, mut state) = setup();
        state.ball = Ball::new(Vec2::new(5.0, 300.0), Vec2::new(-1.0, 0.0));
        assert_eq!(check_goals(&mut state, &field), Some(Team::B));
        for _ in 0..10 {
            assert_eq!(check_goals(&mut state, &field), None);
        }
        assert_eq!(state.team_b_score, 1);
    }
}
