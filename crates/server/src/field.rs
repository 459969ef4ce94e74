//! Field geometry.
//!
//! Pure helpers shared by the physics, the goal detector and the session
//! manager: clamping entities to the pitch and locating the goal mouths.

use crate::config::FieldConfig;
use crate::entity::Ball;
use glam::Vec2;
use protocol::Team;

/// One of the two goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalSide {
    /// Defended by team A.
    Left,
    /// Defended by team B.
    Right,
}

impl GoalSide {
    /// Checking order of the goal detector.
    pub const ALL: [GoalSide; 2] = [GoalSide::Left, GoalSide::Right];

    /// Team credited when the ball enters this goal.
    pub const fn scoring_team(self) -> Team {
        match self {
            GoalSide::Left => Team::B,
            GoalSide::Right => Team::A,
        }
    }
}

/// Pitch bounds and radii. The field spans `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub width: f32,
    pub height: f32,
    pub goal_width: f32,
    pub goal_depth: f32,
    pub player_radius: f32,
    pub ball_radius: f32,
}

impl Field {
    pub fn new(config: &FieldConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            goal_width: config.goal_width,
            goal_depth: config.goal_depth,
            player_radius: config.player_radius,
            ball_radius: config.ball_radius,
        }
    }

    pub const fn left(&self) -> f32 {
        0.0
    }

    pub const fn right(&self) -> f32 {
        self.width
    }

    pub const fn top(&self) -> f32 {
        0.0
    }

    pub const fn bottom(&self) -> f32 {
        self.height
    }

    /// Kick-off spot.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Upper edge of both goal mouths.
    pub fn goal_top(&self) -> f32 {
        (self.height - self.goal_width) / 2.0
    }

    /// Lower edge of both goal mouths.
    pub fn goal_bottom(&self) -> f32 {
        self.goal_top() + self.goal_width
    }

    /// Whether `y` lies in the goal-mouth span (edges included).
    pub fn within_goal_span(&self, y: f32) -> bool {
        y >= self.goal_top() && y <= self.goal_bottom()
    }

    /// X coordinate the ball must reach to score in `side`.
    pub fn goal_line(&self, side: GoalSide) -> f32 {
        match side {
            GoalSide::Left => self.left() + self.goal_depth,
            GoalSide::Right => self.right() - self.goal_depth,
        }
    }

    /// Whether `position` is past the goal line of `side` and inside its mouth.
    pub fn is_in_goal_mouth(&self, position: Vec2, side: GoalSide) -> bool {
        if !self.within_goal_span(position.y) {
            return false;
        }
        match side {
            GoalSide::Left => position.x <= self.goal_line(side),
            GoalSide::Right => position.x >= self.goal_line(side),
        }
    }

    /// Keep a player at least one radius away from every edge.
    pub fn clamp_player_position(&self, position: Vec2) -> Vec2 {
        let r = self.player_radius;
        Vec2::new(
            position.x.clamp(self.left() + r, self.right() - r),
            position.y.clamp(self.top() + r, self.bottom() - r),
        )
    }

    /// Keep the ball inside the walls, bouncing it with `restitution`.
    ///
    /// Side walls are open across the goal-mouth span: a ball there is left
    /// unclamped so the goal detector can see it.
    pub fn clamp_ball(&self, mut ball: Ball, restitution: f32) -> Ball {
        let r = self.ball_radius;
        let (min_x, max_x) = (self.left() + r, self.right() - r);
        let (min_y, max_y) = (self.top() + r, self.bottom() - r);

        if !self.within_goal_span(ball.position.y) {
            if ball.position.x <= min_x {
                ball.position.x = min_x;
                if ball.velocity.x < 0.0 {
                    ball.velocity.x = -ball.velocity.x * restitution;
                }
            } else if ball.position.x >= max_x {
                ball.position.x = max_x;
                if ball.velocity.x > 0.0 {
                    ball.velocity.x = -ball.velocity.x * restitution;
                }
            }
        }

        if ball.position.y <= min_y {
            ball.position.y = min_y;
            if ball.velocity.y < 0.0 {
                ball.velocity.y = -ball.velocity.y * restitution;
            }
        } else if ball.position.y >= max_y {
            ball.position.y = max_y;
            if ball.velocity.y > 0.0 {
                ball.velocity.y = -ball.velocity.y * restitution;
            }
        }

        ball
    }

    /// Spawn point for `team`, `depth` in [0, 1] picking the height within
    /// the middle third of the field.
    pub fn spawn_point(&self, team: Team, depth: f32) -> Vec2 {
        let x = match team {
            Team::A => self.width * 0.15,
            Team::B => self.width * 0.85,
        };
        let y = self.height / 3.0 + depth.clamp(0.0, 1.0) * self.height / 3.0;
        self.clamp_player_position(Vec2::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Field {
        Field::new(&FieldConfig::default())
    }

    #[test]
    fn test_goal_mouth_span() {
        let f = field();
        assert_eq!(f.goal_top(), 240.0);
        assert_eq!(f.goal_bottom(), 360.0);
        assert!(f.is_in_goal_mouth(Vec2::new(20.0, 240.0), GoalSide::Left));
        assert!(f.is_in_goal_mouth(Vec2::new(985.0, 360.0), GoalSide::Right));
        assert!(!f.is_in_goal_mouth(Vec2::new(20.0, 239.0), GoalSide::Left));
        assert!(!f.is_in_goal_mouth(Vec2::new(21.0, 300.0), GoalSide::Left));
        assert!(!f.is_in_goal_mouth(Vec2::new(10.0, 300.0), GoalSide::Right));
    }

    #[test]
    fn test_clamp_player_stays_inside() {
        let f = field();
        let corners = [
            Vec2::new(-50.0, -50.0),
            Vec2::new(2000.0, 300.0),
            Vec2::new(500.0, 900.0),
            Vec2::new(29.9, 570.1),
        ];
        for p in corners {
            let c = f.clamp_player_position(p);
            assert!(c.x >= 30.0 && c.x <= 970.0, "{:?}", c);
            assert!(c.y >= 30.0 && c.y <= 570.0, "{:?}", c);
        }
        let inside = Vec2::new(400.0, 200.0);
        assert_eq!(f.clamp_player_position(inside), inside);
    }

    #[test]
    fn test_ball_bounces_off_side_wall() {
        let f = field();
        let ball = Ball::new(Vec2::new(10.0, 100.0), Vec2::new(-5.0, 0.0));
        let out = f.clamp_ball(ball, 0.8);
        assert_eq!(out.position.x, 20.0);
        assert_eq!(out.velocity.x, 4.0);
    }

    #[test]
    fn test_ball_bounces_off_right_wall() {
        let f = field();
        let ball = Ball::new(Vec2::new(990.0, 100.0), Vec2::new(5.0, 2.0));
        let out = f.clamp_ball(ball, 0.8);
        assert_eq!(out.position, Vec2::new(980.0, 100.0));
        assert_eq!(out.velocity, Vec2::new(-4.0, 2.0));

        // Already heading back: only the position is corrected
        let ball = Ball::new(Vec2::new(990.0, 500.0), Vec2::new(-3.0, 0.0));
        let out = f.clamp_ball(ball, 0.8);
        assert_eq!(out.position.x, 980.0);
        assert_eq!(out.velocity.x, -3.0);
    }

    #[test]
    fn test_right_goal_mouth_edges() {
        let f = field();
        for y in [240.0, 360.0] {
            let ball = Ball::new(Vec2::new(995.0, y), Vec2::new(5.0, 0.0));
            assert_eq!(f.clamp_ball(ball, 0.8), ball, "open at y = {}", y);
            assert!(f.is_in_goal_mouth(ball.position, GoalSide::Right));
        }
        for y in [239.5, 360.5] {
            let ball = Ball::new(Vec2::new(995.0, y), Vec2::new(5.0, 0.0));
            let out = f.clamp_ball(ball, 0.8);
            assert_eq!(out.position.x, 980.0, "wall at y = {}", y);
            assert_eq!(out.velocity.x, -4.0);
            assert!(!f.is_in_goal_mouth(out.position, GoalSide::Right));
        }
    }

    #[test]
    fn test_ball_not_clamped_inside_goal_mouth() {
        let f = field();
        let ball = Ball::new(Vec2::new(5.0, 300.0), Vec2::new(-5.0, 1.0));
        let out = f.clamp_ball(ball, 0.8);
        assert_eq!(out, ball);
    }

    #[test]
    fn test_ball_bounces_off_bottom_wall() {
        let f = field();
        let ball = Ball::new(Vec2::new(300.0, 590.0), Vec2::new(1.0, 5.0));
        let out = f.clamp_ball(ball, 0.8);
        assert_eq!(out.position.y, 580.0);
        assert_eq!(out.velocity.y, -4.0);
        assert_eq!(out.velocity.x, 1.0);
    }

    #[test]
    fn test_spawn_points_by_half() {
        let f = field();
        let a = f.spawn_point(Team::A, 0.5);
        let b = f.spawn_point(Team::B, 0.0);
        assert!(a.x < f.width / 2.0);
        assert!(b.x > f.width / 2.0);
        assert_eq!(b.y, 200.0);
        assert_eq!(a.y, 300.0);
    }

    #[test]
    fn test_scoring_team() {
        assert_eq!(GoalSide::Left.scoring_team(), Team::B);
        assert_eq!(GoalSide::Right.scoring_team(), Team::A);
    }
}
