//! Server configuration.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub ball: BallConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config
                .validate()
                .with_context(|| format!("invalid config in {}", path.display()))?;
            Ok(config)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Reject values the geometry and physics cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let field = &self.field;
        let radius = field.player_radius.max(field.ball_radius);
        ensure!(
            field.player_radius >= 0.0 && field.ball_radius >= 0.0,
            "field radii must not be negative"
        );
        ensure!(
            field.width > 2.0 * radius && field.height > 2.0 * radius,
            "field {}x{} is too small for radius {}",
            field.width,
            field.height,
            radius
        );
        ensure!(
            field.goal_width > 0.0 && field.goal_width <= field.height,
            "goal_width {} must be in (0, {}]",
            field.goal_width,
            field.height
        );
        ensure!(
            field.goal_depth >= 0.0 && 2.0 * field.goal_depth < field.width,
            "goal_depth {} does not fit the field",
            field.goal_depth
        );

        let ball = &self.ball;
        ensure!(
            ball.friction > 0.0 && ball.friction < 1.0,
            "ball friction {} must be in (0, 1)",
            ball.friction
        );
        ensure!(
            ball.restitution >= 0.0 && ball.restitution < 1.0,
            "ball restitution {} must be in [0, 1)",
            ball.restitution
        );
        ensure!(ball.stop_epsilon >= 0.0, "ball stop_epsilon must not be negative");

        ensure!(self.server.tick_rate > 0, "server tick_rate must be positive");
        ensure!(self.player.max_name_length > 0, "player max_name_length must be positive");
        Ok(())
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Server name reported by the status endpoint.
    #[serde(default = "default_name")]
    pub name: String,
}

impl ServerConfig {
    /// Interval between two ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            tick_rate: default_tick_rate(),
            name: default_name(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    10
}
fn default_tick_rate() -> u32 {
    60
}
fn default_name() -> String {
    "Kickoff".to_string()
}

/// Field dimensions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldConfig {
    #[serde(default = "default_field_width")]
    pub width: f32,
    #[serde(default = "default_field_height")]
    pub height: f32,
    /// Vertical span of each goal mouth.
    #[serde(default = "default_goal_width")]
    pub goal_width: f32,
    /// Distance from the side edge to the goal line.
    #[serde(default = "default_goal_depth")]
    pub goal_depth: f32,
    #[serde(default = "default_player_radius")]
    pub player_radius: f32,
    #[serde(default = "default_ball_radius")]
    pub ball_radius: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: default_field_width(),
            height: default_field_height(),
            goal_width: default_goal_width(),
            goal_depth: default_goal_depth(),
            player_radius: default_player_radius(),
            ball_radius: default_ball_radius(),
        }
    }
}

fn default_field_width() -> f32 {
    1000.0
}
fn default_field_height() -> f32 {
    600.0
}
fn default_goal_width() -> f32 {
    120.0
}
fn default_goal_depth() -> f32 {
    20.0
}
fn default_player_radius() -> f32 {
    30.0
}
fn default_ball_radius() -> f32 {
    20.0
}

/// Ball physics.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BallConfig {
    /// Velocity multiplier applied every tick.
    #[serde(default = "default_friction")]
    pub friction: f32,
    /// Velocity retained on a wall bounce.
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    /// Velocity components below this magnitude snap to zero.
    #[serde(default = "default_stop_epsilon")]
    pub stop_epsilon: f32,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            friction: default_friction(),
            restitution: default_restitution(),
            stop_epsilon: default_stop_epsilon(),
        }
    }
}

fn default_friction() -> f32 {
    0.98
}
fn default_restitution() -> f32 {
    0.8
}
fn default_stop_epsilon() -> f32 {
    0.1
}

/// Player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Distance covered per input message at full stick.
    #[serde(default = "default_player_speed")]
    pub speed: f32,
    /// Capture radius for kicks.
    #[serde(default = "default_kick_range")]
    pub kick_range: f32,
    /// Ball speed right after a kick.
    #[serde(default = "default_kick_power")]
    pub kick_power: f32,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: default_player_speed(),
            kick_range: default_kick_range(),
            kick_power: default_kick_power(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_player_speed() -> f32 {
    3.0
}
fn default_kick_range() -> f32 {
    30.0
}
fn default_kick_power() -> f32 {
    8.0
}
fn default_max_name_length() -> usize {
    20
}

/// Match rules and timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameConfig {
    /// Match length in seconds.
    #[serde(default = "default_duration")]
    pub duration_secs: u32,
    /// Players needed before the clock starts.
    #[serde(default = "default_min_players")]
    pub min_players: usize,
    /// Pause between the final whistle and the next lobby.
    #[serde(default = "default_reset_delay")]
    pub reset_delay_secs: u64,
    #[serde(default = "default_chat_max_length")]
    pub chat_max_length: usize,
}

impl GameConfig {
    pub fn reset_delay(&self) -> Duration {
        Duration::from_secs(self.reset_delay_secs)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration(),
            min_players: default_min_players(),
            reset_delay_secs: default_reset_delay(),
            chat_max_length: default_chat_max_length(),
        }
    }
}

fn default_duration() -> u32 {
    300
}
fn default_min_players() -> usize {
    2
}
fn default_reset_delay() -> u64 {
    10
}
fn default_chat_max_length() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[game]\nduration_secs = 60\n").unwrap();
        assert_eq!(config.game.duration_secs, 60);
        assert_eq!(config.game.min_players, 2);
        assert_eq!(config.server.tick_rate, 60);
        assert_eq!(config.field.width, 1000.0);
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.ball.friction, 0.98);
        assert_eq!(config.player.kick_power, 8.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_field_narrower_than_a_player() {
        let mut config = Config::default();
        config.field.width = 50.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.field.goal_width = 700.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_lossless_ball() {
        let mut config = Config::default();
        config.ball.friction = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ball.restitution = 1.2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ball.friction = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_reports_invalid_file() {
        let path = std::env::temp_dir().join(format!("kickoff-invalid-{}.toml", std::process::id()));
        std::fs::write(&path, "[field]\nwidth = 40.0\n").unwrap();
        let result = Config::load_from(&path);
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("too small"), "{:#}", err);
    }

    #[test]
    fn test_tick_interval() {
        let server = ServerConfig::default();
        assert_eq!(server.tick_interval().as_micros(), 16_666);
    }
}
