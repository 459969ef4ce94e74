//! Authoritative two-team football match server.

pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod lifecycle;
pub mod physics;
pub mod scoring;
pub mod server;
pub mod session;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use error::{GameError, GameResult};
pub use server::{
    run, Broadcasters, Connection, Frame, GameState, PendingBroadcasts, SharedGame, Simulation,
    Subscriptions, TargetedMessage, TimerRequest,
};
