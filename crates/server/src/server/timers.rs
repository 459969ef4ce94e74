//! Match countdown and delayed reset tasks.
//!
//! Every task carries the generation of the match it was started for and
//! checks it under the write lock, so a task that outlives its match does
//! nothing.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, info};

use super::SharedGame;

/// Timer work requested by the game state while it holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRequest {
    /// Count match `generation` down once per second.
    StartCountdown { generation: u64 },
    /// Replace match `generation` after the reset delay.
    ScheduleReset { generation: u64 },
}

/// Owns every timer task until the request channel closes.
pub async fn run_timers(
    state: SharedGame,
    mut requests: mpsc::UnboundedReceiver<TimerRequest>,
    reset_delay: Duration,
) {
    let mut tasks = JoinSet::new();

    while let Some(request) = requests.recv().await {
        // Reap finished timers
        while tasks.try_join_next().is_some() {}

        match request {
            TimerRequest::StartCountdown { generation } => {
                let handle = tasks.spawn(run_countdown(Arc::clone(&state), generation));
                state.write().await.attach_countdown(generation, handle);
            }
            TimerRequest::ScheduleReset { generation } => {
                info!("Match {} resets in {:?}", generation, reset_delay);
                tasks.spawn(run_reset(Arc::clone(&state), generation, reset_delay));
            }
        }
    }

    debug!("Timer supervisor stopped");
}

async fn run_countdown(state: SharedGame, generation: u64) {
    let period = Duration::from_secs(1);
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;
        if !state.write().await.on_countdown_second(generation) {
            break;
        }
    }
}

async fn run_reset(state: SharedGame, generation: u64, delay: Duration) {
    sleep(delay).await;
    state.write().await.reset_match(generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::{Broadcasters, GameState};
    use protocol::Team;
    use tokio::sync::RwLock;

    fn start(duration_secs: u32) -> SharedGame {
        let mut config = Config::default();
        config.game.duration_secs = duration_secs;
        config.game.reset_delay_secs = 10;

        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(GameState::new(&config, Broadcasters::new(), tx)));
        tokio::spawn(run_timers(Arc::clone(&state), rx, config.game.reset_delay()));
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_runs_to_zero() {
        let state = start(3);
        {
            let mut game = state.write().await;
            game.join(1, "Ann", Team::A).unwrap();
            game.join(2, "Bob", Team::B).unwrap();
        }

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(state.read().await.current().clock.remaining(), 2);

        sleep(Duration::from_secs(2)).await;
        let game = state.read().await;
        assert!(game.current().clock.is_ended());
        assert_eq!(game.current().clock.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_delay() {
        let state = start(1);
        {
            let mut game = state.write().await;
            game.join(1, "Ann", Team::A).unwrap();
            game.join(2, "Bob", Team::B).unwrap();
        }

        sleep(Duration::from_millis(1100)).await;
        // The tick reports the end and schedules the reset
        assert_eq!(state.write().await.tick().events.len(), 2);

        sleep(Duration::from_secs(9)).await;
        assert_eq!(state.read().await.generation(), 1);

        sleep(Duration::from_secs(2)).await;
        let game = state.read().await;
        assert_eq!(game.generation(), 2);
        assert!(game.current().players.is_empty());
        assert!(!game.current().clock.is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_of_reset_match_does_nothing() {
        let state = start(300);
        {
            let mut game = state.write().await;
            game.join(1, "Ann", Team::A).unwrap();
            game.join(2, "Bob", Team::B).unwrap();
        }
        sleep(Duration::from_millis(2500)).await;

        {
            let mut game = state.write().await;
            assert!(game.reset_match(1));
            game.join(3, "Cid", Team::A).unwrap();
        }

        sleep(Duration::from_secs(5)).await;
        let game = state.read().await;
        assert_eq!(game.generation(), 2);
        assert_eq!(game.current().clock.remaining(), 300);
        assert!(!game.current().clock.is_started());
    }
}
