//! Game state and main loop.

use crate::config::Config;
use crate::error::{GameError, GameResult};
use crate::field::Field;
use crate::lifecycle::Countdown;
use crate::physics::{self, PhysicsParams};
use crate::scoring;
use crate::session::SessionRules;
use crate::world::MatchState;
use protocol::packets::{ChatLine, ChatMode, ClientMessage, GameSnapshot, Movement, ServerMessage, Winner};
use protocol::Team;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::client::Client;
use super::timers::TimerRequest;
use super::{Broadcasters, Frame, SharedGame};

/// Pending broadcasts to send after releasing the game state lock.
#[derive(Debug, Default)]
pub struct PendingBroadcasts {
    /// Generation of the match that produced these frames.
    pub generation: u64,
    /// The tick's `gameState` snapshot.
    pub state: Option<Frame>,
    /// Goal and game-end events raised by the tick, in order.
    pub events: Vec<Frame>,
}

/// Load and activity figures reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub generation: u64,
    pub players: usize,
    pub connections: usize,
    pub tick_count: u64,
    /// Smoothed tick duration in milliseconds.
    pub avg_tick_ms: f64,
    pub clients: Vec<ClientStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub id: u32,
    pub connected_secs: u64,
    pub idle_ms: u64,
    pub frames_received: u64,
}

/// Main game state.
pub struct GameState {
    pub config: Config,
    pub field: Field,
    physics: PhysicsParams,
    rules: SessionRules,
    pub tick_count: u64,
    pub start_time: std::time::Instant,

    // ID counters
    next_client_id: u32,

    // Connected clients
    pub clients: HashMap<u32, Client>,

    // The match being played; replaced wholesale on reset
    current: MatchState,

    // Countdown task of the current match
    countdown: Option<AbortHandle>,

    broadcasters: Broadcasters,
    timers_tx: mpsc::UnboundedSender<TimerRequest>,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

impl GameState {
    /// Create a new game state holding a fresh first match.
    pub fn new(
        config: &Config,
        broadcasters: Broadcasters,
        timers_tx: mpsc::UnboundedSender<TimerRequest>,
    ) -> Self {
        let field = Field::new(&config.field);
        let current = MatchState::new(1, &field, config.game.duration_secs);

        Self {
            config: config.clone(),
            field,
            physics: PhysicsParams::from_config(config),
            rules: SessionRules::from_config(config),
            tick_count: 0,
            start_time: std::time::Instant::now(),
            next_client_id: 1,
            clients: HashMap::new(),
            current,
            countdown: None,
            broadcasters,
            timers_tx,
            update_time_avg: 0.0,
        }
    }

    /// The match being played.
    pub fn current(&self) -> &MatchState {
        &self.current
    }

    pub fn generation(&self) -> u64 {
        self.current.generation
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.current.snapshot()
    }

    pub fn stats(&self) -> ServerStats {
        let mut clients: Vec<ClientStats> = self
            .clients
            .values()
            .map(|client| ClientStats {
                id: client.id,
                connected_secs: client.connected_at.elapsed().as_secs(),
                idle_ms: client.idle_for().as_millis() as u64,
                frames_received: client.frames_received,
            })
            .collect();
        clients.sort_unstable_by_key(|c| c.id);

        ServerStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            generation: self.current.generation,
            players: self.current.players.len(),
            connections: self.clients.len(),
            tick_count: self.tick_count,
            avg_tick_ms: self.update_time_avg,
            clients,
        }
    }

    /// Add a new client.
    pub fn add_client(&mut self, addr: SocketAddr) -> u32 {
        let id = self.next_client_id;
        self.next_client_id += 1;
        self.clients.insert(id, Client::new(id, addr));
        info!("Client {} connected from {}", id, addr);
        id
    }

    /// Remove a client and its player. Repeated calls are no-ops.
    pub fn remove_client(&mut self, id: u32) {
        if let Some(client) = self.clients.remove(&id) {
            info!(
                "Client {} ({}) disconnected after {:.1}s",
                id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32()
            );
        }
        self.leave(id);
    }

    /// Handle one inbound text frame, reporting failures to the sender.
    pub fn handle_frame(&mut self, client_id: u32, text: &str) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.touch();
        }
        if let Err(e) = self.handle_message(client_id, text) {
            self.report_error(client_id, e);
        }
    }

    /// Log `err` and send its client-facing text back to `client_id`.
    pub fn report_error(&mut self, client_id: u32, err: GameError) {
        match &err {
            GameError::Internal(_) => error!("Client {}: {}", client_id, err),
            _ => warn!("Rejected message from client {}: {}", client_id, err),
        }
        self.send_to(client_id, &ServerMessage::error(err.client_message()));
    }

    /// Decode and dispatch a client message.
    pub fn handle_message(&mut self, client_id: u32, text: &str) -> GameResult<()> {
        let message = ClientMessage::parse(text)?;
        match message {
            // Inputs arrive every frame; keep them out of the log
            ClientMessage::PlayerInput { movement, kick } => {
                self.apply_input(client_id, movement, kick);
            }
            ClientMessage::JoinTeam { team, name } => {
                debug!("Client {} asks to join team {}", client_id, team);
                self.join(client_id, &name, team)?;
            }
            ClientMessage::ChatMessage { message, mode } => {
                self.chat(client_id, &message, mode);
            }
        }
        Ok(())
    }

    /// Register `client_id` on `team` and announce it.
    pub fn join(&mut self, client_id: u32, name: &str, team: Team) -> GameResult<()> {
        let outcome = self
            .current
            .join(client_id, name, team, &self.field, &self.rules)?;
        let name = outcome.player.name.clone();

        let joined = ServerMessage::PlayerJoined {
            player_id: client_id,
            team,
            player: outcome.player,
        };
        let frame = match encode(&joined) {
            Ok(frame) => frame,
            Err(e) => {
                self.current.leave(client_id);
                return Err(e);
            }
        };

        info!("Client {} joined team {} as {}", client_id, team, name);
        self.broadcasters.send_to(client_id, frame);
        self.broadcast_roster();
        self.broadcast_event(&ServerMessage::ChatMessage(ChatLine::system(format!(
            "{} joined Team {}",
            name, team
        ))));

        if outcome.kicked_off {
            info!(
                "Match {} started with {} players",
                self.current.generation,
                self.current.players.len()
            );
            self.request_timer(TimerRequest::StartCountdown {
                generation: self.current.generation,
            });
        }
        Ok(())
    }

    /// Apply a movement/kick input. Unknown players are ignored.
    pub fn apply_input(&mut self, client_id: u32, movement: Movement, kick: bool) {
        let applied = self.current.apply_input(
            client_id,
            movement.clamped(),
            kick,
            &self.field,
            &self.rules,
        );
        if !applied {
            debug!("Ignoring input from client {} without a player", client_id);
        }
    }

    /// Relay a chat line to everyone, or to the sender's team.
    pub fn chat(&mut self, client_id: u32, message: &str, mode: ChatMode) {
        let Some(player) = self.current.players.get(&client_id) else {
            debug!("Ignoring chat from client {} without a player", client_id);
            return;
        };

        let message = message.trim();
        if message.is_empty() {
            return;
        }

        let team = player.team();
        let line = ChatLine {
            player_name: player.name.clone(),
            message: message.chars().take(self.config.game.chat_max_length).collect(),
            team: Some(team),
            timestamp: protocol::packets::timestamp_millis(),
            is_team_message: mode == ChatMode::Team,
        };
        debug!("Chat from {} ({:?}): {}", line.player_name, mode, line.message);

        let message = ServerMessage::ChatMessage(line);
        match mode {
            ChatMode::All => self.broadcast_event(&message),
            ChatMode::Team => {
                for id in self.current.team_members(team) {
                    self.send_to(id, &message);
                }
            }
        }
    }

    /// Remove the player of `client_id` and announce it.
    fn leave(&mut self, client_id: u32) {
        let Some(player) = self.current.leave(client_id) else {
            return;
        };
        info!("{} left team {}", player.name, player.team());
        self.broadcast_roster();
        self.broadcast_event(&ServerMessage::ChatMessage(ChatLine::system(format!(
            "{} left the game",
            player.name
        ))));
    }

    /// Run one simulation tick.
    pub fn tick(&mut self) -> PendingBroadcasts {
        self.tick_count += 1;
        let mut events = Vec::new();

        if !self.current.clock.is_ended() {
            physics::advance(&mut self.current, &self.field, &self.physics);
            if let Some(team) = scoring::check_goals(&mut self.current, &self.field) {
                events.push(ServerMessage::Goal { team });
            }
        }

        if self.current.clock.take_end_report() {
            events.extend(self.game_over());
        }

        PendingBroadcasts {
            generation: self.current.generation,
            state: encode_logged(&ServerMessage::GameState(self.current.snapshot())),
            events: events.iter().filter_map(encode_logged).collect(),
        }
    }

    /// Final result messages; schedules the reset.
    fn game_over(&mut self) -> [ServerMessage; 2] {
        let (a, b) = (self.current.score(Team::A), self.current.score(Team::B));
        let winner = Winner::from_scores(a, b);
        let text = match winner {
            Winner::A => format!("Game Over! Team A wins! Final Score: {} - {}", a, b),
            Winner::B => format!("Game Over! Team B wins! Final Score: {} - {}", a, b),
            Winner::Draw => format!("Game Over! It's a draw! Final Score: {} - {}", a, b),
        };
        info!("Match {} over: {:?} ({} - {})", self.current.generation, winner, a, b);

        self.request_timer(TimerRequest::ScheduleReset {
            generation: self.current.generation,
        });

        [
            ServerMessage::GameEnd {
                winner,
                team_a_score: a,
                team_b_score: b,
            },
            ServerMessage::ChatMessage(ChatLine::system(text)),
        ]
    }

    /// One countdown second for match `generation`.
    ///
    /// Returns false when the countdown task should stop.
    pub fn on_countdown_second(&mut self, generation: u64) -> bool {
        if generation != self.current.generation {
            debug!("Countdown of discarded match {} stopped", generation);
            return false;
        }
        match self.current.clock.on_second() {
            Countdown::Ticking(remaining) => {
                if remaining % 60 == 0 || remaining <= 10 {
                    debug!("Match {}: {}s left", generation, remaining);
                }
                true
            }
            Countdown::Expired => {
                info!("Match {} time is up", generation);
                self.countdown = None;
                false
            }
            Countdown::Idle => false,
        }
    }

    /// Keep the countdown handle of match `generation`, or abort it if that
    /// match is already gone.
    pub fn attach_countdown(&mut self, generation: u64, handle: AbortHandle) {
        if generation == self.current.generation && self.current.clock.is_started() {
            if let Some(previous) = self.countdown.replace(handle) {
                previous.abort();
            }
        } else {
            handle.abort();
        }
    }

    /// Replace match `generation` with a fresh one. Stale requests are ignored.
    pub fn reset_match(&mut self, generation: u64) -> bool {
        if generation != self.current.generation {
            debug!("Ignoring reset of discarded match {}", generation);
            return false;
        }

        self.abort_timers();
        self.current = MatchState::new(
            generation + 1,
            &self.field,
            self.config.game.duration_secs,
        );
        info!("Match {} ready, waiting for teams", self.current.generation);

        self.broadcast_event(&ServerMessage::ChatMessage(ChatLine::system(
            "New game starting! Please select your teams again.",
        )));
        self.broadcast_roster();
        self.broadcast_event(&ServerMessage::GameReset);
        true
    }

    /// Abort the countdown of the current match.
    pub fn abort_timers(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }

    fn request_timer(&self, request: TimerRequest) {
        if self.timers_tx.send(request).is_err() {
            warn!("Timer supervisor is gone, dropped {:?}", request);
        }
    }

    fn broadcast_roster(&self) {
        self.broadcast_event(&ServerMessage::PlayerList(self.current.roster()));
    }

    fn broadcast_event(&self, message: &ServerMessage) {
        if let Some(frame) = encode_logged(message) {
            self.broadcasters.send_event(self.current.generation, frame);
        }
    }

    fn send_to(&self, client_id: u32, message: &ServerMessage) {
        if let Some(frame) = encode_logged(message) {
            self.broadcasters.send_to(client_id, frame);
        }
    }
}

fn encode(message: &ServerMessage) -> GameResult<Frame> {
    message
        .to_json()
        .map(Frame::from)
        .map_err(|e| GameError::Internal(e.to_string()))
}

fn encode_logged(message: &ServerMessage) -> Option<Frame> {
    match encode(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to encode {:?}: {}", message, e);
            None
        }
    }
}

/// Run the game loop.
pub async fn run_game_loop(state: SharedGame, broadcasters: Broadcasters, tick_interval: Duration) {
    let start = Instant::now() + tick_interval;
    let mut ticker = interval_at(start, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let tick_budget = tick_interval.as_secs_f64() * 1000.0 * 0.9;

    loop {
        ticker.tick().await;

        // Run tick and extract pending broadcasts
        let broadcasts = {
            let mut game = state.write().await;
            let tick_start = std::time::Instant::now();
            let broadcasts = game.tick();
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            if tick_ms > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players",
                    game.tick_count,
                    tick_ms,
                    tick_budget,
                    game.current.players.len()
                );
            }

            broadcasts
        }; // Write lock released here

        broadcasters.publish(broadcasts);
    }
}
