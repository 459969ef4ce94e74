//! Game server implementation.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod client;
pub mod connection;
pub mod game;
pub mod timers;

pub use connection::Connection;
pub use game::{run_game_loop, ClientStats, GameState, PendingBroadcasts, ServerStats};
pub use timers::TimerRequest;

/// A serialized server message, shared by every recipient.
pub type Frame = Arc<str>;

/// Game state behind the single exclusive lock.
pub type SharedGame = Arc<RwLock<GameState>>;

/// A frame for one connection only.
#[derive(Debug, Clone)]
pub struct TargetedMessage {
    /// Target client ID.
    pub client_id: u32,
    pub frame: Frame,
}

/// A broadcast frame stamped with the match generation it belongs to.
#[derive(Debug, Clone)]
pub struct Stamped {
    pub generation: u64,
    pub frame: Frame,
}

/// Senders of the three outbound channels.
#[derive(Debug, Clone)]
pub struct Broadcasters {
    /// `gameState` snapshots, one per tick.
    state_tx: broadcast::Sender<Stamped>,
    /// Roster, goal, lifecycle and chat events for everyone.
    event_tx: broadcast::Sender<Stamped>,
    /// Frames addressed to a single connection.
    targeted_tx: broadcast::Sender<TargetedMessage>,
}

impl Broadcasters {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(5);
        let (event_tx, _) = broadcast::channel(100);
        let (targeted_tx, _) = broadcast::channel(100);
        Self {
            state_tx,
            event_tx,
            targeted_tx,
        }
    }

    pub fn subscribe(&self) -> Subscriptions {
        Subscriptions {
            state_rx: self.state_tx.subscribe(),
            event_rx: self.event_tx.subscribe(),
            targeted_rx: self.targeted_tx.subscribe(),
            generation: 0,
        }
    }

    /// Send without waiting on anyone; no receivers is not an error.
    pub fn publish(&self, pending: PendingBroadcasts) {
        let generation = pending.generation;
        for frame in pending.events {
            let _ = self.event_tx.send(Stamped { generation, frame });
        }
        if let Some(frame) = pending.state {
            let _ = self.state_tx.send(Stamped { generation, frame });
        }
    }

    pub fn send_event(&self, generation: u64, frame: Frame) {
        let _ = self.event_tx.send(Stamped { generation, frame });
    }

    pub fn send_to(&self, client_id: u32, frame: Frame) {
        let _ = self.targeted_tx.send(TargetedMessage { client_id, frame });
    }
}

impl Default for Broadcasters {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving ends of the outbound channels for one connection.
#[derive(Debug)]
pub struct Subscriptions {
    pub state_rx: broadcast::Receiver<Stamped>,
    pub event_rx: broadcast::Receiver<Stamped>,
    pub targeted_rx: broadcast::Receiver<TargetedMessage>,
    /// Newest match generation this connection has been shown.
    generation: u64,
}

impl Subscriptions {
    /// Next frame for `client_id`, or `None` once the server is gone.
    ///
    /// Targeted frames win over events, events over snapshots. A receiver
    /// that fell behind skips what it missed. Snapshots of a match older
    /// than the newest event seen are dropped, so nothing of a discarded
    /// match follows its `gameReset`.
    pub async fn next_for(&mut self, client_id: u32) -> Option<Frame> {
        loop {
            tokio::select! {
                biased;
                msg = self.targeted_rx.recv() => match msg {
                    Ok(msg) if msg.client_id == client_id => return Some(msg.frame),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(n)) => warn!("Client {} missed {} direct messages", client_id, n),
                    Err(RecvError::Closed) => return None,
                },
                stamped = self.event_rx.recv() => match stamped {
                    Ok(stamped) => {
                        self.generation = self.generation.max(stamped.generation);
                        return Some(stamped.frame);
                    }
                    Err(RecvError::Lagged(n)) => warn!("Client {} missed {} events", client_id, n),
                    Err(RecvError::Closed) => return None,
                },
                stamped = self.state_rx.recv() => match stamped {
                    Ok(stamped) if stamped.generation < self.generation => {
                        debug!("Client {} dropped a snapshot of match {}", client_id, stamped.generation);
                    }
                    Ok(stamped) => {
                        self.generation = stamped.generation;
                        return Some(stamped.frame);
                    }
                    Err(RecvError::Lagged(n)) => debug!("Client {} skipped {} snapshots", client_id, n),
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    }
}

/// The running simulation: shared state plus its tick loop and timers.
pub struct Simulation {
    state: SharedGame,
    broadcasters: Broadcasters,
    tasks: Vec<JoinHandle<()>>,
}

impl Simulation {
    /// Build the first match and spawn the tick loop and timer supervisor.
    pub fn start(config: &Config) -> Self {
        let broadcasters = Broadcasters::new();
        let (timers_tx, timers_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(GameState::new(
            config,
            broadcasters.clone(),
            timers_tx,
        )));

        let tick_task = tokio::spawn(game::run_game_loop(
            Arc::clone(&state),
            broadcasters.clone(),
            config.server.tick_interval(),
        ));
        let timer_task = tokio::spawn(timers::run_timers(
            Arc::clone(&state),
            timers_rx,
            config.game.reset_delay(),
        ));

        Self {
            state,
            broadcasters,
            tasks: vec![tick_task, timer_task],
        }
    }

    pub fn state(&self) -> SharedGame {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> Subscriptions {
        self.broadcasters.subscribe()
    }

    /// Stop the tick loop and every timer.
    pub async fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
        self.state.write().await.abort_timers();
        info!("Simulation stopped");
    }
}

/// Connection tracking state (shared across connection handlers).
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }

        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the game server until Ctrl+C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));
    let simulation = Simulation::start(&config);

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(accept_backoff(&e)).await;
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        };
        let ip = addr.ip();

        if !conn_state
            .write()
            .await
            .try_add_connection(ip, max_connections, ip_limit)
        {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }

        let game = simulation.state();
        let subscriptions = simulation.subscribe();
        let conn_state = Arc::clone(&conn_state);

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game, subscriptions).await;

            conn_state.write().await.remove_connection(ip);

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }

    simulation.shutdown().await;
    Ok(())
}

/// Pause before the next accept. Per-connection failures retry at once;
/// anything else (such as running out of file descriptors) waits a little.
fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => Duration::from_millis(100),
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game: SharedGame,
    subscriptions: Subscriptions,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let mut connection = Connection::open(game, subscriptions, addr).await;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => connection.on_text(text.as_str()).await,
                    Some(Ok(Message::Binary(_))) => connection.on_unsupported_frame().await,
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            frame = connection.next_frame() => {
                let Some(frame) = frame else { break };
                if let Err(e) = write.send(Message::Text(frame.to_string().into())).await {
                    warn!("Failed to send to {}: {}", addr, e);
                    break;
                }
            }
        }
    }

    connection.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_limits() {
        let mut state = ConnectionState::new();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let other: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(state.try_add_connection(ip, 3, 2));
        assert!(state.try_add_connection(ip, 3, 2));
        assert!(!state.try_add_connection(ip, 3, 2));
        assert!(state.try_add_connection(other, 3, 2));
        assert!(!state.try_add_connection(other, 3, 2));

        state.remove_connection(ip);
        assert!(state.try_add_connection(other, 3, 2));
        state.remove_connection(other);
        state.remove_connection(other);
        state.remove_connection(other);
        assert_eq!(state.total_connections, 1);
    }

    #[test]
    fn test_accept_errors_back_off() {
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(accept_backoff(&reset), Duration::ZERO);

        // EMFILE surfaces as an uncategorized OS error
        let exhausted = io::Error::from_raw_os_error(24);
        assert_eq!(accept_backoff(&exhausted), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_next_for_filters_targeted() {
        let broadcasters = Broadcasters::new();
        let mut subs = broadcasters.subscribe();

        broadcasters.send_to(2, Frame::from("for two"));
        broadcasters.send_to(1, Frame::from("for one"));
        broadcasters.send_event(1, Frame::from("everyone"));

        assert_eq!(subs.next_for(1).await.as_deref(), Some("for one"));
        assert_eq!(subs.next_for(1).await.as_deref(), Some("everyone"));
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_stale_snapshots() {
        let broadcasters = Broadcasters::new();
        let mut subs = broadcasters.subscribe();

        for i in 0..20 {
            broadcasters.publish(PendingBroadcasts {
                generation: 1,
                state: Some(Frame::from(format!("tick {}", i))),
                events: Vec::new(),
            });
        }

        assert_eq!(subs.next_for(1).await.as_deref(), Some("tick 15"));
    }

    #[tokio::test]
    async fn test_snapshot_of_older_match_is_dropped_after_newer_event() {
        let broadcasters = Broadcasters::new();
        let mut subs = broadcasters.subscribe();

        broadcasters.publish(PendingBroadcasts {
            generation: 1,
            state: Some(Frame::from("old snapshot")),
            events: Vec::new(),
        });
        broadcasters.send_event(2, Frame::from("reset"));
        broadcasters.publish(PendingBroadcasts {
            generation: 2,
            state: Some(Frame::from("new snapshot")),
            events: Vec::new(),
        });

        assert_eq!(subs.next_for(1).await.as_deref(), Some("reset"));
        assert_eq!(subs.next_for(1).await.as_deref(), Some("new snapshot"));
    }
}
