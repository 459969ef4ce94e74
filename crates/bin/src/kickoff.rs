//! Kickoff - Unified HTTP and game server.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use protocol::packets::timestamp_millis;
use serde_json::{json, Value};
use server::{Connection, SharedGame, Simulation, Subscriptions};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    simulation: Arc<Simulation>,
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Kickoff Server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Field: {}x{}", config.field.width, config.field.height);
    info!("  Match length: {}s", config.game.duration_secs);

    // Start the tick loop and timers
    let simulation = Arc::new(Simulation::start(&config));

    let state = AppState {
        simulation: Arc::clone(&simulation),
        name: config.server.name.clone(),
    };

    // Build the axum router
    let app = Router::new()
        // WebSocket game endpoint
        .route("/game", get(websocket_handler))
        .route("/api/status", get(status))
        .route("/api/health", get(health))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/game", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down");
        })
        .await?;

    simulation.shutdown().await;

    Ok(())
}

/// Server identity and wall-clock time.
async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "game": state.name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": timestamp_millis(),
    }))
}

/// Liveness, population counts and tick load.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.simulation.state().read().await.stats();
    Json(json!({
        "status": "healthy",
        "uptime": stats.uptime_secs,
        "players": stats.players,
        "connections": stats.connections,
        "generation": stats.generation,
        "tickCount": stats.tick_count,
        "avgTickMs": stats.avg_tick_ms,
        "clients": stats.clients,
    }))
}

/// Handle WebSocket connections for the game
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket connection from {}", addr);

    // Subscribe before the upgrade completes so nothing addressed to us is lost
    let game = state.simulation.state();
    let subscriptions = state.simulation.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, addr, game, subscriptions))
}

/// Pump frames between an axum socket and the game.
async fn handle_websocket(
    socket: WebSocket,
    addr: SocketAddr,
    game: SharedGame,
    subscriptions: Subscriptions,
) {
    let (mut write, mut read) = socket.split();
    let mut connection = Connection::open(game, subscriptions, addr).await;
    info!("New game connection {} from {}", connection.id(), connection.addr());

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
}
