//! Per-connection glue between a transport and the shared game state.

use protocol::ProtocolError;
use std::net::SocketAddr;

use super::{Frame, SharedGame, Subscriptions};

/// One registered connection. Transports feed it inbound text and drain
/// `next_frame` into their socket.
pub struct Connection {
    id: u32,
    addr: SocketAddr,
    game: SharedGame,
    subscriptions: Subscriptions,
}

impl Connection {
    /// Register a connection. `subscriptions` must be taken before this call
    /// so no frame addressed to the new ID is missed.
    pub async fn open(game: SharedGame, subscriptions: Subscriptions, addr: SocketAddr) -> Self {
        let id = game.write().await.add_client(addr);
        Self {
            id,
            addr,
            game,
            subscriptions,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn on_text(&self, text: &str) {
        self.game.write().await.handle_frame(self.id, text);
    }

    /// Binary and other non-text frames.
    pub async fn on_unsupported_frame(&self) {
        self.game
            .write()
            .await
            .report_error(self.id, ProtocolError::UnsupportedFrame.into());
    }

    /// Next outbound frame, or `None` once the game is gone.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.subscriptions.next_for(self.id).await
    }

    /// Drop the connection and its player.
    pub async fn close(self) {
        self.game.write().await.remove_client(self.id);
    }
}
