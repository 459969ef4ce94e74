//! Connection session state.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client. Whether it plays is decided by the current match.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique client ID, also the player ID once joined.
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
    /// Connection time.
    pub connected_at: Instant,
    /// Last time a frame arrived.
    pub last_activity: Instant,
    /// Frames received so far.
    pub frames_received: u64,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            connected_at: now,
            last_activity: now,
            frames_received: 0,
        }
    }

    /// Time since the last inbound frame.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Record an inbound frame.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.frames_received += 1;
    }
}
