//! Message definitions for the kickoff protocol.
//!
//! Every message travels as one WebSocket text frame holding a JSON object
//! `{"type": <event>, "data": <payload>}`. Payload-less events omit `data`.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Current Unix time in milliseconds, as carried by chat timestamps.
pub fn timestamp_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
