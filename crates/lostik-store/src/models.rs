//! Records held by the message store

use std::time::Duration;

use chrono::{DateTime, Utc};

/// A message queued for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Queue-assigned id, monotonically increasing and never reused
    pub id: i64,
    pub text: String,
    pub enqueued_at: DateTime<Utc>,
    /// Set together with `air_time` once the modem confirms transmission
    pub sent_at: Option<DateTime<Utc>>,
    pub air_time: Option<Duration>,
}

impl OutboundMessage {
    /// Returns true once the message has been transmitted
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }
}

/// A message received over the air
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub id: i64,
    pub text: String,
    pub received_at: DateTime<Utc>,
    /// Received signal strength (dBm)
    pub rssi: i32,
    /// Signal-to-noise ratio (dB)
    pub snr: f64,
}

/// A participant on the shared channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub node_id: u32,
    pub node_name: String,
    /// At most one node per database is local
    pub is_local: bool,
}
