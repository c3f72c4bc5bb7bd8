//! Service event stream
//!
//! The service reports what it does on an optional channel so a status
//! display can follow along without sharing its state.

use std::time::Duration;

use crate::schedule::SlotId;
use crate::state::LinkState;

/// Something the channel access service did or observed
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// Service loop started
    Started {
        eui: String,
        slot: Option<SlotId>,
    },

    /// Radio state changed
    StateChanged { from: LinkState, to: LinkState },

    /// Self-learning node claimed its slot
    SlotClaimed { slot: SlotId },

    /// Outbound message left the antenna
    Transmitted {
        id: i64,
        text: String,
        air_time: Duration,
    },

    /// Radio reported `radio_err`; the message stays queued
    TransmitFailed { id: i64 },

    /// An owned window passed without transmitting
    WindowSkipped { slot: SlotId, reason: String },

    /// Inbound message recorded
    Received { id: i64, text: String, rssi: i32, snr: f64 },

    /// Frame arrived whose payload was not text
    FrameDropped { payload_hex: String, reason: String },

    /// Service stopped and the radio was left idle
    Stopped,
}
