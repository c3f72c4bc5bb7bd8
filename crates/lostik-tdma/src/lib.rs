//! LoStik Time-Division Channel Access
//!
//! This crate shares one LoRa channel between several LoStik nodes by giving
//! each node its own transmit window in a repeating per-minute schedule.
//! Outside its window a node listens.
//!
//! # Architecture
//!
//! - [`link::DeviceLink`] speaks the RN2903 command protocol over any
//!   `Read + Write` byte stream: a real serial port or a simulated modem
//! - [`schedule::SlotTable`] maps each second of the minute to the slot that
//!   owns it and whether it is that slot's transmit window
//! - [`assignment::SlotResolver`] decides which slot belongs to this node,
//!   either from a static table keyed by hardware EUI or by claiming the
//!   first window it transmits in successfully
//! - [`service::ChannelAccessService`] ticks the state machine: transmit the
//!   oldest queued message in an owned window, otherwise listen and record
//!   what arrives
//!
//! Everything is synchronous; the serial read time-out paces the loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use lostik_store::MessageStore;
//! use lostik_tdma::{ChannelAccessService, DeviceLink, ServiceConfig, SystemClock};
//!
//! let config = ServiceConfig::default();
//! let link = DeviceLink::connect(&config).unwrap();
//! let store = MessageStore::open("lora_chat.db").unwrap();
//!
//! let mut service = ChannelAccessService::start(link, store, &config, SystemClock).unwrap();
//! let shutdown = AtomicBool::new(false);
//! service.run(&shutdown).unwrap();
//! ```

pub mod assignment;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod link;
pub mod schedule;
pub mod service;
pub mod state;

pub use assignment::{SlotRegistry, SlotResolver};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ServiceConfig, SlotPolicy};
pub use error::{LinkError, ScheduleError, ServiceError};
pub use events::ServiceEvent;
pub use link::{DeviceLink, LinkQuality, Reception, TransmitReceipt};
pub use schedule::{SlotDecision, SlotId, SlotPlan, SlotTable};
pub use service::ChannelAccessService;
pub use state::LinkState;
