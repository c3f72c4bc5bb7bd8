//! LoStik Message Store
//!
//! Crash-safe staging of outbound and inbound radio traffic in a local SQLite
//! database. The same database is shared by the channel access service, which
//! drains the outbound queue and records receptions, and by the command-line
//! tools that enqueue messages and inspect history.
//!
//! Outbound messages form a FIFO keyed by an `AUTOINCREMENT` identifier, so
//! "oldest unsent" is simply the lowest unsent id and ids are never reused,
//! even after the queue is purged.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use chrono::Utc;
//! use lostik_store::MessageStore;
//!
//! let store = MessageStore::open_in_memory().unwrap();
//! let queued = store.enqueue_outbound("HELLO").unwrap();
//!
//! let next = store.next_unsent().unwrap().unwrap();
//! assert_eq!(next.id, queued.id);
//!
//! store.mark_sent(next.id, Utc::now(), Duration::from_millis(120)).unwrap();
//! assert!(store.next_unsent().unwrap().is_none());
//! ```

pub mod database;
pub mod error;
pub mod models;
pub mod queries;

pub use database::{MessageStore, SCHEMA_VERSION};
pub use error::StoreError;
pub use models::{InboundMessage, Node, OutboundMessage};
