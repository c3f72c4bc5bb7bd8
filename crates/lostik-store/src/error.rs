//! Error types for the message store

use std::path::PathBuf;

use lostik_protocol::PayloadError;
use thiserror::Error;

/// Errors that can occur in the message store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Outbound text failed validation; nothing was written
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] PayloadError),

    /// Message already carries transmission metadata
    #[error("message {0} has already been marked sent")]
    AlreadySent(i64),

    /// No outbound message with this id
    #[error("outbound message {0} not found")]
    MessageNotFound(i64),

    /// No node with this id is registered
    #[error("node {0} is not registered")]
    NodeNotFound(u32),

    /// A different node is already marked local in this database
    #[error("node {existing} is already the local node, cannot mark node {requested}")]
    LocalNodeConflict { existing: u32, requested: u32 },

    /// Database written by a newer version of this software
    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },

    /// Could not create the database directory
    #[error("cannot create database directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying SQLite failure
    #[error("persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}
