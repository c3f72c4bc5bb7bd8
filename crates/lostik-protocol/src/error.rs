//! Error types for LoStik protocol parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing modem replies
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Reply was expected to be a number
    #[error("expected a numeric reply, got {0:?}")]
    NotNumeric(String),
}

/// Errors for outbound message text and hexadecimal payloads
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Message is empty
    #[error("message is empty")]
    Empty,

    /// Message exceeds the maximum length
    #[error("message is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },

    /// Message contains a character outside `[A-Za-z0-9 .?!]`
    #[error("message contains invalid character {0:?}")]
    InvalidCharacter(char),

    /// Payload is not valid hexadecimal
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),

    /// Decoded payload bytes are not valid UTF-8
    #[error("payload is not valid text")]
    NotText,
}

/// Errors for radio settings that the RN2903 would reject
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Frequency outside the RN2903 band
    #[error("frequency {0} Hz is outside 902000000..=928000000")]
    FrequencyOutOfRange(u32),

    /// Spreading factor outside sf7..sf12
    #[error("spreading factor {0} is outside 7..=12")]
    SpreadingFactor(u8),

    /// Sync word must be a single byte rendered as hex
    #[error("sync word {0:?} is not a single hex byte")]
    SyncWord(String),
}
