//! LoStik Protocol Library
//!
//! This crate provides encoding and parsing for the line-oriented command
//! protocol spoken by the Microchip RN2903 LoRa module inside the Ronoth
//! LoStik USB modem:
//!
//! - **Commands**: ASCII text terminated by CRLF (`radio set sf sf12\r\n`)
//! - **Responses**: one ASCII line per reply, terminated by LF
//! - **Payloads**: message bytes rendered as hexadecimal ASCII
//!
//! # Architecture
//!
//! - [`command`] builds the requests the host sends to the modem
//! - [`response`] classifies the lines the modem sends back
//! - [`codec`] reassembles lines from a byte stream that may deliver them in
//!   fragments across read time-outs
//! - [`payload`] validates outbound message text and converts it to and from
//!   the hexadecimal over-the-air form
//! - [`settings`] describes the radio parameters applied at start-up
//!
//! # Example
//!
//! ```rust
//! use lostik_protocol::{Command, LineCodec, Response};
//!
//! assert_eq!(Command::MacPause.encode(), b"mac pause\r\n");
//!
//! let mut codec = LineCodec::new();
//! codec.push_bytes(b"radio_rx  48454C4C4F\r\n");
//! let line = codec.next_line().unwrap();
//! assert_eq!(
//!     Response::parse(&line),
//!     Response::RadioRx { payload_hex: "48454C4C4F".into() }
//! );
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod payload;
pub mod response;
pub mod settings;

pub use codec::LineCodec;
pub use command::{Command, Led, RadioParam};
pub use error::{ParseError, PayloadError, SettingsError};
pub use payload::{decode_hex, encode_hex, MessageText, MAX_MESSAGE_LEN};
pub use response::{parse_numeric, Response, MAC_PAUSE_ACK};
pub use settings::{Bandwidth, CodingRate, RadioSettings, SpreadingFactor, TxPower};

/// Firmware version string reported by the LoStik units this service was built against
pub const EXPECTED_FIRMWARE: &str = "RN2903 1.0.5 Nov 06 2018 10:45:27";

/// Serial baud rate of the RN2903 command interface
pub const BAUD_RATE: u32 = 57_600;
