//! LoStik Modem Simulation Library
//!
//! This crate provides a stand-in for a LoStik's RN2903 so the device link
//! and channel access service can be tested without hardware:
//!
//! - **VirtualModem**: Answers RN2903 text commands and tracks radio state
//! - **VirtualPort**: Byte-stream transport (`Read + Write`) in front of a modem
//! - **ModemHandle**: Scripts and inspects the modem while a port is in use
//!
//! # Example
//!
//! ```rust
//! use std::io::{Read, Write};
//! use lostik_sim::VirtualPort;
//!
//! let (mut port, handle) = VirtualPort::new();
//! handle.queue_frame("HELLO");
//!
//! port.write_all(b"radio rx 0\r\n").unwrap();
//!
//! let mut buf = [0u8; 64];
//! let n = port.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"ok\r\n");
//! let n = port.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"radio_rx  48454C4C4F\r\n");
//! assert_eq!(handle.commands(), vec!["radio rx 0"]);
//! ```

pub mod modem;
pub mod port;

pub use modem::{ModemMode, RxEvent, TxOutcome, VirtualModem, DEFAULT_HWEUI};
pub use port::{ModemHandle, VirtualPort};
