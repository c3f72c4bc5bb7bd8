//! LoStik Serial Port Detection Library
//!
//! This crate locates the USB serial port a LoStik modem is attached to by
//! its USB Vendor/Product ID, so the port never has to be guessed or passed
//! on the command line.
//!
//! # Example
//!
//! ```rust,no_run
//! use lostik_detect::{usb_ids, PortScanner};
//!
//! let scanner = PortScanner::new();
//! let port = scanner.find_device(usb_ids::LOSTIK).unwrap();
//! println!("LoStik on {}", port.port);
//! ```

pub mod error;
pub mod scanner;
pub mod usb_ids;

pub use error::DetectError;
pub use scanner::{select_device, PortScanner, SerialPortInfo};
pub use usb_ids::UsbId;
