//! USB Vendor/Product ID database for LoStik-compatible adapters
//!
//! The Ronoth LoStik bridges the RN2903's UART to USB through a WCH CH340,
//! so it enumerates with the CH340's IDs rather than a Ronoth-specific pair.

use std::fmt;

/// USB Vendor ID / Product ID pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl UsbId {
    pub const fn new(vid: u16, pid: u16) -> Self {
        Self { vid, pid }
    }
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vid, self.pid)
    }
}

/// WCH CH340/CH341
pub mod ch340 {
    use super::UsbId;

    pub const VID: u16 = 0x1A86;

    pub const CH340: UsbId = UsbId::new(VID, 0x7523);
    pub const CH341: UsbId = UsbId::new(VID, 0x5523);
}

/// The Ronoth LoStik
pub const LOSTIK: UsbId = ch340::CH340;

/// Get adapter type name from VID
pub fn adapter_name(vid: u16) -> Option<&'static str> {
    match vid {
        ch340::VID => Some("CH340"),
        _ => None,
    }
}
