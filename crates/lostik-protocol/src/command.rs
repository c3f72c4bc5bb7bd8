//! RN2903 command encoding
//!
//! Every command is a single ASCII line terminated by CRLF. The modem answers
//! each one with exactly one line, except `radio tx` which is acknowledged
//! immediately and reports its outcome on a second line once the packet has
//! left the antenna.

use std::fmt;

use crate::settings::{Bandwidth, CodingRate, SpreadingFactor};

/// Command terminator expected by the modem
pub const TERMINATOR: &[u8] = b"\r\n";

/// Status LEDs on the LoStik, wired to RN2903 GPIO pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    /// Blue receive LED (GPIO10)
    Rx,
    /// Red transmit LED (GPIO11)
    Tx,
}

impl Led {
    /// GPIO pin name driving this LED
    pub fn pin(&self) -> &'static str {
        match self {
            Led::Rx => "GPIO10",
            Led::Tx => "GPIO11",
        }
    }
}

/// A single `radio set` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioParam {
    /// Carrier frequency in Hz
    Frequency(u32),
    /// Spreading factor
    SpreadingFactor(SpreadingFactor),
    /// Signal bandwidth
    Bandwidth(Bandwidth),
    /// Forward error correction coding rate
    CodingRate(CodingRate),
    /// Raw RN2903 transmit power setting (2..=20)
    Power(u8),
    /// Modulation mode, `lora` or `fsk`
    Modulation(String),
    /// CRC header on or off
    Crc(bool),
    /// IQ inversion on or off
    IqInversion(bool),
    /// Sync word as a single hex byte
    SyncWord(String),
    /// Watchdog time-out in milliseconds (0 disables it)
    Watchdog(u32),
}

impl RadioParam {
    /// Parameter keyword as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            RadioParam::Frequency(_) => "freq",
            RadioParam::SpreadingFactor(_) => "sf",
            RadioParam::Bandwidth(_) => "bw",
            RadioParam::CodingRate(_) => "cr",
            RadioParam::Power(_) => "pwr",
            RadioParam::Modulation(_) => "mod",
            RadioParam::Crc(_) => "crc",
            RadioParam::IqInversion(_) => "iqi",
            RadioParam::SyncWord(_) => "sync",
            RadioParam::Watchdog(_) => "wdt",
        }
    }

    /// Parameter value as it appears on the wire
    pub fn value(&self) -> String {
        match self {
            RadioParam::Frequency(hz) => hz.to_string(),
            RadioParam::SpreadingFactor(sf) => sf.to_string(),
            RadioParam::Bandwidth(bw) => bw.to_string(),
            RadioParam::CodingRate(cr) => cr.to_string(),
            RadioParam::Power(pwr) => pwr.to_string(),
            RadioParam::Modulation(m) => m.clone(),
            RadioParam::Crc(on) | RadioParam::IqInversion(on) => on_off(*on).to_string(),
            RadioParam::SyncWord(s) => s.clone(),
            RadioParam::Watchdog(ms) => ms.to_string(),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Commands understood by the RN2903
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `sys get ver` - firmware version string
    SysGetVer,
    /// `sys get hweui` - preprogrammed EUI-64 of the module
    SysGetHweui,
    /// `sys set pindig <pin> <0|1>` - drive a GPIO pin
    SysSetPinDig { led: Led, on: bool },
    /// `mac pause` - suspend the LoRaWAN stack so raw radio commands are accepted
    MacPause,
    /// `radio set <param> <value>`
    RadioSet(RadioParam),
    /// `radio rx <window>` - receive; a window of 0 means continuous
    RadioRx { window: u32 },
    /// `radio rxstop` - leave continuous receive mode
    RadioRxStop,
    /// `radio tx <hex>` - transmit a payload
    RadioTx { payload_hex: String },
    /// `radio get rssi` - RSSI of the last received frame
    RadioGetRssi,
    /// `radio get snr` - SNR of the last received frame
    RadioGetSnr,
}

impl Command {
    /// Encode this command to its wire format, including the terminator
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.to_string().into_bytes();
        bytes.extend_from_slice(TERMINATOR);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SysGetVer => write!(f, "sys get ver"),
            Command::SysGetHweui => write!(f, "sys get hweui"),
            Command::SysSetPinDig { led, on } => {
                write!(f, "sys set pindig {} {}", led.pin(), u8::from(*on))
            }
            Command::MacPause => write!(f, "mac pause"),
            Command::RadioSet(param) => write!(f, "radio set {} {}", param.name(), param.value()),
            Command::RadioRx { window } => write!(f, "radio rx {}", window),
            Command::RadioRxStop => write!(f, "radio rxstop"),
            Command::RadioTx { payload_hex } => write!(f, "radio tx {}", payload_hex),
            Command::RadioGetRssi => write!(f, "radio get rssi"),
            Command::RadioGetSnr => write!(f, "radio get snr"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_crlf() {
        assert_eq!(Command::SysGetVer.encode(), b"sys get ver\r\n");
        assert_eq!(Command::RadioRxStop.encode(), b"radio rxstop\r\n");
    }

    #[test]
    fn test_encode_radio_set() {
        let cmd = Command::RadioSet(RadioParam::Frequency(923_300_000));
        assert_eq!(cmd.encode(), b"radio set freq 923300000\r\n");

        let cmd = Command::RadioSet(RadioParam::SpreadingFactor(SpreadingFactor::SF12));
        assert_eq!(cmd.to_string(), "radio set sf sf12");

        let cmd = Command::RadioSet(RadioParam::CodingRate(CodingRate::Cr4_8));
        assert_eq!(cmd.to_string(), "radio set cr 4/8");

        let cmd = Command::RadioSet(RadioParam::Crc(true));
        assert_eq!(cmd.to_string(), "radio set crc on");
    }

    #[test]
    fn test_encode_led() {
        let cmd = Command::SysSetPinDig {
            led: Led::Tx,
            on: true,
        };
        assert_eq!(cmd.to_string(), "sys set pindig GPIO11 1");
    }

    #[test]
    fn test_encode_tx_and_rx() {
        let cmd = Command::RadioTx {
            payload_hex: "48454C4C4F".into(),
        };
        assert_eq!(cmd.encode(), b"radio tx 48454C4C4F\r\n");
        assert_eq!(Command::RadioRx { window: 0 }.to_string(), "radio rx 0");
    }
}
