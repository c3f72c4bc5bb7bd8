//! Radio settings applied to the RN2903 at start-up
//!
//! All nodes sharing a channel must agree on frequency, spreading factor,
//! bandwidth and coding rate. Transmit power may vary per node.

use std::fmt;

use crate::command::RadioParam;
use crate::error::SettingsError;

/// Lowest frequency accepted by the RN2903 (Hz)
pub const MIN_FREQUENCY_HZ: u32 = 902_000_000;
/// Highest frequency accepted by the RN2903 (Hz)
pub const MAX_FREQUENCY_HZ: u32 = 928_000_000;

/// LoRa spreading factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct SpreadingFactor(u8);

impl SpreadingFactor {
    pub const SF7: SpreadingFactor = SpreadingFactor(7);
    pub const SF12: SpreadingFactor = SpreadingFactor(12);

    /// Create a spreading factor, rejecting values outside 7..=12
    pub fn new(sf: u8) -> Result<Self, SettingsError> {
        if (7..=12).contains(&sf) {
            Ok(Self(sf))
        } else {
            Err(SettingsError::SpreadingFactor(sf))
        }
    }

    /// Get the raw spreading factor
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = SettingsError;

    fn try_from(sf: u8) -> Result<Self, Self::Error> {
        Self::new(sf)
    }
}

impl From<SpreadingFactor> for u8 {
    fn from(sf: SpreadingFactor) -> u8 {
        sf.0
    }
}

impl fmt::Display for SpreadingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sf{}", self.0)
    }
}

/// Signal bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bandwidth {
    Khz125,
    Khz250,
    Khz500,
}

impl Bandwidth {
    /// Bandwidth in kHz
    pub fn khz(&self) -> u16 {
        match self {
            Bandwidth::Khz125 => 125,
            Bandwidth::Khz250 => 250,
            Bandwidth::Khz500 => 500,
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.khz())
    }
}

/// Forward error correction coding rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodingRate {
    Cr4_5,
    Cr4_6,
    Cr4_7,
    Cr4_8,
}

impl fmt::Display for CodingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let denominator = match self {
            CodingRate::Cr4_5 => 5,
            CodingRate::Cr4_6 => 6,
            CodingRate::Cr4_7 => 7,
            CodingRate::Cr4_8 => 8,
        };
        write!(f, "4/{}", denominator)
    }
}

/// Transmit power presets
///
/// The LoStik's RN2903 output is not linear in its `pwr` setting, so each
/// preset carries the measured output alongside the raw setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TxPower {
    #[default]
    Low,
    Medium,
    High,
}

impl TxPower {
    /// Raw value for `radio set pwr`
    pub fn setting(&self) -> u8 {
        match self {
            TxPower::Low => 6,
            TxPower::Medium => 12,
            TxPower::High => 20,
        }
    }

    /// Output power in dBm
    pub fn dbm(&self) -> f32 {
        match self {
            TxPower::Low => 7.0,
            TxPower::Medium => 13.0,
            TxPower::High => 18.5,
        }
    }

    /// Output power in milliwatts
    pub fn milliwatts(&self) -> f32 {
        match self {
            TxPower::Low => 5.0,
            TxPower::Medium => 20.0,
            TxPower::High => 70.8,
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            TxPower::Low => "LOW",
            TxPower::Medium => "MEDIUM",
            TxPower::High => "HIGH",
        }
    }
}

impl fmt::Display for TxPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.1} dBm, {:.1} mW)",
            self.name(),
            self.dbm(),
            self.milliwatts()
        )
    }
}

/// Complete radio configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RadioSettings {
    /// Carrier frequency in Hz
    pub frequency_hz: u32,
    /// Spreading factor
    pub spreading_factor: SpreadingFactor,
    /// Signal bandwidth
    pub bandwidth: Bandwidth,
    /// Coding rate
    pub coding_rate: CodingRate,
    /// Transmit power preset
    pub power: TxPower,
    /// Modulation mode (`lora`), sent only when set
    pub modulation: Option<String>,
    /// CRC header, sent only when set
    pub crc: Option<bool>,
    /// IQ inversion, sent only when set
    pub iq_inversion: Option<bool>,
    /// Sync word (one hex byte), sent only when set
    pub sync_word: Option<String>,
    /// Receive watchdog time-out in milliseconds, sent only when set
    pub watchdog_ms: Option<u32>,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 923_300_000,
            spreading_factor: SpreadingFactor::SF12,
            bandwidth: Bandwidth::Khz125,
            coding_rate: CodingRate::Cr4_8,
            power: TxPower::Low,
            modulation: None,
            crc: None,
            iq_inversion: None,
            sync_word: None,
            watchdog_ms: None,
        }
    }
}

impl RadioSettings {
    /// Check the settings against the RN2903's accepted ranges
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&self.frequency_hz) {
            return Err(SettingsError::FrequencyOutOfRange(self.frequency_hz));
        }
        if let Some(sync) = &self.sync_word {
            let valid = !sync.is_empty()
                && sync.len() <= 2
                && sync.chars().all(|c| c.is_ascii_hexdigit());
            if !valid {
                return Err(SettingsError::SyncWord(sync.clone()));
            }
        }
        Ok(())
    }

    /// Parameters in the order they are written to the modem
    pub fn params(&self) -> Vec<RadioParam> {
        let mut params = Vec::with_capacity(10);
        if let Some(m) = &self.modulation {
            params.push(RadioParam::Modulation(m.clone()));
        }
        params.push(RadioParam::Frequency(self.frequency_hz));
        params.push(RadioParam::SpreadingFactor(self.spreading_factor));
        params.push(RadioParam::Bandwidth(self.bandwidth));
        params.push(RadioParam::CodingRate(self.coding_rate));
        params.push(RadioParam::Power(self.power.setting()));
        if let Some(crc) = self.crc {
            params.push(RadioParam::Crc(crc));
        }
        if let Some(iqi) = self.iq_inversion {
            params.push(RadioParam::IqInversion(iqi));
        }
        if let Some(sync) = &self.sync_word {
            params.push(RadioParam::SyncWord(sync.clone()));
        }
        if let Some(wdt) = self.watchdog_ms {
            params.push(RadioParam::Watchdog(wdt));
        }
        params
    }

    /// Format frequency for display
    pub fn frequency_display(&self) -> String {
        format!("{:.3} MHz", self.frequency_hz as f64 / 1_000_000.0)
    }
}
