//! Service configuration

use std::time::Duration;

use lostik_detect::{usb_ids, UsbId};
use lostik_protocol::{RadioSettings, BAUD_RATE, EXPECTED_FIRMWARE};
use serde::{Deserialize, Serialize};

use crate::assignment::SlotRegistry;
use crate::error::ServiceError;
use crate::schedule::SlotPlan;

/// How this node finds its slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Look the modem's hardware EUI up in a fixed table
    Static { slots: SlotRegistry },
    /// Claim the first window that carries a successful transmission
    SelfLearning,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        SlotPolicy::Static {
            slots: SlotRegistry::new(),
        }
    }
}

/// Everything the link and scheduler need, fixed for the life of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// USB ID used to find the modem
    pub device: UsbId,
    /// Serial port to use instead of searching by USB ID
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Serial read time-out; also the service's tick length while listening
    pub read_timeout: Duration,
    /// Firmware the modem must report
    pub expected_firmware: String,
    pub radio: RadioSettings,
    pub slot_plan: SlotPlan,
    pub slot_policy: SlotPolicy,
    /// Pause after finding nothing to send in an owned window
    pub idle_backoff: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            device: usb_ids::LOSTIK,
            port: None,
            baud_rate: BAUD_RATE,
            read_timeout: Duration::from_secs(1),
            expected_firmware: EXPECTED_FIRMWARE.to_string(),
            radio: RadioSettings::default(),
            slot_plan: SlotPlan::default(),
            slot_policy: SlotPolicy::default(),
            idle_backoff: Duration::from_secs(1),
        }
    }
}

impl ServiceConfig {
    /// Check the configuration before touching the modem
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.radio.validate()?;
        self.slot_plan.validate()?;
        if let SlotPolicy::Static { slots } = &self.slot_policy {
            slots.validate(&self.slot_plan)?;
        }
        Ok(())
    }
}
