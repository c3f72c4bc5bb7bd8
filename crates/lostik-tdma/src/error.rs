//! Error types for the device link and channel access service

use lostik_detect::{DetectError, UsbId};
use lostik_protocol::{PayloadError, SettingsError};
use lostik_store::StoreError;
use thiserror::Error;

/// Errors raised while talking to the modem
#[derive(Debug, Error)]
pub enum LinkError {
    /// No attached device matches the expected USB ID
    #[error("LoStik not detected (looking for USB device {0})")]
    DeviceNotFound(UsbId),

    /// Device present but the port could not be opened or enumerated
    #[error("unable to connect to LoStik on {port}: {reason}")]
    DeviceUnreachable { port: String, reason: String },

    /// Firmware version does not match the configured one
    #[error("LoStik reported firmware {actual:?}, expected {expected:?}")]
    UnexpectedFirmware { expected: String, actual: String },

    /// Reply did not match what the command requires
    #[error("unexpected reply to `{command}`: expected {expected}, got {actual:?}")]
    ProtocolMismatch {
        command: String,
        expected: &'static str,
        actual: String,
    },

    /// A radio setting was refused
    #[error("failed to set radio {setting} to {value}: modem replied {response:?}")]
    ConfigurationFailure {
        setting: &'static str,
        value: String,
        response: String,
    },

    /// Modem refused to switch receive mode
    #[error("LoStik busy, `{command}` refused with {response:?}")]
    DeviceBusy { command: String, response: String },

    /// Transmission aborted by the radio (`radio_err`)
    #[error("transmit failure: radio error")]
    TransmitFailure,

    /// Serial I/O failure after the port was opened
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DetectError> for LinkError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::DeviceNotFound(id) => LinkError::DeviceNotFound(id),
            DetectError::EnumerationFailed(reason) => LinkError::DeviceUnreachable {
                port: "serial port enumeration".to_string(),
                reason,
            },
        }
    }
}

/// Errors in the slot schedule or slot ownership
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Slot plan does not tile the minute into whole cycles
    #[error("invalid slot plan: {slot_count} slot(s) of {seconds_per_slot}s do not divide a minute")]
    InvalidSlotPlan {
        seconds_per_slot: u32,
        slot_count: u32,
    },

    /// Assigned slot does not exist in the plan
    #[error("slot {slot} assigned to {eui} is outside the plan's {slot_count} slot(s)")]
    SlotOutOfRange {
        eui: String,
        slot: u32,
        slot_count: u32,
    },

    /// Hardware EUI has no slot in the static registry
    #[error("device {eui} has no assigned time slot")]
    UnregisteredDevice { eui: String },
}

/// Errors that can stop the channel access service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("invalid radio settings: {0}")]
    Settings(#[from] SettingsError),

    /// Message text rejected by the queue
    #[error("invalid message: {0}")]
    InvalidMessage(PayloadError),

    /// Message store failure
    #[error("message store failure: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidMessage(e) => ServiceError::InvalidMessage(e),
            other => ServiceError::Persistence(other),
        }
    }
}

impl ServiceError {
    /// Returns true if the service cannot continue after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ServiceError::Link(LinkError::TransmitFailure)
                | ServiceError::Link(LinkError::DeviceBusy { .. })
                | ServiceError::InvalidMessage(_)
        )
    }

    /// Actionable advice for the operator
    pub fn remedy(&self) -> &'static str {
        match self {
            ServiceError::Link(LinkError::DeviceNotFound(_)) => {
                "Check serial port descriptor and/or device connection."
            }
            ServiceError::Link(LinkError::DeviceUnreachable { .. }) => {
                "Check port permissions. User must be member of \"dialout\" group on Linux."
            }
            ServiceError::Link(LinkError::UnexpectedFirmware { .. }) => {
                "Update the LoStik firmware or set expected_firmware in the settings file."
            }
            ServiceError::Link(LinkError::ConfigurationFailure { .. })
            | ServiceError::Settings(_) => {
                "Check the radio settings; all nodes must share frequency, sf, bw and cr."
            }
            ServiceError::Link(_) => "Disconnect and reconnect LoStik device, then try again.",
            ServiceError::Schedule(ScheduleError::UnregisteredDevice { .. }) => {
                "Add this device's hardware EUI to the slot table, or run with --self-learning."
            }
            ServiceError::Schedule(_) => {
                "Fix the slot plan: slot count times seconds per slot must divide 60."
            }
            ServiceError::InvalidMessage(_) => {
                "Messages are 1 to 50 characters of letters, digits, spaces and . ? !"
            }
            ServiceError::Persistence(_) => {
                "Check that the database file exists and is writable."
            }
        }
    }
}
