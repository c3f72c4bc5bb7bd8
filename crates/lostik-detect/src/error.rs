//! Error types for LoStik detection

use thiserror::Error;

use crate::usb_ids::UsbId;

/// Errors that can occur during detection
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// No attached port matches the requested USB ID
    #[error("no serial device with USB ID {0} is attached")]
    DeviceNotFound(UsbId),
}
