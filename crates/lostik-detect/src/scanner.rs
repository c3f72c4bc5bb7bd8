//! Serial port lookup by USB ID

use serialport::{available_ports, SerialPortType};
use tracing::{debug, info, warn};

use crate::error::DetectError;
use crate::usb_ids::{adapter_name, UsbId};

/// A serial port and the USB IDs behind it, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    pub usb: Option<UsbId>,
}

impl SerialPortInfo {
    fn from_serialport(port: String, port_type: &SerialPortType) -> Self {
        let usb = match port_type {
            SerialPortType::UsbPort(usb) => Some(UsbId::new(usb.vid, usb.pid)),
            _ => None,
        };
        Self { port, usb }
    }
}

/// Finds attached devices among the system's serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct PortScanner;

impl PortScanner {
    pub fn new() -> Self {
        Self
    }

    /// Find the port of the attached device with the given USB ID
    pub fn find_device(&self, id: UsbId) -> Result<SerialPortInfo, DetectError> {
        let ports: Vec<_> = available_ports()
            .map_err(|e| DetectError::EnumerationFailed(e.to_string()))?
            .into_iter()
            .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type))
            .collect();
        debug!("{} serial port(s) present", ports.len());

        let port = select_device(ports, id)?;
        info!(
            "{} device {} detected on port {}",
            adapter_name(id.vid).unwrap_or("USB"),
            id,
            port.port
        );
        Ok(port)
    }
}

/// Pick the port matching `id` out of an enumeration
///
/// When several matching devices are attached the first one enumerated wins.
pub fn select_device(ports: Vec<SerialPortInfo>, id: UsbId) -> Result<SerialPortInfo, DetectError> {
    let mut matching = ports.into_iter().filter(|p| p.usb == Some(id));
    let first = matching.next().ok_or(DetectError::DeviceNotFound(id))?;
    let others: Vec<_> = matching.map(|p| p.port).collect();
    if !others.is_empty() {
        warn!(
            "Multiple {} devices attached, using {} and ignoring {}",
            id,
            first.port,
            others.join(", ")
        );
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb_ids::{ch340, LOSTIK};
    use serialport::UsbPortInfo;

    fn usb_port(name: &str, vid: u16, pid: u16) -> SerialPortInfo {
        let usb_info = SerialPortType::UsbPort(UsbPortInfo {
            vid,
            pid,
            serial_number: None,
            manufacturer: None,
            product: Some("USB Serial".to_string()),
        });
        SerialPortInfo::from_serialport(name.to_string(), &usb_info)
    }

    #[test]
    fn test_usb_port_carries_ids() {
        assert_eq!(usb_port("/dev/ttyUSB0", 0x1A86, 0x7523).usb, Some(LOSTIK));
    }

    #[test]
    fn test_non_usb_port_has_no_ids() {
        let info =
            SerialPortInfo::from_serialport("/dev/ttyS0".to_string(), &SerialPortType::Unknown);
        assert_eq!(info.usb, None);
    }

    #[test]
    fn test_select_device_matches_vid_pid() {
        let ports = vec![
            SerialPortInfo::from_serialport("/dev/ttyS0".into(), &SerialPortType::Unknown),
            usb_port("/dev/ttyUSB0", 0x0403, 0x6001),
            usb_port("/dev/ttyUSB1", 0x1A86, 0x7523),
        ];
        let port = select_device(ports, LOSTIK).unwrap();
        assert_eq!(port.port, "/dev/ttyUSB1");
    }

    #[test]
    fn test_select_device_prefers_first_match() {
        let ports = vec![
            usb_port("/dev/ttyUSB2", 0x1A86, 0x7523),
            usb_port("/dev/ttyUSB3", 0x1A86, 0x7523),
        ];
        assert_eq!(select_device(ports, LOSTIK).unwrap().port, "/dev/ttyUSB2");
    }

    #[test]
    fn test_ch341_is_not_a_lostik() {
        let ports = vec![usb_port("/dev/ttyUSB0", 0x1A86, 0x5523)];
        assert_eq!(ports[0].usb, Some(ch340::CH341));
        assert!(matches!(
            select_device(ports, LOSTIK),
            Err(DetectError::DeviceNotFound(id)) if id == LOSTIK
        ));
    }
}
