//! Device link to the RN2903
//!
//! Turns the radio operations the service needs into command/reply exchanges
//! over a serial byte stream. Every command expects a specific reply; anything
//! else is reported as an error naming the command and what came back.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lostik_detect::PortScanner;
use lostik_protocol::{
    parse_numeric, Command, Led, LineCodec, RadioSettings, Response, MAC_PAUSE_ACK,
};
use serialport::SerialPort;
use tracing::{debug, info, trace, warn};

use crate::config::ServiceConfig;
use crate::error::LinkError;

/// Longest wait for `radio_tx_ok`/`radio_err` after a transmission starts
const MAX_TX_WAIT: Duration = Duration::from_secs(30);

/// Proof of a completed transmission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmitReceipt {
    /// When the modem reported completion
    pub sent_at: DateTime<Utc>,
    /// Time between the modem accepting the packet and reporting completion
    pub air_time: Duration,
}

/// Outcome of one bounded read while receiving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reception {
    /// `radio_rx <hex>`; the radio has left receive mode
    Frame(String),
    /// Nothing arrived within the read time-out
    NoFrame,
    /// `radio_err`: the receive watchdog expired and the radio is idle
    WatchdogExpired,
}

/// Signal quality of the last received packet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkQuality {
    /// dBm
    pub rssi: i32,
    /// dB
    pub snr: f64,
}

/// Command channel to a LoStik over any byte stream
pub struct DeviceLink<T> {
    port_name: String,
    io: T,
    codec: LineCodec,
    buffer: Vec<u8>,
}

impl DeviceLink<Box<dyn SerialPort>> {
    /// Find the LoStik, open its serial port and check its firmware
    pub fn connect(config: &ServiceConfig) -> Result<Self, LinkError> {
        let port_name = match &config.port {
            Some(port) => port.clone(),
            None => PortScanner::new().find_device(config.device)?.port,
        };

        let port = serialport::new(&port_name, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| LinkError::DeviceUnreachable {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;
        info!("Opened {} at {} baud", port_name, config.baud_rate);

        let mut link = Self::with_name(port, port_name);
        link.verify_firmware(&config.expected_firmware)?;
        Ok(link)
    }
}

impl<T> DeviceLink<T>
where
    T: Read + Write,
{
    /// Wrap an already-open transport
    pub fn new(io: T) -> Self {
        Self::with_name(io, "virtual")
    }

    /// Wrap an already-open transport and check the modem's firmware
    pub fn open(io: T, expected_firmware: &str) -> Result<Self, LinkError> {
        let mut link = Self::new(io);
        link.verify_firmware(expected_firmware)?;
        Ok(link)
    }

    fn with_name(io: T, port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            io,
            codec: LineCodec::new(),
            buffer: vec![0; 256],
        }
    }

    /// Name of the underlying port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// `sys get ver`; fails unless the reply equals `expected`
    pub fn verify_firmware(&mut self, expected: &str) -> Result<String, LinkError> {
        let actual = self.request(&Command::SysGetVer)?;
        if actual.trim() != expected.trim() {
            return Err(LinkError::UnexpectedFirmware {
                expected: expected.to_string(),
                actual,
            });
        }
        info!("LoStik firmware: {}", actual);
        Ok(actual)
    }

    /// `sys get hweui`
    pub fn hardware_eui(&mut self) -> Result<String, LinkError> {
        let command = Command::SysGetHweui;
        let eui = self.request(&command)?;
        if eui.len() != 16 || !eui.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(mismatch(&command, "a 16-digit hardware EUI", eui));
        }
        Ok(eui)
    }

    /// `mac pause`: stop the built-in LoRaWAN stack so the radio can be driven directly
    pub fn suspend_builtin_protocol(&mut self) -> Result<(), LinkError> {
        let command = Command::MacPause;
        let reply = self.request(&command)?;
        if reply != MAC_PAUSE_ACK {
            return Err(mismatch(&command, MAC_PAUSE_ACK, reply));
        }
        debug!("LoRaWAN stack paused");
        Ok(())
    }

    /// Apply every radio setting, stopping at the first refusal
    ///
    /// Both LEDs are lit while the settings are written.
    pub fn configure(&mut self, settings: &RadioSettings) -> Result<(), LinkError> {
        self.set_led(Led::Rx, true)?;
        self.set_led(Led::Tx, true)?;
        let result = self.apply_settings(settings);
        self.set_led(Led::Rx, false)?;
        self.set_led(Led::Tx, false)?;
        result?;

        info!(
            "Radio configured: {} {} bw {} cr {} power {}",
            settings.frequency_display(),
            settings.spreading_factor,
            settings.bandwidth,
            settings.coding_rate,
            settings.power
        );
        Ok(())
    }

    fn apply_settings(&mut self, settings: &RadioSettings) -> Result<(), LinkError> {
        for param in settings.params() {
            let command = Command::RadioSet(param.clone());
            let reply = self.request(&command)?;
            if Response::parse(&reply) != Response::Ok {
                return Err(LinkError::ConfigurationFailure {
                    setting: param.name(),
                    value: param.value(),
                    response: reply,
                });
            }
        }
        Ok(())
    }

    /// Switch a status LED; returns whether the modem acknowledged
    pub fn set_led(&mut self, led: Led, on: bool) -> Result<bool, LinkError> {
        let reply = self.request(&Command::SysSetPinDig { led, on })?;
        let acknowledged = Response::parse(&reply) == Response::Ok;
        if !acknowledged {
            warn!("LED {} not switched: {}", led.pin(), reply);
        }
        Ok(acknowledged)
    }

    /// `radio rx 0`: enter continuous receive
    pub fn start_receiving(&mut self) -> Result<(), LinkError> {
        let command = Command::RadioRx { window: 0 };
        let reply = self.request(&command)?;
        match Response::parse(&reply) {
            Response::Ok => Ok(()),
            _ => Err(refusal(&command, reply)),
        }
    }

    /// `radio rxstop`: leave continuous receive
    ///
    /// A frame or watchdog expiry the modem reported just before it read the
    /// command arrives ahead of the reply and is returned. The radio is idle
    /// whenever this returns `Ok`.
    pub fn stop_receiving(&mut self) -> Result<Option<Reception>, LinkError> {
        let command = Command::RadioRxStop;
        let reply = self.request(&command)?;
        let early = match Response::parse(&reply) {
            Response::Ok => return Ok(None),
            Response::RadioRx { payload_hex } => Reception::Frame(payload_hex),
            Response::RadioErr => Reception::WatchdogExpired,
            _ => return Err(refusal(&command, reply)),
        };
        debug!("{:?} arrived ahead of the rxstop reply", early);

        // The reception already ended receive mode; any refusal here is moot
        let reply = self
            .read_line()?
            .ok_or_else(|| mismatch(&command, "ok", "<no reply>"))?;
        match Response::parse(&reply) {
            Response::Ok | Response::Busy | Response::InvalidParam => Ok(Some(early)),
            _ => Err(mismatch(&command, "ok", reply)),
        }
    }

    /// `radio tx <hex>`, waiting for the radio to report the outcome
    pub fn transmit(&mut self, payload_hex: &str) -> Result<TransmitReceipt, LinkError> {
        let command = Command::RadioTx {
            payload_hex: payload_hex.to_string(),
        };
        let ack = self.request(&command)?;
        if Response::parse(&ack) != Response::Ok {
            return Err(mismatch(&command, "ok", ack));
        }

        let started = Instant::now();
        loop {
            let Some(line) = self.read_line()? else {
                if started.elapsed() > MAX_TX_WAIT {
                    return Err(mismatch(&command, "radio_tx_ok or radio_err", "<no reply>"));
                }
                continue;
            };
            return match Response::parse(&line) {
                Response::RadioTxOk => Ok(TransmitReceipt {
                    sent_at: Utc::now(),
                    air_time: started.elapsed(),
                }),
                Response::RadioErr => Err(LinkError::TransmitFailure),
                _ => Err(mismatch(&command, "radio_tx_ok or radio_err", line)),
            };
        }
    }

    /// Wait up to one read time-out for a frame
    pub fn poll_receive(&mut self) -> Result<Reception, LinkError> {
        let Some(line) = self.read_line()? else {
            return Ok(Reception::NoFrame);
        };
        match Response::parse(&line) {
            Response::RadioRx { payload_hex } => Ok(Reception::Frame(payload_hex)),
            Response::RadioErr => Ok(Reception::WatchdogExpired),
            _ => Err(mismatch(
                &Command::RadioRx { window: 0 },
                "a received frame",
                line,
            )),
        }
    }

    /// RSSI and SNR of the last received packet
    pub fn link_quality(&mut self) -> Result<LinkQuality, LinkError> {
        let rssi = self.numeric(&Command::RadioGetRssi)?;
        let snr = self.numeric(&Command::RadioGetSnr)?;
        Ok(LinkQuality { rssi, snr })
    }

    fn numeric<N: std::str::FromStr>(&mut self, command: &Command) -> Result<N, LinkError> {
        let reply = self.request(command)?;
        parse_numeric(&reply).map_err(|_| mismatch(command, "a number", reply))
    }

    /// Send a command and read its single-line reply
    fn request(&mut self, command: &Command) -> Result<String, LinkError> {
        self.send(command)?;
        self.read_line()?
            .ok_or_else(|| mismatch(command, "a reply", "<no reply>"))
    }

    fn send(&mut self, command: &Command) -> Result<(), LinkError> {
        trace!("{} <- {}", self.port_name, command);
        self.io.write_all(&command.encode())?;
        self.io.flush()?;
        Ok(())
    }

    /// Next complete line, or `None` once a read times out
    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        loop {
            if let Some(line) = self.codec.next_line() {
                trace!("{} -> {}", self.port_name, line);
                return Ok(Some(line));
            }
            match self.io.read(&mut self.buffer) {
                Ok(0) => return Ok(None),
                Ok(n) => self.codec.push_bytes(&self.buffer[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(None)
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// `busy` and `invalid_param` leave the radio as it was; anything else is a protocol fault
fn refusal(command: &Command, reply: String) -> LinkError {
    match Response::parse(&reply) {
        Response::Busy | Response::InvalidParam => LinkError::DeviceBusy {
            command: command.to_string(),
            response: reply,
        },
        _ => mismatch(command, "ok", reply),
    }
}

fn mismatch(command: &Command, expected: &'static str, actual: impl Into<String>) -> LinkError {
    LinkError::ProtocolMismatch {
        command: command.to_string(),
        expected,
        actual: actual.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lostik_protocol::{TxPower, EXPECTED_FIRMWARE};
    use lostik_sim::{ModemMode, RxEvent, TxOutcome, VirtualPort, DEFAULT_HWEUI};

    fn link() -> (DeviceLink<VirtualPort>, lostik_sim::ModemHandle) {
        let (port, handle) = VirtualPort::new();
        (DeviceLink::new(port), handle)
    }

    #[test]
    fn test_verify_firmware() {
        let (mut link, handle) = link();
        assert_eq!(link.port_name(), "virtual");
        assert_eq!(link.verify_firmware(EXPECTED_FIRMWARE).unwrap(), EXPECTED_FIRMWARE);

        handle.set_firmware("RN2903 1.0.3 Aug 8 2017 15:11:09");
        assert!(matches!(
            link.verify_firmware(EXPECTED_FIRMWARE),
            Err(LinkError::UnexpectedFirmware { actual, .. }) if actual.contains("1.0.3")
        ));
    }

    #[test]
    fn test_open_checks_firmware_first() {
        let (port, handle) = VirtualPort::new();
        handle.set_firmware("RN2483 1.0.4");
        assert!(DeviceLink::open(port, EXPECTED_FIRMWARE).is_err());
        assert_eq!(handle.commands(), vec!["sys get ver"]);
    }

    #[test]
    fn test_hardware_eui() {
        let (mut link, handle) = link();
        assert_eq!(link.hardware_eui().unwrap(), DEFAULT_HWEUI);

        handle.set_hweui("not-an-eui");
        assert!(matches!(
            link.hardware_eui(),
            Err(LinkError::ProtocolMismatch { .. })
        ));
    }

    #[test]
    fn test_suspend_builtin_protocol() {
        let (mut link, handle) = link();
        link.suspend_builtin_protocol().unwrap();
        assert!(handle.with_modem(|m| m.mac_paused()));
    }

    #[test]
    fn test_configure_writes_settings_in_order() {
        let (mut link, handle) = link();
        let settings = RadioSettings {
            power: TxPower::High,
            ..Default::default()
        };
        link.configure(&settings).unwrap();

        let sets: Vec<_> = handle
            .commands()
            .into_iter()
            .filter(|c| c.starts_with("radio set"))
            .collect();
        assert_eq!(
            sets,
            vec![
                "radio set freq 923300000",
                "radio set sf sf12",
                "radio set bw 125",
                "radio set cr 4/8",
                "radio set pwr 20",
            ]
        );
        assert!(!handle.led(Led::Rx));
        assert!(!handle.led(Led::Tx));
    }

    #[test]
    fn test_configure_reports_refused_setting() {
        let (mut link, handle) = link();
        handle.reject_setting("bw");
        let err = link.configure(&RadioSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            LinkError::ConfigurationFailure { setting: "bw", ref response, .. }
                if response == "invalid_param"
        ));
        assert!(handle.setting("cr").is_none());
        assert!(!handle.led(Led::Tx));
    }

    #[test]
    fn test_receive_mode_busy() {
        let (mut link, handle) = link();
        link.start_receiving().unwrap();
        assert!(matches!(
            link.start_receiving(),
            Err(LinkError::DeviceBusy { ref response, .. }) if response == "busy"
        ));

        handle.set_busy_rxstops(1);
        assert!(matches!(
            link.stop_receiving(),
            Err(LinkError::DeviceBusy { .. })
        ));
        assert_eq!(handle.mode(), ModemMode::Receiving);
        assert_eq!(link.stop_receiving().unwrap(), None);
        assert_eq!(handle.mode(), ModemMode::Idle);
    }

    #[test]
    fn test_frame_ahead_of_rxstop_reply() {
        let (mut link, handle) = link();
        link.start_receiving().unwrap();
        handle.queue_frame("HI");
        handle.set_racing_rxstops(1);

        assert_eq!(
            link.stop_receiving().unwrap(),
            Some(Reception::Frame("4849".into()))
        );
        // The rxstop reply was consumed, so the next exchange lines up
        assert_eq!(link.hardware_eui().unwrap(), DEFAULT_HWEUI);
    }

    #[test]
    fn test_watchdog_ahead_of_rxstop_reply() {
        let (mut link, handle) = link();
        link.start_receiving().unwrap();
        handle.queue_rx_event(RxEvent::WatchdogExpired);
        handle.set_racing_rxstops(1);

        assert_eq!(
            link.stop_receiving().unwrap(),
            Some(Reception::WatchdogExpired)
        );
    }

    #[test]
    fn test_transmit_success() {
        let (mut link, handle) = link();
        let receipt = link.transmit("48454C4C4F").unwrap();
        assert!(receipt.air_time < MAX_TX_WAIT);
        assert_eq!(handle.transmitted(), vec!["48454C4C4F"]);
    }

    #[test]
    fn test_transmit_radio_error() {
        let (mut link, handle) = link();
        handle.queue_tx_outcome(TxOutcome::Failed);
        assert!(matches!(
            link.transmit("4849"),
            Err(LinkError::TransmitFailure)
        ));
    }

    #[test]
    fn test_transmit_refused_is_protocol_mismatch() {
        let (mut link, _handle) = link();
        link.start_receiving().unwrap();
        assert!(matches!(
            link.transmit("4849"),
            Err(LinkError::ProtocolMismatch { ref actual, .. }) if actual == "busy"
        ));
    }

    #[test]
    fn test_poll_receive() {
        let (mut link, handle) = link();
        link.start_receiving().unwrap();
        assert_eq!(link.poll_receive().unwrap(), Reception::NoFrame);

        handle.queue_frame("HELLO");
        assert_eq!(
            link.poll_receive().unwrap(),
            Reception::Frame("48454C4C4F".into())
        );
    }

    #[test]
    fn test_poll_receive_watchdog_and_busy() {
        let (mut link, handle) = link();
        link.start_receiving().unwrap();
        handle.queue_rx_event(RxEvent::WatchdogExpired);
        assert_eq!(link.poll_receive().unwrap(), Reception::WatchdogExpired);

        link.start_receiving().unwrap();
        handle.queue_rx_event(RxEvent::Line("busy".into()));
        assert!(matches!(
            link.poll_receive(),
            Err(LinkError::ProtocolMismatch { .. })
        ));
    }

    #[test]
    fn test_fragmented_replies_are_reassembled() {
        let (mut link, handle) = link();
        handle.set_chunk_size(Some(2));
        link.start_receiving().unwrap();
        handle.queue_frame("HELLO");
        assert_eq!(
            link.poll_receive().unwrap(),
            Reception::Frame("48454C4C4F".into())
        );
    }

    #[test]
    fn test_link_quality() {
        let (mut link, handle) = link();
        handle.set_link_quality(-104, -6.25);
        assert_eq!(
            link.link_quality().unwrap(),
            LinkQuality {
                rssi: -104,
                snr: -6.25
            }
        );
    }
}
