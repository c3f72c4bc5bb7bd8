//! Virtual RN2903 modem
//!
//! Processes the modem's text commands one line at a time and queues the
//! replies a real device would send. Receptions and transmit outcomes are
//! scripted by the test.

use std::collections::{BTreeMap, HashSet, VecDeque};

use lostik_protocol::{encode_hex, Led, EXPECTED_FIRMWARE, MAC_PAUSE_ACK};
use tracing::trace;

/// Hardware EUI reported when none is configured
pub const DEFAULT_HWEUI: &str = "0004A30B001A2B3C";

/// Radio state of the simulated modem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemMode {
    Idle,
    Receiving,
}

/// Scripted result of the next `radio tx`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// `radio_tx_ok`
    Delivered,
    /// `radio_err`
    Failed,
}

/// Scripted event delivered while the modem is receiving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// `radio_rx  <hex>`; the modem returns to idle
    Frame(String),
    /// `radio_err`; the modem returns to idle
    WatchdogExpired,
    /// Arbitrary line, delivered verbatim
    Line(String),
}

/// A simulated RN2903 behind a LoStik
#[derive(Debug)]
pub struct VirtualModem {
    firmware: String,
    hweui: String,
    mode: ModemMode,
    mac_paused: bool,
    /// Applied `radio set` values by parameter name
    settings: BTreeMap<String, String>,
    /// Parameters answered with `invalid_param`
    rejected: HashSet<String>,
    tx_outcomes: VecDeque<TxOutcome>,
    rx_events: VecDeque<RxEvent>,
    /// Upcoming `radio rxstop` calls answered with `busy`
    busy_rxstops: usize,
    /// Upcoming `radio rxstop` calls that a queued rx event beats to the port
    racing_rxstops: usize,
    rssi: i32,
    snr: f64,
    leds: [bool; 2],
    /// Commands received (for test verification)
    received_commands: Vec<String>,
    /// Payloads accepted by `radio tx`
    transmitted: Vec<String>,
    /// Pending reply lines, terminator included
    pending_output: VecDeque<String>,
}

impl Default for VirtualModem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualModem {
    /// Create a modem running the expected firmware
    pub fn new() -> Self {
        Self {
            firmware: EXPECTED_FIRMWARE.to_string(),
            hweui: DEFAULT_HWEUI.to_string(),
            mode: ModemMode::Idle,
            mac_paused: false,
            settings: BTreeMap::new(),
            rejected: HashSet::new(),
            tx_outcomes: VecDeque::new(),
            rx_events: VecDeque::new(),
            busy_rxstops: 0,
            racing_rxstops: 0,
            rssi: -97,
            snr: 7.0,
            leds: [false; 2],
            received_commands: Vec::new(),
            transmitted: Vec::new(),
            pending_output: VecDeque::new(),
        }
    }

    pub fn set_firmware(&mut self, firmware: impl Into<String>) {
        self.firmware = firmware.into();
    }

    pub fn set_hweui(&mut self, hweui: impl Into<String>) {
        self.hweui = hweui.into();
    }

    /// Answer `radio set <name>` with `invalid_param`
    pub fn reject_setting(&mut self, name: impl Into<String>) {
        self.rejected.insert(name.into());
    }

    pub fn queue_tx_outcome(&mut self, outcome: TxOutcome) {
        self.tx_outcomes.push_back(outcome);
    }

    pub fn queue_rx_event(&mut self, event: RxEvent) {
        self.rx_events.push_back(event);
    }

    /// Answer the next `count` calls to `radio rxstop` with `busy`
    pub fn set_busy_rxstops(&mut self, count: usize) {
        self.busy_rxstops = count;
    }

    /// Deliver the next queued rx event ahead of the reply to each of the
    /// next `count` calls to `radio rxstop`
    pub fn set_racing_rxstops(&mut self, count: usize) {
        self.racing_rxstops = count;
    }

    pub fn set_link_quality(&mut self, rssi: i32, snr: f64) {
        self.rssi = rssi;
        self.snr = snr;
    }

    pub fn mode(&self) -> ModemMode {
        self.mode
    }

    pub fn mac_paused(&self) -> bool {
        self.mac_paused
    }

    /// Value last applied with `radio set <name>`
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }

    pub fn led(&self, led: Led) -> bool {
        self.leds[led_index(led)]
    }

    pub fn received_commands(&self) -> &[String] {
        &self.received_commands
    }

    pub fn transmitted(&self) -> &[String] {
        &self.transmitted
    }

    /// Process one command line (terminator stripped)
    pub fn process_command(&mut self, line: &str) {
        trace!("Virtual modem <- {}", line);
        self.received_commands.push(line.to_string());

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["sys", "get", "ver"] => self.reply(self.firmware.clone()),
            ["sys", "get", "hweui"] => self.reply(self.hweui.clone()),
            ["sys", "set", "pindig", pin, value] => self.set_pin(pin, value),
            ["mac", "pause"] => {
                self.mac_paused = true;
                self.reply(MAC_PAUSE_ACK);
            }
            ["radio", "set", name, value] => self.apply_setting(name, value),
            ["radio", "rx", _window] => self.start_receive(),
            ["radio", "rxstop"] => self.stop_receive(),
            ["radio", "tx", payload] => self.transmit(payload),
            ["radio", "get", "rssi"] => self.reply(self.rssi.to_string()),
            ["radio", "get", "snr"] => self.reply(self.snr.to_string()),
            _ => self.reply("invalid_param"),
        }
    }

    /// Next chunk of output, if any
    ///
    /// Queued replies come first. A receiving modem then delivers its next
    /// scripted event.
    pub fn take_output(&mut self) -> Option<String> {
        if let Some(line) = self.pending_output.pop_front() {
            return Some(line);
        }
        if self.mode != ModemMode::Receiving {
            return None;
        }
        self.next_rx_line()
    }

    /// Next scripted rx event as a terminated line
    fn next_rx_line(&mut self) -> Option<String> {
        let line = match self.rx_events.pop_front()? {
            RxEvent::Frame(hex) => {
                self.mode = ModemMode::Idle;
                format!("radio_rx  {}", hex)
            }
            RxEvent::WatchdogExpired => {
                self.mode = ModemMode::Idle;
                "radio_err".to_string()
            }
            RxEvent::Line(line) => line,
        };
        trace!("Virtual modem -> {}", line);
        Some(format!("{}\r\n", line))
    }

    fn reply(&mut self, line: impl Into<String>) {
        let line = line.into();
        trace!("Virtual modem -> {}", line);
        self.pending_output.push_back(format!("{}\r\n", line));
    }

    fn set_pin(&mut self, pin: &str, value: &str) {
        let led = [Led::Rx, Led::Tx].into_iter().find(|l| l.pin() == pin);
        match (led, value) {
            (Some(led), "0" | "1") => {
                self.leds[led_index(led)] = value == "1";
                self.reply("ok");
            }
            _ => self.reply("invalid_param"),
        }
    }

    fn apply_setting(&mut self, name: &str, value: &str) {
        if self.rejected.contains(name) {
            self.reply("invalid_param");
        } else if self.mode == ModemMode::Receiving {
            self.reply("busy");
        } else {
            self.settings.insert(name.to_string(), value.to_string());
            self.reply("ok");
        }
    }

    fn start_receive(&mut self) {
        if self.mode == ModemMode::Receiving {
            self.reply("busy");
        } else {
            self.mode = ModemMode::Receiving;
            self.reply("ok");
        }
    }

    fn stop_receive(&mut self) {
        if self.busy_rxstops > 0 {
            self.busy_rxstops -= 1;
            self.reply("busy");
            return;
        }
        if self.racing_rxstops > 0 && self.mode == ModemMode::Receiving {
            self.racing_rxstops -= 1;
            if let Some(line) = self.next_rx_line() {
                self.pending_output.push_back(line);
            }
        }
        self.mode = ModemMode::Idle;
        self.reply("ok");
    }

    fn transmit(&mut self, payload: &str) {
        if self.mode == ModemMode::Receiving {
            self.reply("busy");
            return;
        }
        self.transmitted.push(payload.to_string());
        self.reply("ok");
        match self.tx_outcomes.pop_front().unwrap_or(TxOutcome::Delivered) {
            TxOutcome::Delivered => self.reply("radio_tx_ok"),
            TxOutcome::Failed => self.reply("radio_err"),
        }
    }
}

/// Queue text as a received frame
pub(crate) fn frame_for_text(text: &str) -> RxEvent {
    RxEvent::Frame(encode_hex(text))
}

fn led_index(led: Led) -> usize {
    match led {
        Led::Rx => 0,
        Led::Tx => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(modem: &mut VirtualModem) -> Vec<String> {
        std::iter::from_fn(|| modem.take_output())
            .map(|l| l.trim_end().to_string())
            .collect()
    }

    #[test]
    fn test_identity_commands() {
        let mut modem = VirtualModem::new();
        modem.process_command("sys get ver");
        modem.process_command("sys get hweui");
        modem.process_command("mac pause");

        assert_eq!(
            drain(&mut modem),
            vec![EXPECTED_FIRMWARE, DEFAULT_HWEUI, MAC_PAUSE_ACK]
        );
        assert!(modem.mac_paused());
    }

    #[test]
    fn test_settings_applied_and_rejected() {
        let mut modem = VirtualModem::new();
        modem.reject_setting("sf");
        modem.process_command("radio set freq 923300000");
        modem.process_command("radio set sf sf12");

        assert_eq!(drain(&mut modem), vec!["ok", "invalid_param"]);
        assert_eq!(modem.setting("freq"), Some("923300000"));
        assert_eq!(modem.setting("sf"), None);
    }

    #[test]
    fn test_transmit_outcomes() {
        let mut modem = VirtualModem::new();
        modem.queue_tx_outcome(TxOutcome::Failed);
        modem.process_command("radio tx 48454C4C4F");
        modem.process_command("radio tx 48454C4C4F");

        assert_eq!(
            drain(&mut modem),
            vec!["ok", "radio_err", "ok", "radio_tx_ok"]
        );
        assert_eq!(modem.transmitted().len(), 2);
    }

    #[test]
    fn test_transmit_while_receiving_is_busy() {
        let mut modem = VirtualModem::new();
        modem.process_command("radio rx 0");
        modem.process_command("radio tx 4849");

        assert_eq!(drain(&mut modem), vec!["ok", "busy"]);
        assert!(modem.transmitted().is_empty());
    }

    #[test]
    fn test_frames_only_delivered_while_receiving() {
        let mut modem = VirtualModem::new();
        modem.queue_rx_event(frame_for_text("HI"));
        assert!(modem.take_output().is_none());

        modem.process_command("radio rx 0");
        assert_eq!(drain(&mut modem), vec!["ok", "radio_rx  4849"]);
        assert_eq!(modem.mode(), ModemMode::Idle);
    }

    #[test]
    fn test_busy_rxstop() {
        let mut modem = VirtualModem::new();
        modem.process_command("radio rx 0");
        modem.set_busy_rxstops(1);
        modem.process_command("radio rxstop");
        modem.process_command("radio rxstop");

        assert_eq!(drain(&mut modem), vec!["ok", "busy", "ok"]);
        assert_eq!(modem.mode(), ModemMode::Idle);
    }

    #[test]
    fn test_rx_event_ahead_of_rxstop_reply() {
        let mut modem = VirtualModem::new();
        modem.process_command("radio rx 0");
        assert_eq!(drain(&mut modem), vec!["ok"]);

        modem.queue_rx_event(frame_for_text("HI"));
        modem.set_racing_rxstops(1);
        modem.process_command("radio rxstop");
        assert_eq!(drain(&mut modem), vec!["radio_rx  4849", "ok"]);
        assert_eq!(modem.mode(), ModemMode::Idle);

        // Nothing queued, so only the reply arrives
        modem.set_racing_rxstops(1);
        modem.process_command("radio rx 0");
        modem.process_command("radio rxstop");
        assert_eq!(drain(&mut modem), vec!["ok", "ok"]);
    }

    #[test]
    fn test_leds() {
        let mut modem = VirtualModem::new();
        modem.process_command("sys set pindig GPIO11 1");
        assert!(modem.led(Led::Tx));
        assert!(!modem.led(Led::Rx));
        modem.process_command("sys set pindig GPIO12 1");
        assert_eq!(drain(&mut modem), vec!["ok", "invalid_param"]);
    }
}
