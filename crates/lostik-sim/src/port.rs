//! Byte-stream front end for the virtual modem
//!
//! [`VirtualPort`] stands in for an open serial port: writes are split into
//! CRLF-terminated commands and fed to the modem, reads return its replies.
//! With nothing to say a read fails with `TimedOut`, exactly as a serial port
//! opened with a read time-out does.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use lostik_protocol::{Led, LineCodec};

use crate::modem::{frame_for_text, ModemMode, RxEvent, TxOutcome, VirtualModem};

#[derive(Debug, Default)]
struct Shared {
    modem: VirtualModem,
    /// Output not yet handed to the reader
    unread: Vec<u8>,
    /// Deliver at most this many bytes per read
    chunk_size: Option<usize>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Transport end handed to the device link
#[derive(Debug)]
pub struct VirtualPort {
    shared: Arc<Mutex<Shared>>,
    commands: LineCodec,
}

impl VirtualPort {
    /// Create a port in front of a fresh modem, plus a handle to script it
    pub fn new() -> (Self, ModemHandle) {
        Self::with_modem(VirtualModem::new())
    }

    /// Create a port in front of a pre-configured modem
    pub fn with_modem(modem: VirtualModem) -> (Self, ModemHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            modem,
            ..Default::default()
        }));
        let port = Self {
            shared: Arc::clone(&shared),
            commands: LineCodec::new(),
        };
        (port, ModemHandle { shared })
    }
}

impl Write for VirtualPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commands.push_bytes(buf);
        let mut shared = lock(&self.shared);
        while let Some(line) = self.commands.next_line() {
            shared.modem.process_command(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for VirtualPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = lock(&self.shared);
        if shared.unread.is_empty() {
            match shared.modem.take_output() {
                Some(line) => shared.unread = line.into_bytes(),
                None => return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
            }
        }

        let limit = shared.chunk_size.unwrap_or(usize::MAX).max(1);
        let n = buf.len().min(shared.unread.len()).min(limit);
        buf[..n].copy_from_slice(&shared.unread[..n]);
        shared.unread.drain(..n);
        Ok(n)
    }
}

/// Test-side handle onto the modem behind a [`VirtualPort`]
#[derive(Debug, Clone)]
pub struct ModemHandle {
    shared: Arc<Mutex<Shared>>,
}

impl ModemHandle {
    /// Run `f` against the modem
    pub fn with_modem<R>(&self, f: impl FnOnce(&mut VirtualModem) -> R) -> R {
        f(&mut lock(&self.shared).modem)
    }

    pub fn set_firmware(&self, firmware: &str) {
        self.with_modem(|m| m.set_firmware(firmware));
    }

    pub fn set_hweui(&self, hweui: &str) {
        self.with_modem(|m| m.set_hweui(hweui));
    }

    pub fn reject_setting(&self, name: &str) {
        self.with_modem(|m| m.reject_setting(name));
    }

    pub fn queue_tx_outcome(&self, outcome: TxOutcome) {
        self.with_modem(|m| m.queue_tx_outcome(outcome));
    }

    /// Queue `text` to arrive as a frame once the modem is receiving
    pub fn queue_frame(&self, text: &str) {
        self.with_modem(|m| m.queue_rx_event(frame_for_text(text)));
    }

    pub fn queue_rx_event(&self, event: RxEvent) {
        self.with_modem(|m| m.queue_rx_event(event));
    }

    pub fn set_busy_rxstops(&self, count: usize) {
        self.with_modem(|m| m.set_busy_rxstops(count));
    }

    /// Let a queued rx event reach the port ahead of the next `count`
    /// `radio rxstop` replies
    pub fn set_racing_rxstops(&self, count: usize) {
        self.with_modem(|m| m.set_racing_rxstops(count));
    }

    pub fn set_link_quality(&self, rssi: i32, snr: f64) {
        self.with_modem(|m| m.set_link_quality(rssi, snr));
    }

    /// Split every reply into reads of at most `size` bytes
    pub fn set_chunk_size(&self, size: Option<usize>) {
        lock(&self.shared).chunk_size = size;
    }

    pub fn mode(&self) -> ModemMode {
        self.with_modem(|m| m.mode())
    }

    pub fn led(&self, led: Led) -> bool {
        self.with_modem(|m| m.led(led))
    }

    pub fn setting(&self, name: &str) -> Option<String> {
        self.with_modem(|m| m.setting(name).map(str::to_string))
    }

    /// Every command received so far
    pub fn commands(&self) -> Vec<String> {
        self.with_modem(|m| m.received_commands().to_vec())
    }

    /// Hex payloads accepted by `radio tx`
    pub fn transmitted(&self) -> Vec<String> {
        self.with_modem(|m| m.transmitted().to_vec())
    }
}
