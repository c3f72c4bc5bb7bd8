//! Channel access service
//!
//! Drives the modem between listening and transmitting according to the slot
//! schedule. Each tick either uses an owned transmit window to send the oldest
//! queued message or listens for one read time-out and records whatever
//! arrives.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use chrono::Timelike;
use lostik_protocol::{decode_hex, encode_hex};
use lostik_store::{MessageStore, OutboundMessage};
use tracing::{debug, error, info, trace, warn};

use crate::assignment::SlotResolver;
use crate::clock::Clock;
use crate::config::{ServiceConfig, SlotPolicy};
use crate::error::{LinkError, ServiceError};
use crate::events::ServiceEvent;
use crate::link::{DeviceLink, Reception};
use crate::schedule::{SlotDecision, SlotTable};
use crate::state::LinkState;

/// Time-division channel access over one LoStik
pub struct ChannelAccessService<T, C> {
    link: DeviceLink<T>,
    store: MessageStore,
    clock: C,
    table: SlotTable,
    resolver: SlotResolver,
    state: LinkState,
    idle_backoff: Duration,
    /// Unix second of the last transmit window acted on
    last_window: Option<i64>,
    events: Option<Sender<ServiceEvent>>,
    eui: String,
}

impl<T, C> ChannelAccessService<T, C>
where
    T: Read + Write,
    C: Clock,
{
    /// Prepare the modem and resolve this node's slot
    ///
    /// `link` must already have passed its firmware check. Pauses the
    /// LoRaWAN stack, applies the radio settings and looks up the slot.
    pub fn start(
        mut link: DeviceLink<T>,
        store: MessageStore,
        config: &ServiceConfig,
        clock: C,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let table = SlotTable::new(config.slot_plan)?;

        link.suspend_builtin_protocol()?;
        link.configure(&config.radio)?;
        let eui = link.hardware_eui()?;
        info!("LoStik hardware EUI: {}", eui);

        let resolver = match &config.slot_policy {
            SlotPolicy::Static { slots } => {
                SlotResolver::from_registry(slots, &eui, &config.slot_plan)?
            }
            SlotPolicy::SelfLearning => SlotResolver::self_learning(),
        };
        match resolver.owned_slot() {
            Some(slot) => info!("Transmitting in {} of {}", slot, config.slot_plan.slot_count),
            None => info!("Slot will be claimed by the first successful transmission"),
        }

        Ok(Self {
            link,
            store,
            clock,
            table,
            resolver,
            state: LinkState::Idle,
            idle_backoff: config.idle_backoff,
            last_window: None,
            events: None,
            eui,
        })
    }

    /// Publish events on `events` from now on
    pub fn with_events(mut self, events: Sender<ServiceEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Hardware EUI reported by the modem
    pub fn eui(&self) -> &str {
        &self.eui
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn resolver(&self) -> &SlotResolver {
        &self.resolver
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Tick until `shutdown` is set, then leave the radio idle
    ///
    /// Recoverable errors are logged and the loop continues. A fatal error
    /// ends the loop and is returned.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ServiceError> {
        info!("Channel access service running");
        self.emit(ServiceEvent::Started {
            eui: self.eui.clone(),
            slot: self.resolver.owned_slot(),
        });
        let result = loop {
            if shutdown.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(e) = self.tick() {
                if e.is_fatal() {
                    error!("{}", e);
                    break Err(e);
                }
                warn!("{}", e);
            }
        };

        match result {
            Ok(()) => self.stop(),
            Err(e) => {
                if let Err(stop_err) = self.stop() {
                    debug!("Could not idle radio after failure: {}", stop_err);
                }
                Err(e)
            }
        }
    }

    /// One scheduling step
    pub fn tick(&mut self) -> Result<(), ServiceError> {
        let now = self.clock.now();
        let decision = self.table.decide(now.second());
        let occurrence = now.timestamp();

        if self.resolver.may_transmit(decision) && self.last_window != Some(occurrence) {
            self.last_window = Some(occurrence);
            return self.use_window(decision);
        }
        self.listen()
    }

    /// Leave receive mode if active
    pub fn stop(&mut self) -> Result<(), ServiceError> {
        if self.state == LinkState::Receiving {
            let early = self.link.stop_receiving()?;
            self.set_state(LinkState::Idle);
            if let Some(reception) = early {
                self.absorb(reception)?;
            }
        }
        info!("Channel access service stopped");
        self.emit(ServiceEvent::Stopped);
        Ok(())
    }

    fn use_window(&mut self, decision: SlotDecision) -> Result<(), ServiceError> {
        let Some(message) = self.store.next_unsent()? else {
            trace!("Nothing to send in {}", decision.slot);
            self.clock.sleep(self.idle_backoff);
            return Ok(());
        };

        if self.state == LinkState::Receiving {
            match self.link.stop_receiving() {
                Ok(early) => {
                    self.set_state(LinkState::Idle);
                    if let Some(reception) = early {
                        self.absorb(reception)?;
                    }
                }
                Err(LinkError::DeviceBusy { response, .. }) => {
                    warn!(
                        "Skipping {} window, receiver busy ({}); message {} stays queued",
                        decision.slot, response, message.id
                    );
                    self.emit(ServiceEvent::WindowSkipped {
                        slot: decision.slot,
                        reason: response,
                    });
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.transmit(message, decision)
    }

    fn transmit(
        &mut self,
        message: OutboundMessage,
        decision: SlotDecision,
    ) -> Result<(), ServiceError> {
        self.set_state(LinkState::Transmitting);
        let result = self.link.transmit(&encode_hex(&message.text));
        self.set_state(LinkState::Idle);

        match result {
            Ok(receipt) => {
                self.store
                    .mark_sent(message.id, receipt.sent_at, receipt.air_time)?;
                info!(
                    "Sent message {} in {} ({} ms on air): {}",
                    message.id,
                    decision.slot,
                    receipt.air_time.as_millis(),
                    message.text
                );
                if let Some(slot) = self.resolver.record_success(decision.slot) {
                    self.emit(ServiceEvent::SlotClaimed { slot });
                }
                self.emit(ServiceEvent::Transmitted {
                    id: message.id,
                    text: message.text,
                    air_time: receipt.air_time,
                });
                Ok(())
            }
            Err(LinkError::TransmitFailure) => {
                warn!(
                    "Transmit failure, radio error; message {} retried next window",
                    message.id
                );
                self.emit(ServiceEvent::TransmitFailed { id: message.id });
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn listen(&mut self) -> Result<(), ServiceError> {
        if self.state != LinkState::Receiving {
            match self.link.start_receiving() {
                Ok(()) => self.set_state(LinkState::Receiving),
                Err(LinkError::DeviceBusy { response, .. }) => {
                    warn!("Receiver busy ({}), retrying", response);
                    self.clock.sleep(self.idle_backoff);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        let reception = self.link.poll_receive()?;
        self.absorb(reception)
    }

    /// Act on what the receiver reported
    fn absorb(&mut self, reception: Reception) -> Result<(), ServiceError> {
        match reception {
            Reception::NoFrame => Ok(()),
            Reception::WatchdogExpired => {
                debug!("Receive watchdog expired");
                self.set_state(LinkState::Idle);
                Ok(())
            }
            Reception::Frame(payload_hex) => {
                self.set_state(LinkState::Idle);
                self.record_frame(payload_hex)
            }
        }
    }

    fn record_frame(&mut self, payload_hex: String) -> Result<(), ServiceError> {
        let text = match decode_hex(&payload_hex) {
            Ok(text) => text,
            Err(e) => {
                warn!("Dropping undecodable frame {}: {}", payload_hex, e);
                self.emit(ServiceEvent::FrameDropped {
                    payload_hex,
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        let quality = self.link.link_quality()?;
        let message = self
            .store
            .record_inbound(&text, quality.rssi, quality.snr)?;
        info!(
            "Received message {} (RSSI {} dBm, SNR {} dB): {}",
            message.id, message.rssi, message.snr, message.text
        );
        self.emit(ServiceEvent::Received {
            id: message.id,
            text: message.text,
            rssi: message.rssi,
            snr: message.snr,
        });
        Ok(())
    }

    fn set_state(&mut self, to: LinkState) {
        if self.state != to {
            let from = self.state;
            self.state = to;
            debug!("Link state {} -> {}", from, to);
            self.emit(ServiceEvent::StateChanged { from, to });
        }
    }

    fn emit(&self, event: ServiceEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
