//! Subcommand handlers

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use lostik_store::MessageStore;
use lostik_tdma::{ChannelAccessService, DeviceLink, ServiceConfig, ServiceEvent, SystemClock};
use tracing::{debug, info};

use crate::error::CliError;
use crate::settings::ServiceSettings;

/// Run the channel access service until Ctrl-C
pub fn run(settings: &ServiceSettings) -> Result<(), CliError> {
    let config = settings.to_config();
    config.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let store = MessageStore::open(&settings.database)?;
    info!("Message database: {}", settings.database.display());
    let link = DeviceLink::connect(&config)?;
    print_banner(&mut std::io::stdout(), link.port_name(), &config)?;

    let (tx, rx) = mpsc::channel();
    let printer = thread::spawn(move || {
        for event in rx {
            if let Some(line) = describe(&event) {
                println!("{}", line);
            }
        }
    });

    let mut service = ChannelAccessService::start(link, store, &config, SystemClock)?.with_events(tx);
    let result = service.run(&shutdown);
    drop(service);
    if printer.join().is_err() {
        debug!("Event printer panicked");
    }
    result.map_err(CliError::from)
}

fn print_banner(out: &mut impl Write, port: &str, config: &ServiceConfig) -> Result<(), CliError> {
    let radio = &config.radio;
    let plan = config.slot_plan;
    let lines = [
        format!("Port:        {}", port),
        format!("Frequency:   {}", radio.frequency_display()),
        format!(
            "Modulation:  SF{} / {} kHz / CR {}",
            radio.spreading_factor.as_u8(),
            radio.bandwidth.khz(),
            radio.coding_rate
        ),
        format!("Power:       {}", radio.power),
        format!(
            "Slots:       {} x {} s per minute cycle",
            plan.slot_count, plan.seconds_per_slot
        ),
        "Press CTRL+C to quit.".to_string(),
    ];
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Console line for a service event; state changes stay in the log
fn describe(event: &ServiceEvent) -> Option<String> {
    match event {
        ServiceEvent::Started { eui, slot } => Some(match slot {
            Some(slot) => format!("LoStik {} transmitting in {}", eui, slot),
            None => format!("LoStik {} waiting to claim a slot", eui),
        }),
        ServiceEvent::StateChanged { .. } => None,
        ServiceEvent::SlotClaimed { slot } => Some(format!("Claimed {}", slot)),
        ServiceEvent::Transmitted { id, text, air_time } => Some(format!(
            "TX #{} {:?} ({} ms on air)",
            id,
            text,
            air_time.as_millis()
        )),
        ServiceEvent::TransmitFailed { id } => {
            Some(format!("TX #{} failed, will retry next window", id))
        }
        ServiceEvent::WindowSkipped { slot, reason } => {
            Some(format!("Skipped {}: {}", slot, reason))
        }
        ServiceEvent::Received {
            text, rssi, snr, ..
        } => Some(format!("RX {:?} (RSSI {} dBm, SNR {:.1} dB)", text, rssi, snr)),
        ServiceEvent::FrameDropped { payload_hex, reason } => {
            Some(format!("Dropped frame {}: {}", payload_hex, reason))
        }
        ServiceEvent::Stopped => Some("Radio idle, service stopped".to_string()),
    }
}

/// Queue `words` as one message
pub fn send(store: &MessageStore, words: &[String], out: &mut impl Write) -> Result<(), CliError> {
    let message = store.enqueue_outbound(&words.join(" "))?;
    let pending = store.pending_count()?;
    report(out, format!("Queued #{} ({} pending)", message.id, pending))
}

pub fn purge(store: &MessageStore, out: &mut impl Write) -> Result<(), CliError> {
    let removed = store.purge_outbound()?;
    report(out, format!("Purged {} outbound message(s)", removed))
}

pub fn status(store: &MessageStore, out: &mut impl Write) -> Result<(), CliError> {
    let outbound = store.outbound_messages()?;
    let sent = outbound.iter().filter(|m| m.is_sent()).count();
    let received = store.inbound_messages()?.len();
    let air_time = store.total_air_time()?;
    let local = store
        .local_node()?
        .map(|n| format!("{} ({})", n.node_name, n.node_id))
        .unwrap_or_else(|| "not set".to_string());

    report(out, format!("Local node:  {}", local))?;
    report(out, format!("Pending:     {}", outbound.len() - sent))?;
    report(out, format!("Sent:        {}", sent))?;
    report(out, format!("Received:    {}", received))?;
    report(out, format!("Air time:    {:.1} s", air_time.as_secs_f64()))
}

pub fn node_add(
    store: &MessageStore,
    node_id: u32,
    name: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let node = store.register_node(node_id, name)?;
    report(out, format!("Registered node {} as {}", node.node_id, node.node_name))
}

pub fn node_list(store: &MessageStore, out: &mut impl Write) -> Result<(), CliError> {
    let nodes = store.nodes()?;
    if nodes.is_empty() {
        return report(out, "No nodes registered".to_string());
    }
    for node in nodes {
        let marker = if node.is_local { " (local)" } else { "" };
        report(out, format!("{:>6}  {}{}", node.node_id, node.node_name, marker))?;
    }
    Ok(())
}

pub fn node_local(store: &MessageStore, node_id: u32, out: &mut impl Write) -> Result<(), CliError> {
    let node = store.mark_local_node(node_id)?;
    report(out, format!("This station is {} ({})", node.node_name, node.node_id))
}

fn report(out: &mut impl Write, line: String) -> Result<(), CliError> {
    writeln!(out, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lostik_tdma::{ServiceError, SlotId};
    use std::time::Duration;

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<(), CliError>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_send_and_status() {
        let store = MessageStore::open_in_memory().unwrap();
        let text = output(|out| send(&store, &["HELLO".into(), "WORLD".into()], out));
        assert_eq!(text, "Queued #1 (1 pending)\n");
        assert_eq!(store.next_unsent().unwrap().unwrap().text, "HELLO WORLD");

        let text = output(|out| status(&store, out));
        assert!(text.contains("Pending:     1"));
        assert!(text.contains("Sent:        0"));
        assert!(text.contains("Local node:  not set"));
    }

    #[test]
    fn test_send_rejects_invalid_text() {
        let store = MessageStore::open_in_memory().unwrap();
        let mut out = Vec::new();
        let err = send(&store, &["hello,".into(), "world".into()], &mut out).unwrap_err();
        assert!(matches!(
            err,
            CliError::Service(ServiceError::InvalidMessage(_))
        ));
        assert_eq!(store.pending_count().unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_purge_reports_count() {
        let store = MessageStore::open_in_memory().unwrap();
        store.enqueue_outbound("ONE").unwrap();
        store.enqueue_outbound("TWO").unwrap();
        let text = output(|out| purge(&store, out));
        assert_eq!(text, "Purged 2 outbound message(s)\n");
        assert_eq!(store.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_node_commands() {
        let store = MessageStore::open_in_memory().unwrap();
        assert_eq!(output(|out| node_list(&store, out)), "No nodes registered\n");

        output(|out| node_add(&store, 7, "BASE", out));
        output(|out| node_add(&store, 12, "ROVER", out));
        let text = output(|out| node_local(&store, 12, out));
        assert_eq!(text, "This station is ROVER (12)\n");

        let text = output(|out| node_list(&store, out));
        assert!(text.contains("     7  BASE\n"));
        assert!(text.contains("    12  ROVER (local)\n"));
    }

    #[test]
    fn test_local_node_must_exist() {
        let store = MessageStore::open_in_memory().unwrap();
        let mut out = Vec::new();
        assert!(node_local(&store, 3, &mut out).is_err());
    }

    #[test]
    fn test_banner_lists_radio() {
        let text = output(|out| print_banner(out, "/dev/ttyUSB0", &ServiceConfig::default()));
        assert!(text.starts_with("Port:        /dev/ttyUSB0\n"));
        assert!(text.contains("923.300 MHz"));
        assert!(text.contains("SF12 / 125 kHz / CR 4/8"));
        assert!(text.contains("LOW (7.0 dBm, 5.0 mW)"));
        assert!(text.contains("2 x 5 s"));
    }

    #[test]
    fn test_describe_events() {
        assert_eq!(
            describe(&ServiceEvent::Transmitted {
                id: 4,
                text: "HELLO".into(),
                air_time: Duration::from_millis(1318),
            })
            .as_deref(),
            Some("TX #4 \"HELLO\" (1318 ms on air)")
        );
        assert_eq!(
            describe(&ServiceEvent::SlotClaimed { slot: SlotId(2) }).as_deref(),
            Some("Claimed slot 2")
        );
        assert!(describe(&ServiceEvent::StateChanged {
            from: lostik_tdma::LinkState::Idle,
            to: lostik_tdma::LinkState::Receiving,
        })
        .is_none());
    }
}
