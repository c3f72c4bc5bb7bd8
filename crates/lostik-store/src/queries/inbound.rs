//! Inbound log: append-only record of received frames

use rusqlite::params;
use tracing::debug;

use crate::database::{from_millis, now_millis, to_millis, MessageStore};
use crate::error::StoreError;
use crate::models::InboundMessage;

impl MessageStore {
    /// Record a received message, timestamped now
    pub fn record_inbound(
        &self,
        text: &str,
        rssi: i32,
        snr: f64,
    ) -> Result<InboundMessage, StoreError> {
        let received_at = now_millis();
        self.conn.execute(
            "INSERT INTO inbound (text, received_at, rssi, snr) VALUES (?1, ?2, ?3, ?4)",
            params![text, to_millis(received_at), rssi, snr],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Recorded inbound message {} (rssi {}, snr {})", id, rssi, snr);
        Ok(InboundMessage {
            id,
            text: text.to_string(),
            received_at,
            rssi,
            snr,
        })
    }

    /// All received messages, oldest first
    pub fn inbound_messages(&self) -> Result<Vec<InboundMessage>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, received_at, rssi, snr FROM inbound ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(InboundMessage {
                id: row.get(0)?,
                text: row.get(1)?,
                received_at: from_millis(row.get(2)?),
                rssi: row.get(3)?,
                snr: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
