//! Outbound queue: validated insert, FIFO dequeue, one-shot completion

use std::time::Duration;

use chrono::{DateTime, Utc};
use lostik_protocol::MessageText;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use crate::database::{from_millis, now_millis, to_millis, MessageStore};
use crate::error::StoreError;
use crate::models::OutboundMessage;

const OUTBOUND_COLUMNS: &str = "id, text, enqueued_at, sent_at, air_time_ms";

fn outbound_from_row(row: &Row<'_>) -> rusqlite::Result<OutboundMessage> {
    let sent_at: Option<i64> = row.get(3)?;
    let air_time_ms: Option<i64> = row.get(4)?;
    Ok(OutboundMessage {
        id: row.get(0)?,
        text: row.get(1)?,
        enqueued_at: from_millis(row.get(2)?),
        sent_at: sent_at.map(from_millis),
        air_time: air_time_ms.map(|ms| Duration::from_millis(ms.max(0) as u64)),
    })
}

impl MessageStore {
    /// Validate `text` and append it to the outbound queue
    ///
    /// Invalid text is rejected before the database is touched.
    pub fn enqueue_outbound(&self, text: &str) -> Result<OutboundMessage, StoreError> {
        let text = MessageText::new(text)?;
        self.enqueue_message(text)
    }

    /// Append already-validated text to the outbound queue
    pub fn enqueue_message(&self, text: MessageText) -> Result<OutboundMessage, StoreError> {
        let enqueued_at = now_millis();
        self.conn.execute(
            "INSERT INTO outbound (text, enqueued_at) VALUES (?1, ?2)",
            params![text.as_str(), to_millis(enqueued_at)],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Queued outbound message {}: {}", id, text);
        Ok(OutboundMessage {
            id,
            text: text.into_inner(),
            enqueued_at,
            sent_at: None,
            air_time: None,
        })
    }

    /// Oldest message not yet transmitted
    pub fn next_unsent(&self) -> Result<Option<OutboundMessage>, StoreError> {
        let sql = format!(
            "SELECT {} FROM outbound WHERE sent_at IS NULL ORDER BY id ASC LIMIT 1",
            OUTBOUND_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, [], outbound_from_row)
            .optional()?)
    }

    /// Record a successful transmission
    ///
    /// Transmission metadata is written exactly once per message.
    pub fn mark_sent(
        &self,
        id: i64,
        sent_at: DateTime<Utc>,
        air_time: Duration,
    ) -> Result<(), StoreError> {
        let air_time_ms = i64::try_from(air_time.as_millis()).unwrap_or(i64::MAX);
        let updated = self.conn.execute(
            "UPDATE outbound SET sent_at = ?2, air_time_ms = ?3
             WHERE id = ?1 AND sent_at IS NULL",
            params![id, to_millis(sent_at), air_time_ms],
        )?;
        if updated == 0 {
            return match self.outbound_message(id)? {
                Some(_) => Err(StoreError::AlreadySent(id)),
                None => Err(StoreError::MessageNotFound(id)),
            };
        }
        debug!("Message {} marked sent ({} ms on air)", id, air_time_ms);
        Ok(())
    }

    /// Look up a single outbound message
    pub fn outbound_message(&self, id: i64) -> Result<Option<OutboundMessage>, StoreError> {
        let sql = format!("SELECT {} FROM outbound WHERE id = ?1", OUTBOUND_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], outbound_from_row)
            .optional()?)
    }

    /// All outbound messages, oldest first
    pub fn outbound_messages(&self) -> Result<Vec<OutboundMessage>, StoreError> {
        let sql = format!("SELECT {} FROM outbound ORDER BY id ASC", OUTBOUND_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], outbound_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Number of messages waiting to be transmitted
    pub fn pending_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM outbound WHERE sent_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Combined air time of every transmitted message still in the queue
    pub fn total_air_time(&self) -> Result<Duration, StoreError> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(air_time_ms), 0) FROM outbound",
            [],
            |row| row.get(0),
        )?;
        Ok(Duration::from_millis(total.max(0) as u64))
    }

    /// Delete every outbound message, sent or not
    ///
    /// Ids are not reused afterwards. Returns the number of messages removed.
    pub fn purge_outbound(&self) -> Result<usize, StoreError> {
        let removed = self.conn.execute("DELETE FROM outbound", [])?;
        info!("Purged {} outbound message(s)", removed);
        Ok(removed)
    }
}
