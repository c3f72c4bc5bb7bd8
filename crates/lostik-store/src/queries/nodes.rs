//! Node registry

use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use crate::database::MessageStore;
use crate::error::StoreError;
use crate::models::Node;

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        node_id: row.get(0)?,
        node_name: row.get(1)?,
        is_local: row.get(2)?,
    })
}

impl MessageStore {
    /// Add a node, or rename it if already registered
    pub fn register_node(&self, node_id: u32, node_name: &str) -> Result<Node, StoreError> {
        self.conn.execute(
            "INSERT INTO nodes (node_id, node_name) VALUES (?1, ?2)
             ON CONFLICT(node_id) DO UPDATE SET node_name = excluded.node_name",
            params![node_id, node_name],
        )?;
        self.node(node_id)?.ok_or(StoreError::NodeNotFound(node_id))
    }

    /// Look up one node
    pub fn node(&self, node_id: u32) -> Result<Option<Node>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT node_id, node_name, is_local FROM nodes WHERE node_id = ?1",
                params![node_id],
                node_from_row,
            )
            .optional()?)
    }

    /// All registered nodes ordered by id
    pub fn nodes(&self) -> Result<Vec<Node>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT node_id, node_name, is_local FROM nodes ORDER BY node_id ASC")?;
        let rows = stmt.query_map([], node_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The node this database belongs to, if one has been marked
    pub fn local_node(&self) -> Result<Option<Node>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT node_id, node_name, is_local FROM nodes WHERE is_local = 1",
                [],
                node_from_row,
            )
            .optional()?)
    }

    /// Mark `node_id` as the local node
    ///
    /// The flag is permanent: repeating it for the same node is a no-op and
    /// marking a different node fails.
    pub fn mark_local_node(&self, node_id: u32) -> Result<Node, StoreError> {
        if let Some(existing) = self.local_node()? {
            if existing.node_id == node_id {
                return Ok(existing);
            }
            return Err(StoreError::LocalNodeConflict {
                existing: existing.node_id,
                requested: node_id,
            });
        }

        let updated = self.conn.execute(
            "UPDATE nodes SET is_local = 1 WHERE node_id = ?1",
            params![node_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NodeNotFound(node_id));
        }
        info!("Node {} marked as local", node_id);
        self.node(node_id)?.ok_or(StoreError::NodeNotFound(node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_list() {
        let store = MessageStore::open_in_memory().unwrap();
        store.register_node(2, "Bravo").unwrap();
        store.register_node(1, "Alpha").unwrap();

        let ids: Vec<_> = store.nodes().unwrap().iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(store.local_node().unwrap().is_none());
    }

    #[test]
    fn test_register_renames_existing() {
        let store = MessageStore::open_in_memory().unwrap();
        store.register_node(1, "Alpha").unwrap();
        let node = store.register_node(1, "Able").unwrap();
        assert_eq!(node.node_name, "Able");
        assert_eq!(store.nodes().unwrap().len(), 1);
    }

    #[test]
    fn test_local_flag_is_permanent() {
        let store = MessageStore::open_in_memory().unwrap();
        store.register_node(1, "Alpha").unwrap();
        store.register_node(2, "Bravo").unwrap();

        let local = store.mark_local_node(1).unwrap();
        assert!(local.is_local);
        assert_eq!(store.mark_local_node(1).unwrap(), local);
        assert!(matches!(
            store.mark_local_node(2),
            Err(StoreError::LocalNodeConflict {
                existing: 1,
                requested: 2
            })
        ));
        assert_eq!(store.local_node().unwrap().unwrap().node_id, 1);
    }

    #[test]
    fn test_mark_unknown_node() {
        let store = MessageStore::open_in_memory().unwrap();
        assert!(matches!(
            store.mark_local_node(9),
            Err(StoreError::NodeNotFound(9))
        ));
    }

    #[test]
    fn test_zero_node_id_rejected() {
        let store = MessageStore::open_in_memory().unwrap();
        assert!(matches!(
            store.register_node(0, "Nobody"),
            Err(StoreError::Persistence(_))
        ));
    }
}
