use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::data::{DBConnection, UserID};
use crate::internal_error::{InternalError, InternalResult};
use crate::nodes::data::{NewNode, Node, NodeID, NodeKind, NodePatch};
use crate::pages::data::{Page, PageID};
use crate::progress::PositionAssignment;

use super::Storage;

const NODE_COLUMNS: &str = "id, page_id, parent_id, title, content, fullness, maxfullness, type, \
     pinned, completed, completed_at, position, created_at, updated_at";

const PAGE_COLUMNS: &str = "id, user_id, title, position, created_at, updated_at";

fn node_from_row(row: &Row) -> rusqlite::Result<Node> {
    let kind = row.get::<usize, String>(7)?;

    Ok(Node {
        id: row.get(0)?,
        page_id: row.get(1)?,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        fullness: row.get(5)?,
        max_fullness: row.get(6)?,
        kind: NodeKind::from_stored(&kind),
        pinned: row.get(8)?,
        completed: row.get(9)?,
        completed_at: row.get(10)?,
        position: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn page_from_row(row: &Row) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        position: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn query_node(connection: &Connection, node_id: NodeID) -> InternalResult<Option<Node>> {
    let node = connection
        .query_row(
            &format!("SELECT {} FROM nodes WHERE id = (?1)", NODE_COLUMNS),
            params![node_id],
            node_from_row,
        )
        .optional()?;

    Ok(node)
}

/// Pages and nodes kept in the relational database.
pub struct SqliteStorage {
    connection: DBConnection,
}

impl SqliteStorage {
    pub fn new(connection: DBConnection) -> SqliteStorage {
        SqliteStorage { connection }
    }
}

impl Storage for SqliteStorage {
    fn get_pages(&self, user_id: UserID) -> InternalResult<Vec<Page>> {
        let connection = self.connection.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {} FROM pages WHERE user_id = (?1) ORDER BY position, id",
            PAGE_COLUMNS
        ))?;

        let pages = statement
            .query_map(params![user_id], page_from_row)?
            .collect::<rusqlite::Result<Vec<Page>>>()?;

        Ok(pages)
    }

    fn get_page(&self, page_id: PageID) -> InternalResult<Option<Page>> {
        let connection = self.connection.lock()?;

        let page = connection
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = (?1)", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?;

        Ok(page)
    }

    fn find_page_by_title(&self, user_id: UserID, title: &str) -> InternalResult<Option<Page>> {
        let connection = self.connection.lock()?;

        let page = connection
            .query_row(
                &format!(
                    "SELECT {} FROM pages WHERE user_id = (?1) AND title = (?2)",
                    PAGE_COLUMNS
                ),
                params![user_id, title],
                page_from_row,
            )
            .optional()?;

        Ok(page)
    }

    fn add_page(
        &self,
        user_id: UserID,
        title: &str,
        position: i64,
        now: DateTime<Utc>,
    ) -> InternalResult<PageID> {
        let connection = self.connection.lock()?;

        connection.execute(
            "INSERT INTO pages (user_id, title, position, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![user_id, title, position, now],
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn rename_page(
        &self,
        user_id: UserID,
        page_id: PageID,
        title: &str,
        now: DateTime<Utc>,
    ) -> InternalResult<bool> {
        let connection = self.connection.lock()?;

        let updated = connection.execute(
            "UPDATE pages SET title = (?1), updated_at = (?2) WHERE id = (?3) AND user_id = (?4)",
            params![title, now, page_id, user_id],
        )?;

        Ok(updated == 1)
    }

    fn delete_page(&self, user_id: UserID, page_id: PageID) -> InternalResult<bool> {
        let mut connection = self.connection.lock()?;
        let transaction = connection.transaction()?;

        let owned = transaction
            .query_row(
                "SELECT id FROM pages WHERE id = (?1) AND user_id = (?2)",
                params![page_id, user_id],
                |row| row.get::<usize, PageID>(0),
            )
            .optional()?
            .is_some();

        if !owned {
            return Ok(false);
        }

        let removed_nodes =
            transaction.execute("DELETE FROM nodes WHERE page_id = (?1)", params![page_id])?;
        transaction.execute("DELETE FROM pages WHERE id = (?1)", params![page_id])?;
        transaction.commit()?;

        debug!(page_id, removed_nodes, "page deleted");

        Ok(true)
    }

    fn set_page_positions(
        &self,
        user_id: UserID,
        assignments: &[PositionAssignment],
    ) -> InternalResult<()> {
        let mut connection = self.connection.lock()?;
        let transaction = connection.transaction()?;

        for assignment in assignments {
            let updated = transaction.execute(
                "UPDATE pages SET position = (?1) WHERE id = (?2) AND user_id = (?3)",
                params![assignment.position, assignment.id, user_id],
            )?;

            if updated != 1 {
                return Err(InternalError::NotFound("Page", assignment.id));
            }
        }

        transaction.commit()?;
        Ok(())
    }

    fn get_nodes(&self, page_id: PageID) -> InternalResult<Vec<Node>> {
        let connection = self.connection.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {} FROM nodes WHERE page_id = (?1) ORDER BY position, id",
            NODE_COLUMNS
        ))?;

        let nodes = statement
            .query_map(params![page_id], node_from_row)?
            .collect::<rusqlite::Result<Vec<Node>>>()?;

        Ok(nodes)
    }

    fn get_node(&self, node_id: NodeID) -> InternalResult<Option<Node>> {
        let connection = self.connection.lock()?;
        query_node(&connection, node_id)
    }

    fn add_node(&self, node: &NewNode, now: DateTime<Utc>) -> InternalResult<NodeID> {
        let connection = self.connection.lock()?;

        connection.execute(
            "INSERT INTO nodes (page_id, parent_id, title, content, fullness, maxfullness, type, \
             pinned, completed, completed_at, position, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, 0, 0, NULL, ?7, ?8, ?8)",
            params![
                node.page_id,
                node.parent_id,
                node.title,
                node.content,
                node.max_fullness,
                node.kind.as_str(),
                node.position,
                now
            ],
        )?;

        Ok(connection.last_insert_rowid())
    }

    fn update_node(
        &self,
        node_id: NodeID,
        patch: &NodePatch,
        now: DateTime<Utc>,
    ) -> InternalResult<bool> {
        let connection = self.connection.lock()?;

        let mut node = match query_node(&connection, node_id)? {
            Some(node) => node,
            None => return Ok(false),
        };
        patch.apply_to(&mut node);

        connection.execute(
            "UPDATE nodes SET title = (?1), content = (?2), fullness = (?3), maxfullness = (?4), \
             type = (?5), pinned = (?6), completed = (?7), completed_at = (?8), updated_at = (?9) \
             WHERE id = (?10)",
            params![
                node.title,
                node.content,
                node.fullness,
                node.max_fullness,
                node.kind.as_str(),
                node.pinned,
                node.completed,
                node.completed_at,
                now,
                node_id
            ],
        )?;

        Ok(true)
    }

    fn delete_node(&self, node_id: NodeID) -> InternalResult<bool> {
        let connection = self.connection.lock()?;
        let deleted = connection.execute("DELETE FROM nodes WHERE id = (?1)", params![node_id])?;

        Ok(deleted == 1)
    }

    fn set_node_positions(&self, assignments: &[PositionAssignment]) -> InternalResult<()> {
        let mut connection = self.connection.lock()?;
        let transaction = connection.transaction()?;

        for assignment in assignments {
            let updated = transaction.execute(
                "UPDATE nodes SET position = (?1) WHERE id = (?2)",
                params![assignment.position, assignment.id],
            )?;

            if updated != 1 {
                return Err(InternalError::NotFound("Node", assignment.id));
            }
        }

        transaction.commit()?;
        Ok(())
    }
}
