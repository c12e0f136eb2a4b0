use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::data::UserID;
use crate::internal_error::{InternalError, InternalResult};
use crate::nodes::data::{NewNode, Node, NodeID, NodePatch};
use crate::pages::data::{Page, PageID};
use crate::progress::PositionAssignment;

use super::Storage;

pub const PAGES_KEY: &str = "revise_local_pages";
pub const NODES_KEY: &str = "revise_local_nodes";

type Entries = BTreeMap<String, String>;

/// Account-less storage: string keys holding JSON arrays of the same page and
/// node shapes the database uses. With a path, every write is flushed to disk.
pub struct LocalStorage {
    path: Option<PathBuf>,
    entries: Mutex<Entries>,
}

fn read<T: DeserializeOwned>(entries: &Entries, key: &str) -> InternalResult<Vec<T>> {
    match entries.get(key) {
        Some(value) => Ok(serde_json::from_str(value)?),
        None => Ok(vec![]),
    }
}

fn put<T: Serialize>(entries: &mut Entries, key: &str, items: &[T]) -> InternalResult<()> {
    entries.insert(key.to_string(), serde_json::to_string(items)?);
    Ok(())
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

impl LocalStorage {
    pub fn in_memory() -> LocalStorage {
        LocalStorage {
            path: None,
            entries: Mutex::new(Entries::new()),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> InternalResult<LocalStorage> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            Entries::new()
        };

        debug!(path = %path.display(), "opened local store");

        Ok(LocalStorage {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    fn write<T: Serialize>(&self, entries: &mut Entries, key: &str, items: &[T]) -> InternalResult<()> {
        let mut staged = entries.clone();
        put(&mut staged, key, items)?;
        self.commit(entries, staged)
    }

    /// Makes `staged` the current state once it is on disk. A failed flush
    /// leaves `entries` untouched.
    fn commit(&self, entries: &mut Entries, staged: Entries) -> InternalResult<()> {
        self.flush(&staged)?;
        *entries = staged;
        Ok(())
    }

    fn flush(&self, entries: &Entries) -> InternalResult<()> {
        if let Some(path) = &self.path {
            fs::write(path, serde_json::to_string_pretty(entries)?)?;
        }

        Ok(())
    }
}

impl Storage for LocalStorage {
    fn get_pages(&self, user_id: UserID) -> InternalResult<Vec<Page>> {
        let entries = self.entries.lock()?;

        let mut pages: Vec<Page> = read::<Page>(&entries, PAGES_KEY)?
            .into_iter()
            .filter(|page| page.user_id == user_id)
            .collect();
        pages.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));

        Ok(pages)
    }

    fn get_page(&self, page_id: PageID) -> InternalResult<Option<Page>> {
        let entries = self.entries.lock()?;

        Ok(read::<Page>(&entries, PAGES_KEY)?
            .into_iter()
            .find(|page| page.id == page_id))
    }

    fn find_page_by_title(&self, user_id: UserID, title: &str) -> InternalResult<Option<Page>> {
        let entries = self.entries.lock()?;

        Ok(read::<Page>(&entries, PAGES_KEY)?
            .into_iter()
            .find(|page| page.user_id == user_id && page.title == title))
    }

    fn add_page(
        &self,
        user_id: UserID,
        title: &str,
        position: i64,
        now: DateTime<Utc>,
    ) -> InternalResult<PageID> {
        let mut entries = self.entries.lock()?;
        let mut pages: Vec<Page> = read(&entries, PAGES_KEY)?;

        let id = next_id(pages.iter().map(|page| page.id));
        pages.push(Page {
            id,
            user_id,
            title: title.to_string(),
            position,
            created_at: now,
            updated_at: now,
        });
        self.write(&mut entries, PAGES_KEY, &pages)?;

        Ok(id)
    }

    fn rename_page(
        &self,
        user_id: UserID,
        page_id: PageID,
        title: &str,
        now: DateTime<Utc>,
    ) -> InternalResult<bool> {
        let mut entries = self.entries.lock()?;
        let mut pages: Vec<Page> = read(&entries, PAGES_KEY)?;

        match pages
            .iter_mut()
            .find(|page| page.id == page_id && page.user_id == user_id)
        {
            Some(page) => {
                page.title = title.to_string();
                page.updated_at = now;
            }
            None => return Ok(false),
        }
        self.write(&mut entries, PAGES_KEY, &pages)?;

        Ok(true)
    }

    fn delete_page(&self, user_id: UserID, page_id: PageID) -> InternalResult<bool> {
        let mut entries = self.entries.lock()?;
        let mut pages: Vec<Page> = read(&entries, PAGES_KEY)?;
        let mut nodes: Vec<Node> = read(&entries, NODES_KEY)?;

        let before = pages.len();
        pages.retain(|page| !(page.id == page_id && page.user_id == user_id));
        if pages.len() == before {
            return Ok(false);
        }
        nodes.retain(|node| node.page_id != page_id);

        let mut staged = entries.clone();
        put(&mut staged, NODES_KEY, &nodes)?;
        put(&mut staged, PAGES_KEY, &pages)?;
        self.commit(&mut entries, staged)?;

        Ok(true)
    }

    fn set_page_positions(
        &self,
        user_id: UserID,
        assignments: &[PositionAssignment],
    ) -> InternalResult<()> {
        let mut entries = self.entries.lock()?;
        let mut pages: Vec<Page> = read(&entries, PAGES_KEY)?;

        for assignment in assignments {
            match pages
                .iter_mut()
                .find(|page| page.id == assignment.id && page.user_id == user_id)
            {
                Some(page) => page.position = assignment.position,
                None => return Err(InternalError::NotFound("Page", assignment.id)),
            }
        }

        self.write(&mut entries, PAGES_KEY, &pages)
    }

    fn get_nodes(&self, page_id: PageID) -> InternalResult<Vec<Node>> {
        let entries = self.entries.lock()?;

        let mut nodes: Vec<Node> = read::<Node>(&entries, NODES_KEY)?
            .into_iter()
            .filter(|node| node.page_id == page_id)
            .collect();
        nodes.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));

        Ok(nodes)
    }

    fn get_node(&self, node_id: NodeID) -> InternalResult<Option<Node>> {
        let entries = self.entries.lock()?;

        Ok(read::<Node>(&entries, NODES_KEY)?
            .into_iter()
            .find(|node| node.id == node_id))
    }

    fn add_node(&self, node: &NewNode, now: DateTime<Utc>) -> InternalResult<NodeID> {
        let mut entries = self.entries.lock()?;
        let mut nodes: Vec<Node> = read(&entries, NODES_KEY)?;

        let id = next_id(nodes.iter().map(|node| node.id));
        nodes.push(Node {
            id,
            page_id: node.page_id,
            parent_id: node.parent_id,
            title: node.title.clone(),
            content: node.content.clone(),
            fullness: 0,
            max_fullness: node.max_fullness,
            kind: node.kind,
            pinned: false,
            completed: false,
            completed_at: None,
            position: node.position,
            created_at: now,
            updated_at: now,
        });
        self.write(&mut entries, NODES_KEY, &nodes)?;

        Ok(id)
    }

    fn update_node(
        &self,
        node_id: NodeID,
        patch: &NodePatch,
        now: DateTime<Utc>,
    ) -> InternalResult<bool> {
        let mut entries = self.entries.lock()?;
        let mut nodes: Vec<Node> = read(&entries, NODES_KEY)?;

        match nodes.iter_mut().find(|node| node.id == node_id) {
            Some(node) => {
                patch.apply_to(node);
                node.updated_at = now;
            }
            None => return Ok(false),
        }
        self.write(&mut entries, NODES_KEY, &nodes)?;

        Ok(true)
    }

    fn delete_node(&self, node_id: NodeID) -> InternalResult<bool> {
        let mut entries = self.entries.lock()?;
        let mut nodes: Vec<Node> = read(&entries, NODES_KEY)?;

        let before = nodes.len();
        nodes.retain(|node| node.id != node_id);
        if nodes.len() == before {
            return Ok(false);
        }
        self.write(&mut entries, NODES_KEY, &nodes)?;

        Ok(true)
    }

    fn set_node_positions(&self, assignments: &[PositionAssignment]) -> InternalResult<()> {
        let mut entries = self.entries.lock()?;
        let mut nodes: Vec<Node> = read(&entries, NODES_KEY)?;

        for assignment in assignments {
            match nodes.iter_mut().find(|node| node.id == assignment.id) {
                Some(node) => node.position = assignment.position,
                None => return Err(InternalError::NotFound("Node", assignment.id)),
            }
        }

        self.write(&mut entries, NODES_KEY, &nodes)
    }
}
