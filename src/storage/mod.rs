//! Storage port for pages and nodes.
//!
//! The HTTP layer and the page workspace talk to `dyn Storage`; which
//! implementation sits behind it is decided once, when the app is composed.

use chrono::{DateTime, Utc};

use std::sync::Arc;

use crate::data::UserID;
use crate::internal_error::InternalResult;
use crate::nodes::data::{NewNode, Node, NodeID, NodePatch};
use crate::pages::data::{Page, PageID};
use crate::progress::PositionAssignment;

pub mod local;
pub mod sqlite;

pub use local::LocalStorage;
pub use sqlite::SqliteStorage;

pub type SharedStorage = Arc<dyn Storage>;

pub trait Storage: Send + Sync {
    /// The owner's pages in position order.
    fn get_pages(&self, user_id: UserID) -> InternalResult<Vec<Page>>;

    fn get_page(&self, page_id: PageID) -> InternalResult<Option<Page>>;

    fn find_page_by_title(&self, user_id: UserID, title: &str) -> InternalResult<Option<Page>>;

    fn add_page(
        &self,
        user_id: UserID,
        title: &str,
        position: i64,
        now: DateTime<Utc>,
    ) -> InternalResult<PageID>;

    /// Returns false when the page does not exist or belongs to someone else.
    fn rename_page(
        &self,
        user_id: UserID,
        page_id: PageID,
        title: &str,
        now: DateTime<Utc>,
    ) -> InternalResult<bool>;

    /// Deletes the page and every node inside it.
    fn delete_page(&self, user_id: UserID, page_id: PageID) -> InternalResult<bool>;

    /// All assignments are written, or none are.
    fn set_page_positions(
        &self,
        user_id: UserID,
        assignments: &[PositionAssignment],
    ) -> InternalResult<()>;

    /// Nodes of a page ordered by position. Empty for unknown pages.
    fn get_nodes(&self, page_id: PageID) -> InternalResult<Vec<Node>>;

    fn get_node(&self, node_id: NodeID) -> InternalResult<Option<Node>>;

    fn add_node(&self, node: &NewNode, now: DateTime<Utc>) -> InternalResult<NodeID>;

    /// Fullness is clamped to the resulting max fullness.
    fn update_node(&self, node_id: NodeID, patch: &NodePatch, now: DateTime<Utc>)
        -> InternalResult<bool>;

    fn delete_node(&self, node_id: NodeID) -> InternalResult<bool>;

    /// All assignments are written, or none are.
    fn set_node_positions(&self, assignments: &[PositionAssignment]) -> InternalResult<()>;
}
