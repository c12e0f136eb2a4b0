//! Client-side view of one page.
//!
//! Every action lands in the in-memory copy first and is then written through
//! the storage port. If the write fails the copy is re-read from storage so
//! what is shown never drifts from what is stored.

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use std::time::Duration;

use crate::config::AppConfig;
use crate::data::UserID;
use crate::internal_error::{InternalError, InternalResult};
use crate::nodes::data::{ActiveGroup, Node, NodeID, NodeKind};
use crate::nodes::helpers::{apply_action, persist_changed, run_action, visible_nodes, NodeAction};
use crate::pages::data::PageID;
use crate::progress::{cascade, ledger, view};
use crate::storage::SharedStorage;

/// A completion scheduled by [`PageWorkspace::finish_simple`]. It always runs;
/// the handle only lets the caller wait for the stored result.
pub struct PendingCommit {
    changed: Vec<NodeID>,
    handle: JoinHandle<InternalResult<Vec<Node>>>,
}

impl PendingCommit {
    /// Nodes already shown as completed.
    pub fn changed(&self) -> &[NodeID] {
        &self.changed
    }

    pub async fn wait(self) -> InternalResult<Vec<Node>> {
        self.handle
            .await
            .map_err(|e| InternalError::Internal(e.to_string()))?
    }
}

pub struct PageWorkspace {
    store: SharedStorage,
    user_id: UserID,
    page_id: PageID,
    nodes: Vec<Node>,
    commit_delay: Duration,
}

impl PageWorkspace {
    pub fn load(
        store: SharedStorage,
        user_id: UserID,
        page_id: PageID,
        commit_delay: Duration,
    ) -> InternalResult<PageWorkspace> {
        let nodes = visible_nodes(store.as_ref(), user_id, page_id)?;

        Ok(PageWorkspace {
            store,
            user_id,
            page_id,
            nodes,
            commit_delay,
        })
    }

    /// Loads a page with the commit delay from the app settings.
    pub fn from_config(
        store: SharedStorage,
        user_id: UserID,
        page_id: PageID,
        config: &AppConfig,
    ) -> InternalResult<PageWorkspace> {
        PageWorkspace::load(store, user_id, page_id, config.completion_delay())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn active(&self) -> Vec<ActiveGroup> {
        view::group_active(&self.nodes)
    }

    pub fn completed(&self) -> Vec<&Node> {
        view::completed_list(&self.nodes)
    }

    /// Replaces the in-memory copy with what storage holds.
    pub fn reconcile(&mut self) -> InternalResult<()> {
        self.nodes = visible_nodes(self.store.as_ref(), self.user_id, self.page_id)?;
        Ok(())
    }

    fn settle<T>(&mut self, result: InternalResult<T>) -> InternalResult<T> {
        if let Err(e) = &result {
            warn!(page_id = self.page_id, "write failed, reloading page: {}", e);
            if let Err(reload) = self.reconcile() {
                warn!(page_id = self.page_id, "reload failed: {}", reload);
            }
        }

        result
    }

    pub fn apply(&mut self, action: NodeAction) -> InternalResult<Vec<NodeID>> {
        let now = Utc::now();
        let changed = apply_action(&mut self.nodes, action, now)?;
        debug!(?action, ?changed, "applied locally");

        let result = persist_changed(self.store.as_ref(), &self.nodes, &changed, now).map(|_| changed);
        self.settle(result)
    }

    pub fn increment(&mut self, node_id: NodeID) -> InternalResult<Vec<NodeID>> {
        self.apply(NodeAction::Increment(node_id))
    }

    pub fn complete(&mut self, node_id: NodeID) -> InternalResult<Vec<NodeID>> {
        self.apply(NodeAction::Complete(node_id))
    }

    pub fn restore(&mut self, node_id: NodeID) -> InternalResult<Vec<NodeID>> {
        self.apply(NodeAction::Restore(node_id))
    }

    /// Drag-and-drop result for one sibling group.
    pub fn reorder(&mut self, node_ids: &[NodeID]) -> InternalResult<()> {
        let parent_id = match node_ids.first().and_then(|id| self.nodes.iter().find(|n| n.id == *id)) {
            Some(node) => node.parent_id,
            None => return Ok(()),
        };
        let siblings: Vec<Node> = self
            .nodes
            .iter()
            .filter(|node| node.parent_id == parent_id)
            .cloned()
            .collect();
        ledger::validate_group(node_ids, &siblings)?;

        let assignments = ledger::reorder(node_ids);
        ledger::apply_positions(&mut self.nodes, &assignments);

        let result = self.store.set_node_positions(&assignments);
        self.settle(result)
    }

    /// Ticks off a simple node. The page shows it completed straight away; the
    /// stored completion is written once the commit delay has passed. Must be
    /// called from within a Tokio runtime.
    pub fn finish_simple(&mut self, node_id: NodeID) -> InternalResult<PendingCommit> {
        match self.nodes.iter().find(|node| node.id == node_id) {
            Some(node) if node.kind == NodeKind::Simple => {}
            Some(_) => return Err(InternalError::validation("Only simple nodes can be ticked off")),
            None => return Err(InternalError::NotFound("Node", node_id)),
        }

        let runtime = Handle::try_current().map_err(|e| InternalError::Internal(e.to_string()))?;

        let changed = cascade::complete(&mut self.nodes, node_id, Utc::now());

        let store = self.store.clone();
        let user_id = self.user_id;
        let delay = self.commit_delay;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let result = run_action(store.as_ref(), user_id, NodeAction::Complete(node_id), Utc::now());
            if let Err(e) = &result {
                warn!(node_id, "deferred completion failed: {}", e);
            }
            result
        });

        Ok(PendingCommit { changed, handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::data::NewNode;
    use crate::progress::test_support::at;
    use crate::storage::test_support::Flaky;
    use crate::storage::Storage;
    use chrono::DateTime;

    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    const USER: UserID = 3;

    fn seeded() -> (Arc<Flaky>, PageID, NodeID, NodeID, NodeID) {
        let store = Arc::new(Flaky::new());
        let page_id = store.add_page(USER, "Exam Prep", 0, at(0)).unwrap();
        let node = |title: &str, parent_id: Option<NodeID>, position: i64| NewNode {
            page_id,
            parent_id,
            title: title.to_string(),
            content: None,
            max_fullness: 1,
            kind: NodeKind::Simple,
            position,
        };
        let chapter = store.add_node(&node("Chapter 1", None, 0), at(0)).unwrap();
        let first = store.add_node(&node("Section 1.1", Some(chapter), 0), at(0)).unwrap();
        let second = store.add_node(&node("Section 1.2", Some(chapter), 1), at(0)).unwrap();

        (store, page_id, chapter, first, second)
    }

    fn states(nodes: &[Node]) -> Vec<(NodeID, u32, bool, Option<DateTime<Utc>>, i64)> {
        nodes
            .iter()
            .map(|n| (n.id, n.fullness, n.completed, n.completed_at, n.position))
            .collect()
    }

    fn workspace(store: &Arc<Flaky>, page_id: PageID) -> PageWorkspace {
        let shared: SharedStorage = store.clone();
        PageWorkspace::load(shared, USER, page_id, Duration::from_secs(3)).unwrap()
    }

    #[test]
    fn actions_land_locally_and_in_storage() {
        let (store, page_id, chapter, first, second) = seeded();
        let mut workspace = workspace(&store, page_id);

        assert_eq!(workspace.complete(first).unwrap(), vec![first]);
        assert_eq!(workspace.active().len(), 1);

        let changed = workspace.complete(second).unwrap();
        assert_eq!(changed, vec![second, chapter]);
        assert!(workspace.active().is_empty());
        assert_eq!(workspace.completed().len(), 3);
        assert_eq!(states(workspace.nodes()), states(&store.get_nodes(page_id).unwrap()));
    }

    #[test]
    fn failed_write_reloads_from_storage() {
        let (store, page_id, _, first, _) = seeded();
        let mut workspace = workspace(&store, page_id);

        store.failing.store(true, Ordering::SeqCst);
        assert!(workspace.complete(first).is_err());

        let node = workspace.nodes().iter().find(|n| n.id == first).unwrap();
        assert!(!node.completed);
        assert_eq!(workspace.nodes(), store.get_nodes(page_id).unwrap().as_slice());
    }

    #[test]
    fn failed_reorder_is_rolled_back() {
        let (store, page_id, chapter, first, second) = seeded();
        let mut workspace = workspace(&store, page_id);

        store.failing.store(true, Ordering::SeqCst);
        assert!(workspace.reorder(&[second, first]).is_err());
        assert_eq!(workspace.nodes(), store.get_nodes(page_id).unwrap().as_slice());

        store.failing.store(false, Ordering::SeqCst);
        workspace.reorder(&[second, first]).unwrap();
        let groups = workspace.active();
        assert_eq!(groups[0].node.id, chapter);
        assert_eq!(groups[0].children[0].id, second);
        assert_eq!(store.get_node(second).unwrap().unwrap().position, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn simple_completion_commits_after_the_delay() {
        let (store, page_id, _, first, _) = seeded();
        let mut workspace = workspace(&store, page_id);

        let started = tokio::time::Instant::now();
        let pending = workspace.finish_simple(first).unwrap();

        let shown = workspace.nodes().iter().find(|n| n.id == first).unwrap();
        assert!(shown.completed);
        assert!(!store.get_node(first).unwrap().unwrap().completed);

        let written = pending.wait().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(written.iter().map(|n| n.id).collect::<Vec<_>>(), vec![first]);
        assert!(store.get_node(first).unwrap().unwrap().completed);
    }

    #[tokio::test(start_paused = true)]
    async fn commit_delay_comes_from_the_settings() {
        let (store, page_id, _, first, _) = seeded();
        let config = AppConfig {
            completion_delay_ms: 500,
            ..AppConfig::default()
        };
        let shared: SharedStorage = store.clone();
        let mut workspace = PageWorkspace::from_config(shared, USER, page_id, &config).unwrap();

        let started = tokio::time::Instant::now();
        let pending = workspace.finish_simple(first).unwrap();
        assert_eq!(pending.changed(), &[first]);

        pending.wait().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(store.get_node(first).unwrap().unwrap().completed);
    }

    #[test]
    fn finish_simple_rejects_progress_nodes() {
        let store = Arc::new(Flaky::new());
        let page_id = store.add_page(USER, "P", 0, at(0)).unwrap();
        let node_id = store
            .add_node(
                &NewNode {
                    page_id,
                    parent_id: None,
                    title: "Bar".to_string(),
                    content: None,
                    max_fullness: 3,
                    kind: NodeKind::Progress,
                    position: 0,
                },
                at(0),
            )
            .unwrap();
        let mut workspace = workspace(&store, page_id);

        assert!(matches!(
            workspace.finish_simple(node_id),
            Err(InternalError::Validation(_))
        ));
        assert!(matches!(
            workspace.finish_simple(404),
            Err(InternalError::NotFound(..))
        ));
    }
}
