use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::data::UserID;
use crate::internal_error::{InternalError, InternalResult};
use crate::pages::data::PageID;
use crate::pages::helpers::owned_page;
use crate::progress::ledger::{self, Direction};
use crate::progress::{cascade, model, Increment};
use crate::storage::Storage;

use super::data::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Increment(NodeID),
    Complete(NodeID),
    Restore(NodeID),
}

impl NodeAction {
    pub fn node_id(&self) -> NodeID {
        match self {
            NodeAction::Increment(id) | NodeAction::Complete(id) | NodeAction::Restore(id) => *id,
        }
    }
}

/// Runs an action against an in-memory node set and returns the ids that changed.
/// An increment that fills the bar hands over to the completion cascade. A
/// direct completion is refused unless the node may be ticked off. Unknown ids
/// change nothing.
pub fn apply_action(nodes: &mut [Node], action: NodeAction, now: DateTime<Utc>) -> InternalResult<Vec<NodeID>> {
    let changed = match action {
        NodeAction::Increment(node_id) => match model::increment(nodes, node_id) {
            Increment::Ignored => vec![],
            Increment::Filled => vec![node_id],
            Increment::ReachedCompletion => {
                let mut changed = vec![node_id];
                for id in cascade::complete(nodes, node_id, now) {
                    if !changed.contains(&id) {
                        changed.push(id);
                    }
                }
                changed
            }
        },
        NodeAction::Complete(node_id) => {
            if let Some(node) = nodes.iter().find(|node| node.id == node_id) {
                if !node.completed && !model::can_complete(node, &model::children_of(nodes, node_id)) {
                    return Err(InternalError::validation(
                        "Only simple or filled nodes can be completed directly",
                    ));
                }
            }
            cascade::complete(nodes, node_id, now)
        }
        NodeAction::Restore(node_id) => cascade::restore(nodes, node_id),
    };

    Ok(changed)
}

/// Writes every listed node back in full, in the order given, and returns the
/// written copies.
pub fn persist_changed(
    store: &dyn Storage,
    nodes: &[Node],
    changed: &[NodeID],
    now: DateTime<Utc>,
) -> InternalResult<Vec<Node>> {
    let mut written = vec![];

    for node_id in changed {
        let node = nodes
            .iter()
            .find(|node| node.id == *node_id)
            .ok_or(InternalError::NotFound("Node", *node_id))?;

        if !store.update_node(node.id, &NodePatch::from_node(node), now)? {
            return Err(InternalError::NotFound("Node", node.id));
        }
        written.push(node.clone());
    }

    Ok(written)
}

/// Nodes of a page the caller may see. An unknown page has no nodes.
pub fn visible_nodes(store: &dyn Storage, user_id: UserID, page_id: PageID) -> InternalResult<Vec<Node>> {
    match store.get_page(page_id)? {
        Some(page) if page.user_id != user_id => Err(InternalError::NotFound("Page", page_id)),
        Some(_) => store.get_nodes(page_id),
        None => Ok(vec![]),
    }
}

/// Loads a node the caller owns together with every node on its page.
fn owned_node(store: &dyn Storage, user_id: UserID, node_id: NodeID) -> InternalResult<(Node, Vec<Node>)> {
    let node = store
        .get_node(node_id)?
        .ok_or(InternalError::NotFound("Node", node_id))?;
    owned_page(store, user_id, node.page_id)?;
    let page_nodes = store.get_nodes(node.page_id)?;

    Ok((node, page_nodes))
}

pub fn run_action(
    store: &dyn Storage,
    user_id: UserID,
    action: NodeAction,
    now: DateTime<Utc>,
) -> InternalResult<Vec<Node>> {
    let (_, mut page_nodes) = owned_node(store, user_id, action.node_id())?;

    let changed = apply_action(&mut page_nodes, action, now)?;
    debug!(?action, ?changed, "node action applied");

    persist_changed(store, &page_nodes, &changed, now)
}

fn clean_title(title: &str) -> InternalResult<String> {
    let title = title.trim();

    if title.is_empty() {
        return Err(InternalError::validation("Node title cannot be empty"));
    }

    Ok(title.to_string())
}

pub fn add_node(
    store: &dyn Storage,
    user_id: UserID,
    request: &AddNodeRequest,
    now: DateTime<Utc>,
) -> InternalResult<NodeID> {
    let title = clean_title(&request.title)?;
    owned_page(store, user_id, request.page_id)?;
    let page_nodes = store.get_nodes(request.page_id)?;

    if let Some(parent_id) = request.parent_id {
        match page_nodes.iter().find(|node| node.id == parent_id) {
            Some(parent) if parent.is_child() => {
                return Err(InternalError::validation("Cannot add a child under a child node"))
            }
            Some(_) => {}
            None => return Err(InternalError::validation("Parent node is not on this page")),
        }
    }

    let siblings: Vec<Node> = page_nodes
        .into_iter()
        .filter(|node| node.parent_id == request.parent_id)
        .collect();

    let new_node = NewNode {
        page_id: request.page_id,
        parent_id: request.parent_id,
        title,
        content: request.content.clone(),
        max_fullness: request.max_fullness.unwrap_or(DEFAULT_MAX_FULLNESS),
        kind: request.kind.unwrap_or_default(),
        position: ledger::next_position(&siblings),
    };
    let node_id = store.add_node(&new_node, now)?;

    info!(page_id = request.page_id, node_id, "node created");

    Ok(node_id)
}

pub fn update_node(
    store: &dyn Storage,
    user_id: UserID,
    request: &UpdateNodeRequest,
    now: DateTime<Utc>,
) -> InternalResult<Node> {
    let title = match &request.title {
        Some(title) => Some(clean_title(title)?),
        None => None,
    };
    let (mut node, _) = owned_node(store, user_id, request.node_id)?;

    let patch = NodePatch {
        title,
        content: request.content.clone().map(Some),
        fullness: request.fullness,
        max_fullness: request.max_fullness,
        kind: request.kind,
        pinned: request.pinned,
        ..NodePatch::default()
    };
    if !store.update_node(node.id, &patch, now)? {
        return Err(InternalError::NotFound("Node", node.id));
    }
    patch.apply_to(&mut node);
    node.updated_at = now;

    Ok(node)
}

/// Deletes one node. Children of a deleted parent are left in place. Removing a
/// child can leave a parent whose remaining children are all done, which
/// completes it. Unknown ids are a no-op.
pub fn delete_node(
    store: &dyn Storage,
    user_id: UserID,
    node_id: NodeID,
    now: DateTime<Utc>,
) -> InternalResult<Vec<Node>> {
    let node = match store.get_node(node_id)? {
        Some(node) => node,
        None => return Ok(vec![]),
    };
    owned_page(store, user_id, node.page_id)?;

    store.delete_node(node_id)?;
    info!(node_id, page_id = node.page_id, "node deleted");

    match node.parent_id {
        Some(parent_id) => {
            let mut page_nodes = store.get_nodes(node.page_id)?;
            let changed = cascade::reevaluate_parent(&mut page_nodes, parent_id, now);
            persist_changed(store, &page_nodes, &changed, now)
        }
        None => Ok(vec![]),
    }
}

fn sibling_group(page_nodes: Vec<Node>, parent_id: Option<NodeID>) -> Vec<Node> {
    page_nodes
        .into_iter()
        .filter(|node| node.parent_id == parent_id)
        .collect()
}

pub fn reorder_nodes(store: &dyn Storage, user_id: UserID, node_ids: &[NodeID]) -> InternalResult<()> {
    let first = match node_ids.first() {
        Some(first) => *first,
        None => return Ok(()),
    };

    let (node, page_nodes) = owned_node(store, user_id, first)?;
    let siblings = sibling_group(page_nodes, node.parent_id);
    ledger::validate_group(node_ids, &siblings)?;

    store.set_node_positions(&ledger::reorder(node_ids))
}

pub fn move_node(
    store: &dyn Storage,
    user_id: UserID,
    node_id: NodeID,
    direction: Direction,
) -> InternalResult<bool> {
    let (node, page_nodes) = owned_node(store, user_id, node_id)?;
    let siblings = sibling_group(page_nodes, node.parent_id);

    match ledger::swap_with_neighbour(&siblings, node_id, direction) {
        Some(swap) => {
            store.set_node_positions(&swap)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
