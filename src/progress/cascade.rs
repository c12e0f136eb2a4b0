use chrono::{DateTime, Utc};

use crate::nodes::data::{Node, NodeID};

fn index_of(nodes: &[Node], node_id: NodeID) -> Option<usize> {
    nodes.iter().position(|node| node.id == node_id)
}

fn all_children_completed(nodes: &[Node], parent_id: NodeID) -> bool {
    nodes
        .iter()
        .filter(|node| node.parent_id == Some(parent_id))
        .all(|node| node.completed)
}

/// Marks a node completed and propagates upward: once every child of a parent
/// is completed, the parent is completed with the same timestamp.
///
/// Completing an already completed node changes nothing and does not
/// re-trigger the parent rule. Returns the ids whose state changed.
pub fn complete(nodes: &mut [Node], node_id: NodeID, now: DateTime<Utc>) -> Vec<NodeID> {
    let mut changed = vec![];

    let index = match index_of(nodes, node_id) {
        Some(index) => index,
        None => return changed,
    };

    if nodes[index].completed {
        return changed;
    }

    nodes[index].completed = true;
    nodes[index].completed_at = Some(now);
    changed.push(node_id);

    if let Some(parent_id) = nodes[index].parent_id {
        // The node itself is now completed, so this is "no siblings, or all siblings completed".
        if all_children_completed(nodes, parent_id) {
            changed.extend(complete(nodes, parent_id, now));
        }
    }

    changed
}

/// Returns a node to the active state. Fullness is always zeroed. Restoration
/// never touches the node's parent or children.
pub fn restore(nodes: &mut [Node], node_id: NodeID) -> Vec<NodeID> {
    let index = match index_of(nodes, node_id) {
        Some(index) => index,
        None => return vec![],
    };

    let node = &mut nodes[index];
    let changed = node.completed || node.completed_at.is_some() || node.fullness != 0;

    node.completed = false;
    node.completed_at = None;
    node.fullness = 0;

    if changed {
        vec![node_id]
    } else {
        vec![]
    }
}

/// Applies the parent rule after the children of `parent_id` changed without a
/// completion, e.g. an incomplete child was deleted.
pub fn reevaluate_parent(nodes: &mut [Node], parent_id: NodeID, now: DateTime<Utc>) -> Vec<NodeID> {
    let has_children = nodes.iter().any(|node| node.parent_id == Some(parent_id));

    if has_children && all_children_completed(nodes, parent_id) {
        complete(nodes, parent_id, now)
    } else {
        vec![]
    }
}
