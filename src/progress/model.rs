use serde::Serialize;

use crate::nodes::data::{Node, NodeID, NodeKind};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub fullness: u32,
    pub max_fullness: u32,
}

impl Progress {
    pub fn is_full(&self) -> bool {
        self.max_fullness > 0 && self.fullness >= self.max_fullness
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// Simple node, parent, zero-target node, or already full. Nothing changed.
    Ignored,
    Filled,
    /// The fill just reached `max_fullness`; the caller must run the completion cascade.
    ReachedCompletion,
}

pub fn children_of(nodes: &[Node], parent_id: NodeID) -> Vec<&Node> {
    nodes
        .iter()
        .filter(|node| node.parent_id == Some(parent_id))
        .collect()
}

/// Progress shown for a node. A parent's own counters are ignored as soon as it
/// has children: it is full when every child is completed.
pub fn display_progress(node: &Node, children: &[&Node]) -> Progress {
    if children.is_empty() {
        return Progress {
            fullness: node.fullness.min(node.max_fullness),
            max_fullness: node.max_fullness,
        };
    }

    Progress {
        fullness: children.iter().filter(|child| child.completed).count() as u32,
        max_fullness: children.len() as u32,
    }
}

/// Only a childless progress node with room left fills up. A parent's own
/// counters are never incremented.
pub fn can_increment(node: &Node, children: &[&Node]) -> bool {
    children.is_empty() && node.kind == NodeKind::Progress && node.fullness < node.max_fullness
}

/// Whether a node may be completed on request. Simple nodes always can. Anything
/// else must already show full progress, or be a childless node without a target.
pub fn can_complete(node: &Node, children: &[&Node]) -> bool {
    node.kind == NodeKind::Simple
        || display_progress(node, children).is_full()
        || (children.is_empty() && node.max_fullness == 0)
}

/// Fills `node_id` by one step within its page's node set.
pub fn increment(nodes: &mut [Node], node_id: NodeID) -> Increment {
    let accepted = match nodes.iter().find(|node| node.id == node_id) {
        Some(node) => can_increment(node, &children_of(nodes, node_id)),
        None => false,
    };

    let node = match nodes.iter_mut().find(|node| node.id == node_id) {
        Some(node) if accepted => node,
        _ => return Increment::Ignored,
    };

    node.fullness = (node.fullness + 1).min(node.max_fullness);

    if node.fullness == node.max_fullness {
        Increment::ReachedCompletion
    } else {
        Increment::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::test_support::node;

    #[test]
    fn fullness_never_exceeds_max_over_many_increments() {
        let mut n = node(1, None);
        n.max_fullness = 3;
        let mut nodes = vec![n];

        let outcomes: Vec<Increment> = (0..10).map(|_| increment(&mut nodes, 1)).collect();

        assert_eq!(nodes[0].fullness, 3);
        assert_eq!(outcomes[0], Increment::Filled);
        assert_eq!(outcomes[1], Increment::Filled);
        assert_eq!(outcomes[2], Increment::ReachedCompletion);
        assert!(outcomes[3..].iter().all(|o| *o == Increment::Ignored));
    }

    #[test]
    fn increment_on_full_node_is_a_no_op() {
        let mut n = node(1, None);
        n.max_fullness = 2;
        n.fullness = 2;
        let mut nodes = vec![n.clone()];

        assert_eq!(increment(&mut nodes, 1), Increment::Ignored);
        assert_eq!(nodes[0], n);
        assert_eq!(increment(&mut nodes, 99), Increment::Ignored);
    }

    #[test]
    fn simple_and_zero_target_nodes_do_not_fill() {
        let mut simple = node(1, None);
        simple.kind = NodeKind::Simple;
        let mut bare = node(2, None);
        bare.max_fullness = 0;
        let mut nodes = vec![simple, bare];

        assert!(!can_increment(&nodes[0], &[]));
        assert_eq!(increment(&mut nodes, 1), Increment::Ignored);
        assert_eq!(nodes[0].fullness, 0);

        assert_eq!(increment(&mut nodes, 2), Increment::Ignored);
        assert_eq!(display_progress(&nodes[1], &[]), Progress { fullness: 0, max_fullness: 0 });
    }

    #[test]
    fn parents_ignore_their_own_counters_when_incremented() {
        let mut parent = node(1, None);
        parent.max_fullness = 2;
        let mut nodes = vec![parent, node(2, Some(1))];

        assert_eq!(increment(&mut nodes, 1), Increment::Ignored);
        assert_eq!(increment(&mut nodes, 1), Increment::Ignored);
        assert_eq!(nodes[0].fullness, 0);

        assert_eq!(increment(&mut nodes, 2), Increment::Filled);
        assert_eq!(nodes[1].fullness, 1);
    }

    #[test]
    fn direct_completion_needs_a_simple_or_full_node() {
        let half = {
            let mut n = node(1, None);
            n.fullness = 2;
            n
        };
        assert!(!can_complete(&half, &[]));

        let mut full = half.clone();
        full.fullness = full.max_fullness;
        assert!(can_complete(&full, &[]));

        let mut simple = node(2, None);
        simple.kind = NodeKind::Simple;
        assert!(can_complete(&simple, &[]));

        let mut bare = node(3, None);
        bare.max_fullness = 0;
        assert!(can_complete(&bare, &[]));

        let mut done = node(4, Some(5));
        done.completed = true;
        let open = node(6, Some(5));
        let parent = node(5, None);
        assert!(!can_complete(&parent, &[&done, &open]));
        assert!(can_complete(&parent, &[&done]));
    }

    #[test]
    fn parent_progress_is_derived_from_children() {
        let mut parent = node(1, None);
        parent.fullness = 4;
        parent.max_fullness = 5;
        let mut a = node(2, Some(1));
        a.completed = true;
        let b = node(3, Some(1));
        let c = node(4, Some(1));

        let progress = display_progress(&parent, &[&a, &b, &c]);

        assert_eq!(progress, Progress { fullness: 1, max_fullness: 3 });
        assert!(!progress.is_full());
    }

    #[test]
    fn leaf_progress_is_clamped() {
        let mut n = node(1, None);
        n.fullness = 9;
        n.max_fullness = 4;

        assert_eq!(display_progress(&n, &[]), Progress { fullness: 4, max_fullness: 4 });
    }

    #[test]
    fn children_of_only_returns_direct_children() {
        let nodes = vec![node(1, None), node(2, Some(1)), node(3, None), node(4, Some(3))];
        let ids: Vec<NodeID> = children_of(&nodes, 1).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2]);
    }
}
