use crate::nodes::data::{ActiveGroup, Node};

use super::model::{children_of, display_progress};

fn find<'a>(nodes: &'a [Node], id: i64) -> Option<&'a Node> {
    nodes.iter().find(|node| node.id == id)
}

/// Anything not completed, plus completed children whose parent is still active.
pub fn is_active(node: &Node, nodes: &[Node]) -> bool {
    if !node.completed {
        return true;
    }

    match node.parent_id {
        Some(parent_id) => find(nodes, parent_id).map_or(false, |parent| !parent.completed),
        None => false,
    }
}

pub fn active_list(nodes: &[Node]) -> Vec<&Node> {
    nodes.iter().filter(|node| is_active(node, nodes)).collect()
}

/// Completed nodes, most recently completed first. Missing timestamps sort last.
pub fn completed_list(nodes: &[Node]) -> Vec<&Node> {
    let mut completed: Vec<&Node> = nodes.iter().filter(|node| node.completed).collect();
    completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    completed
}

fn by_position(a: &&Node, b: &&Node) -> std::cmp::Ordering {
    a.position.cmp(&b.position).then(a.id.cmp(&b.id))
}

/// Builds the nested active view. A child whose parent no longer exists is
/// rendered at the top level; children of a completed parent are hidden with it.
pub fn group_active(nodes: &[Node]) -> Vec<ActiveGroup> {
    let mut top_level: Vec<&Node> = nodes
        .iter()
        .filter(|node| match node.parent_id {
            Some(parent_id) => find(nodes, parent_id).is_none(),
            None => true,
        })
        .filter(|node| !node.completed)
        .collect();
    top_level.sort_by(by_position);

    top_level
        .into_iter()
        .map(|node| {
            let mut children = children_of(nodes, node.id);
            children.sort_by(by_position);

            ActiveGroup {
                node: node.clone(),
                progress: display_progress(node, &children),
                children: children
                    .into_iter()
                    .filter(|child| is_active(child, nodes))
                    .cloned()
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::model::Progress;
    use crate::progress::test_support::{at, node};

    fn ids(nodes: &[&Node]) -> Vec<i64> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn completed_top_level_node_is_hidden() {
        let mut nodes = vec![node(1, None), node(2, None)];
        nodes[0].completed = true;

        assert_eq!(ids(&active_list(&nodes)), vec![2]);
    }

    #[test]
    fn completed_child_stays_visible_under_active_parent() {
        let mut nodes = vec![node(1, None), node(2, Some(1)), node(3, Some(1))];
        nodes[1].completed = true;

        assert_eq!(ids(&active_list(&nodes)), vec![1, 2, 3]);

        nodes[0].completed = true;
        assert_eq!(ids(&active_list(&nodes)), vec![3]);
        assert!(group_active(&nodes).is_empty());
    }

    #[test]
    fn completed_list_orders_newest_first_and_missing_last() {
        let mut nodes = vec![node(1, None), node(2, None), node(3, None), node(4, None)];
        nodes[0].completed = true;
        nodes[0].completed_at = Some(at(100));
        nodes[1].completed = true;
        nodes[1].completed_at = None;
        nodes[2].completed = true;
        nodes[2].completed_at = Some(at(200));

        assert_eq!(ids(&completed_list(&nodes)), vec![3, 1, 2]);
    }

    #[test]
    fn groups_follow_position_order() {
        let mut nodes = vec![
            node(1, None),
            node(2, None),
            node(3, Some(2)),
            node(4, Some(2)),
        ];
        nodes[0].position = 1;
        nodes[1].position = 0;
        nodes[2].position = 1;
        nodes[3].position = 0;
        nodes[3].completed = true;

        let groups = group_active(&nodes);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].node.id, 2);
        assert_eq!(groups[0].children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(groups[0].progress, Progress { fullness: 1, max_fullness: 2 });
        assert_eq!(groups[1].node.id, 1);
        assert!(groups[1].children.is_empty());
    }

    #[test]
    fn orphaned_child_is_rendered_at_top_level() {
        let nodes = vec![node(5, Some(404))];

        let groups = group_active(&nodes);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].node.id, 5);
    }
}
