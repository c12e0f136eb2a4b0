//! Fill state, completion rules, view partitioning and sibling ordering for
//! nodes. Everything here works on in-memory slices; persistence is the
//! caller's job.

pub mod cascade;
pub mod ledger;
pub mod model;
pub mod view;

pub use ledger::{Direction, PositionAssignment, Positioned};
pub use model::{Increment, Progress};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::nodes::data::{Node, NodeID, NodeKind};

    pub fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    pub fn node(id: NodeID, parent_id: Option<NodeID>) -> Node {
        Node {
            id,
            page_id: 1,
            parent_id,
            title: format!("node {}", id),
            content: None,
            fullness: 0,
            max_fullness: 5,
            kind: NodeKind::Progress,
            pinned: false,
            completed: false,
            completed_at: None,
            position: 0,
            created_at: at(0),
            updated_at: at(0),
        }
    }
}
