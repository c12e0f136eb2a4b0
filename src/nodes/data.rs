use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pages::data::PageID;
use crate::progress::Progress;

pub type NodeID = i64;

pub const DEFAULT_MAX_FULLNESS: u32 = 5;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Fill bar, incremented one click at a time.
    #[default]
    Progress,
    /// Checklist item, completed by an explicit action.
    Simple,
}

impl NodeKind {
    /// Older rows carry "bar" or "revision" for fillable nodes. Anything
    /// unrecognised is read back as a progress node.
    pub fn from_stored(value: &str) -> NodeKind {
        match value {
            "simple" => NodeKind::Simple,
            _ => NodeKind::Progress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Progress => "progress",
            NodeKind::Simple => "simple",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeID,
    pub page_id: PageID,
    pub parent_id: Option<NodeID>,
    pub title: String,
    pub content: Option<String>,
    pub fullness: u32,
    pub max_fullness: u32,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub pinned: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Fields for a node about to be inserted. Storage assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub page_id: PageID,
    pub parent_id: Option<NodeID>,
    pub title: String,
    pub content: Option<String>,
    pub max_fullness: u32,
    pub kind: NodeKind,
    pub position: i64,
}

/// Partial update of a stored node; `None` leaves the column alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: Option<Option<String>>,
    pub fullness: Option<u32>,
    pub max_fullness: Option<u32>,
    pub kind: Option<NodeKind>,
    pub pinned: Option<bool>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl NodePatch {
    /// Patch that overwrites every mutable field with the node's current values.
    pub fn from_node(node: &Node) -> NodePatch {
        NodePatch {
            title: Some(node.title.clone()),
            content: Some(node.content.clone()),
            fullness: Some(node.fullness),
            max_fullness: Some(node.max_fullness),
            kind: Some(node.kind),
            pinned: Some(node.pinned),
            completed: Some(node.completed),
            completed_at: Some(node.completed_at),
        }
    }

    /// Applies the patch in memory, clamping fullness to the (possibly new) maximum.
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(title) = &self.title {
            node.title = title.clone();
        }
        if let Some(content) = &self.content {
            node.content = content.clone();
        }
        if let Some(max_fullness) = self.max_fullness {
            node.max_fullness = max_fullness;
        }
        if let Some(fullness) = self.fullness {
            node.fullness = fullness;
        }
        node.fullness = node.fullness.min(node.max_fullness);
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(pinned) = self.pinned {
            node.pinned = pinned;
        }
        if let Some(completed) = self.completed {
            node.completed = completed;
        }
        if let Some(completed_at) = self.completed_at {
            node.completed_at = completed_at;
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddNodeRequest {
    pub page_id: PageID,
    pub title: String,
    pub parent_id: Option<NodeID>,
    pub content: Option<String>,
    pub max_fullness: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<NodeKind>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddNodeResult {
    pub node_id: NodeID,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    pub node_id: NodeID,
    pub title: Option<String>,
    pub content: Option<String>,
    pub fullness: Option<u32>,
    pub max_fullness: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<NodeKind>,
    pub pinned: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdRequest {
    pub node_id: NodeID,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReorderNodesRequest {
    pub node_ids: Vec<NodeID>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangedNodes {
    pub nodes: Vec<Node>,
}

/// A top-level node as rendered in the active view, with its children nested beneath it.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGroup {
    pub node: Node,
    pub progress: Progress,
    pub children: Vec<Node>,
}
