//! Tree view records.

use serde::{Deserialize, Serialize};

/// Parent id used for entries directly under a tenant's root.
pub const ROOT_PARENT: &str = "#";

/// Whether a node can be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

/// One entry of a one-level directory listing.
///
/// `id` is the entry's normalized root-relative path and is unique within a
/// tenant's view. `parent` is the id of the listed directory, or
/// [`ROOT_PARENT`] when the listing was of the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub parent: String,
    pub label: String,
    pub is_container: bool,
    pub kind: NodeKind,
}

impl TreeNode {
    /// Build a node for `label` inside the directory whose id is `parent_id`.
    ///
    /// An empty `parent_id` means the tenant root.
    pub fn child_of(parent_id: &str, label: impl Into<String>, kind: NodeKind) -> Self {
        let label = label.into();
        let (id, parent) = if parent_id.is_empty() {
            (label.clone(), ROOT_PARENT.to_string())
        } else {
            (format!("{parent_id}/{label}"), parent_id.to_string())
        };
        Self {
            id,
            parent,
            label,
            is_container: kind.is_container(),
            kind,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent == ROOT_PARENT
    }
}
