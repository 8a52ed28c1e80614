//! burrow-types: pure data types shared by the kernel and its transports.
//!
//! Nothing in here touches the filesystem. The types describe what a
//! client sees: tree nodes for the lazily-expanded directory view, and the
//! stable error taxonomy every operation reports through.

mod error;
mod tree;

pub use error::ErrorKind;
pub use tree::{NodeKind, TreeNode, ROOT_PARENT};
