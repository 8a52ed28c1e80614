//! Confined view of a tenant's directory tree.
//!
//! - **resolve**: maps untrusted relative paths to [`ResolvedPath`]s inside a root
//! - **tree**: one-level listings shaped as [`burrow_types::TreeNode`]s
//! - **local**: [`TenantFs`], the file operations built on both
//!
//! # Design
//!
//! ```text
//! client path ──► resolve ──► ResolvedPath ──► tokio::fs
//!                   │
//!                   └── InvalidPath (no syscall made)
//! ```
//!
//! Nothing below this module accepts a raw path.

mod local;
mod resolve;
mod tree;

pub use local::{TenantFs, UploadPolicy, DEFAULT_MAX_UPLOAD_BYTES};
pub use resolve::{resolve, FileName, ResolvedPath};
pub use tree::{list, project};
