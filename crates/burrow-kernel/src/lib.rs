//! burrow-kernel: the confined filesystem core of burrow.
//!
//! This crate provides:
//!
//! - **Registry**: identity → sandbox root, fixed at startup
//! - **VFS**: path confinement, one-level tree projection, file operations
//! - **Sandbox**: the per-request entry point transports call
//! - **Config**: TOML configuration and XDG paths
//!
//! Authentication is not done here. Callers pass an identity that has
//! already been verified; the kernel only decides which directory that
//! identity may touch and keeps every path inside it.

pub mod config;
pub mod error;
pub mod paths;
pub mod registry;
pub mod sandbox;
pub mod vfs;

pub use burrow_types::{ErrorKind, NodeKind, TreeNode};
pub use config::{Config, ConfigError, SandboxConfig};
pub use error::FsError;
pub use registry::{RegistryBuilder, RegistryError, TenantRegistry, TenantRoot};
pub use sandbox::{Sandbox, SandboxOptions};
