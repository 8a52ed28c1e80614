//! The Sandbox: the entry point transports call.
//!
//! Each operation takes the caller's identity exactly as the authentication
//! layer verified it, looks up that identity's root, and runs one confined
//! file operation against it.
//!
//! ```text
//! identity ──► TenantRegistry ──► TenantRoot ──► TenantFs ──► resolve ──► tokio::fs
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use burrow_types::TreeNode;

use crate::config::Config;
use crate::error::FsError;
use crate::registry::{RegistryError, TenantRegistry};
use crate::vfs::{TenantFs, UploadPolicy};

/// Runtime knobs that apply to every tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxOptions {
    pub uploads: UploadPolicy,
    /// Deadline for a single operation. `None` waits for the filesystem.
    ///
    /// On expiry the caller gets `TimedOut` at once. File content already
    /// handed to the blocking pool still lands whole or not at all, so a
    /// retry sees either the old state or the finished write.
    pub op_timeout: Option<Duration>,
}

/// Multi-tenant front door over the confined filesystem core.
///
/// Cheap to clone; the registry is shared and immutable.
#[derive(Debug, Clone)]
pub struct Sandbox {
    registry: Arc<TenantRegistry>,
    options: SandboxOptions,
}

impl Sandbox {
    pub fn new(registry: Arc<TenantRegistry>, options: SandboxOptions) -> Self {
        Self { registry, options }
    }

    /// Provision every configured tenant and build a sandbox over them.
    pub async fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let registry = config
            .registry_builder()?
            .provision_roots(config.sandbox.create_roots)
            .await?;
        tracing::info!(tenants = registry.len(), "sandbox ready");
        let options = SandboxOptions {
            uploads: config.sandbox.upload_policy(),
            op_timeout: config.sandbox.op_timeout(),
        };
        Ok(Self::new(Arc::new(registry), options))
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub fn options(&self) -> SandboxOptions {
        self.options
    }

    fn tenant(&self, identity: &str) -> Result<TenantFs, FsError> {
        let root = self.registry.root_for(identity)?;
        Ok(TenantFs::new(root.clone()).with_upload_policy(self.options.uploads))
    }

    /// Run `op` for `identity` under the configured deadline, logging
    /// confinement rejections.
    async fn run<T, F, Fut>(&self, op: &'static str, identity: &str, f: F) -> Result<T, FsError>
    where
        F: FnOnce(TenantFs) -> Fut,
        Fut: Future<Output = Result<T, FsError>>,
    {
        let fs = self.tenant(identity)?;
        let result = match self.options.op_timeout {
            Some(limit) => match tokio::time::timeout(limit, f(fs)).await {
                Ok(result) => result,
                Err(_) => Err(FsError::TimedOut(limit)),
            },
            None => f(fs).await,
        };

        match &result {
            Err(err @ FsError::InvalidPath(_)) => {
                tracing::warn!(op, identity, error = %err, "path rejected");
            }
            Err(FsError::TimedOut(limit)) => {
                tracing::warn!(op, identity, ?limit, "operation timed out");
            }
            Err(err) => tracing::debug!(op, identity, error = %err, "operation failed"),
            Ok(_) => {}
        }
        result
    }

    pub async fn get_file(&self, identity: &str, path: &str) -> Result<Vec<u8>, FsError> {
        tracing::debug!(identity, path, "get_file");
        self.run("get_file", identity, |fs| async move { fs.read(path).await })
            .await
    }

    pub async fn put_file(&self, identity: &str, path: &str, data: &[u8]) -> Result<(), FsError> {
        tracing::debug!(identity, path, bytes = data.len(), "put_file");
        self.run("put_file", identity, |fs| async move {
            fs.write(path, data).await
        })
        .await
    }

    pub async fn list_tree(&self, identity: &str, path: &str) -> Result<Vec<TreeNode>, FsError> {
        tracing::debug!(identity, path, "list_tree");
        self.run("list_tree", identity, |fs| async move { fs.list(path).await })
            .await
    }

    pub async fn make_dir(&self, identity: &str, path: &str) -> Result<(), FsError> {
        tracing::debug!(identity, path, "make_dir");
        self.run("make_dir", identity, |fs| async move { fs.mkdir(path).await })
            .await
    }

    pub async fn create_empty(&self, identity: &str, path: &str) -> Result<(), FsError> {
        tracing::debug!(identity, path, "create_empty");
        self.run("create_empty", identity, |fs| async move {
            fs.create_empty(path).await
        })
        .await
    }

    pub async fn rename(&self, identity: &str, from: &str, to: &str) -> Result<(), FsError> {
        tracing::debug!(identity, from, to, "rename");
        self.run("rename", identity, |fs| async move { fs.rename(from, to).await })
            .await
    }

    pub async fn remove(&self, identity: &str, path: &str) -> Result<(), FsError> {
        tracing::debug!(identity, path, "remove");
        self.run("remove", identity, |fs| async move { fs.remove(path).await })
            .await
    }

    pub async fn accept_upload(
        &self,
        identity: &str,
        dir: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<(), FsError> {
        tracing::debug!(identity, dir, filename, bytes = data.len(), "accept_upload");
        self.run("accept_upload", identity, |fs| async move {
            fs.accept_upload(dir, filename, data).await
        })
        .await
    }
}
