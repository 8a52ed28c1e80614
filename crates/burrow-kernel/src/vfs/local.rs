//! Tenant-confined local filesystem operations.
//!
//! Every operation resolves all of its path arguments before the first
//! syscall, so a rejected path never reaches the filesystem, not even for a
//! read-only probe.
//!
//! File content is staged in a hidden sibling and moved into place in one
//! step on the blocking pool. Dropping the calling future (a deadline, a
//! disconnected client) cannot stop that step halfway, so a target is
//! either untouched or holds the whole payload.

use std::fs::Metadata;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use burrow_types::TreeNode;
use tokio::fs::{self, OpenOptions};

use super::resolve::{resolve, FileName, ResolvedPath};
use super::tree;
use crate::error::{reason, FsError};
use crate::registry::TenantRoot;

/// Default cap on a single upload (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// How uploads land on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Largest accepted payload, in bytes.
    pub max_bytes: u64,
    /// Replace an existing file instead of failing with `AlreadyExists`.
    pub allow_overwrite: bool,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allow_overwrite: false,
        }
    }
}

/// File operations for one tenant.
///
/// All paths are relative to the tenant root. For example, if the root is
/// `/srv/burrow/alice`, then `read("docs/a.txt")` reads
/// `/srv/burrow/alice/docs/a.txt`.
#[derive(Debug, Clone)]
pub struct TenantFs {
    root: TenantRoot,
    uploads: UploadPolicy,
}

impl TenantFs {
    pub fn new(root: TenantRoot) -> Self {
        Self {
            root,
            uploads: UploadPolicy::default(),
        }
    }

    pub fn with_upload_policy(mut self, uploads: UploadPolicy) -> Self {
        self.uploads = uploads;
        self
    }

    pub fn root(&self) -> &TenantRoot {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<ResolvedPath, FsError> {
        resolve(&self.root, relative)
    }

    /// Read a whole file.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let target = self.resolve(path)?;
        let meta = fs::metadata(target.as_path())
            .await
            .map_err(|e| io_err(e, &target))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory(target.to_string()));
        }
        fs::read(target.as_path())
            .await
            .map_err(|e| io_err(e, &target))
    }

    /// Create or overwrite a file. Parent directories are never created.
    ///
    /// The new content replaces the old in a single rename.
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        if let Some(meta) = probe(&target).await? {
            if meta.is_dir() {
                return Err(FsError::IsADirectory(target.to_string()));
            }
        }
        land(&target, data, Landing::Replace).await
    }

    /// Create a single directory level.
    pub async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        fs::create_dir(target.as_path())
            .await
            .map_err(|e| parent_err(e, &target))
    }

    /// Exclusive create of an empty file. Never truncates.
    pub async fn create_empty(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        create_new(&target).await.map(drop)
    }

    /// Rename `from` to `to`, refusing to replace an existing destination.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let source = self.resolve(from)?;
        let dest = self.resolve(to)?;

        if source.is_root() || dest.is_root() {
            return Err(FsError::InvalidPath(reason::ROOT_IMMUTABLE));
        }
        if probe(&source).await?.is_none() {
            return Err(FsError::NotFound(source.to_string()));
        }
        if probe(&dest).await?.is_some() {
            return Err(FsError::AlreadyExists(dest.to_string()));
        }
        if source.is_ancestor_of(&dest) {
            return Err(FsError::InvalidPath(reason::INTO_ITSELF));
        }

        fs::rename(source.as_path(), dest.as_path())
            .await
            .map_err(|e| parent_err(e, &dest))
    }

    /// Remove a file or an empty directory.
    pub async fn remove(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        if target.is_root() {
            return Err(FsError::InvalidPath(reason::ROOT_IMMUTABLE));
        }
        let meta = probe(&target)
            .await?
            .ok_or_else(|| FsError::NotFound(target.to_string()))?;

        let result = if meta.is_dir() {
            fs::remove_dir(target.as_path()).await
        } else {
            fs::remove_file(target.as_path()).await
        };
        result.map_err(|e| io_err(e, &target))
    }

    /// List one directory level as tree nodes.
    pub async fn list(&self, path: &str) -> Result<Vec<TreeNode>, FsError> {
        let dir = self.resolve(path)?;
        tree::project(&dir).await
    }

    /// Land an uploaded file named `filename` inside directory `dir`.
    ///
    /// `filename` comes from client metadata and must be a single segment;
    /// it is checked before anything else happens.
    pub async fn accept_upload(
        &self,
        dir: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<(), FsError> {
        let dir = self.resolve(dir)?;
        let name = FileName::parse(filename)?;

        let size = data.len() as u64;
        if size > self.uploads.max_bytes {
            return Err(FsError::TooLarge {
                size,
                limit: self.uploads.max_bytes,
            });
        }

        match probe(&dir).await? {
            None => return Err(FsError::NotFound(dir.to_string())),
            Some(meta) if !meta.is_dir() => return Err(FsError::NotADirectory(dir.to_string())),
            Some(_) => {}
        }

        let target = dir.join(&name);
        match probe(&target).await? {
            Some(meta) if meta.is_dir() => Err(FsError::IsADirectory(target.to_string())),
            _ if self.uploads.allow_overwrite => land(&target, data, Landing::Replace).await,
            Some(_) => Err(FsError::AlreadyExists(target.to_string())),
            None => land(&target, data, Landing::Exclusive).await,
        }
    }
}

/// How a staged payload takes the target's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landing {
    /// Fail with `AlreadyExists` if the target appeared meanwhile.
    Exclusive,
    /// Atomically replace whatever file is there.
    Replace,
}

/// Name prefix of in-flight payloads. Listings leave them out.
pub(crate) const STAGING_PREFIX: &str = ".burrow-staging-";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Hidden name in the target's directory for an in-flight payload.
fn staging_path(target: &Path) -> PathBuf {
    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!("{STAGING_PREFIX}{}-{seq}", std::process::id()))
}

/// Stage `data` next to `target` and move it into place, on the blocking
/// pool so the whole sequence runs to completion once started.
async fn land(target: &ResolvedPath, data: &[u8], mode: Landing) -> Result<(), FsError> {
    let path = target.as_path().to_path_buf();
    let data = data.to_vec();
    match tokio::task::spawn_blocking(move || land_blocking(&path, &data, mode)).await {
        Ok(result) => result.map_err(|e| parent_err(e, target)),
        Err(join) => Err(FsError::Io {
            path: target.to_string(),
            source: io::Error::other(join),
        }),
    }
}

fn land_blocking(target: &Path, data: &[u8], mode: Landing) -> io::Result<()> {
    let staging = staging_path(target);
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staging)?;
    let written = file.write_all(data).and_then(|()| file.flush());
    drop(file);

    let result = written.and_then(|()| match mode {
        Landing::Exclusive => std::fs::hard_link(&staging, target),
        Landing::Replace => std::fs::rename(&staging, target),
    });
    // A successful rename consumed the staging name; every other outcome
    // leaves it behind.
    if result.is_err() || mode == Landing::Exclusive {
        // Explicitly ignored: the landing error is the one worth reporting
        let _ = std::fs::remove_file(&staging);
    }
    result
}

/// `symlink_metadata`, with a missing entry as `None`. An entry "under" a
/// regular file is missing too.
async fn probe(target: &ResolvedPath) -> Result<Option<Metadata>, FsError> {
    match fs::symlink_metadata(target.as_path()).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(e) => Err(io_err(e, target)),
    }
}

async fn create_new(target: &ResolvedPath) -> Result<fs::File, FsError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target.as_path())
        .await
        .map_err(|e| parent_err(e, target))
}

fn io_err(err: io::Error, target: &ResolvedPath) -> FsError {
    FsError::from_io(err, &target.to_string())
}

/// For calls that create `target`: a missing or non-directory ancestor is a
/// bad path, not a missing target.
fn parent_err(err: io::Error, target: &ResolvedPath) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
            FsError::InvalidPath(reason::MISSING_PARENT)
        }
        _ => io_err(err, target),
    }
}
