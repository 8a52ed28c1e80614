//! One-level directory projection for lazily expanded tree views.

use burrow_types::{NodeKind, TreeNode};
use tokio::fs;

use super::local::STAGING_PREFIX;
use super::resolve::{resolve, ResolvedPath};
use crate::error::FsError;
use crate::registry::TenantRoot;

/// List the immediate children of `relative` under `root` as tree nodes.
pub async fn list(root: &TenantRoot, relative: &str) -> Result<Vec<TreeNode>, FsError> {
    let dir = resolve(root, relative)?;
    project(&dir).await
}

/// Enumerate `dir` one level deep, sorted by name.
///
/// Entries are classified by their own file type, so a symlink is never
/// followed and shows up as a plain file. Any enumeration error fails the
/// whole listing. Uploads still in flight are left out.
pub async fn project(dir: &ResolvedPath) -> Result<Vec<TreeNode>, FsError> {
    let path = dir.to_string();
    let meta = fs::metadata(dir.as_path())
        .await
        .map_err(|e| FsError::from_io(e, &path))?;
    if !meta.is_dir() {
        return Err(FsError::NotADirectory(path));
    }

    let mut reader = fs::read_dir(dir.as_path())
        .await
        .map_err(|e| FsError::from_io(e, &path))?;

    let mut nodes = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| FsError::from_io(e, &path))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| FsError::from_io(e, &path))?;

        // A node id has to round-trip through a string path.
        let label = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                tracing::warn!(dir = %path, name = ?raw, "skipping entry with non-UTF-8 name");
                continue;
            }
        };
        if label.starts_with(STAGING_PREFIX) {
            continue;
        }

        let kind = if file_type.is_dir() {
            NodeKind::Folder
        } else {
            NodeKind::File
        };
        nodes.push(TreeNode::child_of(dir.relative(), label, kind));
    }

    nodes.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(nodes)
}
