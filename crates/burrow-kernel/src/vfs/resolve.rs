//! Path confinement.
//!
//! Every path a client sends is untrusted. [`resolve`] is the only way to
//! obtain a [`ResolvedPath`], and every filesystem call in the kernel takes
//! one, so an unconfined path cannot reach the filesystem at all.
//!
//! Resolution is purely lexical: the relative path is joined under the
//! tenant root, `.`/`..`/repeated separators are folded, and the result is
//! accepted only if it is the root or lies beneath it component-wise. A
//! leading `/` does not make the path absolute; it is still joined under the
//! root.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{reason, FsError};
use crate::registry::TenantRoot;

/// An absolute path proven to lie inside a tenant root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    /// Host path, for handing to the filesystem.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Normalized root-relative form, `/`-separated. Empty for the root.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Extend by one validated segment. Confinement is preserved because a
    /// [`FileName`] can neither climb nor contain a separator.
    pub fn join(&self, name: &FileName) -> ResolvedPath {
        let relative = if self.relative.is_empty() {
            name.0.clone()
        } else {
            format!("{}/{}", self.relative, name.0)
        };
        ResolvedPath {
            absolute: self.absolute.join(&name.0),
            relative,
        }
    }

    /// Whether `other` lies strictly beneath this path.
    pub fn is_ancestor_of(&self, other: &ResolvedPath) -> bool {
        other.absolute != self.absolute && other.absolute.starts_with(&self.absolute)
    }
}

/// Client-facing rendering: the relative path, or `/` for the root.
impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative.is_empty() {
            f.write_str("/")
        } else {
            f.write_str(&self.relative)
        }
    }
}

/// Confine `relative` under `root`.
///
/// Never touches the filesystem. Fails with [`FsError::InvalidPath`] if the
/// normalized path leaves the root or the input contains a NUL byte.
pub fn resolve(root: &TenantRoot, relative: &str) -> Result<ResolvedPath, FsError> {
    if relative.contains('\0') {
        return Err(FsError::InvalidPath(reason::MALFORMED));
    }

    let mut absolute = root.as_path().to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            // No absolute overrides: a leading `/` or drive prefix is dropped.
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                absolute.pop();
            }
            Component::Normal(segment) => absolute.push(segment),
        }
    }

    if !root.contains(&absolute) {
        return Err(FsError::InvalidPath(reason::ESCAPES_ROOT));
    }

    let relative = absolute
        .strip_prefix(root.as_path())
        .map_err(|_| FsError::InvalidPath(reason::ESCAPES_ROOT))?
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    Ok(ResolvedPath { absolute, relative })
}

/// A single path segment taken from untrusted metadata, such as the name of
/// an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName(String);

impl FileName {
    /// Accept `name` only if it is exactly one normal segment.
    pub fn parse(name: &str) -> Result<Self, FsError> {
        if name.is_empty() || name.contains(['/', '\\', '\0']) {
            return Err(FsError::InvalidPath(reason::BAD_FILE_NAME));
        }
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) if segment == name => {
                Ok(Self(name.to_string()))
            }
            _ => Err(FsError::InvalidPath(reason::BAD_FILE_NAME)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
