//! Tenant root registry.
//!
//! Maps an authenticated identity to the one directory that identity may
//! touch. The registry is assembled once at startup through
//! [`RegistryBuilder`] and is immutable afterwards; there is no way to add,
//! move or drop a tenant from a running process.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::error::FsError;

/// Problems found while registering tenants.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tenant identity must not be empty")]
    EmptyIdentity,

    #[error("identity {0:?} cannot be used as a directory name under base_dir")]
    UnsafeIdentity(String),

    #[error("`provision` lists {0:?} but no base_dir is configured")]
    NoBaseDir(String),

    #[error("root for {identity:?} must be an absolute path, got {}", root.display())]
    RelativeRoot { identity: String, root: PathBuf },

    #[error("tenant {0:?} is registered more than once")]
    Duplicate(String),

    #[error("roots of {first:?} and {second:?} overlap")]
    Overlapping { first: String, second: String },

    #[error("failed to provision root for {identity:?} at {}: {source}", root.display())]
    Provision {
        identity: String,
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Absolute, lexically normalized directory that bounds one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantRoot(PathBuf);

impl TenantRoot {
    /// Accept `path` as a root. It must be absolute; `.` and `..` are folded
    /// away without consulting the filesystem.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return None;
        }
        Some(Self(normalize(path)))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// True when `path` is this root or lies beneath it.
    ///
    /// The comparison is per component, so `/srv/alice-evil` is not inside
    /// `/srv/alice`.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.0)
    }

    /// True when either root contains the other.
    pub fn overlaps(&self, other: &TenantRoot) -> bool {
        self.contains(&other.0) || other.contains(&self.0)
    }
}

/// Lexical normalization of an absolute path. `..` at `/` stays at `/`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component)
            }
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
        }
    }
    out
}

/// Identity → root lookup table.
#[derive(Debug, Default)]
pub struct TenantRegistry {
    roots: HashMap<String, TenantRoot>,
}

impl TenantRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Root for an authenticated identity.
    ///
    /// A miss means the identity was authenticated but never provisioned,
    /// which is a deployment bug rather than a client error.
    pub fn root_for(&self, identity: &str) -> Result<&TenantRoot, FsError> {
        self.roots.get(identity).ok_or_else(|| {
            tracing::error!(identity, "authenticated identity has no provisioned root");
            FsError::Unprovisioned(identity.to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.roots.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Collects tenants before freezing them into a [`TenantRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<(String, PathBuf)>,
    base_dir: Option<PathBuf>,
}

impl RegistryBuilder {
    /// Directory under which [`provision`](Self::provision) places
    /// `<base_dir>/<identity>` roots.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Register `identity` with an explicit root.
    pub fn tenant(mut self, identity: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.entries.push((identity.into(), root.into()));
        self
    }

    /// Register `identity` with a root derived from the base directory.
    pub fn provision(mut self, identity: impl Into<String>) -> Result<Self, RegistryError> {
        let identity = identity.into();
        let base = self
            .base_dir
            .clone()
            .ok_or_else(|| RegistryError::NoBaseDir(identity.clone()))?;
        if !is_single_segment(&identity) {
            return Err(RegistryError::UnsafeIdentity(identity));
        }
        let root = base.join(&identity);
        self.entries.push((identity, root));
        Ok(self)
    }

    /// Validate and freeze without touching the filesystem.
    pub fn build(self) -> Result<TenantRegistry, RegistryError> {
        let mut roots = HashMap::new();
        for (identity, root) in validate(self.entries)? {
            tracing::info!(identity = %identity, root = %root.as_path().display(), "registered tenant");
            roots.insert(identity, root);
        }
        Ok(TenantRegistry { roots })
    }

    /// Create missing roots (when `create` is set), canonicalize each one,
    /// then validate and freeze.
    ///
    /// Canonicalizing here, once, means a root reached through a symlinked
    /// ancestor (such as `/tmp` on some hosts) compares correctly with the
    /// paths resolved beneath it. The lexical roots are validated before
    /// anything is created, and the canonical ones again afterwards.
    pub async fn provision_roots(self, create: bool) -> Result<TenantRegistry, RegistryError> {
        validate(self.entries.clone())?;

        let mut canonical = Vec::with_capacity(self.entries.len());
        for (identity, path) in self.entries {
            if create {
                if let Err(source) = fs::create_dir_all(&path).await {
                    return Err(RegistryError::Provision {
                        identity,
                        root: path,
                        source,
                    });
                }
            }
            match fs::canonicalize(&path).await {
                Ok(real) => canonical.push((identity, real)),
                Err(source) => {
                    return Err(RegistryError::Provision {
                        identity,
                        root: path,
                        source,
                    });
                }
            }
        }
        RegistryBuilder {
            entries: canonical,
            base_dir: self.base_dir,
        }
        .build()
    }
}

/// Registration rules shared by [`RegistryBuilder::build`] and
/// [`RegistryBuilder::provision_roots`].
fn validate(entries: Vec<(String, PathBuf)>) -> Result<Vec<(String, TenantRoot)>, RegistryError> {
    let mut accepted: Vec<(String, TenantRoot)> = Vec::with_capacity(entries.len());
    for (identity, path) in entries {
        if identity.is_empty() {
            return Err(RegistryError::EmptyIdentity);
        }
        let root = TenantRoot::new(&path).ok_or_else(|| RegistryError::RelativeRoot {
            identity: identity.clone(),
            root: path.clone(),
        })?;
        if accepted.iter().any(|(id, _)| *id == identity) {
            return Err(RegistryError::Duplicate(identity));
        }
        if let Some((other, _)) = accepted.iter().find(|(_, r)| r.overlaps(&root)) {
            return Err(RegistryError::Overlapping {
                first: other.clone(),
                second: identity,
            });
        }
        accepted.push((identity, root));
    }
    Ok(accepted)
}

fn is_single_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == name
    ) && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_must_be_absolute() {
        assert!(TenantRoot::new("relative/dir").is_none());
        assert!(TenantRoot::new("/srv/alice").is_some());
    }

    #[test]
    fn root_is_normalized() {
        let root = TenantRoot::new("/srv/./tenants/../alice/").unwrap();
        assert_eq!(root.as_path(), Path::new("/srv/alice"));
    }

    #[test]
    fn contains_is_boundary_safe() {
        let root = TenantRoot::new("/home/alice").unwrap();
        assert!(root.contains(Path::new("/home/alice")));
        assert!(root.contains(Path::new("/home/alice/notes.txt")));
        assert!(!root.contains(Path::new("/home/alice-evil")));
        assert!(!root.contains(Path::new("/home/alice-evil/notes.txt")));
        assert!(!root.contains(Path::new("/home")));
    }

    #[test]
    fn lookup_returns_registered_root() {
        let registry = TenantRegistry::builder()
            .tenant("alice", "/srv/alice")
            .tenant("bob", "/srv/bob")
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.root_for("alice").unwrap().as_path(),
            Path::new("/srv/alice")
        );
        assert_eq!(registry.identities(), vec!["alice", "bob"]);
    }

    #[test]
    fn lookup_miss_is_unprovisioned() {
        let registry = TenantRegistry::builder()
            .tenant("alice", "/srv/alice")
            .build()
            .unwrap();
        let err = registry.root_for("mallory").unwrap_err();
        assert!(matches!(err, FsError::Unprovisioned(id) if id == "mallory"));
    }

    #[test]
    fn sibling_prefix_roots_do_not_overlap() {
        let registry = TenantRegistry::builder()
            .tenant("alice", "/home/alice")
            .tenant("alice-evil", "/home/alice-evil")
            .build();
        assert!(registry.is_ok());
    }

    #[test]
    fn nested_roots_are_rejected() {
        let result = TenantRegistry::builder()
            .tenant("alice", "/srv/alice")
            .tenant("bob", "/srv/alice/bob")
            .build();
        assert!(matches!(result, Err(RegistryError::Overlapping { .. })));

        let result = TenantRegistry::builder()
            .tenant("bob", "/srv/alice/bob")
            .tenant("alice", "/srv/alice")
            .build();
        assert!(matches!(result, Err(RegistryError::Overlapping { .. })));
    }

    #[test]
    fn equal_roots_are_rejected() {
        let result = TenantRegistry::builder()
            .tenant("alice", "/srv/shared")
            .tenant("bob", "/srv/shared/")
            .build();
        assert!(matches!(result, Err(RegistryError::Overlapping { .. })));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let result = TenantRegistry::builder()
            .tenant("alice", "/srv/a")
            .tenant("alice", "/srv/b")
            .build();
        assert!(matches!(result, Err(RegistryError::Duplicate(id)) if id == "alice"));
    }

    #[test]
    fn empty_identity_is_rejected() {
        let result = TenantRegistry::builder().tenant("", "/srv/a").build();
        assert!(matches!(result, Err(RegistryError::EmptyIdentity)));
    }

    #[test]
    fn provision_derives_root_from_base_dir() {
        let registry = TenantRegistry::builder()
            .base_dir("/srv/burrow")
            .provision("alice")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            registry.root_for("alice").unwrap().as_path(),
            Path::new("/srv/burrow/alice")
        );
    }

    #[test]
    fn provision_rejects_unsafe_identities() {
        for identity in ["..", ".", "a/b", "a\\b", "/abs"] {
            let result = TenantRegistry::builder()
                .base_dir("/srv/burrow")
                .provision(identity);
            assert!(
                matches!(result, Err(RegistryError::UnsafeIdentity(_))),
                "{identity:?} should be rejected"
            );
        }
    }

    #[test]
    fn provision_without_base_dir_fails() {
        let result = TenantRegistry::builder().provision("alice");
        assert!(matches!(result, Err(RegistryError::NoBaseDir(_))));
    }

    #[tokio::test]
    async fn provision_roots_creates_and_canonicalizes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TenantRegistry::builder()
            .base_dir(dir.path())
            .provision("alice")
            .unwrap()
            .provision_roots(true)
            .await
            .unwrap();

        let root = registry.root_for("alice").unwrap();
        assert!(root.as_path().is_dir());
        assert_eq!(
            root.as_path(),
            dir.path().join("alice").canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn rejected_provisioning_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let result = TenantRegistry::builder()
            .tenant("alice", dir.path().join("alice"))
            .tenant("bob", dir.path().join("alice/bob"))
            .provision_roots(true)
            .await;
        assert!(matches!(result, Err(RegistryError::Overlapping { .. })));
        assert!(!dir.path().join("alice").exists());

        let result = TenantRegistry::builder()
            .tenant("carol", dir.path().join("carol"))
            .tenant("carol", dir.path().join("elsewhere"))
            .provision_roots(true)
            .await;
        assert!(matches!(result, Err(RegistryError::Duplicate(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn provision_roots_requires_existing_root_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let result = TenantRegistry::builder()
            .tenant("alice", dir.path().join("missing"))
            .provision_roots(false)
            .await;
        assert!(matches!(result, Err(RegistryError::Provision { .. })));
    }
}
