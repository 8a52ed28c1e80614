//! Configuration file loading.
//!
//! ```toml
//! [sandbox]
//! base_dir = "/srv/burrow"
//! provision = ["alice", "bob"]
//! create_roots = true
//! max_upload_bytes = 16777216
//! allow_upload_overwrite = false
//! op_timeout_ms = 30000
//!
//! [tenants]
//! carol = "/data/carol"
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::paths;
use crate::registry::{RegistryBuilder, RegistryError, TenantRegistry};
use crate::vfs::{UploadPolicy, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sandbox: SandboxConfig,
    /// Explicit identity → root assignments.
    pub tenants: BTreeMap<String, PathBuf>,
}

/// `[sandbox]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    /// Parent of `provision`ed roots. Defaults to `$XDG_DATA_HOME/burrow/tenants`.
    pub base_dir: Option<PathBuf>,
    /// Identities whose root is `<base_dir>/<identity>`.
    pub provision: Vec<String>,
    /// Create missing roots at startup.
    pub create_roots: bool,
    pub max_upload_bytes: u64,
    pub allow_upload_overwrite: bool,
    /// Per-operation deadline; unset means no deadline.
    pub op_timeout_ms: Option<u64>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            provision: Vec::new(),
            create_roots: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allow_upload_overwrite: false,
            op_timeout_ms: None,
        }
    }
}

impl SandboxConfig {
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.max_upload_bytes,
            allow_overwrite: self.allow_upload_overwrite,
        }
    }

    pub fn op_timeout(&self) -> Option<Duration> {
        self.op_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (paths::config_file(), false),
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        Self::from_toml(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Registry builder holding every configured tenant.
    pub fn registry_builder(&self) -> Result<RegistryBuilder, RegistryError> {
        let base = self
            .sandbox
            .base_dir
            .clone()
            .unwrap_or_else(paths::tenants_dir);

        let mut builder = TenantRegistry::builder().base_dir(base);
        for identity in &self.sandbox.provision {
            builder = builder.provision(identity.clone())?;
        }
        for (identity, root) in &self.tenants {
            builder = builder.tenant(identity.clone(), root.clone());
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.sandbox.create_roots);
        assert_eq!(config.sandbox.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.sandbox.op_timeout(), None);
    }

    #[test]
    fn full_document_parses() {
        let config = Config::from_toml(
            r#"
            [sandbox]
            base_dir = "/srv/burrow"
            provision = ["alice", "bob"]
            create_roots = false
            max_upload_bytes = 1024
            allow_upload_overwrite = true
            op_timeout_ms = 2500

            [tenants]
            carol = "/data/carol"
            "#,
        )
        .unwrap();

        assert_eq!(config.sandbox.base_dir, Some(PathBuf::from("/srv/burrow")));
        assert_eq!(config.sandbox.provision, vec!["alice", "bob"]);
        assert!(!config.sandbox.create_roots);
        assert_eq!(
            config.sandbox.upload_policy(),
            UploadPolicy {
                max_bytes: 1024,
                allow_overwrite: true
            }
        );
        assert_eq!(
            config.sandbox.op_timeout(),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(config.tenants["carol"], PathBuf::from("/data/carol"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[sandbox]\nbase_directory = \"/x\"").is_err());
        assert!(Config::from_toml("[server]\nport = 1").is_err());
    }

    #[test]
    fn registry_builder_combines_provisioned_and_explicit() {
        let config = Config::from_toml(
            r#"
            [sandbox]
            base_dir = "/srv/burrow"
            provision = ["alice"]

            [tenants]
            carol = "/data/carol"
            "#,
        )
        .unwrap();

        let registry = config.registry_builder().unwrap().build().unwrap();
        assert_eq!(registry.identities(), vec!["alice", "carol"]);
        assert_eq!(
            registry.root_for("alice").unwrap().as_path(),
            Path::new("/srv/burrow/alice")
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "[tenants]\nalice = \"/srv/alice\"\n").unwrap();
        let config = Config::load(Some(&file)).unwrap();
        assert_eq!(config.tenants.len(), 1);
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "[sandbox\n").unwrap();
        let err = Config::load(Some(&file)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
