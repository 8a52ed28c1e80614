//! Server configuration: who we serve, and the sandbox they live in.

use std::path::Path;

use anyhow::{bail, Context};
use burrow_kernel::Config;

/// Configuration for one server process.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name reported to clients.
    pub name: String,
    /// Server version reported to clients.
    pub version: String,
    /// The verified identity this process acts for.
    pub identity: String,
    /// Sandbox and tenant settings.
    pub sandbox: Config,
}

impl McpServerConfig {
    pub fn new(identity: impl Into<String>, sandbox: Config) -> Self {
        Self {
            name: "burrow".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            identity: identity.into(),
            sandbox,
        }
    }

    /// Load the sandbox configuration from `path` (or the default location)
    /// for `identity`.
    pub fn load(path: Option<&Path>, identity: impl Into<String>) -> anyhow::Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            bail!("no identity given; pass --identity or set BURROW_IDENTITY");
        }
        let sandbox = Config::load(path).context("Failed to load sandbox configuration")?;
        Ok(Self::new(identity, sandbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "[sandbox]\nprovision = [\"alice\"]\n").unwrap();

        let config = McpServerConfig::load(Some(&file), "alice").unwrap();
        assert_eq!(config.identity, "alice");
        assert_eq!(config.name, "burrow");
        assert_eq!(config.sandbox.sandbox.provision, vec!["alice".to_string()]);
    }

    #[test]
    fn blank_identity_is_rejected() {
        let err = McpServerConfig::load(None, "  ").unwrap_err();
        assert!(err.to_string().contains("BURROW_IDENTITY"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(McpServerConfig::load(Some(&missing), "alice").is_err());
    }
}
