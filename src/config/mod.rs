//! # Platform Configuration
//!
//! Everything environment-shaped the CLI needs to know about the platform:
//! namespace naming, the shared non-production domain, the local developer
//! instance, secret naming, and where the site registry comes from.
//!
//! Defaults are compiled in and match the production fleet; an optional
//! `platform.yaml` next to the operator's checkout (or at `MOSAIC_CONFIG`)
//! overrides individual fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Platform-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Namespace prefix; environments live in `{prefix}-{env}`
    pub namespace_prefix: String,

    /// Apex of the shared platform domain (production URL of the installation)
    pub platform_apex: String,

    /// Domain of the local Dockerized instance
    pub local_domain: String,

    /// Name of the local WordPress container
    pub local_container: String,

    /// Prefix of the generated WordPress secret object, matched as
    /// `{prefix}-<digits>`
    pub secret_prefix: String,

    /// Key inside the WordPress secret holding the media bucket name
    pub bucket_secret_key: String,

    /// Slug of the login-lockdown safeguard plugin toggled on non-prod targets
    pub lockdown_plugin: String,

    /// Retry budget handed to the file-transfer tool (`kubectl cp --retries`)
    pub copy_retries: u32,

    /// Optional path to a site-registry YAML overriding the embedded table
    pub sites_file: Option<String>,

    /// Optional URL to fetch the site registry from at startup
    pub sites_url: Option<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "mosaic-platform".to_string(),
            platform_apex: "sites.mosaicplatform.net".to_string(),
            local_domain: "mosaic.docker".to_string(),
            local_container: "wordpress".to_string(),
            secret_prefix: "mosaic-wp-secrets".to_string(),
            bucket_secret_key: "S3_UPLOADS_BUCKET".to_string(),
            lockdown_plugin: "restricted-site-access".to_string(),
            copy_retries: 10,
            sites_file: None,
            sites_url: None,
        }
    }
}

impl PlatformConfig {
    /// Load configuration: `MOSAIC_CONFIG` path if set, else `platform.yaml`
    /// in the current directory if present, else compiled-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("MOSAIC_CONFIG") {
            return Self::from_file(&path);
        }

        if Path::new("platform.yaml").exists() {
            return Self::from_file("platform.yaml");
        }

        Ok(Self::default())
    }

    /// Load configuration from an explicit YAML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.namespace_prefix, "mosaic-platform");
        assert_eq!(config.copy_retries, 10);
        assert!(config.sites_file.is_none());
    }

    #[test]
    fn test_partial_override_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "copy_retries: 3\nlocal_domain: wp.docker").unwrap();

        let config = PlatformConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.copy_retries, 3);
        assert_eq!(config.local_domain, "wp.docker");
        // Untouched fields keep their defaults
        assert_eq!(config.platform_apex, "sites.mosaicplatform.net");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = PlatformConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
