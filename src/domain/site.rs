//! Site registry
//!
//! The ordered list of tenants with production domains. Loaded once per
//! invocation and treated as an immutable snapshot for the run; updates
//! happen out of band between runs.

use serde::{Deserialize, Serialize};

use crate::config::PlatformConfig;
use crate::error::ConfigError;

/// One tenant of the multisite installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Numeric tenant ID, unique across the installation
    pub blog_id: u64,
    /// Canonical production domain (may include a path for apex-hosted sites)
    pub domain: String,
    /// Path segment the tenant is addressed by on the platform domain
    pub path: String,
}

impl Site {
    /// The tenant's address on the given platform domain.
    ///
    /// The root site (empty path) is the platform domain itself.
    pub fn platform_address(&self, platform_domain: &str) -> String {
        if self.path.is_empty() {
            platform_domain.to_string()
        } else {
            format!("{}/{}", platform_domain, self.path)
        }
    }

    /// The stored `wp_blogs.path` value for this tenant on a platform domain
    pub fn platform_path(&self) -> String {
        if self.path.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", self.path)
        }
    }
}

/// Immutable, ordered snapshot of the tenant fleet
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    /// The registry table compiled into the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(include_str!("sites.yaml"))
    }

    /// Parse a registry from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let sites: Vec<Site> = serde_yaml::from_str(yaml).map_err(|e| ConfigError::RegistryLoad {
            message: e.to_string(),
        })?;
        Ok(Self { sites })
    }

    /// Load the registry per configuration: remote URL wins over override
    /// file, which wins over the embedded table. Fetched at most once per
    /// process invocation.
    pub async fn load(config: &PlatformConfig) -> Result<Self, ConfigError> {
        if let Some(url) = &config.sites_url {
            let body = reqwest::get(url)
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ConfigError::RegistryLoad {
                    message: format!("fetching {url}: {e}"),
                })?
                .text()
                .await
                .map_err(|e| ConfigError::RegistryLoad {
                    message: format!("reading {url}: {e}"),
                })?;
            return Self::from_yaml(&body);
        }

        if let Some(path) = &config.sites_file {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::RegistryLoad {
                    message: format!("reading {path}: {e}"),
                })?;
            return Self::from_yaml(&content);
        }

        Self::builtin()
    }

    /// All tenants, in registry order
    pub fn list(&self) -> &[Site] {
        &self.sites
    }

    /// Find one tenant by blog ID
    pub fn lookup(&self, blog_id: u64) -> Option<&Site> {
        self.sites.iter().find(|s| s.blog_id == blog_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_parses() {
        let registry = SiteRegistry::builtin().unwrap();
        assert!(!registry.list().is_empty());
        // Root site is always present
        assert_eq!(registry.lookup(1).unwrap().path, "");
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = SiteRegistry::builtin().unwrap();
        let ids: Vec<u64> = registry.list().iter().map(|s| s.blog_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_lookup_missing_tenant() {
        let registry = SiteRegistry::builtin().unwrap();
        assert!(registry.lookup(9999).is_none());
    }

    #[test]
    fn test_platform_address() {
        let site = Site {
            blog_id: 5,
            domain: "riverside-archive.org".to_string(),
            path: "riverside".to_string(),
        };
        assert_eq!(
            site.platform_address("dev.sites.mosaicplatform.net"),
            "dev.sites.mosaicplatform.net/riverside"
        );
        assert_eq!(site.platform_path(), "/riverside/");

        let root = Site {
            blog_id: 1,
            domain: "sites.mosaicplatform.net".to_string(),
            path: String::new(),
        };
        assert_eq!(
            root.platform_address("dev.sites.mosaicplatform.net"),
            "dev.sites.mosaicplatform.net"
        );
        assert_eq!(root.platform_path(), "/");
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        assert!(SiteRegistry::from_yaml("not: [valid").is_err());
    }

    #[test]
    fn test_load_defaults_to_builtin() {
        let config = PlatformConfig::default();
        let registry = tokio_test::block_on(SiteRegistry::load(&config)).unwrap();
        assert_eq!(registry.list().len(), SiteRegistry::builtin().unwrap().list().len());
    }
}
