//! Environment domain types
//!
//! The deployment environments are a closed set. Everything that differs
//! between them (transport, secrets, namespace, site URL) hangs off this
//! enum so callers never branch on raw environment strings.

use clap::ValueEnum;

use crate::config::PlatformConfig;

/// A deployment environment of the multisite installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Prod,
    Staging,
    Dev,
    Demo,
    Local,
}

/// How commands reach the environment's WordPress runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// `docker exec` against the local container
    ContainerExec,
    /// `kubectl exec` against the namespaced pod
    PodExec,
}

/// What an environment is capable of, decided once at this boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_secrets: bool,
    pub transport: TransportKind,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Staging => "staging",
            Self::Dev => "dev",
            Self::Demo => "demo",
            Self::Local => "local",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "prod" => Some(Self::Prod),
            "staging" => Some(Self::Staging),
            "dev" => Some(Self::Dev),
            "demo" => Some(Self::Demo),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Local => Capabilities {
                supports_secrets: false,
                transport: TransportKind::ContainerExec,
            },
            _ => Capabilities {
                supports_secrets: true,
                transport: TransportKind::PodExec,
            },
        }
    }

    /// Kubernetes namespace hosting this environment; local has none
    pub fn namespace(&self, config: &PlatformConfig) -> Option<String> {
        if self.is_local() {
            return None;
        }
        Some(format!("{}-{}", config.namespace_prefix, self.as_str()))
    }

    /// The installation's site URL in this environment.
    ///
    /// Production is the platform apex; other cloud environments prefix it;
    /// local is the Dockerized domain.
    pub fn site_url(&self, config: &PlatformConfig) -> String {
        match self {
            Self::Local => config.local_domain.clone(),
            Self::Prod => config.platform_apex.clone(),
            _ => format!("{}.{}", self.as_str(), config.platform_apex),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlatformConfig {
        PlatformConfig::default()
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Environment::from_str("prod"), Some(Environment::Prod));
        assert_eq!(Environment::from_str("Staging"), Some(Environment::Staging));
        assert_eq!(Environment::from_str("unknown"), None);
    }

    #[test]
    fn test_local_has_no_namespace_or_secrets() {
        assert_eq!(Environment::Local.namespace(&config()), None);
        assert!(!Environment::Local.capabilities().supports_secrets);
        assert_eq!(
            Environment::Local.capabilities().transport,
            TransportKind::ContainerExec
        );
    }

    #[test]
    fn test_cloud_environments_are_namespaced_pod_exec() {
        for env in [
            Environment::Prod,
            Environment::Staging,
            Environment::Dev,
            Environment::Demo,
        ] {
            let caps = env.capabilities();
            assert!(caps.supports_secrets);
            assert_eq!(caps.transport, TransportKind::PodExec);
            assert_eq!(
                env.namespace(&config()),
                Some(format!("mosaic-platform-{}", env.as_str()))
            );
        }
    }

    #[test]
    fn test_site_urls() {
        let cfg = config();
        assert_eq!(Environment::Prod.site_url(&cfg), "sites.mosaicplatform.net");
        assert_eq!(
            Environment::Dev.site_url(&cfg),
            "dev.sites.mosaicplatform.net"
        );
        assert_eq!(Environment::Local.site_url(&cfg), "mosaic.docker");
    }
}
