//! Domain rewrite engine
//!
//! After an import, every stored URL still points at the source environment.
//! This service rewrites the installation's URLs to the target and adjusts
//! tenant domains between their two shapes:
//!
//! - **Collapse**: production domains become `<platform-domain>/<path>` on
//!   non-production targets, and the login-lockdown safeguard is switched on
//!   (off for local).
//! - **Expand**: platform addresses become the tenants' production domains
//!   again when migrating into production.
//!
//! The underlying `wp search-replace` targets exact strings, so re-running a
//! rewrite with identical inputs reports zero further changes.

use tracing::debug;

use crate::config::PlatformConfig;
use crate::domain::{Environment, Site, SiteRegistry};
use crate::error::{CommandExecutionError, RewriteError};
use crate::infrastructure::{RuntimeBackend, RuntimeHandle};

/// Which direction tenant domains are rewritten in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Production domains -> platform addresses (non-prod target)
    Collapse,
    /// Platform addresses -> production domains (prod target)
    Expand,
    /// Leave production domains in place (`--keep-prod-domain`)
    KeepProd,
}

impl RewriteMode {
    /// Mode selection by target class and the keep-prod-domain flag
    pub fn select(target: Environment, keep_prod_domain: bool) -> Self {
        if target.is_prod() {
            Self::Expand
        } else if keep_prod_domain {
            Self::KeepProd
        } else {
            Self::Collapse
        }
    }
}

/// Applies canonical-domain <-> platform-domain rewrites to the imported dataset
pub struct RewriteService<'a> {
    backend: &'a RuntimeBackend,
    registry: &'a SiteRegistry,
    config: &'a PlatformConfig,
}

impl<'a> RewriteService<'a> {
    pub fn new(
        backend: &'a RuntimeBackend,
        registry: &'a SiteRegistry,
        config: &'a PlatformConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            config,
        }
    }

    /// Rewrite every occurrence of the source site URL to the target's
    pub async fn rewrite_site_urls(
        &self,
        handle: &RuntimeHandle,
        from: &str,
        to: &str,
        blog_id: Option<u64>,
    ) -> Result<(), RewriteError> {
        self.search_replace(handle, from, to, blog_id).await
    }

    /// Collapse production domains onto the target's platform domain and
    /// update each tenant's stored domain/path, then toggle the lockdown
    /// safeguard (on for cloud targets, off for local).
    ///
    /// With a tenant scope only that tenant is processed; otherwise every
    /// registry entry is.
    pub async fn collapse_to_platform(
        &self,
        handle: &RuntimeHandle,
        target: Environment,
        blog_id: Option<u64>,
    ) -> Result<(), RewriteError> {
        let platform_domain = target.site_url(self.config);

        for site in self.scoped_sites(blog_id) {
            let to = site.platform_address(&platform_domain);
            debug!("collapse blog {}: {} -> {}", site.blog_id, site.domain, to);

            self.search_replace(handle, &site.domain, &to, blog_id)
                .await?;
            self.update_tenant_record(handle, site.blog_id, &platform_domain, &site.platform_path())
                .await?;
        }

        self.toggle_lockdown(handle, !target.is_local()).await
    }

    /// Expand platform addresses back to production domains and restore each
    /// tenant's stored production domain and path.
    ///
    /// Runs after the site-URL rewrite, so platform-hosted content already
    /// sits on the production apex; the addresses to undo are `apex/<path>`.
    pub async fn expand_to_prod(
        &self,
        handle: &RuntimeHandle,
        blog_id: Option<u64>,
    ) -> Result<(), RewriteError> {
        let platform_domain = Environment::Prod.site_url(self.config);

        for site in self.scoped_sites(blog_id) {
            let from = site.platform_address(&platform_domain);
            debug!("expand blog {}: {} -> {}", site.blog_id, from, site.domain);

            self.search_replace(handle, &from, &site.domain, blog_id)
                .await?;

            let (domain, path) = split_production_domain(&site.domain);
            self.update_tenant_record(handle, site.blog_id, domain, &path)
                .await?;
        }

        Ok(())
    }

    /// Rewrite stored media URLs from the source bucket to the target's
    /// after a media sync between environments.
    pub async fn rewrite_bucket_references(
        &self,
        handle: &RuntimeHandle,
        source_bucket: &str,
        target_bucket: &str,
        blog_id: Option<u64>,
    ) -> Result<(), RewriteError> {
        self.search_replace(handle, source_bucket, target_bucket, blog_id)
            .await
    }

    fn scoped_sites(&self, blog_id: Option<u64>) -> Vec<&Site> {
        match blog_id {
            // Tenant scope: exactly the matching registry entry, then stop
            Some(id) => self.registry.lookup(id).into_iter().collect(),
            None => self.registry.list().iter().collect(),
        }
    }

    async fn search_replace(
        &self,
        handle: &RuntimeHandle,
        from: &str,
        to: &str,
        blog_id: Option<u64>,
    ) -> Result<(), RewriteError> {
        let args = search_replace_args(from, to, blog_id);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        self.backend.exec(handle, &arg_refs).await.map_err(|e| {
            RewriteError::SearchReplaceFailed {
                from: from.to_string(),
                to: to.to_string(),
                code: exit_code_of(&e),
            }
        })
    }

    async fn update_tenant_record(
        &self,
        handle: &RuntimeHandle,
        blog_id: u64,
        domain: &str,
        path: &str,
    ) -> Result<(), RewriteError> {
        let query = tenant_update_query(blog_id, domain, path);

        self.backend
            .exec(handle, &["wp", "db", "query", &query])
            .await
            .map_err(|e| RewriteError::TenantUpdateFailed {
                blog_id,
                code: exit_code_of(&e),
            })
    }

    async fn toggle_lockdown(
        &self,
        handle: &RuntimeHandle,
        enable: bool,
    ) -> Result<(), RewriteError> {
        let args = lockdown_args(&self.config.lockdown_plugin, enable);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        self.backend
            .exec(handle, &arg_refs)
            .await
            .map_err(|e| RewriteError::LockdownToggleFailed {
                code: exit_code_of(&e),
            })
    }
}

/// wp-cli search-replace invocation, scoped to one tenant's table prefix
/// when `blog_id` is set
pub fn search_replace_args(from: &str, to: &str, blog_id: Option<u64>) -> Vec<String> {
    let mut args = vec![
        "wp".to_string(),
        "search-replace".to_string(),
        from.to_string(),
        to.to_string(),
    ];

    match blog_id {
        Some(id) => {
            args.push("--all-tables-with-prefix".to_string());
            args.push(format!("wp_{id}_*"));
        }
        None => args.push("--all-tables".to_string()),
    }

    args.extend(
        [
            "--network",
            "--precise",
            "--skip-columns=guid",
            "--report-changed-only",
            "--recurse-objects",
        ]
        .map(String::from),
    );

    args
}

/// SQL updating one tenant's stored domain and path in the site directory
pub fn tenant_update_query(blog_id: u64, domain: &str, path: &str) -> String {
    format!("UPDATE wp_blogs SET domain='{domain}', path='{path}' WHERE blog_id={blog_id}")
}

/// wp-cli plugin toggle for the login-lockdown safeguard
pub fn lockdown_args(plugin: &str, enable: bool) -> Vec<String> {
    let action = if enable { "activate" } else { "deactivate" };
    vec![
        "wp".to_string(),
        "plugin".to_string(),
        action.to_string(),
        plugin.to_string(),
        "--network".to_string(),
    ]
}

/// Split a registry domain into the stored domain and path columns.
///
/// Apex-hosted tenants are registered as `apex/segment`; their `wp_blogs`
/// row stores the apex as domain and the segment as path.
pub fn split_production_domain(domain: &str) -> (&str, String) {
    match domain.split_once('/') {
        Some((host, segment)) => (host, format!("/{}/", segment.trim_matches('/'))),
        None => (domain, "/".to_string()),
    }
}

fn exit_code_of(e: &CommandExecutionError) -> Option<i32> {
    match e {
        CommandExecutionError::NonZeroExit { code, .. } => *code,
        CommandExecutionError::Spawn { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        assert_eq!(
            RewriteMode::select(Environment::Prod, false),
            RewriteMode::Expand
        );
        assert_eq!(
            RewriteMode::select(Environment::Staging, false),
            RewriteMode::Collapse
        );
        assert_eq!(
            RewriteMode::select(Environment::Local, false),
            RewriteMode::Collapse
        );
        assert_eq!(
            RewriteMode::select(Environment::Staging, true),
            RewriteMode::KeepProd
        );
        // keep-prod-domain is meaningless for a prod target
        assert_eq!(
            RewriteMode::select(Environment::Prod, true),
            RewriteMode::Expand
        );
    }

    #[test]
    fn test_search_replace_args_whole_installation() {
        let args = search_replace_args("old.example.org", "new.example.org", None);
        assert_eq!(args[0..4], ["wp", "search-replace", "old.example.org", "new.example.org"]);
        assert!(args.contains(&"--all-tables".to_string()));
        assert!(args.contains(&"--network".to_string()));
        assert!(args.contains(&"--skip-columns=guid".to_string()));
        assert!(!args.iter().any(|a| a == "--all-tables-with-prefix"));
    }

    #[test]
    fn test_search_replace_args_single_tenant() {
        let args = search_replace_args("a", "b", Some(5));
        let idx = args
            .iter()
            .position(|a| a == "--all-tables-with-prefix")
            .unwrap();
        assert_eq!(args[idx + 1], "wp_5_*");
        assert!(!args.contains(&"--all-tables".to_string()));
    }

    #[test]
    fn test_tenant_update_query() {
        assert_eq!(
            tenant_update_query(5, "dev.sites.mosaicplatform.net", "/riverside/"),
            "UPDATE wp_blogs SET domain='dev.sites.mosaicplatform.net', \
             path='/riverside/' WHERE blog_id=5"
        );
    }

    #[test]
    fn test_lockdown_args() {
        assert_eq!(
            lockdown_args("restricted-site-access", true),
            vec!["wp", "plugin", "activate", "restricted-site-access", "--network"]
        );
        assert_eq!(
            lockdown_args("restricted-site-access", false)[2],
            "deactivate"
        );
    }

    #[test]
    fn test_split_production_domain() {
        assert_eq!(
            split_production_domain("riverside-archive.org"),
            ("riverside-archive.org", "/".to_string())
        );
        assert_eq!(
            split_production_domain("sites.mosaicplatform.net/playground"),
            ("sites.mosaicplatform.net", "/playground/".to_string())
        );
    }

    #[test]
    fn test_scoped_sites_bails_after_single_tenant() {
        let registry = SiteRegistry::builtin().unwrap();
        let config = PlatformConfig::default();
        let backend = RuntimeBackend::from_config(&config);
        let service = RewriteService::new(&backend, &registry, &config);

        let scoped = service.scoped_sites(Some(5));
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].blog_id, 5);

        // Unknown tenants rewrite nothing rather than everything
        assert!(service.scoped_sites(Some(9999)).is_empty());

        assert_eq!(
            service.scoped_sites(None).len(),
            registry.list().len()
        );
    }
}
