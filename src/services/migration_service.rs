//! Migration orchestrator
//!
//! Sequences the cross-environment pipeline: export the source database,
//! move the dump through the operator's machine into the target runtime,
//! import it, rewrite URLs and tenant domains, and mirror the media store.
//!
//! Strictly sequential with no backward transitions; the first failing step
//! aborts the run and nothing already applied is rolled back. Re-invoking
//! restarts from Export; there is no resume.

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::PlatformConfig;
use crate::domain::{
    migration::TransferArtifact, Environment, MigrationRequest, PipelineReport, PipelineStep,
    SiteRegistry,
};
use crate::error::{MigrateError, ValidationError};
use crate::infrastructure::{MediaSync, RuntimeBackend, RuntimeHandle, RuntimeRole, SecretResolver};
use crate::services::rewrite_service::{RewriteMode, RewriteService};
use crate::ui;

/// A tenant export with fewer tables than this is considered broken
const MIN_TENANT_TABLES: usize = 10;

/// Runs one migration request end to end
pub struct MigrationService<'a> {
    backend: &'a RuntimeBackend,
    secrets: &'a SecretResolver,
    registry: &'a SiteRegistry,
    config: &'a PlatformConfig,
}

impl<'a> MigrationService<'a> {
    pub fn new(
        backend: &'a RuntimeBackend,
        secrets: &'a SecretResolver,
        registry: &'a SiteRegistry,
        config: &'a PlatformConfig,
    ) -> Self {
        Self {
            backend,
            secrets,
            registry,
            config,
        }
    }

    /// Validate the request, confirm production targets, then execute the
    /// pipeline in order, aborting at the first failing step. Returns the
    /// full outcome trail for diagnostics.
    pub async fn run(&self, request: &MigrationRequest) -> Result<PipelineReport, MigrateError> {
        request.validate()?;

        if let Some(id) = request.blog_id {
            if self.registry.lookup(id).is_none() {
                return Err(ValidationError::UnknownTenant(id).into());
            }
        }

        if request.target.is_prod() {
            let proceed = ui::confirm_destructive(&format!(
                "{} You are about to overwrite the production database with data from '{}'. Proceed?",
                "##### WARNING #####".bright_red().bold(),
                request.source
            ))
            .unwrap_or(false);

            if !proceed {
                ui::print_warning("Migration cancelled.");
                return Ok(PipelineReport::cancelled());
            }
        }

        info!(
            "migrating {} -> {}{}",
            request.source,
            request.target,
            request
                .blog_id
                .map(|id| format!(" (blog {id})"))
                .unwrap_or_default()
        );

        let source_handle = self
            .backend
            .resolve_handle(request.source, RuntimeRole::WordPress)
            .await?;
        let target_handle = self
            .backend
            .resolve_handle(request.target, RuntimeRole::WordPress)
            .await?;

        let artifact = TransferArtifact::new(
            &self.config.namespace_prefix,
            request.source,
            request.blog_id,
            chrono::Local::now().naive_local(),
        );

        let mut report = PipelineReport::new();

        let r = self
            .export(&source_handle, request, &artifact)
            .await;
        if !note(&mut report, PipelineStep::Export, r) {
            return Ok(report);
        }

        let r = self
            .backend
            .copy_from_runtime(&source_handle, &artifact.file_name, &artifact.local_path())
            .await
            .map(|_| artifact.file_name.clone())
            .map_err(MigrateError::from);
        if !note(&mut report, PipelineStep::CopyToLocal, r) {
            return Ok(report);
        }

        let r = self
            .backend
            .exec(&source_handle, &["rm", &artifact.file_name])
            .await
            .map(|_| String::new())
            .map_err(MigrateError::from);
        if !note(&mut report, PipelineStep::RemoveFromSourceRuntime, r) {
            return Ok(report);
        }

        let r = self
            .backend
            .copy_to_runtime(&target_handle, &artifact.local_path(), &artifact.file_name)
            .await
            .map(|_| String::new())
            .map_err(MigrateError::from);
        if !note(&mut report, PipelineStep::CopyToTarget, r) {
            return Ok(report);
        }

        let r = self
            .backend
            .exec(&target_handle, &["wp", "db", "import", &artifact.file_name])
            .await
            .map(|_| String::new())
            .map_err(MigrateError::from);
        if !note(&mut report, PipelineStep::Import, r) {
            return Ok(report);
        }

        let r = self.cleanup_target(&target_handle, &artifact).await;
        if !note(&mut report, PipelineStep::RemoveFromTargetRuntime, r) {
            return Ok(report);
        }

        let rewriter = RewriteService::new(self.backend, self.registry, self.config);

        let from = request.source.site_url(self.config);
        let to = request.target.site_url(self.config);
        let r = rewriter
            .rewrite_site_urls(&target_handle, &from, &to, request.blog_id)
            .await
            .map(|_| format!("{from} -> {to}"))
            .map_err(MigrateError::from);
        if !note(&mut report, PipelineStep::RewriteUrls, r) {
            return Ok(report);
        }

        let r = self
            .rewrite_domains(&rewriter, &target_handle, request)
            .await;
        if !note(&mut report, PipelineStep::RewriteDomains, r) {
            return Ok(report);
        }

        if request.sync_media {
            let r = self.sync_media(request).await;
            if !note(&mut report, PipelineStep::SyncMedia, r) {
                return Ok(report);
            }
        }

        ui::print_success("Migration complete.");
        Ok(report)
    }

    /// Export the source database straight onto the operator's machine:
    /// export inside the runtime, copy out, delete the runtime copy.
    ///
    /// This is the standalone `db export` path; the migrate pipeline keeps
    /// the same three operations as separate steps in its outcome trail.
    pub async fn export_to_local(
        &self,
        source: Environment,
        blog_id: Option<u64>,
    ) -> Result<TransferArtifact, MigrateError> {
        let handle = self
            .backend
            .resolve_handle(source, RuntimeRole::WordPress)
            .await?;

        let artifact = TransferArtifact::new(
            &self.config.namespace_prefix,
            source,
            blog_id,
            chrono::Local::now().naive_local(),
        );

        let request = MigrationRequest {
            source,
            // Target is irrelevant for a plain export; the request only
            // carries the scope into the shared export path.
            target: source,
            blog_id,
            keep_prod_domain: false,
            sync_media: false,
        };

        self.export(&handle, &request, &artifact).await?;
        self.backend
            .copy_from_runtime(&handle, &artifact.file_name, &artifact.local_path())
            .await?;
        self.backend
            .exec(&handle, &["rm", &artifact.file_name])
            .await?;

        Ok(artifact)
    }

    /// Export the database inside the source runtime.
    ///
    /// Tenant-scoped exports first verify the site exists and gather its
    /// table list; a partial table set aborts before anything is written.
    async fn export(
        &self,
        handle: &RuntimeHandle,
        request: &MigrationRequest,
        artifact: &TransferArtifact,
    ) -> Result<String, MigrateError> {
        let tables = match request.blog_id {
            Some(id) => Some(self.tenant_tables(handle, request.source, id).await?),
            None => None,
        };

        let args = export_args(&artifact.file_name, tables.as_deref());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.backend.exec(handle, &arg_refs).await?;

        Ok(artifact.file_name.clone())
    }

    async fn tenant_tables(
        &self,
        handle: &RuntimeHandle,
        source: Environment,
        blog_id: u64,
    ) -> Result<String, MigrateError> {
        let site_check = self
            .backend
            .exec_capture(
                handle,
                &[
                    "wp",
                    "site",
                    "list",
                    &format!("--site__in={blog_id}"),
                    "--field=blog_id",
                    "--format=csv",
                ],
            )
            .await?;

        if site_check.is_empty() {
            return Err(ValidationError::SiteNotFound {
                blog_id,
                environment: source.as_str().to_string(),
            }
            .into());
        }

        let tables = self
            .backend
            .exec_capture(
                handle,
                &[
                    "wp",
                    "db",
                    "tables",
                    &format!("wp_{blog_id}_*"),
                    "--all-tables-with-prefix",
                    "--format=csv",
                ],
            )
            .await?;

        let found = tables.split(',').filter(|t| !t.is_empty()).count();
        if found < MIN_TENANT_TABLES {
            return Err(ValidationError::IncompleteTenantTables { blog_id, found }.into());
        }

        Ok(tables)
    }

    /// Remove the dump from the target runtime and the operator's machine,
    /// the last two places it still exists.
    async fn cleanup_target(
        &self,
        handle: &RuntimeHandle,
        artifact: &TransferArtifact,
    ) -> Result<String, MigrateError> {
        self.backend
            .exec(handle, &["rm", &artifact.file_name])
            .await?;

        std::fs::remove_file(artifact.local_path()).map_err(|e| {
            MigrateError::from(crate::error::CommandExecutionError::Spawn {
                command: format!("rm {}", artifact.file_name),
                message: e.to_string(),
            })
        })?;

        Ok(String::new())
    }

    async fn rewrite_domains(
        &self,
        rewriter: &RewriteService<'_>,
        handle: &RuntimeHandle,
        request: &MigrationRequest,
    ) -> Result<String, MigrateError> {
        match RewriteMode::select(request.target, request.keep_prod_domain) {
            RewriteMode::Expand => {
                rewriter.expand_to_prod(handle, request.blog_id).await?;
                Ok("expanded to production domains".to_string())
            }
            RewriteMode::Collapse => {
                rewriter
                    .collapse_to_platform(handle, request.target, request.blog_id)
                    .await?;
                Ok("collapsed onto the platform domain".to_string())
            }
            RewriteMode::KeepProd => Ok("production domains kept".to_string()),
        }
    }

    async fn sync_media(&self, request: &MigrationRequest) -> Result<String, MigrateError> {
        let media = MediaSync::new(self.backend, self.secrets, self.config);

        // The sync itself is quiet and can run for minutes
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("static template"),
        );
        spinner.set_message("Syncing media store...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = if request.target.is_local() {
            let workspace = std::env::current_dir().map_err(|e| {
                MigrateError::from(crate::error::CommandExecutionError::Spawn {
                    command: "pwd".to_string(),
                    message: e.to_string(),
                })
            })?;
            media
                .pull_to_local(request.source, request.blog_id, &workspace)
                .await
        } else {
            media
                .sync_buckets(request.source, request.target, request.blog_id)
                .await
        };

        spinner.finish_and_clear();
        result.map(|_| String::new())
    }
}

/// wp-cli export invocation; `tables` narrows a tenant-scoped export
pub fn export_args(file_name: &str, tables: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "wp".to_string(),
        "db".to_string(),
        "export".to_string(),
        "--porcelain".to_string(),
        file_name.to_string(),
    ];
    if let Some(tables) = tables {
        args.push(format!("--tables={tables}"));
    }
    args
}

/// Print a step's result and record it; returns whether to continue.
/// The runner halts, the steps just report.
fn note(
    report: &mut PipelineReport,
    step: PipelineStep,
    result: Result<String, MigrateError>,
) -> bool {
    match &result {
        Ok(message) if message.is_empty() => ui::print_success(step.name()),
        Ok(message) => ui::print_success(&format!("{} ({})", step.name(), message)),
        Err(e) => ui::print_error(&format!("{}: {}", step.name(), e)),
    }
    report.record(step, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunStatus;
    use crate::error::CommandExecutionError;

    #[test]
    fn test_export_args() {
        assert_eq!(
            export_args("dump.sql", None),
            vec!["wp", "db", "export", "--porcelain", "dump.sql"]
        );
        let scoped = export_args("dump.sql", Some("wp_5_posts,wp_5_options"));
        assert_eq!(scoped.last().unwrap(), "--tables=wp_5_posts,wp_5_options");
    }

    #[test]
    fn test_note_halts_on_failure_and_keeps_trail() {
        let mut report = PipelineReport::new();

        assert!(note(
            &mut report,
            PipelineStep::Export,
            Ok("dump.sql".to_string())
        ));
        assert!(note(&mut report, PipelineStep::CopyToLocal, Ok(String::new())));

        let failed: Result<String, MigrateError> = Err(CommandExecutionError::NonZeroExit {
            command: "wp db import dump.sql".to_string(),
            code: Some(1),
        }
        .into());
        assert!(!note(&mut report, PipelineStep::Import, failed));

        // Order preserved, no later steps attempted, abort recorded
        let steps: Vec<PipelineStep> = report.outcomes.iter().map(|o| o.step).collect();
        assert_eq!(
            steps,
            vec![
                PipelineStep::Export,
                PipelineStep::CopyToLocal,
                PipelineStep::Import
            ]
        );
        assert_eq!(report.status, RunStatus::Aborted(PipelineStep::Import));
    }

    #[tokio::test]
    async fn test_run_rejects_local_source_before_any_side_effect() {
        let config = PlatformConfig::default();
        let backend = RuntimeBackend::from_config(&config);
        let secrets = SecretResolver::from_config(&config);
        let registry = SiteRegistry::builtin().unwrap();
        let service = MigrationService::new(&backend, &secrets, &registry, &config);

        let request = MigrationRequest {
            source: Environment::Local,
            target: Environment::Dev,
            blog_id: None,
            keep_prod_domain: false,
            sync_media: true,
        };

        let err = service.run(&request).await.unwrap_err();
        assert!(matches!(
            err,
            MigrateError::Validation(ValidationError::SourceIsLocal)
        ));
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_tenant_before_discovery() {
        let config = PlatformConfig::default();
        let backend = RuntimeBackend::from_config(&config);
        let secrets = SecretResolver::from_config(&config);
        let registry = SiteRegistry::builtin().unwrap();
        let service = MigrationService::new(&backend, &secrets, &registry, &config);

        let request = MigrationRequest {
            source: Environment::Dev,
            target: Environment::Local,
            blog_id: Some(9999),
            keep_prod_domain: false,
            sync_media: false,
        };

        let err = service.run(&request).await.unwrap_err();
        assert!(matches!(
            err,
            MigrateError::Validation(ValidationError::UnknownTenant(9999))
        ));
    }
}
