//! Standalone database export and import commands.
//!
//! Export produces the timestamped dump in the current directory. Import
//! takes any dump produced by export (or a dump of a known origin), rewrites
//! it for the target environment, and optionally mirrors media assets.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config::PlatformConfig;
use crate::domain::{dump, Environment, SiteRegistry};
use crate::error::{MigrateError, ValidationError};
use crate::infrastructure::{MediaSync, RuntimeBackend, RuntimeRole, SecretResolver};
use crate::services::{MigrationService, RewriteMode, RewriteService};
use crate::tools;
use crate::ui;

/// Where a dump originally came from, for URL rewriting on import
enum DumpOrigin {
    Environment(Environment),
    /// A domain given by the operator for dumps from outside the fleet
    Custom(String),
}

impl DumpOrigin {
    fn site_url(&self, config: &PlatformConfig) -> String {
        match self {
            Self::Environment(env) => env.site_url(config),
            Self::Custom(domain) => domain.clone(),
        }
    }
}

pub async fn export(
    config: &PlatformConfig,
    registry: &SiteRegistry,
    target: Environment,
    blog_id: Option<u64>,
) -> Result<()> {
    tools::preflight(&[transport_tool(target)])?;

    let backend = RuntimeBackend::from_config(config);
    let secrets = SecretResolver::from_config(config);
    let service = MigrationService::new(&backend, &secrets, registry, config);

    ui::print_info(&format!("Exporting the {target} database..."));

    match service.export_to_local(target, blog_id).await {
        Ok(artifact) => {
            ui::print_success(&format!("Exported to ./{}", artifact.file_name));
            Ok(())
        }
        Err(e) => {
            ui::print_error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}

pub async fn import(
    config: &PlatformConfig,
    registry: &SiteRegistry,
    target: Environment,
    file: &str,
    blog_id: Option<u64>,
    s3_sync: bool,
) -> Result<()> {
    let mut required = vec![transport_tool(target)];
    if s3_sync && target.is_local() {
        required.push(tools::tools::AWS);
    }
    tools::preflight(&required)?;

    let path = Path::new(file);
    dump::validate_sql_file(path)?;
    dump::validate_tenant_scope(path, blog_id)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let origin = resolve_origin(config, &file_name)?;

    if target.is_prod() {
        let proceed = ui::confirm_destructive(&format!(
            "{} You are running a command against prod. Do you wish to proceed?",
            "##### WARNING #####".bright_red().bold()
        ))?;
        if !proceed {
            ui::print_warning("Command cancelled. Exiting task.");
            return Ok(());
        }
    }

    let backend = RuntimeBackend::from_config(config);
    let secrets = SecretResolver::from_config(config);
    let rewriter = RewriteService::new(&backend, registry, config);

    if let Err(e) = run_import(
        config, &backend, &secrets, &rewriter, target, path, &file_name, blog_id, &origin, s3_sync,
    )
    .await
    {
        ui::print_error(&format!("Error during import: {e}"));
        std::process::exit(e.exit_code());
    }

    ui::print_success("Import completed successfully.");
    Ok(())
}

fn transport_tool(target: Environment) -> &'static str {
    if target.is_local() {
        tools::tools::DOCKER
    } else {
        tools::tools::KUBECTL
    }
}

/// Determine the dump's origin from its name, falling back to asking the
/// operator for the source domain.
fn resolve_origin(config: &PlatformConfig, file_name: &str) -> Result<DumpOrigin, MigrateError> {
    if let Some(env) =
        dump::extract_environment_from_file_name(&config.namespace_prefix, file_name)
    {
        return Ok(DumpOrigin::Environment(env));
    }

    let answer = ui::ask(
        "The dump does not match one of our environments. Enter the domain the \
         database was exported from (required to rewrite it on import):",
    )
    .unwrap_or_default();

    if answer.is_empty() {
        return Err(ValidationError::UnknownOrigin.into());
    }

    Ok(DumpOrigin::Custom(answer))
}

#[allow(clippy::too_many_arguments)]
async fn run_import(
    config: &PlatformConfig,
    backend: &RuntimeBackend,
    secrets: &SecretResolver,
    rewriter: &RewriteService<'_>,
    target: Environment,
    path: &Path,
    file_name: &str,
    blog_id: Option<u64>,
    origin: &DumpOrigin,
    s3_sync: bool,
) -> Result<(), MigrateError> {
    let handle = backend.resolve_handle(target, RuntimeRole::WordPress).await?;

    ui::print_info(&format!("Importing {file_name} into {target}..."));
    backend.copy_to_runtime(&handle, path, file_name).await?;
    backend
        .exec(&handle, &["wp", "db", "import", file_name])
        .await?;
    backend.exec(&handle, &["rm", file_name]).await?;

    let from = origin.site_url(config);
    let to = target.site_url(config);
    ui::print_info(&format!("Rewriting URLs: {from} -> {to}"));
    rewriter
        .rewrite_site_urls(&handle, &from, &to, blog_id)
        .await?;

    match RewriteMode::select(target, false) {
        RewriteMode::Expand => {
            rewriter.expand_to_prod(&handle, blog_id).await?;
        }
        RewriteMode::Collapse => {
            rewriter
                .collapse_to_platform(&handle, target, blog_id)
                .await?;
        }
        RewriteMode::KeepProd => {}
    }

    if s3_sync {
        if let DumpOrigin::Environment(source) = origin {
            sync_media_assets(config, backend, secrets, rewriter, &handle, *source, target, blog_id)
                .await?;
        } else {
            ui::print_warning("Skipping media sync: unknown dump origin has no bucket.");
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn sync_media_assets(
    config: &PlatformConfig,
    backend: &RuntimeBackend,
    secrets: &SecretResolver,
    rewriter: &RewriteService<'_>,
    handle: &crate::infrastructure::RuntimeHandle,
    source: Environment,
    target: Environment,
    blog_id: Option<u64>,
) -> Result<(), MigrateError> {
    let media = MediaSync::new(backend, secrets, config);

    ui::print_info("Syncing media assets...");
    if target.is_local() {
        let workspace = std::env::current_dir().map_err(|e| {
            MigrateError::from(crate::error::CommandExecutionError::Spawn {
                command: "pwd".to_string(),
                message: e.to_string(),
            })
        })?;
        media.pull_to_local(source, blog_id, &workspace).await?;
        return Ok(());
    }

    media.sync_buckets(source, target, blog_id).await?;

    // Imported rows still reference the source bucket in media URLs
    if let (Some(source_bucket), Some(target_bucket)) = (
        secrets.bucket_name(source).await?,
        secrets.bucket_name(target).await?,
    ) {
        ui::print_info(&format!(
            "Rewriting bucket references: {source_bucket} -> {target_bucket}"
        ));
        rewriter
            .rewrite_bucket_references(handle, &source_bucket, &target_bucket, blog_id)
            .await?;
    }

    Ok(())
}
