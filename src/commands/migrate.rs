//! The migrate command: the end-to-end cross-environment pipeline.

use anyhow::Result;
use colored::Colorize;

use crate::config::PlatformConfig;
use crate::domain::{Environment, MigrationRequest, RunStatus, SiteRegistry};
use crate::infrastructure::{RuntimeBackend, SecretResolver};
use crate::services::MigrationService;
use crate::tools;
use crate::ui;

pub async fn execute(
    config: &PlatformConfig,
    registry: &SiteRegistry,
    source: Environment,
    target: Environment,
    blog_id: Option<u64>,
    keep_prod_domain: bool,
    skip_media: bool,
) -> Result<()> {
    let mut required = vec![tools::tools::KUBECTL];
    if target.is_local() {
        required.push(tools::tools::DOCKER);
        if !skip_media {
            required.push(tools::tools::AWS);
        }
    }
    tools::preflight(&required)?;

    let request = MigrationRequest {
        source,
        target,
        blog_id,
        keep_prod_domain,
        sync_media: !skip_media,
    };

    ui::print_header(&format!("Migrate {source} -> {target}"));

    let backend = RuntimeBackend::from_config(config);
    let secrets = SecretResolver::from_config(config);
    let service = MigrationService::new(&backend, &secrets, registry, config);

    let report = match service.run(&request).await {
        Ok(report) => report,
        Err(e) => {
            // Validation and discovery failures happen before any step runs
            ui::print_error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    match report.status {
        RunStatus::Completed => {
            println!();
            println!(
                "{}",
                format!(
                    "{} now mirrors {}{}.",
                    target,
                    source,
                    blog_id
                        .map(|id| format!(" for blog {id}"))
                        .unwrap_or_default()
                )
                .bright_green()
            );
            Ok(())
        }
        RunStatus::Cancelled => Ok(()),
        RunStatus::Aborted(step) => {
            println!();
            ui::print_error(&format!(
                "Migration aborted at '{}'. Earlier steps are not rolled back; \
                 re-run to restart from the export.",
                step.name()
            ));
            for outcome in &report.outcomes {
                let icon = if outcome.success { "✅" } else { "❌" };
                println!(
                    "  {} {}{}",
                    icon,
                    outcome.step.name(),
                    outcome
                        .message
                        .as_deref()
                        .map(|m| format!(": {m}"))
                        .unwrap_or_default()
                );
            }
            std::process::exit(report.exit_code());
        }
    }
}
