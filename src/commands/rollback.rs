//! Roll the wordpress release back to an earlier revision.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

use crate::tools::{self, get_tool_path};
use crate::ui;

pub async fn execute(revision: Option<u32>) -> Result<()> {
    tools::preflight(&[tools::tools::KUBECTL, tools::tools::HELM])?;

    let namespace = super::current_namespace().await?;
    ui::print_info(&format!("Your current namespace: {namespace}"));

    if !ui::confirm("Do you wish to proceed?")? {
        ui::print_warning("Rollback cancelled.");
        return Ok(());
    }

    let mut args = vec!["rollback".to_string(), "wordpress".to_string()];
    if let Some(rev) = revision {
        args.push(rev.to_string());
    }

    let status = Command::new(get_tool_path("helm"))
        .args(&args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .context("Failed to run helm rollback")?;

    if !status.success() {
        anyhow::bail!("helm rollback failed with exit code {:?}", status.code());
    }

    ui::print_success("Rollback initiated.");
    Ok(())
}
