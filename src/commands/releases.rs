//! Display the release history of the wordpress deployment.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

use crate::tools::{self, get_tool_path};
use crate::ui;

pub async fn execute() -> Result<()> {
    tools::preflight(&[tools::tools::KUBECTL, tools::tools::HELM])?;

    let namespace = super::current_namespace().await?;
    ui::print_info(&format!("Your current namespace: {namespace}"));

    let status = Command::new(get_tool_path("helm"))
        .args(["history", "wordpress"])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .context("Failed to run helm history")?;

    if !status.success() {
        anyhow::bail!("helm history failed with exit code {:?}", status.code());
    }

    Ok(())
}
