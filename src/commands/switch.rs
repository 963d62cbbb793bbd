//! Switch the current kubectl context between environments.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::PlatformConfig;
use crate::domain::Environment;
use crate::tools::{self, get_tool_path};
use crate::ui;

pub async fn execute(config: &PlatformConfig, target: Environment) -> Result<()> {
    tools::preflight(&[tools::tools::KUBECTL])?;

    let namespace = match target.namespace(config) {
        Some(ns) => ns,
        None => {
            anyhow::bail!("The local environment has no cluster namespace to switch to.");
        }
    };

    let namespace_flag = format!("--namespace={namespace}");
    let status = Command::new(get_tool_path("kubectl"))
        .args([
            "config",
            "set-context",
            "--current",
            namespace_flag.as_str(),
        ])
        .status()
        .await
        .context("Failed to switch context")?;

    if !status.success() {
        anyhow::bail!("kubectl set-context failed with exit code {:?}", status.code());
    }

    ui::print_success(&format!("Switched to: {namespace}"));

    Command::new(get_tool_path("kubectl"))
        .args(["get", "pods"])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .context("Failed to list pods")?;

    Ok(())
}
