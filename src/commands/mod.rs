//! CLI command implementations
//!
//! One module per command; each exposes thin `execute` functions that wire
//! configuration and infrastructure into the services layer.

pub mod db;
pub mod jump;
pub mod migrate;
pub mod releases;
pub mod rollback;
pub mod s3;
pub mod setup;
pub mod sites;
pub mod status;
pub mod switch;

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::tools::get_tool_path;

/// Namespace of the operator's current kubectl context
pub(crate) async fn current_namespace() -> Result<String> {
    let output = Command::new(get_tool_path("kubectl"))
        .args(["config", "view", "--minify", "-o", "jsonpath={..namespace}"])
        .output()
        .await
        .context("Failed to read current kubectl context")?;

    if !output.status.success() {
        anyhow::bail!(
            "kubectl config view failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
