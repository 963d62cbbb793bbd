//! Display the operator's current cluster connection, optionally with the
//! namespace's decoded WordPress secrets.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tokio::process::Command;

use crate::config::PlatformConfig;
use crate::infrastructure::SecretResolver;
use crate::tools::{self, get_tool_path};
use crate::ui;

pub async fn execute(config: &PlatformConfig, secrets: bool) -> Result<()> {
    tools::preflight(&[tools::tools::KUBECTL])?;

    let namespace = super::current_namespace().await?;
    ui::print_info(&format!("Your current namespace: {namespace}"));

    if !secrets {
        return Ok(());
    }

    let resolver = SecretResolver::from_config(config);
    let secret_name = resolver.find_secret_name(&namespace).await?;

    ui::print_info(&format!("Secret: {secret_name}"));

    let output = Command::new(get_tool_path("kubectl"))
        .args([
            "get",
            "secret",
            secret_name.as_str(),
            "-n",
            namespace.as_str(),
            "-o",
            "json",
        ])
        .output()
        .await
        .context("Failed to read secret")?;

    if !output.status.success() {
        anyhow::bail!(
            "kubectl get secret failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let secret: Value = serde_json::from_slice(&output.stdout).context("Malformed secret JSON")?;
    let data = secret
        .get("data")
        .and_then(|d| d.as_object())
        .context("Secret has no data section")?;

    for (key, value) in data {
        let decoded = value
            .as_str()
            .and_then(|v| BASE64.decode(v).ok())
            .map(|b| String::from_utf8_lossy(&b).to_string())
            .unwrap_or_else(|| "<binary>".to_string());
        println!("  {key}={decoded}");
    }

    Ok(())
}
