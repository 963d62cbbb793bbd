//! One-time operator setup: AWS CLI profiles from namespace secrets.
//!
//! Each namespace exposes credential secrets for its S3 bucket, RDS instance
//! and ECR repository. This imports them as AWS profiles named
//! `<namespace>-<resource>`, which the media-sync commands rely on.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tokio::process::Command;

use crate::tools::{self, get_tool_path};
use crate::ui;

pub async fn create_profiles() -> Result<()> {
    tools::preflight(&[tools::tools::KUBECTL, tools::tools::AWS])?;

    let namespace = super::current_namespace().await?;
    ui::print_info(&format!("Your current namespace: {namespace}"));

    if !ui::confirm("Do you wish to proceed?")? {
        return Ok(());
    }

    let resources = [
        ("s3", "s3-bucket-output".to_string()),
        ("rds", "rds-instance-output".to_string()),
        ("ecr", format!("ecr-repo-{namespace}")),
    ];

    for (key, secret_name) in resources {
        let (access_key_id, secret_access_key) =
            read_credentials(&namespace, &secret_name).await?;

        let profile = format!("{namespace}-{key}");
        let csv_file = format!("{profile}-profile.csv");
        let csv = format!(
            "User Name,Access key ID,Secret access key\n{profile},{access_key_id},{secret_access_key}\n"
        );
        std::fs::write(&csv_file, csv).context("Failed to write profile CSV")?;

        let csv_url = format!("file://{csv_file}");
        let import = Command::new(get_tool_path("aws"))
            .args(["configure", "import", "--csv", csv_url.as_str()])
            .status()
            .await
            .context("Failed to import AWS profile")?;

        // The CSV holds live credentials; remove it before acting on failure
        std::fs::remove_file(&csv_file).ok();

        if !import.success() {
            anyhow::bail!("aws configure import failed for {profile}");
        }

        for (setting, value) in [("region", "eu-west-2"), ("output", "json")] {
            let status = Command::new(get_tool_path("aws"))
                .args(["configure", "set", setting, value, "--profile", profile.as_str()])
                .status()
                .await
                .context("Failed to configure AWS profile")?;
            if !status.success() {
                anyhow::bail!("aws configure set {setting} failed for {profile}");
            }
        }

        ui::print_success(&format!("AWS profile created: {profile}"));
    }

    Ok(())
}

async fn read_credentials(namespace: &str, secret_name: &str) -> Result<(String, String)> {
    let output = Command::new(get_tool_path("kubectl"))
        .args(["get", "secret", secret_name, "-n", namespace, "-o", "json"])
        .output()
        .await
        .context("Failed to read credential secret")?;

    if !output.status.success() {
        anyhow::bail!(
            "kubectl get secret {} failed: {}",
            secret_name,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let secret: Value = serde_json::from_slice(&output.stdout).context("Malformed secret JSON")?;

    let decode = |key: &str| -> Result<String> {
        secret
            .get("data")
            .and_then(|d| d.get(key))
            .and_then(|v| v.as_str())
            .and_then(|v| BASE64.decode(v).ok())
            .map(|b| String::from_utf8_lossy(&b).trim().to_string())
            .with_context(|| format!("secret {secret_name} has no {key} entry"))
    };

    Ok((decode("access_key_id")?, decode("secret_access_key")?))
}
