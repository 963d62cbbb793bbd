//! Direct media asset transfer between a bucket and the local installation.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::error::ValidationError;
use crate::tools::{self, get_tool_path};
use crate::ui;

pub async fn download(bucket: &str, profile: &str, blog_id: Option<u64>) -> Result<()> {
    tools::preflight(&[tools::tools::AWS])?;
    let wp_content = local_wp_content()?;

    let (source, dest) = match blog_id {
        Some(id) => (
            format!("s3://{bucket}/uploads/sites/{id}"),
            wp_content
                .join("uploads")
                .join("sites")
                .join(id.to_string()),
        ),
        None => (format!("s3://{bucket}"), wp_content),
    };

    sync(&source, &dest.display().to_string(), profile, &[]).await?;
    ui::print_success("Download complete.");
    Ok(())
}

pub async fn upload(bucket: &str, profile: &str, blog_id: Option<u64>) -> Result<()> {
    tools::preflight(&[tools::tools::AWS])?;
    let uploads = local_wp_content()?.join("uploads");

    let (source, dest) = match blog_id {
        Some(id) => (
            uploads.join("sites").join(id.to_string()),
            format!("s3://{bucket}/uploads/sites/{id}"),
        ),
        None => (uploads, format!("s3://{bucket}/uploads")),
    };

    sync(
        &source.display().to_string(),
        &dest,
        profile,
        &["--acl=public-read"],
    )
    .await?;
    ui::print_success("Upload complete.");
    Ok(())
}

/// The local installation's wp-content directory, which only exists after
/// the site has been brought up locally at least once.
fn local_wp_content() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    if !cwd.join("wordpress").is_dir() {
        return Err(ValidationError::LocalInstallMissing {
            path: cwd.display().to_string(),
        }
        .into());
    }
    Ok(cwd.join("wordpress").join("wp-content"))
}

async fn sync(source: &str, dest: &str, profile: &str, extra: &[&str]) -> Result<()> {
    ui::print_info(&format!("aws s3 sync {source} -> {dest}"));

    let mut args = vec!["s3", "sync", source, dest, "--profile", profile];
    args.extend(extra);

    let status = Command::new(get_tool_path("aws"))
        .args(&args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .context("Failed to run aws s3 sync")?;

    if !status.success() {
        anyhow::bail!("aws s3 sync failed with exit code {:?}", status.code());
    }

    Ok(())
}

