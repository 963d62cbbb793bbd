//! Media store synchronization
//!
//! Mirrors the uploads bucket between environments. Cloud-to-cloud sync runs
//! inside the target's service pod (which holds the AWS credentials for both
//! buckets); cloud-to-local pulls the source bucket into the operator's
//! checkout using the namespace-scoped AWS profile created by
//! `mosaic setup create-profiles`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::domain::Environment;
use crate::error::{CommandExecutionError, MigrateError, ValidationError};
use crate::infrastructure::{RuntimeBackend, RuntimeRole, SecretResolver};
use crate::tools::get_tool_path;

/// Synchronizes the media object store between environments
pub struct MediaSync<'a> {
    backend: &'a RuntimeBackend,
    secrets: &'a SecretResolver,
    namespace_prefix: String,
}

impl<'a> MediaSync<'a> {
    pub fn new(
        backend: &'a RuntimeBackend,
        secrets: &'a SecretResolver,
        config: &crate::config::PlatformConfig,
    ) -> Self {
        Self {
            backend,
            secrets,
            namespace_prefix: config.namespace_prefix.clone(),
        }
    }

    /// Mirror the source bucket into the target bucket, scoped to one
    /// tenant's sub-path when `blog_id` is set. Runs as a single blocking
    /// sync inside the target's service pod.
    pub async fn sync_buckets(
        &self,
        source: Environment,
        target: Environment,
        blog_id: Option<u64>,
    ) -> Result<(), MigrateError> {
        let source_bucket = self.require_bucket(source).await?;
        let target_bucket = self.require_bucket(target).await?;

        let handle = self
            .backend
            .resolve_handle(target, RuntimeRole::Service)
            .await?;

        let script = bucket_sync_script(&source_bucket, &target_bucket, blog_id);
        debug!("bucket sync: {script}");

        self.backend
            .exec(&handle, &["sh", "-c", &script])
            .await
            .map_err(MigrateError::from)
    }

    /// Pull the source bucket into the local installation's asset directory.
    ///
    /// Requires the `wordpress/` tree generated by running the site locally;
    /// uses the `<namespace>-s3` AWS profile.
    pub async fn pull_to_local(
        &self,
        source: Environment,
        blog_id: Option<u64>,
        workspace: &Path,
    ) -> Result<(), MigrateError> {
        if !workspace.join("wordpress").is_dir() {
            return Err(ValidationError::LocalInstallMissing {
                path: workspace.display().to_string(),
            }
            .into());
        }

        let bucket = self.require_bucket(source).await?;
        let profile = format!("{}-{}-s3", self.namespace_prefix, source.as_str());

        let args = local_sync_args(&bucket, blog_id, workspace, &profile);
        let cmdline = args.join(" ");
        debug!("local media sync: {}", cmdline);

        let status = Command::new(&args[0])
            .args(&args[1..])
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                MigrateError::from(CommandExecutionError::Spawn {
                    command: cmdline.clone(),
                    message: e.to_string(),
                })
            })?;

        if !status.success() {
            return Err(CommandExecutionError::NonZeroExit {
                command: cmdline,
                code: status.code(),
            }
            .into());
        }

        Ok(())
    }

    async fn require_bucket(&self, env: Environment) -> Result<String, MigrateError> {
        self.secrets
            .bucket_name(env)
            .await?
            .ok_or_else(|| {
                // Callers route local targets to pull_to_local; reaching here
                // with a secretless environment is a programming error but
                // surfaces as a clean message rather than a panic.
                MigrateError::from(CommandExecutionError::Spawn {
                    command: "bucket lookup".to_string(),
                    message: format!("environment '{env}' has no media bucket"),
                })
            })
    }
}

/// Tenant-scoped uploads prefix inside the bucket
pub fn uploads_prefix(blog_id: Option<u64>) -> String {
    match blog_id {
        Some(id) => format!("uploads/sites/{id}"),
        None => "uploads".to_string(),
    }
}

/// The shell command run inside the service pod for bucket-to-bucket sync
fn bucket_sync_script(source_bucket: &str, target_bucket: &str, blog_id: Option<u64>) -> String {
    let prefix = uploads_prefix(blog_id);
    format!(
        "aws s3 sync s3://{source_bucket}/{prefix} s3://{target_bucket}/{prefix} --acl=public-read"
    )
}

/// aws CLI invocation for pulling media into the local checkout
fn local_sync_args(
    bucket: &str,
    blog_id: Option<u64>,
    workspace: &Path,
    profile: &str,
) -> Vec<String> {
    let wp_content: PathBuf = workspace.join("wordpress").join("wp-content");

    let (source, dest) = match blog_id {
        Some(id) => (
            format!("s3://{bucket}/uploads/sites/{id}"),
            wp_content
                .join("uploads")
                .join("sites")
                .join(id.to_string())
                .display()
                .to_string(),
        ),
        None => (format!("s3://{bucket}"), wp_content.display().to_string()),
    };

    vec![
        get_tool_path("aws"),
        "s3".to_string(),
        "sync".to_string(),
        "--quiet".to_string(),
        "--profile".to_string(),
        profile.to_string(),
        source,
        dest,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploads_prefix() {
        assert_eq!(uploads_prefix(None), "uploads");
        assert_eq!(uploads_prefix(Some(5)), "uploads/sites/5");
    }

    #[test]
    fn test_bucket_sync_script_whole_installation() {
        let script = bucket_sync_script("src-bucket", "tgt-bucket", None);
        assert_eq!(
            script,
            "aws s3 sync s3://src-bucket/uploads s3://tgt-bucket/uploads --acl=public-read"
        );
    }

    #[test]
    fn test_bucket_sync_script_single_tenant() {
        let script = bucket_sync_script("src-bucket", "tgt-bucket", Some(7));
        assert!(script.contains("s3://src-bucket/uploads/sites/7"));
        assert!(script.contains("s3://tgt-bucket/uploads/sites/7"));
    }

    #[test]
    fn test_local_sync_args_whole_installation() {
        let args = local_sync_args("media-bucket", None, Path::new("/work"), "ns-s3");
        assert!(args.contains(&"s3://media-bucket".to_string()));
        assert!(args.contains(&"/work/wordpress/wp-content".to_string()));
        assert!(args.contains(&"--profile".to_string()));
        assert!(args.contains(&"ns-s3".to_string()));
    }

    #[test]
    fn test_local_sync_args_single_tenant() {
        let args = local_sync_args("media-bucket", Some(5), Path::new("/work"), "ns-s3");
        assert!(args.contains(&"s3://media-bucket/uploads/sites/5".to_string()));
        assert!(args.contains(&"/work/wordpress/wp-content/uploads/sites/5".to_string()));
    }
}
