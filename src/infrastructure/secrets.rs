//! Runtime secret resolution
//!
//! Each cloud environment carries a generated WordPress secret object named
//! `{prefix}-<digits>`. The resolver locates the current one and decodes
//! individual entries, most importantly the media bucket name. Local has no
//! secrets; every lookup short-circuits to "not applicable".

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::domain::Environment;
use crate::error::{CommandExecutionError, DiscoveryError, MigrateError};
use crate::tools::get_tool_path;

/// Resolves per-environment runtime secrets
pub struct SecretResolver {
    namespace_prefix: String,
    secret_prefix: String,
    bucket_key: String,
}

impl SecretResolver {
    pub fn from_config(config: &PlatformConfig) -> Self {
        Self {
            namespace_prefix: config.namespace_prefix.clone(),
            secret_prefix: config.secret_prefix.clone(),
            bucket_key: config.bucket_secret_key.clone(),
        }
    }

    /// The media bucket for an environment; `None` for local, which keeps
    /// its uploads on the local filesystem.
    pub async fn bucket_name(&self, env: Environment) -> Result<Option<String>, MigrateError> {
        if !env.capabilities().supports_secrets {
            return Ok(None);
        }

        let namespace = format!("{}-{}", self.namespace_prefix, env.as_str());
        let secret_name = self.find_secret_name(&namespace).await?;
        let bucket = self
            .decode_entry(&namespace, &secret_name, &self.bucket_key)
            .await?;

        Ok(Some(bucket))
    }

    /// Locate the environment's current WordPress secret by name pattern
    pub async fn find_secret_name(&self, namespace: &str) -> Result<String, MigrateError> {
        let kubectl = get_tool_path("kubectl");
        let output = Command::new(&kubectl)
            .args(["get", "secrets", "-n", namespace, "-o", "name"])
            .output()
            .await
            .map_err(|e| {
                MigrateError::from(CommandExecutionError::Spawn {
                    command: format!("{kubectl} get secrets -n {namespace}"),
                    message: e.to_string(),
                })
            })?;

        if !output.status.success() {
            return Err(CommandExecutionError::NonZeroExit {
                command: format!("{kubectl} get secrets -n {namespace}"),
                code: output.status.code(),
            }
            .into());
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let pattern = format!("{}-[0-9]+", regex::escape(&self.secret_prefix));

        match_secret_name(&listing, &pattern).ok_or_else(|| {
            DiscoveryError::SecretNotFound {
                pattern,
                namespace: namespace.to_string(),
            }
            .into()
        })
    }

    /// Decode one entry of a secret via jsonpath + base64
    pub async fn decode_entry(
        &self,
        namespace: &str,
        secret_name: &str,
        key: &str,
    ) -> Result<String, MigrateError> {
        let kubectl = get_tool_path("kubectl");
        let jsonpath = format!("jsonpath={{.data.{key}}}");
        let output = Command::new(&kubectl)
            .args([
                "get",
                "secret",
                secret_name,
                "-n",
                namespace,
                "-o",
                jsonpath.as_str(),
            ])
            .output()
            .await
            .map_err(|e| {
                MigrateError::from(CommandExecutionError::Spawn {
                    command: format!("{kubectl} get secret {secret_name}"),
                    message: e.to_string(),
                })
            })?;

        if !output.status.success() {
            return Err(CommandExecutionError::NonZeroExit {
                command: format!("{kubectl} get secret {secret_name} -n {namespace}"),
                code: output.status.code(),
            }
            .into());
        }

        let encoded = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if encoded.is_empty() {
            return Err(DiscoveryError::SecretKeyMissing {
                name: secret_name.to_string(),
                key: key.to_string(),
            }
            .into());
        }

        let decoded = BASE64.decode(&encoded).map_err(|_| {
            MigrateError::from(DiscoveryError::SecretKeyMissing {
                name: secret_name.to_string(),
                key: key.to_string(),
            })
        })?;

        let value = String::from_utf8_lossy(&decoded).trim().to_string();
        debug!("decoded {key} from {secret_name}");
        Ok(value)
    }
}

/// Pick the first secret matching the pattern out of a `-o name` listing
fn match_secret_name(listing: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    listing
        .lines()
        .filter_map(|line| re.find(line))
        .map(|m| m.as_str().to_string())
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_has_no_bucket() {
        let resolver = SecretResolver::from_config(&PlatformConfig::default());
        let bucket = resolver.bucket_name(Environment::Local).await.unwrap();
        assert_eq!(bucket, None);
    }

    #[test]
    fn test_match_secret_name() {
        let listing = "secret/default-token-abcde\n\
                       secret/mosaic-wp-secrets-86751\n\
                       secret/tls-cert\n";
        assert_eq!(
            match_secret_name(listing, "mosaic-wp-secrets-[0-9]+"),
            Some("mosaic-wp-secrets-86751".to_string())
        );
    }

    #[test]
    fn test_match_secret_name_no_match() {
        let listing = "secret/default-token-abcde\nsecret/tls-cert\n";
        assert_eq!(match_secret_name(listing, "mosaic-wp-secrets-[0-9]+"), None);
    }

    #[test]
    fn test_match_secret_name_first_wins() {
        let listing = "secret/mosaic-wp-secrets-111\nsecret/mosaic-wp-secrets-222\n";
        assert_eq!(
            match_secret_name(listing, "mosaic-wp-secrets-[0-9]+"),
            Some("mosaic-wp-secrets-111".to_string())
        );
    }
}
