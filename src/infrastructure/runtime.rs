//! Environment runtime backend
//!
//! Resolves how to run a command inside, and move files into or out of, an
//! environment's WordPress runtime. Cloud environments are reached through
//! `kubectl exec`/`kubectl cp` against a pod discovered by role label; the
//! local environment is a fixed Docker container and never touches the
//! cluster.

use std::path::Path;
use std::process::Stdio;

use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, ListParams},
    Client, Config,
};
use tokio::process::Command;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::domain::{Environment, TransportKind};
use crate::error::{CommandExecutionError, DiscoveryError, TransferError};
use crate::tools::get_tool_path;

/// WordPress files live here inside both the pod and the local container
const RUNTIME_WORKDIR: &str = "/var/www/html";

/// Which runtime of an environment to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeRole {
    /// The WordPress application runtime (wp-cli lives here)
    WordPress,
    /// The utility pod with AWS tooling, used for bucket-to-bucket sync
    Service,
}

impl RuntimeRole {
    pub fn label_selector(&self) -> &'static str {
        match self {
            Self::WordPress => "app=wordpress",
            Self::Service => "app=service-pod",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WordPress => "wordpress",
            Self::Service => "service-pod",
        }
    }
}

/// A resolved runtime instance commands can be addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeHandle {
    Pod { namespace: String, name: String },
    LocalContainer { name: String },
}

/// Backend for executing commands and transferring files in any environment
pub struct RuntimeBackend {
    namespace_prefix: String,
    local_container: String,
    /// Retry budget delegated to `kubectl cp --retries`
    copy_retries: u32,
}

impl RuntimeBackend {
    pub fn from_config(config: &PlatformConfig) -> Self {
        Self {
            namespace_prefix: config.namespace_prefix.clone(),
            local_container: config.local_container.clone(),
            copy_retries: config.copy_retries,
        }
    }

    /// Discover the running runtime instance for an environment.
    ///
    /// Container-exec environments short-circuit to the fixed container
    /// without any cluster access. Pod-exec environments list running pods
    /// in the environment's namespace filtered by role label and take the
    /// first.
    pub async fn resolve_handle(
        &self,
        env: Environment,
        role: RuntimeRole,
    ) -> Result<RuntimeHandle, DiscoveryError> {
        if env.capabilities().transport == TransportKind::ContainerExec {
            return Ok(RuntimeHandle::LocalContainer {
                name: self.local_container.clone(),
            });
        }

        let namespace = format!("{}-{}", self.namespace_prefix, env.as_str());
        let client = create_client().await?;
        let pods: Api<Pod> = Api::namespaced(client, &namespace);

        let lp = ListParams::default().labels(role.label_selector());
        let pod_list = pods
            .list(&lp)
            .await
            .map_err(|e| DiscoveryError::ClusterUnreachable(e.to_string()))?;

        let name = pod_list
            .items
            .into_iter()
            .filter(|p| {
                p.status
                    .as_ref()
                    .and_then(|s| s.phase.as_deref())
                    .map(|phase| phase == "Running")
                    .unwrap_or(false)
            })
            .filter_map(|p| p.metadata.name)
            .next()
            .ok_or_else(|| DiscoveryError::PodNotFound {
                role: role.name().to_string(),
                namespace: namespace.clone(),
            })?;

        debug!("Resolved {} runtime in {}: {}", role.name(), namespace, name);

        Ok(RuntimeHandle::Pod { namespace, name })
    }

    /// The command prefix required to run a command inside this runtime
    pub fn exec_args(&self, handle: &RuntimeHandle) -> Vec<String> {
        match handle {
            RuntimeHandle::LocalContainer { name } => vec![
                get_tool_path("docker"),
                "exec".to_string(),
                name.clone(),
            ],
            RuntimeHandle::Pod { namespace, name } => vec![
                get_tool_path("kubectl"),
                "exec".to_string(),
                "-n".to_string(),
                namespace.clone(),
                "-c".to_string(),
                "wordpress".to_string(),
                format!("pod/{name}"),
                "--".to_string(),
            ],
        }
    }

    /// Run a command inside the runtime, streaming its output through
    pub async fn exec(
        &self,
        handle: &RuntimeHandle,
        cmd: &[&str],
    ) -> Result<(), CommandExecutionError> {
        let mut args = self.exec_args(handle);
        args.extend(cmd.iter().map(|s| s.to_string()));
        let cmdline = args.join(" ");

        debug!("exec: {}", cmdline);

        let status = Command::new(&args[0])
            .args(&args[1..])
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| CommandExecutionError::Spawn {
                command: cmdline.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(CommandExecutionError::NonZeroExit {
                command: cmdline,
                code: status.code(),
            });
        }

        Ok(())
    }

    /// Run a command inside the runtime, capturing stdout
    pub async fn exec_capture(
        &self,
        handle: &RuntimeHandle,
        cmd: &[&str],
    ) -> Result<String, CommandExecutionError> {
        let mut args = self.exec_args(handle);
        args.extend(cmd.iter().map(|s| s.to_string()));
        let cmdline = args.join(" ");

        debug!("exec (capture): {}", cmdline);

        let output = Command::new(&args[0])
            .args(&args[1..])
            .output()
            .await
            .map_err(|e| CommandExecutionError::Spawn {
                command: cmdline.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CommandExecutionError::NonZeroExit {
                command: cmdline,
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Copy a file out of the runtime onto the operator's machine
    pub async fn copy_from_runtime(
        &self,
        handle: &RuntimeHandle,
        remote_file: &str,
        local_path: &Path,
    ) -> Result<(), TransferError> {
        let args = self.copy_out_args(handle, remote_file, local_path);
        self.run_copy(args, format!("{remote_file} out of the runtime"))
            .await
    }

    /// Copy a local file into the runtime
    pub async fn copy_to_runtime(
        &self,
        handle: &RuntimeHandle,
        local_path: &Path,
        remote_file: &str,
    ) -> Result<(), TransferError> {
        let args = self.copy_in_args(handle, local_path, remote_file);
        self.run_copy(args, format!("{} into the runtime", local_path.display()))
            .await
    }

    fn copy_out_args(
        &self,
        handle: &RuntimeHandle,
        remote_file: &str,
        local_path: &Path,
    ) -> Vec<String> {
        match handle {
            RuntimeHandle::LocalContainer { name } => vec![
                get_tool_path("docker"),
                "cp".to_string(),
                format!("{name}:{RUNTIME_WORKDIR}/{remote_file}"),
                local_path.display().to_string(),
            ],
            RuntimeHandle::Pod { namespace, name } => vec![
                get_tool_path("kubectl"),
                "cp".to_string(),
                format!("--retries={}", self.copy_retries),
                "-n".to_string(),
                namespace.clone(),
                "-c".to_string(),
                "wordpress".to_string(),
                format!("{name}:{remote_file}"),
                local_path.display().to_string(),
            ],
        }
    }

    fn copy_in_args(
        &self,
        handle: &RuntimeHandle,
        local_path: &Path,
        remote_file: &str,
    ) -> Vec<String> {
        match handle {
            RuntimeHandle::LocalContainer { name } => vec![
                get_tool_path("docker"),
                "cp".to_string(),
                local_path.display().to_string(),
                format!("{name}:{RUNTIME_WORKDIR}/{remote_file}"),
            ],
            RuntimeHandle::Pod { namespace, name } => vec![
                get_tool_path("kubectl"),
                "cp".to_string(),
                format!("--retries={}", self.copy_retries),
                "-n".to_string(),
                namespace.clone(),
                "-c".to_string(),
                "wordpress".to_string(),
                local_path.display().to_string(),
                format!("{name}:{remote_file}"),
            ],
        }
    }

    async fn run_copy(&self, args: Vec<String>, description: String) -> Result<(), TransferError> {
        debug!("copy: {}", args.join(" "));

        let status = Command::new(&args[0])
            .args(&args[1..])
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| TransferError::Spawn(e.to_string()))?;

        if !status.success() {
            return Err(TransferError::CopyFailed {
                description,
                code: status.code(),
            });
        }

        Ok(())
    }
}

/// Create Kubernetes client
pub async fn create_client() -> Result<Client, DiscoveryError> {
    let config = Config::infer()
        .await
        .map_err(|e| DiscoveryError::ClusterUnreachable(e.to_string()))?;

    Client::try_from(config).map_err(|e| DiscoveryError::ClusterUnreachable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RuntimeBackend {
        RuntimeBackend::from_config(&PlatformConfig::default())
    }

    fn pod_handle() -> RuntimeHandle {
        RuntimeHandle::Pod {
            namespace: "mosaic-platform-dev".to_string(),
            name: "wordpress-7f9b".to_string(),
        }
    }

    #[tokio::test]
    async fn test_local_handle_skips_discovery() {
        // No cluster is reachable in tests; local must still resolve
        let handle = backend()
            .resolve_handle(Environment::Local, RuntimeRole::WordPress)
            .await
            .unwrap();
        assert_eq!(
            handle,
            RuntimeHandle::LocalContainer {
                name: "wordpress".to_string()
            }
        );
    }

    #[test]
    fn test_exec_prefix_local() {
        let args = backend().exec_args(&RuntimeHandle::LocalContainer {
            name: "wordpress".to_string(),
        });
        assert_eq!(args, vec!["docker", "exec", "wordpress"]);
    }

    #[test]
    fn test_exec_prefix_pod() {
        let args = backend().exec_args(&pod_handle());
        assert_eq!(
            args,
            vec![
                "kubectl",
                "exec",
                "-n",
                "mosaic-platform-dev",
                "-c",
                "wordpress",
                "pod/wordpress-7f9b",
                "--",
            ]
        );
    }

    #[test]
    fn test_copy_args_carry_retry_budget() {
        let args = backend().copy_out_args(&pod_handle(), "dump.sql", Path::new("dump.sql"));
        assert!(args.contains(&"--retries=10".to_string()));
        assert!(args.contains(&"wordpress-7f9b:dump.sql".to_string()));

        let args = backend().copy_in_args(&pod_handle(), Path::new("dump.sql"), "dump.sql");
        assert!(args.contains(&"--retries=10".to_string()));
    }

    #[test]
    fn test_local_copy_uses_container_workdir() {
        let handle = RuntimeHandle::LocalContainer {
            name: "wordpress".to_string(),
        };
        let args = backend().copy_in_args(&handle, Path::new("dump.sql"), "dump.sql");
        assert_eq!(
            args,
            vec!["docker", "cp", "dump.sql", "wordpress:/var/www/html/dump.sql"]
        );
    }

    #[test]
    fn test_role_label_selectors() {
        assert_eq!(RuntimeRole::WordPress.label_selector(), "app=wordpress");
        assert_eq!(RuntimeRole::Service.label_selector(), "app=service-pod");
    }
}
