//! Shell into the WordPress runtime of an environment.

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::config::PlatformConfig;
use crate::domain::Environment;
use crate::infrastructure::{RuntimeBackend, RuntimeHandle, RuntimeRole};
use crate::tools::{self, get_tool_path};

pub async fn execute(config: &PlatformConfig, target: Environment) -> Result<()> {
    if target.is_local() {
        tools::preflight(&[tools::tools::DOCKER])?;
    } else {
        tools::preflight(&[tools::tools::KUBECTL])?;
    }

    let backend = RuntimeBackend::from_config(config);
    let handle = backend.resolve_handle(target, RuntimeRole::WordPress).await?;

    // Interactive shell needs a TTY, so this builds its own exec invocation
    // instead of going through the backend's non-interactive prefix.
    let status = match &handle {
        RuntimeHandle::LocalContainer { name } => Command::new(get_tool_path("docker"))
            .args(["exec", "-it", name, "bash"])
            .status()
            .await
            .context("Failed to exec into the local container")?,
        RuntimeHandle::Pod { namespace, name } => {
            let pod_ref = format!("pod/{name}");
            Command::new(get_tool_path("kubectl"))
                .args([
                    "exec",
                    "-it",
                    "-n",
                    namespace.as_str(),
                    "-c",
                    "wordpress",
                    pod_ref.as_str(),
                    "--",
                    "bash",
                ])
                .status()
                .await
                .context("Failed to exec into the pod")?
        }
    };

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }

    Ok(())
}
