//! List all sites in the multisite installation.

use anyhow::Result;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::PlatformConfig;
use crate::domain::Environment;
use crate::infrastructure::{RuntimeBackend, RuntimeRole};
use crate::tools::{self, get_tool_path};
use crate::ui;

pub async fn execute(config: &PlatformConfig, env: Option<Environment>) -> Result<()> {
    match env {
        Some(e) if e.is_local() => tools::preflight(&[tools::tools::DOCKER])?,
        _ => tools::preflight(&[tools::tools::KUBECTL])?,
    }

    let backend = RuntimeBackend::from_config(config);

    let handle = match env {
        Some(env) => backend.resolve_handle(env, RuntimeRole::WordPress).await?,
        None => {
            // No environment given: address the current context's namespace
            let namespace = super::current_namespace().await?;
            if namespace.is_empty() {
                anyhow::bail!(
                    "No namespace in the current kubectl context; pass --env or run `mosaic switch`."
                );
            }
            let pod = first_wordpress_pod(&namespace).await?;
            crate::infrastructure::RuntimeHandle::Pod {
                namespace,
                name: pod,
            }
        }
    };

    backend
        .exec(&handle, &["wp", "site", "list", "--fields=blog_id,url"])
        .await?;

    Ok(())
}

async fn first_wordpress_pod(namespace: &str) -> Result<String> {
    let output = Command::new(get_tool_path("kubectl"))
        .args([
            "get",
            "pods",
            "-n",
            namespace,
            "-l",
            "app=wordpress",
            "-o",
            "jsonpath={.items[0].metadata.name}",
        ])
        .stderr(Stdio::inherit())
        .output()
        .await?;

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || name.is_empty() {
        ui::print_error(&format!("No WordPress pod found in {namespace}"));
        anyhow::bail!("no wordpress pod in {namespace}");
    }

    Ok(name)
}
