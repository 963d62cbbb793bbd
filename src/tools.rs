//! Runtime tool path resolution
//!
//! External tools (kubectl, docker, aws, helm) are resolved through a
//! `{TOOL}_BIN` environment variable, falling back to PATH-based invocation
//! when the variable is not set. This keeps packaged installs able to pin
//! exact tool paths while plain `cargo install` users rely on PATH.

use std::env;

use anyhow::{bail, Result};

/// Get the path to an external tool
///
/// Checks for an environment variable `{TOOL}_BIN` (uppercase tool name +
/// "_BIN"). Falls back to the tool name itself if the envvar is not set,
/// which relies on PATH.
pub fn get_tool_path(tool: &str) -> String {
    let env_var = format!("{}_BIN", tool.to_uppercase());
    env::var(&env_var).unwrap_or_else(|_| tool.to_string())
}

/// Verify that the named tools are invocable before any side effect.
///
/// A `{TOOL}_BIN` override is trusted as-is; PATH fallbacks are checked
/// with `which`.
pub fn preflight(required: &[&str]) -> Result<()> {
    let mut missing = Vec::new();

    for tool in required {
        let env_var = format!("{}_BIN", tool.to_uppercase());
        if env::var(&env_var).is_ok() {
            continue;
        }
        if which::which(tool).is_err() {
            missing.push(*tool);
        }
    }

    if !missing.is_empty() {
        bail!(
            "required tools not found on PATH: {}. Install them or set the \
             corresponding {{TOOL}}_BIN environment variable.",
            missing.join(", ")
        );
    }

    Ok(())
}

/// Common tool names (for documentation and IDE autocomplete)
pub mod tools {
    pub const KUBECTL: &str = "kubectl";
    pub const DOCKER: &str = "docker";
    pub const AWS: &str = "aws";
    pub const HELM: &str = "helm";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_tool_path_from_env() {
        env::set_var("TEST_TOOL_BIN", "/custom/path/to/test-tool");
        assert_eq!(get_tool_path("test-tool"), "/custom/path/to/test-tool");
        env::remove_var("TEST_TOOL_BIN");
    }

    #[test]
    fn test_get_tool_path_fallback() {
        env::remove_var("MISSING_TOOL_BIN");
        assert_eq!(get_tool_path("missing-tool"), "missing-tool");
    }

    #[test]
    fn test_preflight_honors_env_override() {
        env::set_var("NOT_A_REAL_TOOL_BIN", "/nonexistent/but/trusted");
        assert!(preflight(&["not-a-real-tool"]).is_ok());
        env::remove_var("NOT_A_REAL_TOOL_BIN");
    }

    #[test]
    fn test_preflight_reports_missing() {
        env::remove_var("DEFINITELY_MISSING_TOOL_BIN");
        let err = preflight(&["definitely-missing-tool"]).unwrap_err();
        assert!(err.to_string().contains("definitely-missing-tool"));
    }
}
