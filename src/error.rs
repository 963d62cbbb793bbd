//! Centralized error types for the mosaic CLI
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Top-level error type for migration operations
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Command error: {0}")]
    CommandExecution(#[from] CommandExecutionError),

    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MigrateError {
    /// Exit code to propagate when this error aborts the process.
    ///
    /// Where the underlying external command reported an exit code, that
    /// code is surfaced; everything else maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandExecution(CommandExecutionError::NonZeroExit { code, .. }) => {
                code.unwrap_or(1)
            }
            Self::Transfer(TransferError::CopyFailed { code, .. }) => code.unwrap_or(1),
            Self::Rewrite(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Invalid CLI input, reported before any side effect
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("migrating from the local environment is not supported")]
    SourceIsLocal,

    #[error("source and target are both '{0}'; nothing to migrate")]
    SameEnvironment(String),

    #[error("not an SQL file: {path}")]
    NotSqlFile { path: String },

    #[error("file not found or unreadable: {path}")]
    FileMissing { path: String },

    #[error(
        "the dump contains multisite tables (wp_blogs, wp_site); drop --blog-id to import \
         the whole installation, which overwrites every site"
    )]
    MultisiteDumpWithTenantScope,

    #[error(
        "the dump looks like a single-site export; pass --blog-id with the site to import into"
    )]
    SingleSiteDumpWithoutTenantScope,

    #[error("site with blog ID {0} not found in the site registry")]
    UnknownTenant(u64),

    #[error("site with blog ID {blog_id} does not exist in the {environment} installation")]
    SiteNotFound { blog_id: u64, environment: String },

    #[error("only {found} tables found for blog {blog_id}; refusing a partial tenant export")]
    IncompleteTenantTables { blog_id: u64, found: usize },

    #[error("could not determine the database origin; aborting")]
    UnknownOrigin,

    #[error(
        "wordpress installation not found under {path}; run from the platform checkout root \
         after bringing the local site up at least once"
    )]
    LocalInstallMissing { path: String },
}

/// The named environment's runtime instance cannot be located
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("no running {role} pod found in namespace {namespace}")]
    PodNotFound { role: String, namespace: String },

    #[error("failed to reach the cluster: {0}")]
    ClusterUnreachable(String),

    #[error("no secret matching '{pattern}' in namespace {namespace}")]
    SecretNotFound { pattern: String, namespace: String },

    #[error("secret {name} has no {key} entry")]
    SecretKeyMissing { name: String, key: String },
}

/// A file copy into or out of a runtime failed after its retry budget
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("copy {description} failed{}", exit_suffix(.code))]
    CopyFailed {
        description: String,
        code: Option<i32>,
    },

    #[error("failed to spawn copy command: {0}")]
    Spawn(String),
}

/// An in-runtime command (export, import, sync) returned non-zero
#[derive(Error, Debug)]
pub enum CommandExecutionError {
    #[error("command failed{}: {command}", exit_suffix(.code))]
    NonZeroExit { command: String, code: Option<i32> },

    #[error("failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },
}

/// The URL/domain rewrite operation failed
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("search-replace of '{from}' -> '{to}' failed{}", exit_suffix(.code))]
    SearchReplaceFailed {
        from: String,
        to: String,
        code: Option<i32>,
    },

    #[error("updating the stored domain/path for blog {blog_id} failed{}", exit_suffix(.code))]
    TenantUpdateFailed { blog_id: u64, code: Option<i32> },

    #[error("toggling the login-lockdown plugin failed{}", exit_suffix(.code))]
    LockdownToggleFailed { code: Option<i32> },
}

impl RewriteError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::SearchReplaceFailed { code, .. }
            | Self::TenantUpdateFailed { code, .. }
            | Self::LockdownToggleFailed { code } => code.unwrap_or(1),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to parse config: {message}")]
    ParseError { message: String },

    #[error("failed to load the site registry: {message}")]
    RegistryLoad { message: String },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" (exit code {c})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_from_command_failure() {
        let err = MigrateError::from(CommandExecutionError::NonZeroExit {
            command: "wp db import dump.sql".to_string(),
            code: Some(2),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        let err = MigrateError::from(ValidationError::SourceIsLocal);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_conversion() {
        let transfer = TransferError::CopyFailed {
            description: "dump out of source pod".to_string(),
            code: Some(1),
        };
        let err: MigrateError = transfer.into();
        assert!(matches!(err, MigrateError::Transfer(_)));
    }

    #[test]
    fn test_display_includes_exit_code() {
        let err = RewriteError::SearchReplaceFailed {
            from: "a.example.org".to_string(),
            to: "b.example.org".to_string(),
            code: Some(255),
        };
        assert!(err.to_string().contains("exit code 255"));
    }
}
