//! Migration domain types
//!
//! The migration request, the transient dump artifact, and the pipeline
//! state machine the orchestrator walks through. Everything here is created
//! fresh per invocation and torn down by pipeline end or abort.

use chrono::NaiveDateTime;

use crate::domain::Environment;
use crate::error::ValidationError;

/// One migration job, built from CLI input and never persisted
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    pub source: Environment,
    pub target: Environment,
    /// Restrict the whole pipeline to one tenant
    pub blog_id: Option<u64>,
    /// Keep production domains instead of collapsing onto the platform domain
    pub keep_prod_domain: bool,
    /// Mirror the media store after import
    pub sync_media: bool,
}

impl MigrationRequest {
    /// Reject invalid requests before any side effect
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.is_local() {
            return Err(ValidationError::SourceIsLocal);
        }
        if self.source == self.target {
            return Err(ValidationError::SameEnvironment(
                self.source.as_str().to_string(),
            ));
        }
        Ok(())
    }
}

/// The transient SQL dump, named from the source environment, optional
/// tenant marker, and a timestamp. Must not outlive the pipeline run.
#[derive(Debug, Clone)]
pub struct TransferArtifact {
    pub file_name: String,
}

impl TransferArtifact {
    pub fn new(
        prefix: &str,
        source: Environment,
        blog_id: Option<u64>,
        stamp: NaiveDateTime,
    ) -> Self {
        let site_label = match blog_id {
            Some(id) => format!("-site-{id}"),
            None => String::new(),
        };
        Self {
            file_name: format!(
                "{}-{}{}-{}.sql",
                prefix,
                source.as_str(),
                site_label,
                stamp.format("%Y-%m-%d-%H-%M-%S")
            ),
        }
    }

    /// Where the dump lands on the operator's machine (current directory)
    pub fn local_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.file_name)
    }
}

/// Steps of the migration pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Export,
    CopyToLocal,
    RemoveFromSourceRuntime,
    CopyToTarget,
    Import,
    RemoveFromTargetRuntime,
    RewriteUrls,
    RewriteDomains,
    SyncMedia,
}

impl PipelineStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Export => "Export",
            Self::CopyToLocal => "Copy to local",
            Self::RemoveFromSourceRuntime => "Clean up source runtime",
            Self::CopyToTarget => "Copy to target",
            Self::Import => "Import",
            Self::RemoveFromTargetRuntime => "Clean up target runtime",
            Self::RewriteUrls => "Rewrite URLs",
            Self::RewriteDomains => "Rewrite domains",
            Self::SyncMedia => "Sync media",
        }
    }
}

/// Outcome of one executed step
#[derive(Debug)]
pub struct StepOutcome {
    pub step: PipelineStep,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
}

/// Terminal state of a pipeline run
#[derive(Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Every step ran
    Completed,
    /// Halted at the first failing step; no rollback of earlier steps
    Aborted(PipelineStep),
    /// The operator declined the production confirmation; nothing ran
    Cancelled,
}

/// The full outcome trail of one pipeline run, for diagnostics
#[derive(Debug)]
pub struct PipelineReport {
    pub outcomes: Vec<StepOutcome>,
    pub status: RunStatus,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            outcomes: Vec::new(),
            status: RunStatus::Cancelled,
        }
    }

    /// Record a step result. Returns `true` if the pipeline may continue;
    /// the runner, not the step, decides to halt.
    pub fn record(
        &mut self,
        step: PipelineStep,
        result: Result<String, crate::error::MigrateError>,
    ) -> bool {
        match result {
            Ok(message) => {
                self.outcomes.push(StepOutcome {
                    step,
                    success: true,
                    exit_code: Some(0),
                    message: if message.is_empty() {
                        None
                    } else {
                        Some(message)
                    },
                });
                true
            }
            Err(e) => {
                self.outcomes.push(StepOutcome {
                    step,
                    success: false,
                    exit_code: Some(e.exit_code()),
                    message: Some(e.to_string()),
                });
                self.status = RunStatus::Aborted(step);
                false
            }
        }
    }

    /// Process exit code for this run: the failing step's code, or 0
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Completed | RunStatus::Cancelled => 0,
            RunStatus::Aborted(step) => self
                .outcomes
                .iter()
                .find(|o| o.step == step)
                .and_then(|o| o.exit_code)
                .unwrap_or(1),
        }
    }
}

impl Default for PipelineReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandExecutionError, MigrateError};
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_request_rejects_local_source() {
        let request = MigrationRequest {
            source: Environment::Local,
            target: Environment::Dev,
            blog_id: None,
            keep_prod_domain: false,
            sync_media: true,
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::SourceIsLocal)
        ));
    }

    #[test]
    fn test_request_rejects_same_environment() {
        let request = MigrationRequest {
            source: Environment::Dev,
            target: Environment::Dev,
            blog_id: None,
            keep_prod_domain: false,
            sync_media: true,
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::SameEnvironment(_))
        ));
    }

    #[test]
    fn test_artifact_file_name() {
        let artifact = TransferArtifact::new("mosaic-platform", Environment::Dev, None, stamp());
        assert_eq!(
            artifact.file_name,
            "mosaic-platform-dev-2024-03-09-14-30-05.sql"
        );

        let scoped = TransferArtifact::new("mosaic-platform", Environment::Prod, Some(5), stamp());
        assert_eq!(
            scoped.file_name,
            "mosaic-platform-prod-site-5-2024-03-09-14-30-05.sql"
        );
    }

    #[test]
    fn test_report_records_and_halts() {
        let mut report = PipelineReport::new();
        assert!(report.record(PipelineStep::Export, Ok(String::new())));
        assert!(report.record(PipelineStep::CopyToLocal, Ok("copied".to_string())));

        let failure: Result<String, MigrateError> = Err(CommandExecutionError::NonZeroExit {
            command: "wp db import".to_string(),
            code: Some(3),
        }
        .into());
        assert!(!report.record(PipelineStep::Import, failure));

        assert_eq!(report.status, RunStatus::Aborted(PipelineStep::Import));
        assert_eq!(report.exit_code(), 3);
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].success);
        assert!(!report.outcomes[2].success);
    }

    #[test]
    fn test_completed_report_exits_zero() {
        let mut report = PipelineReport::new();
        report.record(PipelineStep::Export, Ok(String::new()));
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_cancelled_report_is_empty_and_clean() {
        let report = PipelineReport::cancelled();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.exit_code(), 0);
    }
}
