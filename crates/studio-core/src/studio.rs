use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::StudioError;
use crate::jobs::{JobKind, JobPlan, JobRequest, PlannedOutput, Workspace};
use crate::naming::collect_segments;
use crate::runner::{ProcessRunner, ToolRunner};

/// Outcome of a finished job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub kind: JobKind,
    pub outputs: Vec<PathBuf>,
    /// Diagnostic text the tool wrote to stderr.
    pub diagnostics: String,
    pub elapsed_ms: f64,
    pub finished_at: DateTime<Utc>,
}

/// Plans jobs against a workspace and runs them through a [`ToolRunner`].
#[derive(Clone)]
pub struct Studio {
    workspace: Arc<Workspace>,
    runner: Arc<dyn ToolRunner>,
}

impl Studio {
    pub fn new(workspace: Workspace, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            workspace: Arc::new(workspace),
            runner,
        }
    }

    /// A studio that runs the real external tool.
    pub fn with_process_runner(workspace: Workspace) -> Self {
        Self::new(workspace, Arc::new(ProcessRunner))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn plan(&self, request: &JobRequest) -> Result<JobPlan, StudioError> {
        request.plan(&self.workspace)
    }

    /// Plan and execute a job, blocking until the tool exits.
    pub fn run(&self, request: &JobRequest) -> Result<JobReport, StudioError> {
        let plan = self.plan(request)?;
        self.execute(plan)
    }

    pub fn execute(&self, plan: JobPlan) -> Result<JobReport, StudioError> {
        fs::create_dir_all(&self.workspace.output_dir)?;
        if plan.kind == JobKind::UltraClean && !self.workspace.denoise_model.exists() {
            warn!(
                model = %self.workspace.denoise_model.display(),
                "denoise model not found; arnndn will fail"
            );
        }

        info!(job = %plan.kind, command = %plan.command, "running job");
        let started_wall = SystemTime::now();
        let started = Instant::now();

        let diagnostics = self.runner.run(&plan.command)?;

        let outputs = match plan.output {
            PlannedOutput::File(path) => vec![path],
            PlannedOutput::Segments { dir, prefix } => {
                collect_segments(&dir, &prefix, started_wall)?
            }
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;

        info!(
            job = %plan.kind,
            outputs = ?outputs,
            elapsed_ms,
            "job finished"
        );

        Ok(JobReport {
            kind: plan.kind,
            outputs,
            diagnostics,
            elapsed_ms,
            finished_at: Utc::now(),
        })
    }
}
