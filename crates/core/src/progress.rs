//! Analysis Progress
//!
//! Ordered set of pipeline jobs with a derived total percentage. One
//! `AnalysisProgress` belongs to exactly one pipeline run; observers only
//! ever receive cloned snapshots through a [`ProgressSink`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};

/// Lifecycle of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Pending → InProgress → {Completed, Failed}. Staying in a non-terminal
    /// status is allowed so progress can be updated in place.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Pending | JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed | JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One unit of pipeline work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    /// Stable key, unique within one progress set
    pub tag: String,
    /// Human readable name
    pub name: String,
    pub status: JobStatus,
    /// Percentage in [0, 100]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl AnalysisJob {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            status: JobStatus::Pending,
            progress: None,
        }
    }
}

/// Ordered jobs plus the aggregate percentage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    jobs: Vec<AnalysisJob>,
    total_percentage: f64,
}

impl AnalysisProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &[AnalysisJob] {
        &self.jobs
    }

    pub fn job(&self, tag: &str) -> Option<&AnalysisJob> {
        self.jobs.iter().find(|j| j.tag == tag)
    }

    pub fn total_percentage(&self) -> f64 {
        self.total_percentage
    }

    /// True once every job has reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.jobs.iter().all(|j| j.status.is_terminal())
    }

    /// Append a job at the end.
    pub fn add_job(&mut self, job: AnalysisJob) -> AdvisorResult<()> {
        self.ensure_unique(&job.tag)?;
        self.jobs.push(normalize(job));
        self.recalculate();
        Ok(())
    }

    /// Insert a job immediately before `reference_tag`.
    pub fn insert_job_before(
        &mut self,
        reference_tag: &str,
        job: AnalysisJob,
    ) -> AdvisorResult<()> {
        let index = self.index_of(reference_tag)?;
        self.ensure_unique(&job.tag)?;
        self.jobs.insert(index, normalize(job));
        self.recalculate();
        Ok(())
    }

    /// Move a job to `status`, optionally setting its progress.
    ///
    /// Completing a job without an explicit progress sets it to 100.
    pub fn update_job(
        &mut self,
        tag: &str,
        status: JobStatus,
        progress: Option<f64>,
    ) -> AdvisorResult<()> {
        let index = self.index_of(tag)?;
        let job = &mut self.jobs[index];
        if !job.status.can_transition_to(status) {
            return Err(AdvisorError::validation(format!(
                "Job '{}' cannot move from {} to {}",
                tag, job.status, status
            )));
        }
        job.status = status;
        match (status, progress) {
            (_, Some(value)) => job.progress = Some(clamp_percentage(value)),
            (JobStatus::Completed, None) => job.progress = Some(100.0),
            _ => {}
        }
        self.recalculate();
        Ok(())
    }

    pub fn rename_job(&mut self, tag: &str, name: impl Into<String>) -> AdvisorResult<()> {
        let index = self.index_of(tag)?;
        self.jobs[index].name = name.into();
        Ok(())
    }

    /// Emit an immutable snapshot to `sink`.
    pub fn report(&self, sink: &dyn ProgressSink) {
        sink.report(self.clone());
    }

    fn index_of(&self, tag: &str) -> AdvisorResult<usize> {
        self.jobs
            .iter()
            .position(|j| j.tag == tag)
            .ok_or_else(|| AdvisorError::not_found(format!("Unknown job tag '{}'", tag)))
    }

    fn ensure_unique(&self, tag: &str) -> AdvisorResult<()> {
        if self.jobs.iter().any(|j| j.tag == tag) {
            return Err(AdvisorError::validation(format!(
                "Job tag '{}' already exists",
                tag
            )));
        }
        Ok(())
    }

    fn recalculate(&mut self) {
        if self.jobs.is_empty() {
            self.total_percentage = 0.0;
            return;
        }
        let sum: f64 = self.jobs.iter().map(|j| j.progress.unwrap_or(0.0)).sum();
        self.total_percentage = clamp_percentage(sum / self.jobs.len() as f64);
    }
}

fn normalize(mut job: AnalysisJob) -> AnalysisJob {
    job.progress = job.progress.map(clamp_percentage);
    job
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Receiver of progress snapshots.
pub trait ProgressSink: Send + Sync {
    fn report(&self, snapshot: AnalysisProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(AnalysisProgress) + Send + Sync,
{
    fn report(&self, snapshot: AnalysisProgress) {
        self(snapshot)
    }
}
