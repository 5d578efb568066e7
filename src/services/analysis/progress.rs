//! Progress Tracking
//!
//! [`ProgressTracker`] owns one run's [`AnalysisProgress`] and pushes a
//! snapshot to its sink after every mutation. The built-in sinks cover
//! concurrent readers (watch channel), logs, and silence.

use std::sync::Arc;

use game_advisor_core::{AdvisorResult, AnalysisJob, AnalysisProgress, JobStatus, ProgressSink};
use tokio::sync::watch;

/// Per-run progress owner. Writes go through `&mut self`, so one run has
/// exactly one writer.
pub struct ProgressTracker {
    progress: AnalysisProgress,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            progress: AnalysisProgress::new(),
            sink,
        }
    }

    /// Tracker that reports nowhere.
    pub fn detached() -> Self {
        Self::new(Arc::new(NoopProgressSink))
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> AnalysisProgress {
        self.progress.clone()
    }

    pub fn progress(&self) -> &AnalysisProgress {
        &self.progress
    }

    pub fn has_job(&self, tag: &str) -> bool {
        self.progress.job(tag).is_some()
    }

    pub fn add_job(&mut self, tag: &str, name: &str) -> AdvisorResult<()> {
        self.progress.add_job(AnalysisJob::new(tag, name))?;
        self.emit();
        Ok(())
    }

    pub fn insert_job_before(
        &mut self,
        reference_tag: &str,
        tag: &str,
        name: &str,
    ) -> AdvisorResult<()> {
        self.progress
            .insert_job_before(reference_tag, AnalysisJob::new(tag, name))?;
        self.emit();
        Ok(())
    }

    pub fn start(&mut self, tag: &str) -> AdvisorResult<()> {
        self.update(tag, JobStatus::InProgress, Some(0.0))
    }

    /// Report partial progress on a running job.
    pub fn advance(&mut self, tag: &str, percentage: f64) -> AdvisorResult<()> {
        self.update(tag, JobStatus::InProgress, Some(percentage))
    }

    /// Mark completed, starting the job first if it is still pending.
    pub fn complete(&mut self, tag: &str) -> AdvisorResult<()> {
        self.ensure_started(tag)?;
        self.update(tag, JobStatus::Completed, None)
    }

    /// Mark failed. The job still counts as finished work in the total.
    pub fn fail(&mut self, tag: &str) -> AdvisorResult<()> {
        self.ensure_started(tag)?;
        self.update(tag, JobStatus::Failed, Some(100.0))
    }

    /// Rename to "<name> (skipped)" and complete.
    pub fn skip(&mut self, tag: &str) -> AdvisorResult<()> {
        let name = match self.progress.job(tag) {
            Some(job) => format!("{} (skipped)", job.name),
            None => tag.to_string(),
        };
        self.progress.rename_job(tag, name)?;
        self.complete(tag)
    }

    fn ensure_started(&mut self, tag: &str) -> AdvisorResult<()> {
        match self.progress.job(tag) {
            Some(job) if job.status == JobStatus::Pending => self.start(tag),
            _ => Ok(()),
        }
    }

    fn update(&mut self, tag: &str, status: JobStatus, progress: Option<f64>) -> AdvisorResult<()> {
        self.progress.update_job(tag, status, progress)?;
        self.emit();
        Ok(())
    }

    fn emit(&self) {
        self.progress.report(self.sink.as_ref());
    }
}

/// Publishes snapshots on a `tokio::sync::watch` channel.
pub struct WatchProgressSink {
    sender: watch::Sender<AnalysisProgress>,
}

impl WatchProgressSink {
    pub fn channel() -> (Self, watch::Receiver<AnalysisProgress>) {
        let (sender, receiver) = watch::channel(AnalysisProgress::new());
        (Self { sender }, receiver)
    }
}

impl ProgressSink for WatchProgressSink {
    fn report(&self, snapshot: AnalysisProgress) {
        // No receivers left is fine
        let _ = self.sender.send(snapshot);
    }
}

/// Logs each snapshot through tracing.
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn report(&self, snapshot: AnalysisProgress) {
        let running: Vec<&str> = snapshot
            .jobs()
            .iter()
            .filter(|j| j.status == JobStatus::InProgress)
            .map(|j| j.name.as_str())
            .collect();
        tracing::info!(
            "[Progress] {:>5.1}% {}",
            snapshot.total_percentage(),
            running.join(", ")
        );
    }
}

pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn report(&self, _snapshot: AnalysisProgress) {}
}
