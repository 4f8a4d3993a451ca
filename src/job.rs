//! Non-blocking job handle with progress polling.

use crate::cancel::CancelToken;
use crate::driver::{StreamProgress, StreamReport};
use crate::error::{Error, Result};
use crossbeam_channel::Receiver;
use std::thread::JoinHandle;

/// Status of a background processing job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// No progress yet (just started).
    Pending,
    /// Processing is under way.
    Running(StreamProgress),
    /// Finished successfully; the output is finalized.
    Complete(StreamReport),
    /// Stopped by [`JobHandle::cancel`]; the output is left incomplete.
    Cancelled(StreamReport),
    /// Failed with an error message.
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete(_) | JobStatus::Cancelled(_) | JobStatus::Failed(_)
        )
    }
}

/// Handle to a background job started by
/// [`ProcessBuilder::start`](crate::ProcessBuilder::start).
///
/// # Example
/// ```no_run
/// use retempo::{JobStatus, ProcessBuilder};
///
/// let mut job = ProcessBuilder::new("in.wav", "out.wav").tempo(1.2).start()?;
/// loop {
///     match job.progress() {
///         JobStatus::Running(p) => println!("{:.0}%", p.fraction().unwrap_or(0.0) * 100.0),
///         JobStatus::Pending => {}
///         done => {
///             println!("{done:?}");
///             break;
///         }
///     }
///     std::thread::sleep(std::time::Duration::from_millis(50));
/// }
/// # Ok::<(), retempo::Error>(())
/// ```
pub struct JobHandle {
    progress_rx: Receiver<StreamProgress>,
    thread: Option<JoinHandle<Result<StreamReport>>>,
    last_progress: Option<StreamProgress>,
    finished: Option<JobStatus>,
    cancel: CancelToken,
}

impl JobHandle {
    pub(crate) fn new(
        progress_rx: Receiver<StreamProgress>,
        thread: JoinHandle<Result<StreamReport>>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            progress_rx,
            thread: Some(thread),
            last_progress: None,
            finished: None,
            cancel,
        }
    }

    /// Poll for the latest status (non-blocking).
    pub fn progress(&mut self) -> JobStatus {
        while let Ok(p) = self.progress_rx.try_recv() {
            self.last_progress = Some(p);
        }

        if let Some(status) = &self.finished {
            return status.clone();
        }
        if self.thread.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(thread) = self.thread.take() {
                let status = status_from(thread.join());
                self.finished = Some(status.clone());
                return status;
            }
        }

        match self.last_progress {
            Some(p) => JobStatus::Running(p),
            None => JobStatus::Pending,
        }
    }

    /// Request cooperative cancellation. Takes effect between chunks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if the job has finished (non-blocking).
    pub fn is_done(&self) -> bool {
        self.finished.is_some()
            || self
                .thread
                .as_ref()
                .map(|t| t.is_finished())
                .unwrap_or(true)
    }

    /// Block until the job finishes and return its report.
    pub fn wait(mut self) -> Result<StreamReport> {
        if let Some(thread) = self.thread.take() {
            let result = thread
                .join()
                .unwrap_or_else(|_| Err(Error::Job("processing thread panicked".into())));
            if let Err(e) = &result {
                tracing::error!(error = %e, "background job failed");
            }
            return result;
        }
        match self.finished.take() {
            Some(JobStatus::Complete(report)) | Some(JobStatus::Cancelled(report)) => Ok(report),
            Some(JobStatus::Failed(message)) => Err(Error::Job(message)),
            _ => Err(Error::Job("job result already taken".into())),
        }
    }
}

fn status_from(joined: std::thread::Result<Result<StreamReport>>) -> JobStatus {
    match joined {
        Ok(Ok(report)) if report.cancelled => JobStatus::Cancelled(report),
        Ok(Ok(report)) => JobStatus::Complete(report),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "background job failed");
            JobStatus::Failed(e.to_string())
        }
        Err(_) => {
            tracing::error!("background job panicked");
            JobStatus::Failed("processing thread panicked".into())
        }
    }
}
