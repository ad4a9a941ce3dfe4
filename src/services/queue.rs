use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

use crate::models::{Error, JobRecord, JobStatus, QueueOptions};
use crate::services::task::{Task, TaskHandle};
use crate::store::JobStore;

/// One scheduled execution, passed to workers over the channel. The record in
/// the store stays the single source of truth for status; the entry only
/// carries what cannot be persisted.
#[derive(Clone)]
pub struct JobEntry {
    pub job_id: String,
    pub task: Arc<dyn Task>,
    pub args: Value,
}

impl std::fmt::Debug for JobEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEntry")
            .field("job_id", &self.job_id)
            .finish()
    }
}

/// Job queue orchestration: enqueue, status queries and cancellation. The
/// queue exclusively owns writes to job records; callers only read.
pub struct JobQueue {
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) options: QueueOptions,
    pub(crate) tx: async_channel::Sender<JobEntry>,
    pub(crate) rx: async_channel::Receiver<JobEntry>,
    pub(crate) shutdown_token: CancellationToken,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn JobStore>,
        options: QueueOptions,
        shutdown_token: CancellationToken,
    ) -> Self {
        // Unbounded: enqueue must never block the caller on worker capacity,
        // and backoff requeues must not deadlock against a full buffer.
        let (tx, rx) = async_channel::unbounded::<JobEntry>();
        JobQueue {
            store,
            options,
            tx,
            rx,
            shutdown_token,
        }
    }

    /// Binds a task to this queue under a fixed retry ceiling.
    pub fn register(self: &Arc<Self>, task: Arc<dyn Task>, max_retries: u32) -> TaskHandle {
        TaskHandle::new(Arc::clone(self), task, max_retries)
    }

    /// Creates a pending record, persists it and schedules execution.
    /// Fire-and-forget: returns the job id without waiting for a worker.
    pub async fn enqueue(
        &self,
        task: Arc<dyn Task>,
        args: Value,
        max_retries: u32,
    ) -> Result<String, Error> {
        let job_id = ulid::Ulid::new().to_string();
        let record = JobRecord::new(&job_id, max_retries);
        self.store.put(&record).await?;

        let entry = JobEntry {
            job_id: job_id.clone(),
            task,
            args,
        };
        self.tx.send(entry).await.map_err(|_| Error::QueueClosed)?;
        debug!({ job_id = %job_id, max_retries }, "==> enqueue");
        Ok(job_id)
    }

    pub async fn get_result(&self, job_id: &str) -> Result<Option<JobRecord>, Error> {
        self.store.get(job_id).await
    }

    /// Marks a pending or running job cancelled. Returns `false` for unknown
    /// ids and for jobs already in a terminal state. Best-effort for running
    /// jobs: the callable is not interrupted, but its result is discarded by
    /// the terminal-state-wins rule in the runner.
    pub async fn cancel(&self, job_id: &str) -> Result<bool, Error> {
        let Some(mut record) = self.store.get(job_id).await? else {
            return Ok(false);
        };
        if record.is_done() {
            return Ok(false);
        }
        record.status = JobStatus::Cancelled;
        record.completed_at = Some(Utc::now());
        self.store.put(&record).await?;
        debug!({ job_id = %job_id }, "==> cancel");
        Ok(true)
    }

    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>, Error> {
        self.store.list(status).await
    }

    pub async fn ping(&self) -> Result<(), Error> {
        self.store.ping().await
    }
}
