use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::{select, time};
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

use crate::models::{Error, JobRecord, JobStatus};
use crate::services::queue::{JobEntry, JobQueue};
use crate::store::JobStore;

// Bounded retry for store writes: an outage must not mark the job failed,
// only abandon the transition.
const STORE_RETRY_COUNT: u32 = 3;
const STORE_RETRY_DELAY: Duration = Duration::from_millis(250);

pub async fn job_run(queue: &JobQueue, entry: JobEntry) {
    let job_id = entry.job_id.clone();
    if let Err(err) = job_run_with_error(queue, entry).await {
        error!({ job_id = %job_id }, "run error {:?}", err);
    }
}

async fn job_run_with_error(queue: &JobQueue, entry: JobEntry) -> Result<(), Error> {
    let job_id = entry.job_id.as_str();
    let Some(mut record) = queue.store.get(job_id).await? else {
        warn!({ job_id = %job_id }, "==> record missing, skip");
        return Ok(());
    };
    if record.is_done() {
        // Cancelled or already finished before a worker picked it up;
        // the callable is never invoked.
        debug!({ job_id = %job_id, status = record.status.as_str() }, "==> terminal, skip");
        return Ok(());
    }

    record.status = JobStatus::Running;
    record.started_at.get_or_insert_with(Utc::now);
    record.attempts += 1;
    let attempts = record.attempts;
    let max_retries = record.max_retries;
    put_with_retry(&queue.store, &record).await?;
    debug!({ job_id = %job_id, attempts }, "==> run");

    let outcome = entry.task.execute(entry.args.clone()).await;

    // Reload before writing the outcome: a cancel may have landed while the
    // task ran, and a terminal status is never overridden.
    let Some(mut record) = queue.store.get(job_id).await? else {
        return Ok(());
    };
    if record.is_done() {
        debug!({ job_id = %job_id, status = record.status.as_str() }, "==> terminal, result dropped");
        return Ok(());
    }

    match outcome {
        Ok(value) => {
            record.status = JobStatus::Completed;
            record.result = Some(value);
            record.completed_at = Some(Utc::now());
            put_with_retry(&queue.store, &record).await?;
            debug!({ job_id = %job_id, attempts }, "==> completed");
        }
        Err(err) => match queue.options.backoff.next_delay_in(attempts, max_retries) {
            Some(delay) => {
                record.status = JobStatus::Pending;
                put_with_retry(&queue.store, &record).await?;
                debug!({ job_id = %job_id, attempts }, "==> retry in {:?}: {}", delay, err);
                requeue_after(queue, entry, delay);
            }
            None => {
                record.status = JobStatus::Failed;
                record.error = Some(err.to_string());
                record.completed_at = Some(Utc::now());
                put_with_retry(&queue.store, &record).await?;
                warn!({ job_id = %job_id, attempts }, "==> failed: {}", err);
            }
        },
    }
    Ok(())
}

fn requeue_after(queue: &JobQueue, entry: JobEntry, delay: Duration) {
    let tx = queue.tx.clone();
    let token = queue.shutdown_token.clone();
    tokio::spawn(async move {
        select!(
            biased;
            _ = token.cancelled() => {},
            _ = time::sleep(delay) => {
                _ = tx.send(entry).await;
            }
        );
    });
}

async fn put_with_retry(store: &Arc<dyn JobStore>, record: &JobRecord) -> Result<(), Error> {
    let mut tries = 0;
    loop {
        match store.put(record).await {
            Ok(()) => return Ok(()),
            Err(err @ Error::StoreUnavailable(_)) => {
                tries += 1;
                if tries >= STORE_RETRY_COUNT {
                    return Err(err);
                }
                warn!({ job_id = %record.job_id }, "store put failed, retrying {:?}", err);
                time::sleep(STORE_RETRY_DELAY).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::models::{QueueOptions, RetryBackoff};
    use crate::services::task::{Task, TaskError};
    use crate::services::WorkerService;
    use crate::store::MemoryStore;

    fn store_down() -> Error {
        Error::StoreUnavailable(redis::RedisError::from(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "store down",
        )))
    }

    /// Delegates to a memory store, failing the next `failures` writes.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
    }

    impl FlakyStore {
        fn new() -> Self {
            FlakyStore {
                inner: MemoryStore::new(),
                failures: AtomicU32::new(0),
            }
        }

        fn fail_next_puts(&self, count: u32) {
            self.failures.store(count, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl JobStore for FlakyStore {
        async fn put(&self, record: &JobRecord) -> Result<(), Error> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(store_down());
            }
            self.inner.put(record).await
        }

        async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, Error> {
            self.inner.get(job_id).await
        }

        async fn list(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>, Error> {
            self.inner.list(status).await
        }

        async fn ping(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    /// Store with the network gone: every call fails.
    struct DownStore;

    #[async_trait::async_trait]
    impl JobStore for DownStore {
        async fn put(&self, _record: &JobRecord) -> Result<(), Error> {
            Err(store_down())
        }

        async fn get(&self, _job_id: &str) -> Result<Option<JobRecord>, Error> {
            Err(store_down())
        }

        async fn list(&self, _status: Option<JobStatus>) -> Result<Vec<JobRecord>, Error> {
            Err(store_down())
        }

        async fn ping(&self) -> Result<(), Error> {
            Err(store_down())
        }
    }

    struct OkTask;

    #[async_trait::async_trait]
    impl Task for OkTask {
        async fn execute(&self, _args: Value) -> Result<Value, TaskError> {
            Ok(json!({ "ok": true }))
        }
    }

    fn queue_with(store: Arc<dyn JobStore>) -> Arc<JobQueue> {
        let options = QueueOptions {
            workers_count: 1,
            backoff: RetryBackoff::new(10),
            default_max_retries: 3,
        };
        Arc::new(JobQueue::new(store, options, CancellationToken::new()))
    }

    fn start_workers(queue: &Arc<JobQueue>) {
        let service = WorkerService::new(Arc::clone(queue));
        _ = tokio::spawn(async move { service.run().await });
    }

    async fn wait_done(queue: &JobQueue, job_id: &str) -> JobRecord {
        for _ in 0..1000 {
            if let Ok(Some(record)) = queue.get_result(job_id).await {
                if record.is_done() {
                    return record;
                }
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {job_id} did not reach a terminal state in time");
    }

    #[tokio::test]
    async fn transient_store_outage_is_ridden_out() -> anyhow::Result<()> {
        // arrange: the record exists, then the store drops two writes
        let store = Arc::new(FlakyStore::new());
        let queue = queue_with(Arc::clone(&store) as Arc<dyn JobStore>);
        let job_id = queue.enqueue(Arc::new(OkTask), Value::Null, 0).await?;
        store.fail_next_puts(2);
        start_workers(&queue);

        // act
        let record = wait_done(&queue, &job_id).await;

        // assert: the bounded write retry absorbed the outage
        assert_eq!(JobStatus::Completed, record.status);
        assert_eq!(1, record.attempts);
        assert!(record.error.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn store_outage_never_marks_job_failed() -> anyhow::Result<()> {
        // arrange: writes stay broken past the bounded retry budget
        let store = Arc::new(FlakyStore::new());
        let queue = queue_with(Arc::clone(&store) as Arc<dyn JobStore>);
        let job_id = queue.enqueue(Arc::new(OkTask), Value::Null, 0).await?;
        store.fail_next_puts(u32::MAX);
        start_workers(&queue);

        // act: outlast STORE_RETRY_COUNT x STORE_RETRY_DELAY
        time::sleep(STORE_RETRY_DELAY * (STORE_RETRY_COUNT + 2)).await;
        let record = queue.get_result(&job_id).await?.expect("record");

        // assert: the transition was abandoned, not converted into `failed`
        assert_eq!(JobStatus::Pending, record.status);
        assert_eq!(0, record.attempts);
        assert!(record.error.is_none());
        assert!(record.completed_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn enqueue_surfaces_store_outage_to_caller() -> anyhow::Result<()> {
        // arrange
        let queue = queue_with(Arc::new(DownStore));

        // act
        let res = queue.enqueue(Arc::new(OkTask), Value::Null, 0).await;

        // assert: infrastructure failure, not a job failure
        assert!(matches!(res, Err(Error::StoreUnavailable(_))));
        Ok(())
    }

    #[tokio::test]
    async fn reads_surface_store_outage_to_caller() -> anyhow::Result<()> {
        // arrange
        let queue = queue_with(Arc::new(DownStore));

        // act & assert
        assert!(matches!(
            queue.get_result("01ARZ3NDEKTSV4RRFFQ69G5FAV").await,
            Err(Error::StoreUnavailable(_))
        ));
        assert!(matches!(
            queue.cancel("01ARZ3NDEKTSV4RRFFQ69G5FAV").await,
            Err(Error::StoreUnavailable(_))
        ));
        assert!(matches!(
            queue.list_jobs(None).await,
            Err(Error::StoreUnavailable(_))
        ));
        Ok(())
    }
}
