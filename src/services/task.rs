use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::models::{Error, JobRecord};
use crate::services::JobQueue;

/// A unit of background work. Implementations are registered under a name at
/// startup and invoked by the queue's workers with the arguments captured at
/// enqueue time.
#[async_trait::async_trait]
pub trait Task: Send + Sync + 'static {
    async fn execute(&self, args: Value) -> Result<Value, TaskError>;
}

/// Business-logic failure raised by a task. Contained within the queue and
/// converted into retry/failed transitions, never surfaced to the enqueuer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskError(pub String);

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        TaskError(message.into())
    }
}

/// A task bound to a queue, exposing the enqueue/get_result/cancel surface.
#[derive(Clone)]
pub struct TaskHandle {
    queue: Arc<JobQueue>,
    task: Arc<dyn Task>,
    max_retries: u32,
}

impl TaskHandle {
    pub(crate) fn new(queue: Arc<JobQueue>, task: Arc<dyn Task>, max_retries: u32) -> Self {
        TaskHandle {
            queue,
            task,
            max_retries,
        }
    }

    pub async fn enqueue(&self, args: Value) -> Result<String, Error> {
        self.queue
            .enqueue(Arc::clone(&self.task), args, self.max_retries)
            .await
    }

    pub async fn get_result(&self, job_id: &str) -> Result<Option<JobRecord>, Error> {
        self.queue.get_result(job_id).await
    }

    pub async fn cancel(&self, job_id: &str) -> Result<bool, Error> {
        self.queue.cancel(job_id).await
    }
}

/// Name to handle map, built once at startup and handed to the HTTP layer.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskHandle>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handle: TaskHandle) {
        self.tasks.insert(name.into(), handle);
    }

    pub fn get(&self, name: &str) -> Option<&TaskHandle> {
        self.tasks.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobStatus, QueueOptions};
    use crate::store::MemoryStore;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    struct NoopTask;

    #[async_trait::async_trait]
    impl Task for NoopTask {
        async fn execute(&self, args: Value) -> Result<Value, TaskError> {
            Ok(args)
        }
    }

    fn idle_queue() -> Arc<JobQueue> {
        // No workers attached; records stay pending.
        Arc::new(JobQueue::new(
            Arc::new(MemoryStore::new()),
            QueueOptions::default(),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn registry_resolves_by_name() -> anyhow::Result<()> {
        // arrange
        let queue = idle_queue();
        let mut registry = TaskRegistry::new();
        registry.register("noop", queue.register(Arc::new(NoopTask), 3));

        // act & assert
        assert!(registry.get("noop").is_some());
        assert!(registry.get("other").is_none());
        assert_eq!(vec!["noop".to_owned()], registry.names());
        Ok(())
    }

    #[tokio::test]
    async fn handle_enqueue_creates_pending_record() -> anyhow::Result<()> {
        // arrange
        let queue = idle_queue();
        let handle = queue.register(Arc::new(NoopTask), 2);

        // act
        let job_id = handle.enqueue(json!({"x": 1})).await?;
        let record = handle.get_result(&job_id).await?.expect("record");

        // assert
        assert_eq!(job_id, record.job_id);
        assert_eq!(JobStatus::Pending, record.status);
        assert_eq!(0, record.attempts);
        assert_eq!(2, record.max_retries);
        Ok(())
    }
}
