use futures::future::join_all;
use tokio::{select, task::JoinHandle};
#[allow(unused_imports)]
use tracing::{debug, error, info, warn};

use crate::models::Error;
use crate::services::jobrunner;
use crate::services::queue::JobQueue;
use std::sync::Arc;

/// Worker pool draining the queue's channel. Jobs in flight interleave at
/// their own suspension points; shutdown closes the channel and joins the
/// workers.
pub struct WorkerService {
    queue: Arc<JobQueue>,
}

impl WorkerService {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }

    pub async fn run(&self) -> Result<(), Error> {
        let queue = &self.queue;
        let workers_count = queue.options.workers_count;
        info!({ workers_count }, "start");

        if workers_count == 0 {
            debug!({ workers_count }, "queue options workers_count equals to 0");
            return Ok(());
        }

        let mut running_workers: Vec<JoinHandle<()>> = Vec::with_capacity(workers_count);
        for idx in 0..workers_count {
            let join_handle = tokio::spawn({
                let queue = Arc::clone(queue);
                async move { run_worker(&queue, idx).await }
            });
            running_workers.push(join_handle);
        }

        queue.shutdown_token.cancelled().await;
        queue.tx.close();
        join_all(running_workers.iter_mut()).await;
        info!("stop");
        Ok(())
    }
}

pub async fn run_worker(queue: &Arc<JobQueue>, idx: usize) {
    info!({ idx }, "run_worker");
    let rx = queue.rx.clone();
    loop {
        select!(
            biased;
            _ = queue.shutdown_token.cancelled() => break,
            res = rx.recv() => match res {
                Ok(entry) => jobrunner::job_run(queue, entry).await,
                Err(_) => break,
            }
        );
    }
    info!({ idx }, "stop_worker");
}
