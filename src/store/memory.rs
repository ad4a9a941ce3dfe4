use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::{Error, JobRecord, JobStatus};

use super::JobStore;

/// In-process store. Lost on restart, single process only. The lock guards
/// read-modify-write sequences on a record against lost updates.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryStore {
    async fn put(&self, record: &JobRecord) -> Result<(), Error> {
        self.jobs
            .write()
            .await
            .insert(record.job_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, Error> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn list(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>, Error> {
        let jobs = self.jobs.read().await;
        let records = jobs
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        Ok(records)
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}
