use std::sync::Arc;

use crate::models::{Error, JobRecord, JobStatus};

pub use memory::MemoryStore;
pub use redisstore::RedisStore;

mod memory;
mod redisstore;

pub const DEFAULT_KEY_PREFIX: &str = "backq:jobs:";

/// Storage abstraction for job records, addressable by `job_id`.
///
/// `put` inserts or overwrites, `get` is a point lookup and `list` returns
/// records in unspecified order. Connection errors surface as
/// `Error::StoreUnavailable` and are never recorded as job failures.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, record: &JobRecord) -> Result<(), Error>;
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, Error>;
    async fn list(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>, Error>;
    async fn ping(&self) -> Result<(), Error>;
}

/// Store selection, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Redis {
        url: String,
        prefix: String,
        ttl: Option<u64>,
    },
}

pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn JobStore>, Error> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::Redis { url, prefix, ttl } => {
            let store = RedisStore::connect(url, prefix, *ttl).await?;
            Ok(Arc::new(store))
        }
    }
}
