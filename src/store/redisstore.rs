use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::models::{Error, JobRecord, JobStatus};

use super::JobStore;

/// Redis-backed store. Records are JSON strings under `{prefix}{job_id}`,
/// shared by every process pointed at the same instance. An optional TTL lets
/// the store expire finished records on its own; the queue never deletes them.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    ttl: Option<u64>,
}

impl RedisStore {
    pub async fn connect(
        url: &str,
        prefix: impl Into<String>,
        ttl: Option<u64>,
    ) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(RedisStore {
            conn,
            prefix: prefix.into(),
            ttl,
        })
    }

    fn key(&self, job_id: &str) -> String {
        job_key(&self.prefix, job_id)
    }
}

fn job_key(prefix: &str, job_id: &str) -> String {
    format!("{prefix}{job_id}")
}

#[async_trait::async_trait]
impl JobStore for RedisStore {
    async fn put(&self, record: &JobRecord) -> Result<(), Error> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        match self.ttl {
            Some(secs) => {
                let _: () = conn.set_ex(self.key(&record.job_id), payload, secs).await?;
            }
            None => {
                let _: () = conn.set(self.key(&record.job_id), payload).await?;
            }
        }
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, Error> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(self.key(job_id)).await?;
        match payload {
            None => Ok(None),
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        }
    }

    async fn list(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>, Error> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(format!("{}*", self.prefix)).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            // A key may expire between KEYS and GET.
            let payload: Option<String> = conn.get(&key).await?;
            let Some(s) = payload else { continue };
            let record: JobRecord = serde_json::from_str(&s)?;
            if status.map_or(true, |st| record.status == st) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn ping(&self) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn key_is_prefixed() -> anyhow::Result<()> {
        // No live Redis in unit tests; key layout is still part of the
        // persisted-state contract.
        assert_eq!(
            "backq:jobs:01ARZ3NDEKTSV4RRFFQ69G5FAV",
            job_key("backq:jobs:", "01ARZ3NDEKTSV4RRFFQ69G5FAV")
        );
        Ok(())
    }

    #[tokio::test]
    async fn stored_payload_round_trips_all_fields() -> anyhow::Result<()> {
        // arrange
        let mut record = JobRecord::new("01ARZ3NDEKTSV4RRFFQ69G5FAV", 1);
        record.status = JobStatus::Failed;
        record.attempts = 2;
        record.error = Some("boom".to_owned());
        record.started_at = Some(record.created_at);
        record.completed_at = Some(record.created_at);

        // act
        let payload = serde_json::to_string(&record)?;
        let parsed: JobRecord = serde_json::from_str(&payload)?;

        // assert
        assert_eq!(record.job_id, parsed.job_id);
        assert_eq!(record.status, parsed.status);
        assert_eq!(record.result, parsed.result);
        assert_eq!(record.error, parsed.error);
        assert_eq!(record.created_at, parsed.created_at);
        assert_eq!(record.started_at, parsed.started_at);
        assert_eq!(record.completed_at, parsed.completed_at);
        assert_eq!(record.attempts, parsed.attempts);
        assert_eq!(record.max_retries, parsed.max_retries);
        Ok(())
    }
}
