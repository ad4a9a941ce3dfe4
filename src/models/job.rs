use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(Error::InvalidParams("status")),
        }
    }
}

/// One entry per submitted unit of work. Mutated only by the queue's
/// execution path and by explicit cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub max_retries: u32,
}

impl JobRecord {
    pub fn new(job_id: impl Into<String>, max_retries: u32) -> Self {
        JobRecord {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            attempts: 0,
            max_retries,
        }
    }

    pub const fn is_done(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall time between start and completion, if both happened.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }
}

#[tokio::test]
async fn job_status_from_str() -> anyhow::Result<()> {
    // arrange & act & assert
    assert_eq!(JobStatus::Pending, "pending".parse()?);
    assert_eq!(JobStatus::Cancelled, "cancelled".parse()?);
    assert!("paused".parse::<JobStatus>().is_err());
    Ok(())
}

#[tokio::test]
async fn job_status_is_terminal() -> anyhow::Result<()> {
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
    assert!(JobStatus::Completed.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
    Ok(())
}

#[tokio::test]
async fn job_record_new_is_pending() -> anyhow::Result<()> {
    // act
    let record = JobRecord::new("01ARZ3NDEKTSV4RRFFQ69G5FAV", 3);

    // assert
    assert_eq!(JobStatus::Pending, record.status);
    assert_eq!(0, record.attempts);
    assert_eq!(3, record.max_retries);
    assert!(record.result.is_none());
    assert!(record.error.is_none());
    assert!(record.started_at.is_none());
    assert!(record.completed_at.is_none());
    assert!(!record.is_done());
    Ok(())
}

#[tokio::test]
async fn job_record_serde_round_trip() -> anyhow::Result<()> {
    // arrange
    let mut record = JobRecord::new("01ARZ3NDEKTSV4RRFFQ69G5FAV", 2);
    record.status = JobStatus::Completed;
    record.attempts = 2;
    record.result = Some(serde_json::json!({"value": 42}));
    record.started_at = Some(record.created_at);
    record.completed_at = Some(record.created_at);

    // act
    let json = serde_json::to_string(&record)?;
    let parsed: JobRecord = serde_json::from_str(&json)?;

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

#[tokio::test]
async fn job_record_duration() -> anyhow::Result<()> {
    // arrange
    let mut record = JobRecord::new("01ARZ3NDEKTSV4RRFFQ69G5FAV", 0);
    assert!(record.duration().is_none());

    let started = Utc::now();
    record.started_at = Some(started);
    record.completed_at = Some(started + chrono::Duration::seconds(5));

    // act & assert
    assert_eq!(Some(chrono::Duration::seconds(5)), record.duration());
    Ok(())
}
