use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time;

use crate::services::{Task, TaskError};

/// Returns its arguments unchanged.
pub struct EchoTask;

#[async_trait]
impl Task for EchoTask {
    async fn execute(&self, args: Value) -> Result<Value, TaskError> {
        Ok(args)
    }
}

/// Sleeps for `{"ms": n}` milliseconds. Handy for poking at cancellation and
/// concurrency from the HTTP surface.
pub struct SleepTask;

#[async_trait]
impl Task for SleepTask {
    async fn execute(&self, args: Value) -> Result<Value, TaskError> {
        let ms = args
            .get("ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| TaskError::new("missing 'ms' argument"))?;
        time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "slept_ms": ms }))
    }
}

#[tokio::test]
async fn echo_returns_args() -> anyhow::Result<()> {
    // arrange
    let args = json!({ "hello": "world" });

    // act
    let result = EchoTask.execute(args.clone()).await;

    // assert
    assert_eq!(Ok(args), result);
    Ok(())
}

#[tokio::test]
async fn sleep_requires_ms() -> anyhow::Result<()> {
    // act
    let result = SleepTask.execute(json!({})).await;

    // assert
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn sleep_reports_duration() -> anyhow::Result<()> {
    // act
    let result = SleepTask.execute(json!({ "ms": 1 })).await;

    // assert
    assert_eq!(Ok(json!({ "slept_ms": 1 })), result);
    Ok(())
}
