use dotenv::dotenv;
use std::{fmt, str::FromStr, sync::Arc};
use tokio_util::sync::CancellationToken;

use crate::features::echo::{EchoTask, SleepTask};
use crate::models::backoff::{RetryBackoff, DEFAULT_BACKOFF_BASE_MS};
use crate::services::{JobQueue, TaskRegistry, WorkerService};
use crate::store::{self, StoreConfig, DEFAULT_KEY_PREFIX};

pub struct AppState {
    pub instance_id: String,
    pub queue: Arc<JobQueue>,
    pub tasks: TaskRegistry,
    pub shutdown_token: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    pub workers_count: usize,
    pub backoff: RetryBackoff,
    pub default_max_retries: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        QueueOptions {
            workers_count: 10,
            backoff: RetryBackoff::default(),
            default_max_retries: 3,
        }
    }
}

impl AppState {
    pub async fn new() -> Arc<AppState> {
        dotenv().ok();
        let hostname = whoami::hostname();
        let instance_id = format!("{}:1", hostname);

        let store_config = store_config_from_env();
        let store = store::connect(&store_config)
            .await
            .expect("Unable to connect to job store");

        let options = QueueOptions {
            workers_count: env_parsed("BACKQ_WORKERS", 10),
            backoff: RetryBackoff::new(env_parsed(
                "BACKQ_BACKOFF_BASE_MS",
                DEFAULT_BACKOFF_BASE_MS,
            )),
            default_max_retries: env_parsed("BACKQ_MAX_RETRIES", 3),
        };

        let shutdown_token = CancellationToken::new();
        let queue = Arc::new(JobQueue::new(store, options, shutdown_token.clone()));

        let mut tasks = TaskRegistry::new();
        tasks.register(
            "echo",
            queue.register(Arc::new(EchoTask), options.default_max_retries),
        );
        tasks.register(
            "sleep",
            queue.register(Arc::new(SleepTask), options.default_max_retries),
        );

        let state = AppState {
            instance_id,
            queue,
            tasks,
            shutdown_token,
        };
        Arc::new(state)
    }

    pub fn worker_service(&self) -> WorkerService {
        WorkerService::new(Arc::clone(&self.queue))
    }
}

fn store_config_from_env() -> StoreConfig {
    let backend = std::env::var("BACKQ_STORE").unwrap_or_else(|_| "memory".to_owned());
    match backend.as_str() {
        "memory" => StoreConfig::Memory,
        "redis" => {
            let url = std::env::var("BACKQ_REDIS_URL").expect("BACKQ_REDIS_URL must be set");
            let prefix = std::env::var("BACKQ_REDIS_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_owned());
            let ttl = std::env::var("BACKQ_REDIS_TTL")
                .ok()
                .map(|v| v.parse().expect("BACKQ_REDIS_TTL must be an integer"));
            StoreConfig::Redis { url, prefix, ttl }
        }
        other => panic!("Unknown BACKQ_STORE '{other}', expected 'memory' or 'redis'"),
    }
}

fn env_parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Debug,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|err| panic!("{key} is invalid: {err:?}")),
        Err(_) => default,
    }
}
