use axum::http::StatusCode;
use problemdetails::Problem;

// region:    Error
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Job Not Found - {0}")]
    JobNotFound(String),

    #[error("Task Not Found - {0}")]
    TaskNotFound(String),

    #[error("Store Unavailable")]
    StoreUnavailable(#[from] redis::RedisError),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Invalid Params - {0}")]
    InvalidParams(&'static str),

    #[error("Queue Closed")]
    QueueClosed,
}

impl From<Error> for Problem {
    fn from(item: Error) -> Problem {
        match item {
            Error::JobNotFound(_) | Error::TaskNotFound(_) => {
                problemdetails::new(StatusCode::NOT_FOUND)
                    .with_title(StatusCode::NOT_FOUND.to_string())
                    .with_detail(item.to_string())
            }
            Error::InvalidParams(_) => problemdetails::new(StatusCode::BAD_REQUEST)
                .with_title(StatusCode::BAD_REQUEST.to_string())
                .with_detail(item.to_string()),
            Error::StoreUnavailable(_) => problemdetails::new(StatusCode::SERVICE_UNAVAILABLE)
                .with_title(StatusCode::SERVICE_UNAVAILABLE.to_string())
                .with_detail(item.to_string()),
            _ => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title(StatusCode::INTERNAL_SERVER_ERROR.to_string())
                .with_detail(item.to_string())
                .with_instance(format!("{:?}", item)),
        }
    }
}
