use std::result::Result as StdResult;
use thiserror::Error;

/// Errors raised while starting or talking to a test container.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

pub type Result<T> = StdResult<T, TestInfraError>;
