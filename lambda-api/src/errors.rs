use crate::config::ValidationError;
use registry::{StoreError, TenantKey};
use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for fake Lambda API operations
pub type Result<T, E = FakeLambdaError> = std::result::Result<T, E>;

/// Errors that can occur while running the fake Lambda API
#[derive(Error, Debug)]
pub enum FakeLambdaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Function store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(#[from] serde_json::Error),

    #[error("Failed to build response: {0}")]
    ResponseBuildError(#[from] http::Error),

    #[error("No functions registered for tenant {0}")]
    UnknownTenant(TenantKey),

    #[error("Server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("Server task failed: {0}")]
    ServerTask(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
}
