use std::time::Duration;

use nature_client::{ApiError, Reading};

use crate::transform::ExtractError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("transient error: {0}")]
    Transient(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl PollError {
    /// Only bad credentials end a monitoring session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PollError::Auth(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PollError::Auth(_) => "auth",
            PollError::Transient(_) => "transient",
            PollError::NotFound(_) => "not_found",
            PollError::Decode(_) => "decode",
        }
    }
}

impl From<ApiError> for PollError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized => PollError::Auth(e.to_string()),
            other => PollError::Transient(other.to_string()),
        }
    }
}

impl From<ExtractError> for PollError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::NotFound { .. } => PollError::NotFound(e.to_string()),
            ExtractError::Decode { .. } => PollError::Decode(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    NewData,
    Stale,
    Error,
}

/// What happened in one poll cycle and how long the scheduler will sleep.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    NewData {
        reading: Reading,
        sleep: Duration,
    },
    Stale {
        reading: Reading,
        backoff_count: u32,
        sleep: Duration,
    },
    /// `backoff_count` is `None` on the cold-start path.
    Error {
        error: PollError,
        backoff_count: Option<u32>,
        sleep: Duration,
    },
}

impl PollEvent {
    pub fn classification(&self) -> Classification {
        match self {
            PollEvent::NewData { .. } => Classification::NewData,
            PollEvent::Stale { .. } => Classification::Stale,
            PollEvent::Error { .. } => Classification::Error,
        }
    }

    pub fn sleep(&self) -> Duration {
        match self {
            PollEvent::NewData { sleep, .. }
            | PollEvent::Stale { sleep, .. }
            | PollEvent::Error { sleep, .. } => *sleep,
        }
    }
}

#[async_trait::async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch_reading(&self) -> Result<Reading, PollError>;
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PollEvent);
}
