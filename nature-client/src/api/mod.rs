pub mod client;
pub mod rate_limit;

pub use client::{ApiError, NatureClient, DEFAULT_BASE_URL, DEFAULT_RATE_LIMIT_WAIT, DEFAULT_TIMEOUT};
pub use rate_limit::RateLimitInfo;
