//! Client and domain types for the Nature Remo Cloud API.

pub mod api;
pub mod domain;

pub use api::{ApiError, NatureClient, RateLimitInfo};
pub use domain::{Device, EchonetAppliance, Reading};
