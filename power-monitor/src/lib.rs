pub mod pipeline;
pub mod config;
pub mod sources;
pub mod sinks;
pub mod transform;
pub mod scheduler;
pub mod shutdown;
pub mod observability;
pub mod metrics_server;

pub use pipeline::{PollError, PollEvent};
pub use scheduler::Scheduler;
