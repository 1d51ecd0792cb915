//! Tower middleware layers for the execution pipeline.
//!
//! - [`timeout`]: per-call deadlines, per operation or server default
//! - [`metrics`]: call timing and client-visible outcome on `tracing` spans
//! - [`load_shed`]: server-wide and per-service concurrency budgets
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use load_shed::LoadShedLayer;
pub use metrics::{CallOutcome, MetricsLayer};
pub use pipeline::build_operation_pipeline;
pub use timeout::TimeoutLayer;
