pub mod pipeline;
pub mod config;
pub mod sources;
pub mod sinks;
pub mod transform;
pub mod frame;
pub mod observability;
pub mod dashboard_server;
pub mod metrics_server;

pub use pipeline::{Envelope, Pipeline};
