// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod directory;
pub mod distance;
pub mod external;
pub mod metrics;

pub use crate::api::router;
pub use crate::config::AggregatorConfig;
pub use crate::external::types::{Bundle, JobRecord, Location, ServiceRecord};
pub use crate::external::AggregationManager;
