//! Infrastructure layer implementations.

pub mod kv;
pub mod observability;

pub use kv::MemoryKvStore;
pub use observability::{LogFormat, PrometheusHandle, init_metrics_handle, init_tracing};
