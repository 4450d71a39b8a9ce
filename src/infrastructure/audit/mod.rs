//! Audit sinks for stage transition records

mod in_memory;
mod jsonl;
mod tracing_sink;

pub use in_memory::InMemoryAuditSink;
pub use jsonl::JsonlAuditSink;
pub use tracing_sink::TracingAuditSink;
