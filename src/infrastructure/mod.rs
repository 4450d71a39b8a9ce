//! Infrastructure layer - External service implementations

pub mod audit;
pub mod cache;
pub mod delivery;
pub mod generation;
pub mod knowledge;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod pipeline;
