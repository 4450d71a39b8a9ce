//! Pipeline infrastructure - stages, orchestrator and the request service

mod builder;
mod orchestrator;
mod service;
pub mod stages;

pub use builder::PipelineBuilder;
pub use orchestrator::StageOrchestrator;
pub use service::PipelineService;
