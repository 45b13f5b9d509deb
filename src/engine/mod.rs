pub mod csv_encoder;
pub mod dedup;
pub mod orchestrator;
pub mod planner;
pub mod report;
pub mod resolver;
pub mod types;

pub use orchestrator::{PipelineOptions, PipelineOrchestrator, PipelineRequest};
