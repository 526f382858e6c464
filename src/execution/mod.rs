//! Pipeline execution.
//!
//! Drives the initialize/update/finalize lifecycle over the resolved modules.

pub mod engine;
pub mod progress;

pub use engine::{ExecutionOptions, ExecutionStats, ModuleTiming, Pipeline, PipelinePhase};
pub use progress::{ProgressCallback, ProgressUpdate};
