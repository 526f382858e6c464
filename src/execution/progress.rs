//! Progress reporting for pipeline execution.

use crate::core::module::Lifecycle;

/// A progress update event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// A lifecycle pass over the pipeline has started.
    PassStarted {
        lifecycle: Lifecycle,
        /// Update pass number, 0 for initialize and finalize.
        iteration: u64,
        total_modules: usize,
    },
    /// A module call returned successfully.
    ModuleCompleted {
        module: String,
        lifecycle: Lifecycle,
        index: usize,
        total: usize,
        duration_us: u64,
    },
    /// Every module has been called.
    PassCompleted {
        lifecycle: Lifecycle,
        iteration: u64,
        duration_us: u64,
    },
    /// A module call failed; the run is over.
    Error {
        module: String,
        lifecycle: Lifecycle,
        message: String,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;
