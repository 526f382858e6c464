//! Validation of resolved modules.
//!
//! Runs right after resolution, before dependency expansion, so a malformed
//! module is rejected before it can supply dependencies.

pub mod pipeline;
pub mod stages;

pub use pipeline::ModuleValidator;
pub use stages::{CapabilityValidation, DependencyValidation, NameValidation, ValidationStage};
