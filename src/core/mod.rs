//! Core types and traits for icesheet.
//!
//! This module contains the pieces every other part of the crate builds on:
//! - Dynamic values and grids
//! - The module contract and its metadata
//! - The shared simulation state
//! - Error types

pub mod error;
pub mod module;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use error::{
    ConfigError, ExecutionError, IcesheetError, IcesheetResult, InvalidModuleError, ModuleError,
    ModuleNotFoundError, ModuleResult, ResolveError,
};
pub use module::{
    Capability, CapabilitySet, Category, Lifecycle, Module, ModuleLists, ModuleMetadata,
    NoopModule,
};
pub use state::{RunId, State};
pub use types::{Grid, Value, ValueType};
