//! # icesheet - Modular glacier simulation framework
//!
//! icesheet orchestrates a pipeline of pre-processing, physics and
//! post-processing modules over one shared simulation state, driven by a
//! JSON/command-line parameter set.
//!
//! ## Features
//!
//! - **Named modules**: Modules are declared by name in three ordered lists
//!   (`modules_preproc`, `modules_process`, `modules_postproc`)
//! - **Contract checking**: Every module must provide `register_params`,
//!   `initialize`, `update` and `finalize` before it may run
//! - **Dependencies**: Modules name the modules they need; those are added
//!   to the pipeline once each
//! - **Plugins**: Modules not built in are loaded from dynamic libraries in
//!   the working directory
//! - **Layered options**: Defaults, then the parameter file, then the
//!   command line
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use icesheet::prelude::*;
//!
//! let args = vec!["--time_end".to_string(), "2050".to_string()];
//! let mut simulation = Simulation::setup(&args)?;
//! let summary = simulation.run()?;
//! println!("{} iterations", summary.iterations);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Values, the module contract, the shared state and errors
//! - [`params`]: Option registry, parameter file, command line, merged set
//! - [`modules`]: Built-in module namespaces
//! - [`resolve`]: Name resolution, working-directory plugins, dependencies
//! - [`validation`]: Module contract checks
//! - [`execution`]: The lifecycle phase machine
//! - [`run`]: The run driver tying everything together
//!
//! ## Creating Custom Modules
//!
//! Implement the [`Module`](core::module::Module) trait:
//!
//! ```rust,ignore
//! use icesheet::prelude::*;
//!
//! struct Smb;
//!
//! impl Module for Smb {
//!     fn metadata(&self) -> ModuleMetadata {
//!         ModuleMetadata::builder("smb", Category::Process)
//!             .description("Surface mass balance")
//!             .dependency("time")
//!             .build()
//!     }
//!
//!     fn register_params(&self, params: &mut ParamRegistry) {
//!         params.add_float("smb_ela", 2800.0, "Equilibrium line altitude (m)");
//!     }
//!
//!     fn initialize(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
//!         Ok(())
//!     }
//!
//!     fn update(&self, params: &ParameterSet, state: &mut State) -> ModuleResult {
//!         let ela = params.get_float("smb_ela")?;
//!         // ...
//!         Ok(())
//!     }
//!
//!     fn finalize(&self, _params: &ParameterSet, _state: &mut State) -> ModuleResult {
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Register it in a [`ModuleRegistry`](modules::ModuleRegistry), hand it to
//! [`Simulation::builder`](run::Simulation::builder) as an extension, or
//! build it as a plugin with [`export_module!`].

#![warn(clippy::all)]

pub mod core;
pub mod execution;
pub mod logging;
pub mod modules;
pub mod params;
pub mod resolve;
pub mod run;
pub mod validation;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use icesheet::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{Grid, Value, ValueType};

    // Module contract
    pub use crate::core::module::{
        Capability, CapabilitySet, Category, Lifecycle, Module, ModuleLists, ModuleMetadata,
        NoopModule,
    };

    // State
    pub use crate::core::state::{RunId, State};
    pub use crate::logging::RunLogger;

    // Errors
    pub use crate::core::error::{
        ConfigError, ConfigParseError, DeprecatedParameterError, ExecutionError, IcesheetError,
        IcesheetResult, InvalidModuleError, ModuleError, ModuleNotFoundError, ModuleResult,
        ParamError, PluginError, ResolveError, StateError, ValidationReport, ValidationWarning,
    };

    // Parameters
    pub use crate::params::{
        CollisionPolicy, ParamDefinition, ParamFile, ParamRegistry, ParameterSet,
    };

    // Modules
    pub use crate::modules::builtin::{PrintInfo, Synthetic, Time};
    pub use crate::modules::registry::{ModuleFactory, ModuleRegistry, RegistryBuilder};

    // Resolution
    pub use crate::resolve::{
        DependencyExpander, MissingDependencyPolicy, ModuleOrigin, ModuleResolver, ModuleSource,
        ResolvedModule, StaticExtensions, WorkingDirSource,
    };

    // Validation
    pub use crate::validation::{ModuleValidator, ValidationStage};

    // Execution
    pub use crate::execution::{
        ExecutionOptions, ExecutionStats, Pipeline, PipelinePhase, ProgressUpdate,
    };

    // Run driver
    pub use crate::run::{RunSummary, Simulation, SimulationBuilder};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "icesheet");
    }

    #[test]
    fn test_builtin_namespaces() {
        let registry = ModuleRegistry::with_builtins();
        assert_eq!(registry.names(Category::Preproc), vec!["synthetic"]);
        assert_eq!(registry.names(Category::Process), vec!["time"]);
        assert_eq!(registry.names(Category::Postproc), vec!["print_info"]);
    }

    #[test]
    fn test_manual_pipeline() {
        let resolver = ModuleResolver::new(ModuleRegistry::with_builtins());
        let lists = ModuleLists {
            preproc: vec!["synthetic".to_string()],
            process: Vec::new(),
            postproc: vec!["print_info".to_string()],
        };
        let validator = ModuleValidator::new();
        let resolved = resolver.resolve_lists(&lists).unwrap();
        validator.check(&resolved).unwrap();
        let modules = DependencyExpander::default()
            .expand(&resolver, &validator, resolved)
            .unwrap();

        let pipeline = Pipeline::new(modules);
        assert_eq!(pipeline.names(), vec!["synthetic", "print_info", "time"]);
    }
}
