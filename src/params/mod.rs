//! Parameters: the option schema, the parameter file, command-line
//! overrides and the merged [`ParameterSet`].
//!
//! Precedence, lowest first: registered defaults, parameter file, command
//! line.

pub mod cli;
pub mod file;
pub mod registry;
pub mod set;

pub use file::{Overrides, ParamFile};
pub use registry::{CollisionPolicy, ParamDefinition, ParamRegistry, CORE_OWNER};
pub use set::{ParameterSet, SAVED_PARAMS_FILE};
