//! Error types for icesheet.
//!
//! Uses thiserror for structured errors with context. Every fatal error names
//! the offending module, key or phase so it can be shown to the user as is.

use crate::core::module::{CapabilitySet, Category, Lifecycle};
use crate::core::types::ValueType;
use crate::execution::engine::PipelinePhase;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for icesheet.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum IcesheetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Invalid module: {0}")]
    InvalidModule(#[from] InvalidModuleError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ModuleNotFoundError> for IcesheetError {
    fn from(err: ModuleNotFoundError) -> Self {
        IcesheetError::Resolve(ResolveError::NotFound(err))
    }
}

impl From<DeprecatedParameterError> for IcesheetError {
    fn from(err: DeprecatedParameterError) -> Self {
        IcesheetError::Config(ConfigError::Deprecated(err))
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// The parameter file is not valid JSON once comment lines are removed.
///
/// Carries the document as read, the byte offset of the failure and the text
/// of the offending line so the caller can point at it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{source_name}:{line}:{column}: {message}. Check the JSON structure and make sure \
     comments sit on their own lines starting with // or #\n  {line_text}"
)]
pub struct ConfigParseError {
    /// Where the document came from (usually a file path).
    pub source_name: String,
    /// The document as read.
    pub document: String,
    /// Byte offset of the failure within `document`.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// Parser message.
    pub message: String,
    /// Text of the offending line.
    pub line_text: String,
}

/// A retired configuration entry was used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "'{key}' in '{location}' is deprecated: {hint}. Update your parameter file and user \
     modules following the migration notes in docs/migration.md"
)]
pub struct DeprecatedParameterError {
    pub key: String,
    pub location: String,
    pub hint: String,
}

/// Errors loading or merging the parameter set.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] ConfigParseError),

    #[error(transparent)]
    Deprecated(#[from] DeprecatedParameterError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name} must contain a JSON object at the top level")]
    NotAnObject { source_name: String },

    #[error("{source_name} is missing the '{key}' module list")]
    MissingModuleList { source_name: String, key: String },

    #[error("'{key}' must be a list of module names")]
    InvalidModuleList { key: String },

    #[error("Parameter '{name}' expects {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        got: String,
    },

    #[error("Parameter '{name}' registered by '{owner}' is already registered by '{existing}'")]
    DuplicateParameter {
        name: String,
        owner: String,
        existing: String,
    },

    #[error("{0}")]
    CommandLine(String),
}

/// Errors reading a parameter from a finalized parameter set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("Parameter '{0}' is not registered")]
    Missing(String),

    #[error("Parameter '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: ValueType },
}

// ============================================================================
// Resolution and validation
// ============================================================================

/// A declared module name was not found in any searched location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Cannot find module '{name}'. Make sure it is either 1) {} or \
     2) a module in your working directory. Searched: {}",
    self.expected_builtin(),
    .searched.join(", ")
)]
pub struct ModuleNotFoundError {
    pub name: String,
    /// Namespace the name was declared in, `None` for dependencies, which
    /// are looked up in every namespace.
    pub category: Option<Category>,
    pub searched: Vec<String>,
}

impl ModuleNotFoundError {
    fn expected_builtin(&self) -> String {
        match self.category {
            Some(category) => format!("a built-in {} module", category),
            None => "a built-in module of any category".to_string(),
        }
    }
}

/// Errors turning module names into loaded modules.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    NotFound(#[from] ModuleNotFoundError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// A resolved module does not satisfy the module contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidModuleError {
    #[error(
        "Module '{module}' is missing the required capability ({missing}). Every module must \
         provide register_params, initialize, update and finalize"
    )]
    MissingCapabilities {
        module: String,
        missing: CapabilitySet,
    },

    #[error("Module resolved as '{requested}' reports its name as '{reported}'")]
    NameMismatch { requested: String, reported: String },
}

impl InvalidModuleError {
    /// Name of the offending module.
    pub fn module(&self) -> &str {
        match self {
            InvalidModuleError::MissingCapabilities { module, .. } => module,
            InvalidModuleError::NameMismatch { requested, .. } => requested,
        }
    }
}

impl InvalidModuleError {
    /// Get a suggested fix for this error.
    pub fn suggested_fix(&self) -> String {
        match self {
            InvalidModuleError::MissingCapabilities { missing, .. } => format!(
                "Implement or export the missing entry points: {}",
                missing
            ),
            InvalidModuleError::NameMismatch { requested, .. } => format!(
                "Rename the module or its manifest so both are called '{}'",
                requested
            ),
        }
    }
}

/// Result of validating the resolved modules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Whether validation passed without errors.
    pub success: bool,
    /// List of errors found.
    pub errors: Vec<InvalidModuleError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<ValidationWarning>,
    /// Time taken for validation in microseconds.
    pub duration_us: u64,
}

/// Non-fatal validation warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    /// Warning message.
    pub message: String,
    /// Module that triggered the warning.
    pub module: String,
    /// Suggestion for addressing the warning.
    pub suggestion: Option<String>,
}

impl ValidationReport {
    /// Create a new empty report (success).
    pub fn new() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Add an error to the report.
    pub fn add_error(&mut self, error: InvalidModuleError) {
        self.success = false;
        self.errors.push(error);
    }

    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Check if the pipeline can be executed.
    pub fn can_execute(&self) -> bool {
        self.success
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.success {
            if self.warnings.is_empty() {
                "All modules are valid".to_string()
            } else {
                format!("All modules are valid with {} warning(s)", self.warnings.len())
            }
        } else {
            format!("Validation failed with {} error(s)", self.errors.len())
        }
    }

    /// Get detailed error messages with suggestions.
    pub fn detailed_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}\n  Suggestion: {}", e, e.suggested_fix()))
            .collect()
    }
}

/// Errors from the working-directory plugin loader.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Failed to load plugin from {path}: {error}")]
    LoadFailed { path: PathBuf, error: String },

    #[error("Invalid plugin manifest {path}: {error}")]
    InvalidManifest { path: PathBuf, error: String },

    #[error(
        "Plugin '{name}' requires API {required}, this host provides {host}"
    )]
    IncompatibleVersion {
        name: String,
        required: semver::VersionReq,
        host: semver::Version,
    },

    #[error("Plugin '{name}' was built for ABI v{plugin_abi}, this host uses v{host_abi}")]
    AbiMismatch {
        name: String,
        plugin_abi: u32,
        host_abi: u32,
    },
}

// ============================================================================
// Execution
// ============================================================================

/// Errors raised by a module's own lifecycle code.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error(transparent)]
    Parameter(#[from] ParamError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capability '{0}' is not implemented")]
    Unsupported(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Errors reading fields of the shared state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("State field '{0}' is not set")]
    Missing(String),

    #[error("State field '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: ValueType },
}

/// Errors driving the pipeline.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Module '{module}' failed during {lifecycle}: {source}")]
    Lifecycle {
        module: String,
        lifecycle: Lifecycle,
        #[source]
        source: ModuleError,
    },

    #[error("Cannot {requested} a pipeline in the {current} phase")]
    InvalidTransition {
        current: PipelinePhase,
        requested: Lifecycle,
    },
}

impl ExecutionError {
    /// Get the module that caused this error, if applicable.
    pub fn module(&self) -> Option<&str> {
        match self {
            ExecutionError::Lifecycle { module, .. } => Some(module),
            ExecutionError::InvalidTransition { .. } => None,
        }
    }
}

/// Result type alias for icesheet operations.
pub type IcesheetResult<T> = Result<T, IcesheetError>;

/// Result type alias for module lifecycle calls.
pub type ModuleResult<T = ()> = Result<T, ModuleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::Capability;

    #[test]
    fn test_not_found_lists_locations() {
        let err = ModuleNotFoundError {
            name: "iceflow".to_string(),
            category: Some(Category::Process),
            searched: vec![
                "built-in namespace 'process'".to_string(),
                "working directory /tmp/run".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("'iceflow'"));
        assert!(msg.contains("a built-in process module"));
        assert!(msg.contains("built-in namespace 'process', working directory /tmp/run"));
    }

    #[test]
    fn test_missing_capability_message() {
        let err = InvalidModuleError::MissingCapabilities {
            module: "thk".to_string(),
            missing: CapabilitySet::empty().with(Capability::Update),
        };
        assert_eq!(err.module(), "thk");
        assert!(err.to_string().contains("(update)"));
    }

    #[test]
    fn test_lifecycle_error_names_module_and_phase() {
        let err = ExecutionError::Lifecycle {
            module: "time".to_string(),
            lifecycle: Lifecycle::Update,
            source: ModuleError::Failed("negative time step".to_string()),
        };
        assert_eq!(err.module(), Some("time"));
        assert_eq!(
            err.to_string(),
            "Module 'time' failed during update: negative time step"
        );
    }

    #[test]
    fn test_validation_report() {
        let mut report = ValidationReport::new();
        assert!(report.can_execute());

        report.add_error(InvalidModuleError::NameMismatch {
            requested: "smb".to_string(),
            reported: "smb_simple".to_string(),
        });
        assert!(!report.can_execute());
        assert!(report.detailed_errors()[0].contains("called 'smb'"));
        assert_eq!(report.summary(), "Validation failed with 1 error(s)");
    }
}
