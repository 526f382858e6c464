//! Individual validation stages.
//!
//! Each stage checks one aspect of the module contract.

use crate::core::error::{InvalidModuleError, ValidationWarning};
use crate::resolve::resolver::ResolvedModule;

/// Trait for validation stages.
pub trait ValidationStage: Send + Sync {
    /// Name of this validation stage.
    fn name(&self) -> &str;

    /// Validate one module.
    ///
    /// Returns Ok with warnings, or Err with the reason the module is rejected.
    fn validate(&self, module: &ResolvedModule)
        -> Result<Vec<ValidationWarning>, InvalidModuleError>;
}

/// Capability validation - the four entry points must all be present.
pub struct CapabilityValidation;

impl ValidationStage for CapabilityValidation {
    fn name(&self) -> &str {
        "Capability Validation"
    }

    fn validate(
        &self,
        module: &ResolvedModule,
    ) -> Result<Vec<ValidationWarning>, InvalidModuleError> {
        let missing = module.module.capabilities().missing();
        if missing.is_empty() {
            Ok(Vec::new())
        } else {
            Err(InvalidModuleError::MissingCapabilities {
                module: module.name.clone(),
                missing,
            })
        }
    }
}

/// Name validation - a module must answer to the name it was resolved under.
///
/// Parameter ownership, dependency lookup and error messages all go by
/// name, so a module calling itself something else is rejected.
pub struct NameValidation;

impl ValidationStage for NameValidation {
    fn name(&self) -> &str {
        "Name Validation"
    }

    fn validate(
        &self,
        module: &ResolvedModule,
    ) -> Result<Vec<ValidationWarning>, InvalidModuleError> {
        let reported = module.module.metadata().name;
        if reported == module.name {
            Ok(Vec::new())
        } else {
            Err(InvalidModuleError::NameMismatch {
                requested: module.name.clone(),
                reported,
            })
        }
    }
}

/// Dependency validation - flags suspicious dependency declarations.
///
/// Never rejects a module.
pub struct DependencyValidation;

impl ValidationStage for DependencyValidation {
    fn name(&self) -> &str {
        "Dependency Validation"
    }

    fn validate(
        &self,
        module: &ResolvedModule,
    ) -> Result<Vec<ValidationWarning>, InvalidModuleError> {
        let mut warnings = Vec::new();
        let metadata = module.module.metadata();

        for dependency in &metadata.dependencies {
            if dependency.trim().is_empty() {
                warnings.push(ValidationWarning {
                    message: "declares an empty dependency name".to_string(),
                    module: module.name.clone(),
                    suggestion: Some("Remove the empty entry".to_string()),
                });
            } else if *dependency == module.name {
                warnings.push(ValidationWarning {
                    message: "declares a dependency on itself".to_string(),
                    module: module.name.clone(),
                    suggestion: Some(format!("Remove '{}' from its dependencies", dependency)),
                });
            }
        }

        Ok(warnings)
    }
}
