//! Module validator.

use crate::core::error::{InvalidModuleError, ValidationReport, ValidationWarning};
use crate::resolve::resolver::ResolvedModule;
use crate::validation::stages::{
    CapabilityValidation, DependencyValidation, NameValidation, ValidationStage,
};
use std::time::Instant;

/// Multi-stage module validator.
///
/// Runs a series of validation stages on each resolved module before it is
/// allowed into the pipeline.
pub struct ModuleValidator {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl ModuleValidator {
    /// Create the default validator with all standard stages.
    pub fn new() -> Self {
        Self {
            stages: vec![
                Box::new(CapabilityValidation),
                Box::new(NameValidation),
                Box::new(DependencyValidation),
            ],
        }
    }

    /// Create a validator with the given stages.
    pub fn with_stages(stages: Vec<Box<dyn ValidationStage>>) -> Self {
        Self { stages }
    }

    /// Add a custom validation stage.
    pub fn add_stage(&mut self, stage: Box<dyn ValidationStage>) {
        self.stages.push(stage);
    }

    /// Stage names, in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Validate one module.
    ///
    /// Stops at the first rejecting stage.
    pub fn validate(
        &self,
        module: &ResolvedModule,
    ) -> Result<Vec<ValidationWarning>, InvalidModuleError> {
        let mut warnings = Vec::new();
        for stage in &self.stages {
            warnings.extend(stage.validate(module)?);
        }
        Ok(warnings)
    }

    /// Validate every module and report all findings.
    pub fn validate_all(&self, modules: &[ResolvedModule]) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();

        for module in modules {
            match self.validate(module) {
                Ok(warnings) => {
                    for warning in warnings {
                        report.add_warning(warning);
                    }
                }
                Err(error) => report.add_error(error),
            }
        }

        report.duration_us = start.elapsed().as_micros() as u64;
        report
    }

    /// Validate every module, failing on the first rejected one.
    ///
    /// Warnings are logged.
    pub fn check(&self, modules: &[ResolvedModule]) -> Result<(), InvalidModuleError> {
        for module in modules {
            for warning in self.validate(module)? {
                log::warn!("module '{}' {}", warning.module, warning.message);
            }
        }
        Ok(())
    }
}

impl Default for ModuleValidator {
    fn default() -> Self {
        Self::new()
    }
}
