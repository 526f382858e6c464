//! Module namespaces.
//!
//! Contains the module registry, the built-in modules and their option
//! documentation.

pub mod builtin;
pub mod docs;
pub mod registry;

pub use docs::{module_doc, write_docs};
pub use registry::{ModuleFactory, ModuleRegistry, RegistryBuilder, RegistryEntry};

use crate::core::module::Module;
use crate::params::registry::ParamRegistry;

/// Collect the options a single module registers, owned by the module.
pub fn module_params(module: &dyn Module) -> ParamRegistry {
    let mut registry = ParamRegistry::new();
    registry.set_owner(module.metadata().name);
    module.register_params(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::builtin::Time;

    #[test]
    fn test_module_params_are_owned() {
        let registry = module_params(&Time);
        assert!(registry.contains("time_end"));
        assert!(registry.definitions().all(|d| d.owner == "time"));
    }
}
