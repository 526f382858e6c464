//! Parameter registry.
//!
//! The core and every selected module add the options they understand to a
//! shared [`ParamRegistry`]. Only registered options can be set from the
//! parameter file or the command line.

use crate::core::error::ConfigError;
use crate::core::module::Category;
use crate::core::types::{Value, ValueType};
use indexmap::IndexMap;
use serde::Serialize;

/// Owner name used for the framework's own options.
pub const CORE_OWNER: &str = "core";

/// Default parameter file name.
pub const DEFAULT_PARAM_FILE: &str = "params.json";

/// Definition of a single option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDefinition {
    /// Option name (used as JSON key and `--name` on the command line)
    pub name: String,
    /// Declared type
    pub value_type: ValueType,
    /// Default value
    pub default_value: Value,
    /// Help text
    pub help: String,
    /// Module (or "core") that registered the option
    pub owner: String,
}

impl ParamDefinition {
    /// Create a definition whose type is inferred from the default.
    pub fn new(name: impl Into<String>, default_value: impl Into<Value>) -> Self {
        let default_value = default_value.into();
        Self {
            name: name.into(),
            value_type: default_value.value_type(),
            default_value,
            help: String::new(),
            owner: String::new(),
        }
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Override the inferred type.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }
}

/// What to do when two owners register the same option name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// The later registration replaces the earlier one.
    #[default]
    Overwrite,
    /// Report a [`ConfigError::DuplicateParameter`].
    Reject,
}

/// A registration rejected under [`CollisionPolicy::Reject`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct Collision {
    name: String,
    owner: String,
    existing: String,
}

/// Registry of recognized options.
#[derive(Debug, Clone)]
pub struct ParamRegistry {
    definitions: IndexMap<String, ParamDefinition>,
    owner: String,
    policy: CollisionPolicy,
    collisions: Vec<Collision>,
}

impl ParamRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::with_policy(CollisionPolicy::default())
    }

    /// Create an empty registry with an explicit collision policy.
    pub fn with_policy(policy: CollisionPolicy) -> Self {
        Self {
            definitions: IndexMap::new(),
            owner: CORE_OWNER.to_string(),
            policy,
            collisions: Vec::new(),
        }
    }

    /// Create a registry holding the core options.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_params(&mut registry);
        registry
    }

    /// Attribute subsequent registrations to `owner`.
    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
    }

    /// Current owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Register an option with a type inferred from its default.
    pub fn add(&mut self, name: &str, default_value: impl Into<Value>, help: &str) {
        self.add_definition(ParamDefinition::new(name, default_value).with_help(help));
    }

    /// Register a float option. Accepts integer literals as defaults.
    pub fn add_float(&mut self, name: &str, default_value: f64, help: &str) {
        self.add(name, default_value, help);
    }

    /// Register a list-of-names option.
    pub fn add_list(&mut self, name: &str, default_value: &[&str], help: &str) {
        self.add(name, default_value.to_vec(), help);
    }

    /// Register a fully specified option.
    pub fn add_definition(&mut self, mut definition: ParamDefinition) {
        definition.owner = self.owner.clone();

        if let Some(existing) = self.definitions.get(&definition.name) {
            match self.policy {
                CollisionPolicy::Overwrite => {
                    log::debug!(
                        "parameter '{}' of '{}' replaces the one registered by '{}'",
                        definition.name,
                        definition.owner,
                        existing.owner
                    );
                }
                CollisionPolicy::Reject => {
                    if existing.owner != definition.owner {
                        self.collisions.push(Collision {
                            name: definition.name.clone(),
                            owner: definition.owner.clone(),
                            existing: existing.owner.clone(),
                        });
                        return;
                    }
                }
            }
        }

        self.definitions.insert(definition.name.clone(), definition);
    }

    /// Return the first collision rejected under [`CollisionPolicy::Reject`].
    pub fn check(&self) -> Result<(), ConfigError> {
        match self.collisions.first() {
            Some(collision) => Err(ConfigError::DuplicateParameter {
                name: collision.name.clone(),
                owner: collision.owner.clone(),
                existing: collision.existing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Look up an option.
    pub fn get(&self, name: &str) -> Option<&ParamDefinition> {
        self.definitions.get(name)
    }

    /// Check if an option is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// All definitions, in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &ParamDefinition> {
        self.definitions.values()
    }

    /// Definitions registered by one owner.
    pub fn owned_by<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a ParamDefinition> {
        self.definitions.values().filter(move |d| d.owner == owner)
    }

    /// Registered option names.
    pub fn known_keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(|k| k.as_str())
    }

    /// Default values of every option.
    pub fn defaults(&self) -> IndexMap<String, Value> {
        self.definitions
            .values()
            .map(|d| (d.name.clone(), d.default_value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for ParamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the framework's own options.
pub fn register_core_params(registry: &mut ParamRegistry) {
    let previous = registry.owner().to_string();
    registry.set_owner(CORE_OWNER);

    registry.add(
        "working_dir",
        "",
        "Working directory for all inputs and outputs (default: current directory)",
    );
    registry.add(
        "param_file",
        DEFAULT_PARAM_FILE,
        "Path of the JSON parameter file, relative to the working directory",
    );
    registry.add_list(
        Category::Preproc.list_key(),
        &["synthetic"],
        "List of pre-processing modules",
    );
    registry.add_list(
        Category::Process.list_key(),
        &["time"],
        "List of processing modules",
    );
    registry.add_list(
        Category::Postproc.list_key(),
        &["print_info"],
        "List of post-processing modules",
    );
    registry.add("logging", false, "Activate the run log");
    registry.add(
        "logging_file",
        "",
        "Run log file name; if empty the log goes to the screen",
    );
    registry.add(
        "print_params",
        true,
        "Save the definitive parameters to params_saved.json for the record",
    );
    registry.add("gpu", 0i64, "Id of the GPU to use");

    registry.set_owner(previous);
}
