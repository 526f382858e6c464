//! The shared simulation state.
//!
//! One [`State`] exists per run. Modules add and read named fields at will;
//! the framework imposes no schema beyond the typed accessors below.

use crate::core::error::StateError;
use crate::core::types::{Grid, Value, ValueType};
use crate::logging::RunLogger;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Mutable record passed to every lifecycle call of every module.
#[derive(Debug)]
pub struct State {
    /// Identifier of the run owning this state.
    run_id: RunId,
    /// Named fields, in insertion order.
    fields: IndexMap<String, Value>,
    /// Logger for the run.
    logger: RunLogger,
}

impl State {
    /// Create an empty state logging to `logger`.
    pub fn new(logger: RunLogger) -> Self {
        Self {
            run_id: RunId::new(),
            fields: IndexMap::new(),
            logger,
        }
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The run logger.
    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    /// Check if a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All field names, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// All fields.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Result<&Value, StateError> {
        self.fields
            .get(name)
            .ok_or_else(|| StateError::Missing(name.to_string()))
    }

    /// Get a mutable field by name.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Value, StateError> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| StateError::Missing(name.to_string()))
    }

    /// Get a field as a float.
    pub fn get_float(&self, name: &str) -> Result<f64, StateError> {
        self.get(name)?
            .as_float()
            .ok_or_else(|| mismatch(name, ValueType::Float))
    }

    /// Get a field as an integer.
    pub fn get_integer(&self, name: &str) -> Result<i64, StateError> {
        self.get(name)?
            .as_integer()
            .ok_or_else(|| mismatch(name, ValueType::Integer))
    }

    /// Get a field as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, StateError> {
        self.get(name)?
            .as_bool()
            .ok_or_else(|| mismatch(name, ValueType::Boolean))
    }

    /// Get a field as a string.
    pub fn get_string(&self, name: &str) -> Result<&str, StateError> {
        self.get(name)?
            .as_string()
            .ok_or_else(|| mismatch(name, ValueType::String))
    }

    /// Get a field as a grid.
    pub fn get_grid(&self, name: &str) -> Result<&Grid, StateError> {
        self.get(name)?
            .as_grid()
            .ok_or_else(|| mismatch(name, ValueType::Grid))
    }

    /// Get a field as a mutable grid.
    pub fn get_grid_mut(&mut self, name: &str) -> Result<&mut Grid, StateError> {
        self.get_mut(name)?
            .as_grid_mut()
            .ok_or_else(|| mismatch(name, ValueType::Grid))
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(RunLogger::disabled())
    }
}

fn mismatch(name: &str, expected: ValueType) -> StateError {
    StateError::TypeMismatch {
        name: name.to_string(),
        expected,
    }
}
