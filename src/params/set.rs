//! The finalized parameter set.

use crate::core::error::{ConfigError, ParamError};
use crate::core::types::{Value, ValueType};
use crate::params::file::check_deprecated_entries;
use crate::params::registry::ParamRegistry;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File the definitive parameters are saved to.
pub const SAVED_PARAMS_FILE: &str = "params_saved.json";

/// Merged option values for one run.
///
/// Only ever holds options that were registered, so a module cannot read a
/// value it never declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: IndexMap<String, Value>,
}

impl ParameterSet {
    /// Merge registered defaults with override layers, later layers winning.
    ///
    /// Override keys that are not registered are ignored. Values are
    /// type-checked against their registered definition.
    pub fn finalize<'a>(
        registry: &ParamRegistry,
        layers: impl IntoIterator<Item = &'a IndexMap<String, Value>>,
    ) -> Result<Self, ConfigError> {
        registry.check()?;

        let mut values = registry.defaults();
        for layer in layers {
            for (key, value) in layer {
                let Some(definition) = registry.get(key) else {
                    log::debug!("ignoring unregistered parameter '{}'", key);
                    continue;
                };
                let coerced = definition.value_type.coerce(value.clone()).ok_or_else(|| {
                    ConfigError::TypeMismatch {
                        name: key.clone(),
                        expected: definition.value_type,
                        got: value.to_string(),
                    }
                })?;
                values.insert(key.clone(), coerced);
            }
        }

        check_deprecated_entries(|key| values.get(key))?;
        Ok(Self { values })
    }

    /// Registered defaults only.
    pub fn defaults(registry: &ParamRegistry) -> Result<Self, ConfigError> {
        Self::finalize(registry, std::iter::empty::<&IndexMap<String, Value>>())
    }

    /// Build a set directly from values, bypassing the registry.
    pub fn from_values(values: IndexMap<String, Value>) -> Self {
        Self { values }
    }

    /// Set a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Result<&Value, ParamError> {
        self.values
            .get(name)
            .ok_or_else(|| ParamError::Missing(name.to_string()))
    }

    pub fn get_float(&self, name: &str) -> Result<f64, ParamError> {
        self.get(name)?
            .as_float()
            .ok_or_else(|| mismatch(name, ValueType::Float))
    }

    pub fn get_integer(&self, name: &str) -> Result<i64, ParamError> {
        self.get(name)?
            .as_integer()
            .ok_or_else(|| mismatch(name, ValueType::Integer))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, ParamError> {
        self.get(name)?
            .as_bool()
            .ok_or_else(|| mismatch(name, ValueType::Boolean))
    }

    pub fn get_string(&self, name: &str) -> Result<&str, ParamError> {
        self.get(name)?
            .as_string()
            .ok_or_else(|| mismatch(name, ValueType::String))
    }

    pub fn get_string_list(&self, name: &str) -> Result<Vec<String>, ParamError> {
        self.get(name)?
            .as_string_list()
            .ok_or_else(|| mismatch(name, ValueType::List))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Option names, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Base directory for all file I/O. Empty means the current directory.
    pub fn working_dir(&self) -> PathBuf {
        match self.get_string("working_dir") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from("."),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Write the set as indented JSON to `params_saved.json` in `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        let path = dir.join(SAVED_PARAMS_FILE);
        let text = serde_json::to_string_pretty(&self.to_json()).map_err(|e| {
            ConfigError::Write {
                path: path.clone(),
                source: e.into(),
            }
        })?;
        fs::write(&path, text).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn mismatch(name: &str, expected: ValueType) -> ParamError {
    ParamError::TypeMismatch {
        name: name.to_string(),
        expected,
    }
}
