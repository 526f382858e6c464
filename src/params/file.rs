//! The JSON parameter file.
//!
//! The file is plain JSON except that whole lines starting with `//` or `#`
//! (after leading whitespace) are comments. Comment lines are blanked rather
//! than removed so line and column numbers in parse errors still point into
//! the file as written. Block comments are not supported.

use crate::core::error::{ConfigError, ConfigParseError, DeprecatedParameterError};
use crate::core::module::{Category, ModuleLists};
use crate::core::types::Value;
use crate::params::registry::ParamRegistry;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Retired entries of the module lists: (list key, entry, what replaced it).
const DEPRECATED_ENTRIES: &[(&str, &str, &str)] = &[(
    "modules_process",
    "time_step",
    "the time step is now controlled by the options of the 'time' module",
)];

/// Blank out full-line `//` and `#` comments, keeping line structure.
pub fn strip_comments(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") || trimmed.starts_with('#') {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse relaxed JSON.
///
/// `source_name` is only used in error messages.
pub fn parse_relaxed(text: &str, source_name: &str) -> Result<serde_json::Value, ConfigParseError> {
    let cleaned = strip_comments(text);
    serde_json::from_str(&cleaned).map_err(|e| parse_error(text, source_name, &e))
}

fn parse_error(document: &str, source_name: &str, err: &serde_json::Error) -> ConfigParseError {
    let line = err.line().max(1);
    let column = err.column();
    let line_start: usize = document
        .split('\n')
        .take(line - 1)
        .map(|l| l.len() + 1)
        .sum();
    let line_text = document.split('\n').nth(line - 1).unwrap_or("");
    let offset = (line_start + column.saturating_sub(1)).min(document.len());

    // serde_json appends " at line L column C" to its message
    let message = err.to_string();
    let message = match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    };

    ConfigParseError {
        source_name: source_name.to_string(),
        document: document.to_string(),
        offset,
        line,
        column,
        message,
        line_text: line_text.trim_end_matches('\r').to_string(),
    }
}

/// Overrides accepted from a parameter file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// Values for registered options, type-checked.
    pub accepted: IndexMap<String, Value>,
    /// Keys that no registered option matches.
    pub unknown: Vec<String>,
}

/// A parsed parameter file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamFile {
    source_name: String,
    entries: IndexMap<String, Value>,
}

impl ParamFile {
    /// Read and parse a parameter file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse a parameter document.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, ConfigError> {
        let json = parse_relaxed(text, source_name)?;
        let entries = match Value::from(json) {
            Value::Map(map) => map,
            _ => {
                return Err(ConfigError::NotAnObject {
                    source_name: source_name.to_string(),
                })
            }
        };
        Ok(Self {
            source_name: source_name.to_string(),
            entries,
        })
    }

    /// Where this file came from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Raw value of a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// All keys, in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Fail on retired entries.
    pub fn check_deprecated(&self) -> Result<(), DeprecatedParameterError> {
        check_deprecated_entries(|key| self.entries.get(key))
    }

    /// The three module lists.
    ///
    /// All three keys are required. Retired entries are rejected before the
    /// lists are handed out.
    pub fn module_lists(&self) -> Result<ModuleLists, ConfigError> {
        self.check_deprecated()?;

        let mut lists = ModuleLists::default();
        for category in Category::all() {
            let key = category.list_key();
            let value = self
                .entries
                .get(key)
                .ok_or_else(|| ConfigError::MissingModuleList {
                    source_name: self.source_name.clone(),
                    key: key.to_string(),
                })?;
            let names = value
                .as_string_list()
                .ok_or_else(|| ConfigError::InvalidModuleList {
                    key: key.to_string(),
                })?;
            lists.set(*category, names);
        }
        Ok(lists)
    }

    /// Split the file into values for registered options and unknown keys.
    ///
    /// Unknown keys are logged as warnings and dropped. A value whose type
    /// does not match the registered option is an error.
    pub fn overrides(&self, registry: &ParamRegistry) -> Result<Overrides, ConfigError> {
        let mut overrides = Overrides::default();

        for (key, value) in &self.entries {
            let Some(definition) = registry.get(key) else {
                log::warn!(
                    "the following parameter of {} does not exist in icesheet: {}",
                    self.source_name,
                    key
                );
                overrides.unknown.push(key.clone());
                continue;
            };

            let coerced = definition.value_type.coerce(value.clone()).ok_or_else(|| {
                ConfigError::TypeMismatch {
                    name: key.clone(),
                    expected: definition.value_type,
                    got: value.to_string(),
                }
            })?;
            overrides.accepted.insert(key.clone(), coerced);
        }

        Ok(overrides)
    }
}

/// Check a set of values for retired module list entries.
pub(crate) fn check_deprecated_entries<'a>(
    lookup: impl Fn(&str) -> Option<&'a Value>,
) -> Result<(), DeprecatedParameterError> {
    for &(list_key, entry, hint) in DEPRECATED_ENTRIES {
        let Some(list) = lookup(list_key).and_then(Value::as_list) else {
            continue;
        };
        if list.iter().any(|v| v.as_string() == Some(entry)) {
            return Err(DeprecatedParameterError {
                key: entry.to_string(),
                location: list_key.to_string(),
                hint: hint.to_string(),
            });
        }
    }
    Ok(())
}

/// Path of the parameter file for a working directory.
pub fn param_file_path(working_dir: &Path, param_file: &str) -> PathBuf {
    working_dir.join(param_file)
}

/// Load overrides for the registered options from a file.
pub fn load_overrides(
    path: impl AsRef<Path>,
    registry: &ParamRegistry,
) -> Result<Overrides, ConfigError> {
    ParamFile::load(path)?.overrides(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMENTED: &str = r#"{
  // modules
  "modules_preproc": ["synthetic"],
    # physics
  "modules_process": ["time"],
  "modules_postproc": ["print_info"],
  "url": "http://example.org//path",
  "time_end": 2050
}"#;

    #[test]
    fn test_strip_comments_keeps_line_count() {
        let stripped = strip_comments(COMMENTED);
        assert_eq!(stripped.lines().count(), COMMENTED.lines().count());
        assert!(!stripped.contains("// modules"));
        assert!(!stripped.contains("# physics"));
        assert!(stripped.contains("http://example.org//path"));
    }

    #[test]
    fn test_parse_commented_file() {
        let file = ParamFile::parse(COMMENTED, "params.json").unwrap();
        assert_eq!(
            file.get("url"),
            Some(&Value::from("http://example.org//path"))
        );
        let lists = file.module_lists().unwrap();
        assert_eq!(lists.process, vec!["time".to_string()]);
    }

    #[test]
    fn test_parse_error_points_at_line() {
        let text = "{\n  \"a\": 1,\n  \"b\": ,\n}";
        let err = parse_relaxed(text, "params.json").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.line_text, "  \"b\": ,");
        assert_eq!(err.document, text);
        assert!(err.offset >= text.find("\"b\"").unwrap());
        assert!(err.to_string().starts_with("params.json:3:"));
    }

    #[test]
    fn test_trailing_comment_is_not_stripped() {
        // comments must sit on their own line
        let text = "{\n  \"a\": 1 // trailing\n}";
        assert!(parse_relaxed(text, "params.json").is_err());
    }

    #[test]
    fn test_block_comments_unsupported() {
        let text = "{\n  /* block */\n  \"a\": 1\n}";
        assert!(parse_relaxed(text, "params.json").is_err());
    }

    #[test]
    fn test_top_level_must_be_object() {
        let err = ParamFile::parse("[1, 2]", "params.json").unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject { .. }));
    }

    #[test]
    fn test_missing_module_list() {
        let file = ParamFile::parse(r#"{"modules_preproc": [], "modules_process": []}"#, "p.json")
            .unwrap();
        let err = file.module_lists().unwrap_err();
        assert!(matches!(err, ConfigError::MissingModuleList { ref key, .. } if key == "modules_postproc"));
    }

    #[test]
    fn test_deprecated_time_step() {
        let file = ParamFile::parse(
            r#"{"modules_preproc": [], "modules_process": ["iceflow", "time_step"], "modules_postproc": []}"#,
            "p.json",
        )
        .unwrap();
        let err = file.module_lists().unwrap_err();
        match err {
            ConfigError::Deprecated(e) => {
                assert_eq!(e.key, "time_step");
                assert!(e.to_string().contains("migration"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overrides_filter_unknown_keys() {
        let mut registry = ParamRegistry::with_core();
        registry.set_owner("time");
        registry.add_float("time_end", 2100.0, "End time");

        let file = ParamFile::parse(COMMENTED, "params.json").unwrap();
        let overrides = file.overrides(&registry).unwrap();

        assert_eq!(overrides.unknown, vec!["url".to_string()]);
        assert_eq!(overrides.accepted.get("time_end"), Some(&Value::Float(2050.0)));
        assert!(overrides.accepted.contains_key("modules_process"));
    }

    #[test]
    fn test_overrides_type_mismatch() {
        let registry = ParamRegistry::with_core();
        let file = ParamFile::parse(r#"{"logging": "maybe"}"#, "p.json").unwrap();
        let err = file.overrides(&registry).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { ref name, .. } if name == "logging"));
    }

    #[test]
    fn test_load_overrides_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = param_file_path(temp.path(), "params.json");
        fs::write(&path, "# comment\n{\"gpu\": 1}\n").unwrap();

        let overrides = load_overrides(&path, &ParamRegistry::with_core()).unwrap();
        assert_eq!(overrides.accepted.get("gpu"), Some(&Value::Integer(1)));
    }
}
