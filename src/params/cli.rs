//! Command-line parameter overrides.
//!
//! Every registered option can be set as `--<name> <value>` (or
//! `--<name>=<value>`). The accepted options are only known once the
//! pipeline modules have registered theirs, so the `clap` command is built
//! at run time from the [`ParamRegistry`].
//!
//! A few options are needed before that point (where to find the parameter
//! file, which modules to load); [`peek`] reads them from the raw arguments.

use crate::core::error::ConfigError;
use crate::core::types::{Value, ValueType};
use crate::params::registry::{ParamDefinition, ParamRegistry};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, Command};
use indexmap::IndexMap;

/// Find the raw value of `--<key>` in `args` without validating anything else.
///
/// The last occurrence wins, matching how the full parse treats repeats.
pub fn peek(args: &[String], key: &str) -> Option<String> {
    let flag = format!("--{key}");
    let prefix = format!("--{key}=");
    let mut found = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            found = Some(value.to_string());
        } else if *arg == flag {
            if let Some(value) = iter.next() {
                found = Some(value.clone());
            }
        }
    }
    found
}

/// Read a list option early, see [`peek`].
pub fn peek_list(args: &[String], key: &str) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(raw) = peek(args, key) else {
        return Ok(None);
    };
    match parse_value(key, ValueType::List, &raw)? {
        Value::List(items) => Ok(Some(
            items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        )),
        _ => Ok(None),
    }
}

/// Build the `clap` command accepting every registered option.
pub fn build_command(registry: &ParamRegistry) -> Command {
    registry.definitions().fold(
        Command::new("run")
            .about("Run a simulation")
            .no_binary_name(true)
            .args_override_self(true),
        |command, definition| command.arg(build_arg(definition)),
    )
}

fn build_arg(definition: &ParamDefinition) -> Arg {
    let help = if definition.owner.is_empty() {
        definition.help.clone()
    } else {
        format!("{} [{}]", definition.help, definition.owner)
    };
    Arg::new(definition.name.clone())
        .long(definition.name.clone())
        .value_name(definition.value_type.display_name())
        .help(help)
        .action(ArgAction::Set)
        .allow_negative_numbers(true)
}

/// Parse command-line overrides for the registered options.
///
/// Unknown options and malformed values are errors. Only options actually
/// given on the command line are returned.
pub fn parse_overrides(
    registry: &ParamRegistry,
    args: &[String],
) -> Result<IndexMap<String, Value>, ConfigError> {
    let matches = build_command(registry)
        .try_get_matches_from(args)
        .map_err(|e| ConfigError::CommandLine(e.render().to_string()))?;

    let mut overrides = IndexMap::new();
    for definition in registry.definitions() {
        if matches.value_source(&definition.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        if let Some(raw) = matches.get_one::<String>(&definition.name) {
            let value = parse_value(&definition.name, definition.value_type, raw)?;
            overrides.insert(definition.name.clone(), value);
        }
    }
    Ok(overrides)
}

/// Convert a command-line string to a value of the declared type.
pub fn parse_value(name: &str, value_type: ValueType, raw: &str) -> Result<Value, ConfigError> {
    let mismatch = || ConfigError::TypeMismatch {
        name: name.to_string(),
        expected: value_type,
        got: format!("'{raw}'"),
    };

    match value_type {
        ValueType::Boolean => str2bool(raw).map(Value::Boolean).ok_or_else(mismatch),
        ValueType::Integer => raw.trim().parse::<i64>().map(Value::Integer).map_err(|_| mismatch()),
        ValueType::Float => raw.trim().parse::<f64>().map(Value::Float).map_err(|_| mismatch()),
        ValueType::String => Ok(Value::String(raw.to_string())),
        ValueType::List => parse_list(raw).ok_or_else(mismatch),
        ValueType::Map => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(json @ serde_json::Value::Object(_)) => Ok(Value::from(json)),
            _ => Err(mismatch()),
        },
        ValueType::Grid => Err(mismatch()),
        ValueType::Any => Ok(serde_json::from_str::<serde_json::Value>(raw)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string()))),
    }
}

/// Interpret common spellings of a boolean.
pub fn str2bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Some(true),
        "no" | "false" | "f" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// A JSON array, or comma-separated names.
fn parse_list(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(json @ serde_json::Value::Array(_)) => Some(Value::from(json)),
            _ => None,
        };
    }
    Some(Value::List(
        trimmed
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Value::from)
            .collect(),
    ))
}
