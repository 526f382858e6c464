//! Core value types shared by parameters and simulation state.
//!
//! Parameters and state fields are both schema-less from the framework's point
//! of view, so a single closed enum covers everything a module may store:
//! scalars, strings, lists, nested maps and 2-D grids.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// A dynamically typed value.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    List(Vec<Value>),
    /// String-keyed map, insertion ordered
    Map(IndexMap<String, Value>),
    /// Regular 2-D grid of floats
    Grid(Grid),
    /// Absence of value
    None,
}

/// The declared type of a parameter or state field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Boolean,
    Integer,
    Float,
    String,
    List,
    Map,
    Grid,
    /// Accepts any value
    Any,
}

/// A regular grid stored row-major.
///
/// Rows run along y and columns along x, matching the layout of the
/// NetCDF fields the physics modules exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

// ============================================================================
// Value Implementation
// ============================================================================

impl Value {
    /// Get the type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
            Value::Grid(_) => ValueType::Grid,
            Value::None => ValueType::Any,
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this value as a float.
    /// Integers are automatically converted to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_string(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Try to get this value as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        if let Value::List(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// Try to get this value as a list of strings.
    ///
    /// Returns `None` if the value is not a list or any element is not a string.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        self.as_list()?
            .iter()
            .map(|v| v.as_string().map(str::to_string))
            .collect()
    }

    /// Try to get this value as a map.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        if let Value::Map(map) = self {
            Some(map)
        } else {
            None
        }
    }

    /// Try to get this value as a grid.
    pub fn as_grid(&self) -> Option<&Grid> {
        if let Value::Grid(grid) = self {
            Some(grid)
        } else {
            None
        }
    }

    /// Try to get this value as a mutable grid.
    pub fn as_grid_mut(&mut self) -> Option<&mut Grid> {
        if let Value::Grid(grid) = self {
            Some(grid)
        } else {
            None
        }
    }

    /// Check if this value is None.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Grid> for Value {
    fn from(grid: Grid) -> Self {
        Value::Grid(grid)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => write!(f, "Map{{{} entries}}", map.len()),
            Value::Grid(grid) => write!(f, "Grid({}x{})", grid.rows, grid.cols),
            Value::None => write!(f, "None"),
        }
    }
}

// ============================================================================
// ValueType Implementation
// ============================================================================

impl ValueType {
    /// Check if a value matches this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Any, _) => true,
            (ValueType::Boolean, Value::Boolean(_)) => true,
            (ValueType::Integer, Value::Integer(_)) => true,
            (ValueType::Float, Value::Float(_)) => true,
            // Integer can be used where float is expected (implicit conversion)
            (ValueType::Float, Value::Integer(_)) => true,
            (ValueType::String, Value::String(_)) => true,
            (ValueType::List, Value::List(_)) => true,
            (ValueType::Map, Value::Map(_)) => true,
            (ValueType::Grid, Value::Grid(_)) => true,
            _ => false,
        }
    }

    /// Coerce a value to this type, if it matches.
    ///
    /// Integers given for float options become floats so later typed reads
    /// see the declared type.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (ValueType::Float, Value::Integer(i)) => Some(Value::Float(i as f64)),
            (ty, value) if ty.matches(&value) => Some(value),
            _ => None,
        }
    }

    /// Get a human-readable name for this type.
    pub fn display_name(&self) -> &'static str {
        match self {
            ValueType::Boolean => "bool",
            ValueType::Integer => "int",
            ValueType::Float => "float",
            ValueType::String => "str",
            ValueType::List => "list",
            ValueType::Map => "map",
            ValueType::Grid => "grid",
            ValueType::Any => "any",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Grid Implementation
// ============================================================================

impl Grid {
    /// Create a grid filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Create a grid filled with a constant.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Create a grid from a function of (row, col).
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    /// Number of rows (y).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (x).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Raw row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable raw row-major data.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Get the value at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Set the value at (row, col). Returns false if out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> bool {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
            true
        } else {
            false
        }
    }

    /// Sum of all cells.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Element-wise sum with another grid of the same shape.
    pub fn add(&self, other: &Grid) -> Option<Grid> {
        if self.rows != other.rows || self.cols != other.cols {
            return None;
        }
        Some(Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect(),
        })
    }
}
