//! Values exchanged with backends
//!
//! `Value` is the storage-side representation of every field, parameter
//! and literal. `FromValue` reads typed data back out of it and
//! `ValueConversion` is the hook applied to values before they are bound.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};

/// A storage value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Read this value as `T`
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    /// Wrap a scalar into a one-element array; arrays are kept as they are
    pub fn into_array(self) -> Vec<Value> {
        match self {
            Value::Array(items) => items,
            other => vec![other],
        }
    }

    /// Check if this value matches a LIKE pattern (`%` any run, `_` one char)
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        match self {
            Value::String(s) => like_regex(pattern).is_some_and(|r| r.is_match(s)),
            _ => false,
        }
    }

    /// Order two values of compatible types; `None` across unrelated types
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Compiled LIKE patterns are kept up to this count, then dropped together
const LIKE_CACHE_LIMIT: usize = 256;

fn like_cache() -> &'static Mutex<HashMap<String, Regex>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    CACHE.get_or_init(Mutex::default)
}

/// `%` matches any run of characters and `_` exactly one
fn like_regex(pattern: &str) -> Option<Regex> {
    let mut cache = like_cache().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(regex) = cache.get(pattern) {
        return Some(regex.clone());
    }
    let translated = regex::escape(pattern).replace('%', ".*").replace('_', ".");
    let regex = Regex::new(&format!("^{}$", translated)).ok()?;
    if cache.len() >= LIKE_CACHE_LIMIT {
        cache.clear();
    }
    cache.insert(pattern.to_string(), regex.clone());
    Some(regex)
}

impl From<&nql::Literal> for Value {
    fn from(lit: &nql::Literal) -> Self {
        match lit {
            nql::Literal::Null => Value::Null,
            nql::Literal::Bool(b) => Value::Bool(*b),
            nql::Literal::Int(i) => Value::Int(*i),
            nql::Literal::Float(f) => Value::Float(*f),
            nql::Literal::String(s) => Value::String(s.clone()),
            nql::Literal::Array(arr) => Value::Array(arr.iter().map(Value::from).collect()),
            nql::Literal::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// JSON documents as returned by most document stores
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Value {
    /// JSON form; non-finite floats become `null`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

// =============================================================================
// Reading values
// =============================================================================

/// Typed read of a `Value`
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(value: &Value, target: &str) -> Error {
    Error::conversion(format!("cannot read {} value as {}", value.kind(), target))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            Value::String(s) => s.trim().parse().map_err(|_| mismatch(value, "i64")),
            _ => Err(mismatch(value, "i64")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| mismatch(value, "i32"))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::String(s) => s.trim().parse().map_err(|_| mismatch(value, "f64")),
            _ => Err(mismatch(value, "f64")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(mismatch(value, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(mismatch(value, "string")),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            Value::Null => Ok(vec![]),
            single => Ok(vec![T::from_value(single)?]),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// =============================================================================
// Writing values
// =============================================================================

/// Applied to every value before it is stored in a parameter slot
pub trait ValueConversion: Send + Sync {
    fn convert(&self, value: Value) -> Result<Value>;
}

/// Passes values through, except `NaN` and infinite floats which no backend
/// can store
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardConversion;

impl ValueConversion for StandardConversion {
    fn convert(&self, value: Value) -> Result<Value> {
        match value {
            Value::Float(f) if !f.is_finite() => {
                Err(Error::conversion(format!("{} cannot be stored", f)))
            }
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.convert(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| self.convert(v).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Value::Object),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_reads() {
        assert_eq!(Value::Int(30).get::<i64>().unwrap(), 30);
        assert_eq!(Value::from("42").get::<i32>().unwrap(), 42);
        assert_eq!(Value::Int(2).get::<f64>().unwrap(), 2.0);
        assert_eq!(Value::Int(7).get::<String>().unwrap(), "7");
        assert!(Value::from("true").get::<bool>().unwrap());
        assert_eq!(Value::Null.get::<Option<i64>>().unwrap(), None);
        assert_eq!(
            Value::from(vec![1i64, 2]).get::<Vec<i64>>().unwrap(),
            vec![1, 2]
        );
        assert!(Value::from("Diana").get::<i64>().is_err());
        assert!(Value::Int(i64::MAX).get::<i32>().is_err());
    }

    #[test]
    fn test_json_values() {
        let json = serde_json::json!({"name": "Diana", "age": 30, "power": 9.5, "tags": ["moon"]});
        let value = Value::from(json.clone());
        let Value::Object(fields) = &value else {
            panic!("expected an object");
        };
        assert_eq!(fields.get("age"), Some(&Value::Int(30)));
        assert_eq!(fields.get("power"), Some(&Value::Float(9.5)));
        assert_eq!(value.to_json(), json);
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_matches_pattern() {
        let value = Value::from("Zeus.Jr");
        assert!(value.matches_pattern("Zeus%"));
        assert!(value.matches_pattern("Zeus_Jr"));
        assert!(!value.matches_pattern("Hera%"));
        assert!(!Value::Int(1).matches_pattern("%"));
    }

    #[test]
    fn test_like_patterns_compiled_once() {
        let pattern = "Hermes_%_cached";
        assert!(Value::from("Hermes_of_cached").matches_pattern(pattern));
        let first = like_regex(pattern).unwrap();
        assert_eq!(first.as_str(), "^Hermes..*.cached$");
        assert!(like_cache().lock().unwrap().contains_key(pattern));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::Int(1).compare(&Value::from("1")), None);
    }

    #[test]
    fn test_standard_conversion() {
        let conversion = StandardConversion;
        assert_eq!(conversion.convert(Value::Int(3)).unwrap(), Value::Int(3));
        assert!(conversion.convert(Value::Float(f64::NAN)).is_err());
        assert!(conversion
            .convert(Value::Array(vec![Value::Float(f64::INFINITY)]))
            .is_err());
    }

    #[test]
    fn test_from_literal() {
        let lit = nql::Literal::Array(vec![nql::Literal::Int(1), nql::Literal::Null]);
        assert_eq!(
            Value::from(&lit),
            Value::Array(vec![Value::Int(1), Value::Null])
        );
    }
}
