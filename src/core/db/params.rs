//! Parameter module - typed values and the ordered bindings attached to a statement

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

/// Decimal or scientific notation, with optional sign and surrounding whitespace.
static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?\s*$").unwrap()
});

/// A value supplied by the caller for a placeholder, before classification
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

/// A value as it is handed to the backend: an integer or a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    Integer(i64),
    Text(String),
}

impl BoundValue {
    /// Classifies a caller value for binding.
    ///
    /// Digit-only strings and any other numeric value bind as integers
    /// (non-integral numbers are truncated toward zero); everything else binds
    /// as text.
    pub fn classify(value: ParamValue) -> Self {
        match value {
            ParamValue::Integer(i) => BoundValue::Integer(i),
            ParamValue::Float(f) => BoundValue::Integer(f as i64),
            ParamValue::Text(s) => classify_text(s),
        }
    }
}

fn classify_text(s: String) -> BoundValue {
    if DIGITS.is_match(&s) {
        return match s.parse::<i64>() {
            Ok(i) => BoundValue::Integer(i),
            Err(_) => {
                debug!(value = %s, "digit string overflows i64, binding as text");
                BoundValue::Text(s)
            }
        };
    }
    if NUMERIC.is_match(&s) {
        let trimmed = s.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return BoundValue::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return BoundValue::Integer(f as i64);
        }
    }
    BoundValue::Text(s)
}

/// Adds the `:` sigil to bare placeholder names.
///
/// `name` and `:name` address the same slot; `@name` and `$name` are kept as given.
pub fn normalize_placeholder(placeholder: &str) -> String {
    if placeholder.starts_with([':', '@', '$']) {
        placeholder.to_string()
    } else {
        format!(":{}", placeholder)
    }
}

/// Placeholder bindings in first-bound order; rebinding a placeholder replaces its value in place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, BoundValue)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `placeholder` (already normalized), overwriting any previous value
    pub fn set(&mut self, placeholder: String, value: BoundValue) {
        match self.entries.iter_mut().find(|(p, _)| *p == placeholder) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((placeholder, value)),
        }
    }

    pub fn get(&self, placeholder: &str) -> Option<&BoundValue> {
        let placeholder = normalize_placeholder(placeholder);
        self.entries
            .iter()
            .find(|(p, _)| *p == placeholder)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
