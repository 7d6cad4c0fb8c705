use std::collections::HashMap;
use std::fmt;

/// The set of evaluated value types.
///
/// Evaluation turns every [`Expr`](crate::ast::Expr) into a `Value`.
/// Constant references never survive evaluation, so a `Value` is always
/// fully resolved data: numbers, nested arrays and nested dicts.
///
/// Conversion from common Rust types is provided via `From` impls:
///
/// ```rust
/// use constxml::Value;
///
/// let n: Value = 1.5_f64.into();
/// let a: Value = vec![1.0_f64, 2.0].into();
/// assert_eq!(a, Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]));
/// # let _ = n;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    /// Element tag used for this value in XML output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }

    /// Nesting depth: 0 for a number, one more than the deepest child for
    /// an array or dict (an empty container has depth 1).
    pub fn depth(&self) -> usize {
        match self {
            Value::Number(_) => 0,
            Value::Array(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Dict(dict) => 1 + dict.iter().map(|(_, v)| v.depth()).max().unwrap_or(0),
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

/// Textual form of a number in output.
///
/// Uses the shortest representation that parses back to the same bits,
/// and always keeps a decimal point or exponent (`2.0`, not `2`).
pub fn format_number(n: f64) -> String {
    format!("{n:?}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Dict(dict) => {
                f.write_str("{")?;
                for (i, (key, value)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// An insertion-ordered string-keyed map.
///
/// Keys keep the position of their first insertion. Inserting an existing
/// key replaces its value in place, so duplicate keys in a dict literal
/// collapse to the last value written. Lookups go through a key index.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

// The index is derived from `entries`, so order-sensitive entry equality
// is the whole story.
impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}
