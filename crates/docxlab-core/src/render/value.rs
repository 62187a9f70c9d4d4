//! Dynamic data binding
//!
//! A render is driven by a [`ReportData`] map of [`Value`]s: scalars, ordered
//! sequences, string-keyed maps, and the plugin payloads consumed by the
//! IMAGE / LINK / HTML directives.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A user-supplied helper callable from EXEC/INS expressions.
pub type Function = Arc<dyn Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync>;

/// Name → helper table, invoked through the expression evaluator.
pub type Functions = BTreeMap<String, Function>;

/// Image payload for the IMAGE directive. Dimensions are centimetres;
/// `extension` keeps its leading dot (`.png`).
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePars {
    pub width: f64,
    pub height: f64,
    pub data: Vec<u8>,
    pub extension: String,
    pub caption: Option<String>,
}

/// Hyperlink payload for the LINK directive; the label defaults to the URL.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPars {
    pub url: String,
    pub label: Option<String>,
}

/// A dynamically typed binding value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Image(ImagePars),
    Link(LinkPars),
    Html(String),
    Function(Function),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
            Value::Image(img) => write!(f, "Image({}, {}x{})", img.extension, img.width, img.height),
            Value::Link(link) => write!(f, "Link({})", link.url),
            Value::Html(_) => write!(f, "Html(..)"),
            Value::Function(_) => write!(f, "Function(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Image(a), Value::Image(b)) => a == b,
            (Value::Link(a), Value::Link(b)) => a == b,
            (Value::Html(a), Value::Html(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Default stringification used by INS.
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::List(items) => items
                .iter()
                .map(Value::stringify)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.stringify()))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Image(_) => String::new(),
            Value::Link(link) => link.url.clone(),
            Value::Html(html) => html.clone(),
            Value::Function(_) => String::new(),
        }
    }

    /// Truthiness used by the IF directive.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Image(_) | Value::Link(_) | Value::Html(_) | Value::Function(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Map a JSON document onto a binding value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Top-level data binding for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportData(BTreeMap<String, Value>);

impl ReportData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Build a binding from the top-level keys of a JSON object.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match Value::from_json(json) {
            Value::Map(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ReportData {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The function table every render starts from: `length(x)` mirrors the
/// built-in helper of the original engine.
pub fn default_functions() -> Functions {
    let mut functions = Functions::new();
    functions.insert(
        "length".to_string(),
        Arc::new(|args: &[Value]| {
            let len = match args.first() {
                Some(Value::Str(s)) => s.chars().count() as i64,
                Some(Value::List(items)) => items.len() as i64,
                Some(Value::Map(map)) => map.len() as i64,
                Some(Value::Bytes(bytes)) => bytes.len() as i64,
                _ => -1,
            };
            Ok(Value::Int(len))
        }) as Function,
    );
    functions
}
