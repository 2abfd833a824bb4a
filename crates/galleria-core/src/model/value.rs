// ── Client-side field values ──
//
// Pk and Value are the dynamic currency of the model layer: wire JSON is
// converted into `Value`s by field descriptors, and `Value`s are what a
// `Model` instance actually stores. A field that is absent altogether
// ("undefined") is represented by key absence, never by a `Value`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Model;
use crate::model::year_month::YearMonth;

/// A dictionary of client-format values keyed by client field name.
///
/// Keys absent from the dictionary mean "no opinion" — they are skipped by
/// `Model::set_properties` and omitted from wire payloads.
pub type ClientDict = HashMap<String, Value>;

// ── Pk ──────────────────────────────────────────────────────────────

/// Primary key of any entity.
///
/// Most entities use integer ids; table strings are keyed by string, and
/// the session endpoint is addressed as `user/self`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pk {
    Int(i64),
    Text(String),
}

impl Pk {
    /// Read a pk from a wire value, if it is pk-shaped (number or string).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Text(s) => serde_json::Value::from(s.clone()),
        }
    }
}

impl fmt::Display for Pk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Pk {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Pk {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Pk {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ── File uploads ────────────────────────────────────────────────────

/// A binary value destined for a multipart write (e.g. a piece image).
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

// ── Value ───────────────────────────────────────────────────────────

/// A client-format field value.
///
/// `Json` is the passthrough variant for structured plain fields (such as
/// multi-size image dictionaries) that no conversion rule claims.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    YearMonth(YearMonth),
    /// A single linked object (full instance or stub).
    Link(Model),
    /// A list of linked objects. Never written back to the server.
    LinkList(Vec<Model>),
    /// A binary value, valid only on the outbound update path.
    File(FileUpload),
    Json(serde_json::Value),
}

impl Value {
    /// Convert a wire JSON value verbatim, without any field-specific rule.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            structured => Self::Json(structured.clone()),
        }
    }

    /// Truthiness in the JavaScript sense: `null`, `false`, `0`, `0.0` and
    /// the empty string are falsy; everything else (including an empty
    /// link list) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::YearMonth(_) | Self::Link(_) | Self::LinkList(_) | Self::File(_)
            | Self::Json(_) => true,
        }
    }

    /// Interpret this value as a primary key, if it is pk-shaped.
    pub fn as_pk(&self) -> Option<Pk> {
        match self {
            Self::Int(i) => Some(Pk::Int(*i)),
            Self::Text(s) => Some(Pk::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => {
                #[allow(clippy::cast_precision_loss)]
                Some(*i as f64)
            }
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Model> {
        match self {
            Self::Link(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_link_list(&self) -> Option<&[Model]> {
        match self {
            Self::LinkList(list) => Some(list),
            _ => None,
        }
    }
}

impl From<Pk> for Value {
    fn from(pk: Pk) -> Self {
        match pk {
            Pk::Int(i) => Self::Int(i),
            Pk::Text(s) => Self::Text(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
