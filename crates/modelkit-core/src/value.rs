//! Dynamic value model
//!
//! [`Value`] is both the loosely-typed external input and the canonical
//! in-memory representation that strategies produce. A field slot holding
//! `Value::Null` is "set to none"; an absent slot is "unset" - the
//! tri-state distinction lives in the record, not here.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use crate::collection::KeyedCollection;
use crate::record::Record;

/// An ordered raw map, the shape every ingestion surface accepts
pub type RawMap = IndexMap<MapKey, Value>;

/// A hashable key form for raw maps and collections
///
/// `Sym` is the native key form; during ingestion the symbol form of a
/// field name is checked before the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    /// Symbol key (native form)
    Sym(String),
    /// String key
    Str(String),
    /// Integer key
    Int(i64),
    /// Boolean key
    Bool(bool),
}

impl MapKey {
    /// Symbol key constructor
    #[inline]
    pub fn sym(name: impl Into<String>) -> Self {
        Self::Sym(name.into())
    }

    /// String key constructor
    #[inline]
    pub fn str_key(name: impl Into<String>) -> Self {
        Self::Str(name.into())
    }

    /// Text form of the key, if it has one
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Sym(s) | Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The key as a plain value (for key coercion)
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Sym(s) => Value::Sym(s.clone()),
            Self::Str(s) => Value::Str(s.clone()),
            Self::Int(i) => Value::Int(*i),
            Self::Bool(b) => Value::Bool(*b),
        }
    }

    /// Build a key from a value, if the value has a key form
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Sym(s) => Some(Self::Sym(s.clone())),
            Value::Str(s) => Some(Self::Str(s.clone())),
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Bool(b) => Some(Self::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sym(s) => write!(f, ":{s}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// A dynamic value
///
/// Scalar variants are the "native" products of the builtin strategies;
/// `Record` and `Collection` carry typed object graphs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence marker ("none")
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
    /// Symbol (interned name)
    Sym(String),
    /// Instant in time
    Time(DateTime<Utc>),
    /// Ordered list
    List(Vec<Value>),
    /// Ordered map
    Map(RawMap),
    /// Typed record
    Record(Box<Record>),
    /// Keyed child collection
    Collection(Box<KeyedCollection>),
}

impl Value {
    /// String value constructor
    #[inline]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Symbol value constructor
    #[inline]
    pub fn sym(s: impl Into<String>) -> Self {
        Self::Sym(s.into())
    }

    /// True iff this is the absence marker
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's own type (for error payloads)
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Sym(_) => "symbol",
            Self::Time(_) => "time",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Collection(_) => "collection",
        }
    }

    /// Borrow the raw map, if this is one
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&RawMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// A map view of this value, if it exposes one
    ///
    /// Maps return their entries; records return their set attributes
    /// (declared then extra) under symbol keys; collections return their
    /// keyed entries. Everything else is not map-like.
    #[must_use]
    pub fn to_raw_map(&self) -> Option<RawMap> {
        match self {
            Self::Map(m) => Some(m.clone()),
            Self::Record(r) => Some(r.to_raw_map()),
            Self::Collection(c) => Some(c.to_raw_map()),
            _ => None,
        }
    }

    /// Build a value from parsed JSON
    ///
    /// Objects become `Map`s with string keys; numbers become `Int` when
    /// integral, `Float` otherwise.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(entries) => {
                let mut map = RawMap::new();
                for (k, v) in entries {
                    map.insert(MapKey::Str(k), Self::from_json(v));
                }
                Self::Map(map)
            }
        }
    }

    /// Render this value as JSON
    ///
    /// Symbols and times render as strings; records and collections render
    /// their attribute/entry maps.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Self::Str(s) | Self::Sym(s) => serde_json::Value::String(s.clone()),
            Self::Time(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Map(m) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in m {
                    let key = k.as_text().map_or_else(|| k.to_string(), str::to_string);
                    obj.insert(key, v.to_json());
                }
                serde_json::Value::Object(obj)
            }
            Self::Record(r) => Self::Map(r.to_raw_map()).to_json(),
            Self::Collection(c) => Self::Map(c.to_raw_map()).to_json(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Sym(s) => write!(f, ":{s}"),
            Self::Time(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Record(r) => {
                write!(f, "{}{}", r.model().name(), Self::Map(r.to_raw_map()))
            }
            Self::Collection(c) => write!(f, "{}", Self::Map(c.to_raw_map())),
        }
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

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}
