use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
};

use chrono::NaiveDateTime;
use serde::{ser::SerializeMap, ser::SerializeSeq, Serialize, Serializer};

/// A value as handed back by the backend, before any casting.
pub type RawValue = serde_json::Value;

/// One result row. Column order follows the select list.
pub type DbRow = serde_json::Map<String, RawValue>;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The typed result of casting one raw field value.
///
/// Equality, hashing and ordering are structural. Floats use their total
/// order and bit pattern, so `a == b` always implies `hash(a) == hash(b)`.
#[derive(Debug, Clone)]
pub enum CastValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
    Array(Vec<CastValue>),
    Object(BTreeMap<String, CastValue>),
}

impl CastValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CastValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CastValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CastValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CastValue::Float(f) => Some(*f),
            CastValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CastValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
        match self {
            CastValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CastValue]> {
        match self {
            CastValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, CastValue>> {
        match self {
            CastValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key when this value is an object.
    pub fn get(&self, key: &str) -> Option<&CastValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    fn rank(&self) -> u8 {
        match self {
            CastValue::Null => 0,
            CastValue::Bool(_) => 1,
            CastValue::Int(_) => 2,
            CastValue::Float(_) => 3,
            CastValue::Timestamp(_) => 4,
            CastValue::Text(_) => 5,
            CastValue::Array(_) => 6,
            CastValue::Object(_) => 7,
        }
    }
}

impl PartialEq for CastValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CastValue {}

impl PartialOrd for CastValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CastValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CastValue::Null, CastValue::Null) => Ordering::Equal,
            (CastValue::Bool(a), CastValue::Bool(b)) => a.cmp(b),
            (CastValue::Int(a), CastValue::Int(b)) => a.cmp(b),
            (CastValue::Float(a), CastValue::Float(b)) => a.total_cmp(b),
            (CastValue::Timestamp(a), CastValue::Timestamp(b)) => a.cmp(b),
            (CastValue::Text(a), CastValue::Text(b)) => a.cmp(b),
            (CastValue::Array(a), CastValue::Array(b)) => a.cmp(b),
            (CastValue::Object(a), CastValue::Object(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for CastValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            CastValue::Null => {}
            CastValue::Bool(b) => b.hash(state),
            CastValue::Int(i) => i.hash(state),
            CastValue::Float(f) => f.to_bits().hash(state),
            CastValue::Timestamp(ts) => ts.hash(state),
            CastValue::Text(s) => s.hash(state),
            CastValue::Array(items) => items.hash(state),
            CastValue::Object(map) => map.hash(state),
        }
    }
}

impl Serialize for CastValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CastValue::Null => serializer.serialize_unit(),
            CastValue::Bool(b) => serializer.serialize_bool(*b),
            CastValue::Int(i) => serializer.serialize_i64(*i),
            CastValue::Float(f) => serializer.serialize_f64(*f),
            CastValue::Timestamp(ts) => {
                serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
            }
            CastValue::Text(s) => serializer.serialize_str(s),
            CastValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            CastValue::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl fmt::Display for CastValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

impl From<RawValue> for CastValue {
    fn from(v: RawValue) -> Self {
        match v {
            RawValue::Null => CastValue::Null,
            RawValue::Bool(b) => CastValue::Bool(b),
            RawValue::Number(n) => match n.as_i64() {
                Some(i) => CastValue::Int(i),
                None => CastValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            RawValue::String(s) => CastValue::Text(s),
            RawValue::Array(items) => {
                CastValue::Array(items.into_iter().map(CastValue::from).collect())
            }
            RawValue::Object(map) => CastValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, CastValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for CastValue {
    fn from(b: bool) -> Self {
        CastValue::Bool(b)
    }
}

impl From<i64> for CastValue {
    fn from(i: i64) -> Self {
        CastValue::Int(i)
    }
}

impl From<f64> for CastValue {
    fn from(f: f64) -> Self {
        CastValue::Float(f)
    }
}

impl From<&str> for CastValue {
    fn from(s: &str) -> Self {
        CastValue::Text(s.to_string())
    }
}

impl From<String> for CastValue {
    fn from(s: String) -> Self {
        CastValue::Text(s)
    }
}

impl From<NaiveDateTime> for CastValue {
    fn from(ts: NaiveDateTime) -> Self {
        CastValue::Timestamp(ts)
    }
}

/// Interned-style key used when destructuring a record.
///
/// The key text is kept verbatim, so distinct column or JSON keys never
/// collapse into one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(key: impl Into<String>) -> Self {
        Symbol(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

pub type SymbolMap = BTreeMap<Symbol, SymbolValue>;

/// Mirror of a [`CastValue`] tree with every nested object keyed by [`Symbol`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolValue {
    Scalar(CastValue),
    List(Vec<SymbolValue>),
    Map(SymbolMap),
}

impl SymbolValue {
    pub fn get(&self, key: &str) -> Option<&SymbolValue> {
        match self {
            SymbolValue::Map(m) => m.get(&Symbol::new(key)),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&CastValue> {
        match self {
            SymbolValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SymbolValue]> {
        match self {
            SymbolValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&CastValue> for SymbolValue {
    fn from(v: &CastValue) -> Self {
        match v {
            CastValue::Array(items) => {
                SymbolValue::List(items.iter().map(SymbolValue::from).collect())
            }
            CastValue::Object(map) => SymbolValue::Map(
                map.iter()
                    .map(|(k, v)| (Symbol::new(k), SymbolValue::from(v)))
                    .collect(),
            ),
            scalar => SymbolValue::Scalar(scalar.clone()),
        }
    }
}
