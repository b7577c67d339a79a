//! Record descriptors and the records they build.
//!
//! A [`RecordDescriptor`] is the fixed layout for one result shape: the
//! ordered column names plus the caster resolved for each column. Records
//! store their values in that layout, so field access is an index lookup.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt,
    hash::{Hash, Hasher},
    ops::Index,
    sync::Arc,
};

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    core::{
        directive::{Directive, FieldCaster},
        types::{CastValue, DbRow, RawValue, Symbol, SymbolMap, SymbolValue},
    },
    error::AppResult,
};

static NULL: CastValue = CastValue::Null;
static NULL_RAW: RawValue = RawValue::Null;

#[derive(Debug)]
pub struct RecordDescriptor {
    name: String,
    columns: Vec<String>,
    casters: Vec<FieldCaster>,
    positions: HashMap<String, usize>,
}

impl RecordDescriptor {
    /// Resolves every column's directive once. Unknown named directives fail here.
    pub fn build(
        name: &str,
        columns: Vec<String>,
        directives: &HashMap<String, Directive>,
    ) -> AppResult<Self> {
        let casters = columns
            .iter()
            .map(|c| match directives.get(c) {
                Some(d) => d.resolve(c),
                None => Ok(FieldCaster::Heuristic),
            })
            .collect::<AppResult<Vec<_>>>()?;
        let positions = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Ok(Self {
            name: name.to_string(),
            columns,
            casters,
            positions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    /// Casts one row into a record. A failed directive cast yields no record.
    pub fn instantiate(self: &Arc<Self>, row: DbRow) -> AppResult<Record> {
        let original = self
            .columns
            .iter()
            .zip(&self.casters)
            .map(|(column, caster)| {
                let raw = row.get(column).unwrap_or(&NULL_RAW);
                caster.apply(column, raw)
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Record {
            descriptor: Arc::clone(self),
            raw_original: row,
            fields: original.clone(),
            original,
        })
    }
}

/// One row after casting.
///
/// Equality, hashing and ordering use the values captured at construction.
/// Records from different descriptors are never equal and do not order.
#[derive(Debug, Clone)]
pub struct Record {
    descriptor: Arc<RecordDescriptor>,
    raw_original: DbRow,
    original: Vec<CastValue>,
    fields: Vec<CastValue>,
}

impl Record {
    pub fn descriptor(&self) -> &Arc<RecordDescriptor> {
        &self.descriptor
    }

    pub fn columns(&self) -> &[String] {
        self.descriptor.columns()
    }

    /// Current value of a column, or `None` when the shape has no such column.
    pub fn get(&self, column: &str) -> Option<&CastValue> {
        self.descriptor.position(column).map(|i| &self.fields[i])
    }

    /// Like [`Record::get`], but returns `default` only when the column is absent.
    /// A present column holding null yields null.
    pub fn fetch(&self, column: &str, default: CastValue) -> CastValue {
        self.get(column).cloned().unwrap_or(default)
    }

    pub fn original_attributes(&self) -> BTreeMap<String, CastValue> {
        self.zip_columns(&self.original)
    }

    pub fn raw_original_attributes(&self) -> &DbRow {
        &self.raw_original
    }

    /// Canonical mapping of column name to current value.
    pub fn to_h(&self) -> BTreeMap<String, CastValue> {
        self.zip_columns(&self.fields)
    }

    /// JSON object with columns in select-list order.
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Symbol-keyed view of the record for pattern-style extraction.
    /// With `keys`, only those columns that exist are included.
    pub fn deconstruct_keys(&self, keys: Option<&[&str]>) -> SymbolMap {
        let wanted = keys.map(|ks| ks.iter().map(|k| Symbol::new(*k)).collect::<Vec<_>>());
        self.columns()
            .iter()
            .zip(&self.fields)
            .map(|(c, v)| (Symbol::new(c), SymbolValue::from(v)))
            .filter(|(s, _)| wanted.as_ref().map_or(true, |w| w.contains(s)))
            .collect()
    }

    pub fn is_changed(&self) -> bool {
        self.fields != self.original
    }

    /// Every column whose current value differs from the original, as `(original, current)`.
    pub fn changes(&self) -> BTreeMap<String, (CastValue, CastValue)> {
        self.columns()
            .iter()
            .zip(self.original.iter().zip(&self.fields))
            .filter(|(_, (before, after))| before != after)
            .map(|(c, (before, after))| (c.clone(), (before.clone(), after.clone())))
            .collect()
    }

    /// Overwrites a field without touching the original snapshot.
    /// Test-only; requires exclusive ownership of the record.
    #[cfg(test)]
    pub(crate) fn overwrite_field_for_test(&mut self, column: &str, value: CastValue) -> bool {
        match self.descriptor.position(column) {
            Some(i) => {
                self.fields[i] = value;
                true
            }
            None => false,
        }
    }

    fn zip_columns(&self, values: &[CastValue]) -> BTreeMap<String, CastValue> {
        self.columns()
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect()
    }
}

impl Index<&str> for Record {
    type Output = CastValue;

    fn index(&self, column: &str) -> &CastValue {
        self.get(column).unwrap_or(&NULL)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.descriptor, &other.descriptor) && self.original == other.original
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.original.hash(state);
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !Arc::ptr_eq(&self.descriptor, &other.descriptor) {
            return None;
        }
        Some(self.original.cmp(&other.original))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in self.columns().iter().zip(&self.fields) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}", self.descriptor.name())?;
        for (column, value) in self.columns().iter().zip(&self.fields) {
            write!(f, " {column}={value}")?;
        }
        f.write_str(">")
    }
}
