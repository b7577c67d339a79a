use std::{fmt, sync::Arc};

use crate::{
    core::{
        cast::{cast_heuristic, BooleanCaster, Caster, JsonCaster, PgArrayCaster},
        types::{CastValue, RawValue},
    },
    error::{AppError, AppResult},
};

pub type CastFn = Arc<dyn Fn(&RawValue) -> CastValue + Send + Sync>;

/// An explicit cast declared for one column of a query definition.
///
/// Columns without a directive are cast heuristically.
#[derive(Clone)]
pub enum Directive {
    /// A built-in caster selected by name: `boolean`, `array`, `json`.
    Named(String),
    /// Caller-supplied mapping; its result is used as-is.
    Function(CastFn),
    /// A caster object.
    Caster(Arc<dyn Caster>),
}

impl Directive {
    pub fn named(name: impl Into<String>) -> Self {
        Directive::Named(name.into())
    }

    pub fn boolean() -> Self {
        Directive::Caster(Arc::new(BooleanCaster))
    }

    pub fn pg_array() -> Self {
        Directive::Caster(Arc::new(PgArrayCaster))
    }

    pub fn json() -> Self {
        Directive::Caster(Arc::new(JsonCaster))
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&RawValue) -> CastValue + Send + Sync + 'static,
    {
        Directive::Function(Arc::new(f))
    }

    pub fn caster<C: Caster + 'static>(caster: C) -> Self {
        Directive::Caster(Arc::new(caster))
    }

    /// Resolves the directive into the caster used for every row.
    pub(crate) fn resolve(&self, column: &str) -> AppResult<FieldCaster> {
        match self {
            Directive::Named(name) => match name.as_str() {
                "boolean" | "bool" => Ok(FieldCaster::Object(Arc::new(BooleanCaster))),
                "array" | "pg_array" => Ok(FieldCaster::Object(Arc::new(PgArrayCaster))),
                "json" | "jsonb" | "pg_jsonb" => Ok(FieldCaster::Object(Arc::new(JsonCaster))),
                _ => Err(AppError::UnsupportedDirective {
                    column: column.to_string(),
                    directive: name.clone(),
                }),
            },
            Directive::Function(f) => Ok(FieldCaster::Function(f.clone())),
            Directive::Caster(c) => Ok(FieldCaster::Object(c.clone())),
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Directive::Function(_) => f.write_str("Function(..)"),
            Directive::Caster(c) => f.debug_tuple("Caster").field(c).finish(),
        }
    }
}

#[derive(Clone)]
pub(crate) enum FieldCaster {
    Heuristic,
    Function(CastFn),
    Object(Arc<dyn Caster>),
}

impl FieldCaster {
    /// Casts one field. Null passes through regardless of the directive.
    pub(crate) fn apply(&self, column: &str, raw: &RawValue) -> AppResult<CastValue> {
        if raw.is_null() {
            return Ok(CastValue::Null);
        }
        match self {
            FieldCaster::Heuristic => Ok(cast_heuristic(raw)),
            FieldCaster::Function(f) => Ok(f(raw)),
            FieldCaster::Object(c) => c.cast(raw).map_err(|source| AppError::InvalidCast {
                column: column.to_string(),
                source,
            }),
        }
    }
}

impl fmt::Debug for FieldCaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCaster::Heuristic => f.write_str("Heuristic"),
            FieldCaster::Function(_) => f.write_str("Function(..)"),
            FieldCaster::Object(c) => f.debug_tuple("Object").field(c).finish(),
        }
    }
}
