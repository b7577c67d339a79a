//! Parameterized SQL queries bound to `.sql` files, with results cast into
//! typed, comparable records.

pub mod cli;
pub mod commands;
pub mod core;
pub mod error;
pub mod logging;
pub mod output;

pub use crate::core::{
    cast::{cast_heuristic, parse_pg_array, BooleanCaster, CastError, Caster, JsonCaster, PgArrayCaster},
    directive::Directive,
    executor::{BoundParam, Executor},
    paths::{Configuration, SqlLocation},
    query::{Params, QueryDefinition},
    record::{Record, RecordDescriptor},
    types::{CastValue, DbRow, RawValue, Symbol, SymbolValue},
};
pub use error::{AppError, AppResult};
