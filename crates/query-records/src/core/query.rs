//! Query definitions: a named SQL file, its parameter bindings and the
//! per-column type directives used to build records.
//!
//! ```ignore
//! let search = QueryDefinition::new("UserSearch")
//!     .bind("name", "$1")
//!     .cast_select("active", Directive::boolean());
//!
//! let users = search.with_records(&conn, &params)?;
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::PathBuf,
    sync::{Arc, OnceLock},
};

use crate::{
    core::{
        directive::Directive,
        executor::{BoundParam, Executor},
        paths::{self, Configuration, SqlLocation},
        record::Record,
        shape::ShapeCache,
        types::{DbRow, RawValue},
    },
    error::{AppError, AppResult},
};

pub type Params = BTreeMap<String, RawValue>;

/// A parameterized query bound to a `.sql` file.
///
/// Declarations are made with the builder methods before first use. Clones
/// share the loaded SQL text and the record descriptor cache until a builder
/// method changes a declaration, which detaches the clone from both.
#[derive(Debug, Clone)]
pub struct QueryDefinition {
    name: String,
    bindings: Vec<(String, String)>,
    directives: HashMap<String, Directive>,
    location: SqlLocation,
    config: Configuration,
    inline_sql: Option<Arc<str>>,
    loaded_sql: Arc<OnceLock<String>>,
    shapes: ShapeCache,
}

impl QueryDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
            directives: HashMap::new(),
            location: SqlLocation::Default,
            config: Configuration::default(),
            inline_sql: None,
            loaded_sql: Arc::new(OnceLock::new()),
            shapes: ShapeCache::new(),
        }
    }

    /// Binds a parameter to a placeholder. Bound parameters are required.
    pub fn bind(mut self, param: impl Into<String>, placeholder: impl Into<String>) -> Self {
        let param = param.into();
        let placeholder = placeholder.into();
        match self.bindings.iter_mut().find(|(p, _)| *p == param) {
            Some(existing) => existing.1 = placeholder,
            None => self.bindings.push((param, placeholder)),
        }
        self
    }

    /// Declares an explicit cast for a result column.
    pub fn cast_select(mut self, column: impl Into<String>, directive: Directive) -> Self {
        self.directives.insert(column.into(), directive);
        self.shapes = ShapeCache::new();
        self
    }

    pub fn sql_file_location(mut self, location: SqlLocation) -> Self {
        self.location = location;
        self.detach_sql()
    }

    pub fn configuration(mut self, config: Configuration) -> Self {
        self.config = config;
        self.detach_sql()
    }

    /// Uses inline SQL instead of a file.
    pub fn sql(mut self, text: impl Into<String>) -> Self {
        self.inline_sql = Some(Arc::from(text.into()));
        self.detach_sql()
    }

    fn detach_sql(mut self) -> Self {
        self.loaded_sql = Arc::new(OnceLock::new());
        self.shapes = ShapeCache::new();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bindings(&self) -> &[(String, String)] {
        &self.bindings
    }

    pub fn directives(&self) -> &HashMap<String, Directive> {
        &self.directives
    }

    pub fn shapes(&self) -> &ShapeCache {
        &self.shapes
    }

    pub fn sql_path(&self) -> AppResult<PathBuf> {
        paths::resolve(&self.location, &self.name, &self.config)
    }

    /// SQL text, read from disk on first use.
    pub fn sql_content(&self) -> AppResult<&str> {
        if let Some(s) = &self.inline_sql {
            return Ok(&**s);
        }
        if let Some(s) = self.loaded_sql.get() {
            return Ok(s.as_str());
        }
        let path = self.sql_path()?;
        let text = fs::read_to_string(&path)?;
        tracing::debug!(query = %self.name, path = %path.display(), "loaded sql file");
        Ok(self.loaded_sql.get_or_init(|| text).as_str())
    }

    /// Executes the query and returns raw rows.
    pub fn with<E: Executor + ?Sized>(&self, executor: &E, params: &Params) -> AppResult<Vec<DbRow>> {
        self.validate_params(params)?;
        let ordered = self.order_params(params);
        let sql = self.sql_content()?;
        tracing::debug!(query = %self.name, params = ordered.len(), "executing query");
        executor.exec_params(sql, &ordered)
    }

    /// Executes the query and returns one typed record per row.
    pub fn with_records<E: Executor + ?Sized>(
        &self,
        executor: &E,
        params: &Params,
    ) -> AppResult<Vec<Record>> {
        let rows = self.with(executor, params)?;
        self.build_records(rows)
    }

    /// Parameter-free form of [`QueryDefinition::with`].
    pub fn all<E: Executor + ?Sized>(&self, executor: &E) -> AppResult<Vec<DbRow>> {
        self.ensure_no_bindings()?;
        self.with(executor, &Params::new())
    }

    pub fn all_records<E: Executor + ?Sized>(&self, executor: &E) -> AppResult<Vec<Record>> {
        self.ensure_no_bindings()?;
        self.with_records(executor, &Params::new())
    }

    /// Turns fetched rows into records. The first row's columns pick the descriptor.
    pub fn build_records(&self, rows: Vec<DbRow>) -> AppResult<Vec<Record>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Vec<String> = first.keys().cloned().collect();
        let descriptor = self
            .shapes
            .ensure_descriptor(&self.name, &columns, &self.directives)?;
        rows.into_iter().map(|row| descriptor.instantiate(row)).collect()
    }

    fn ensure_no_bindings(&self) -> AppResult<()> {
        if self.bindings.is_empty() {
            Ok(())
        } else {
            Err(AppError::BindingsPresent(self.name.clone()))
        }
    }

    fn validate_params(&self, params: &Params) -> AppResult<()> {
        let missing: Vec<String> = self
            .bindings
            .iter()
            .filter(|(p, _)| !params.contains_key(p))
            .map(|(p, _)| p.clone())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingParams(missing));
        }

        let unknown: Vec<String> = params
            .keys()
            .filter(|k| !self.bindings.iter().any(|(p, _)| p == *k))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::UnknownParams(unknown));
        }
        Ok(())
    }

    fn order_params(&self, params: &Params) -> Vec<BoundParam> {
        self.bindings
            .iter()
            .map(|(p, placeholder)| BoundParam {
                placeholder: placeholder.clone(),
                value: params.get(p).cloned().unwrap_or(RawValue::Null),
            })
            .collect()
    }
}
