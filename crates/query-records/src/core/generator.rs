use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::paths::snake_case,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaffold {
    pub sql_path: PathBuf,
    /// `(param, placeholder)` pairs in declaration order.
    pub bindings: Vec<(String, String)>,
}

/// Writes a commented SQL skeleton for a new query into `dir`.
pub fn generate(dir: &Path, name: &str, params: &[String]) -> AppResult<Scaffold> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidRequest("query name must not be empty".into()));
    }
    let bindings: Vec<(String, String)> = params
        .iter()
        .enumerate()
        .map(|(i, p)| (snake_case(p), format!("${}", i + 1)))
        .collect();

    let sql_path = dir.join(format!("{}.sql", snake_case(name)));
    if sql_path.exists() {
        return Err(AppError::AlreadyExists(sql_path));
    }
    if let Some(parent) = sql_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&sql_path, sql_template(&bindings))?;
    tracing::info!(path = %sql_path.display(), params = bindings.len(), "generated query file");

    Ok(Scaffold { sql_path, bindings })
}

fn sql_template(bindings: &[(String, String)]) -> String {
    let available = if bindings.is_empty() {
        "none".to_string()
    } else {
        bindings
            .iter()
            .map(|(p, ph)| format!("{ph} ({p})"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "-- Write your SQL query here\n\
         -- Available parameters: {available}\n\
         \n\
         -- SELECT\n\
         --   columns\n\
         -- FROM\n\
         --   tables\n\
         -- WHERE\n\
         --   conditions\n"
    )
}
