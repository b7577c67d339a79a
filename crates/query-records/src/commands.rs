use std::{path::PathBuf, sync::Arc};

use crate::{
    cli::{NewArgs, RunArgs},
    core::{
        connection::ConnectionManager,
        directive::Directive,
        generator,
        paths::{Configuration, SqlLocation},
        query::{Params, QueryDefinition},
        types::RawValue,
    },
    error::AppResult,
    output::NdjsonWriter,
};

/// Builds the query definition described by the `run` flags.
pub fn definition_from_args(args: &RunArgs) -> QueryDefinition {
    let mut config = Configuration::default();
    if !args.queries_dir.is_empty() {
        config.sql_paths = args.queries_dir.clone();
    }

    let mut query = QueryDefinition::new(args.query.clone()).configuration(config);
    if let Some(sql) = &args.sql {
        query = query.sql_file_location(SqlLocation::Root(sql.clone()));
    }

    if args.binds.is_empty() {
        for (i, (name, _)) in args.params.iter().enumerate() {
            query = query.bind(name.clone(), format!("${}", i + 1));
        }
    } else {
        for (name, placeholder) in &args.binds {
            query = query.bind(name.clone(), placeholder.clone());
        }
    }

    for (column, kind) in &args.casts {
        query = query.cast_select(column.clone(), Directive::named(kind.clone()));
    }
    query
}

pub async fn run(args: RunArgs) -> AppResult<()> {
    let query = Arc::new(definition_from_args(&args));
    let params: Params = args
        .params
        .iter()
        .map(|(k, v)| (k.clone(), RawValue::String(v.clone())))
        .collect();

    let cm = ConnectionManager::new();
    let worker = cm.ensure_worker(&args.db)?;
    tracing::info!(query = %query.name(), db = %worker.db_path.display(), raw = args.raw, "running query");

    let mut out = NdjsonWriter::stdout();
    let n = if args.raw {
        let rows = worker.rows(query, params).await?;
        out.write_all_lines(&rows)?
    } else {
        let records = worker.records(query, params).await?;
        out.write_all_lines(&records)?
    };
    tracing::info!(rows = n, "done");
    Ok(())
}

pub fn new(args: NewArgs) -> AppResult<()> {
    let dir = target_dir(&args, &Configuration::default());
    let scaffold = generator::generate(&dir, &args.name, &args.params)?;
    println!("{}", scaffold.sql_path.display());
    for (param, placeholder) in &scaffold.bindings {
        println!("  --bind {param}={placeholder}");
    }
    Ok(())
}

fn target_dir(args: &NewArgs, config: &Configuration) -> PathBuf {
    args.dir.clone().unwrap_or_else(|| config.generate_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command};
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["query-records", "run"];
        full.extend_from_slice(argv);
        match Args::try_parse_from(full).unwrap().command {
            Command::Run(r) => r,
            Command::New(_) => panic!("expected run"),
        }
    }

    fn new_args(argv: &[&str]) -> NewArgs {
        let mut full = vec!["query-records", "new"];
        full.extend_from_slice(argv);
        match Args::try_parse_from(full).unwrap().command {
            Command::New(n) => n,
            Command::Run(_) => panic!("expected new"),
        }
    }

    #[test]
    fn test_new_defaults_to_configured_path() {
        let mut config = Configuration::with_root("/srv/app");
        config.default_path = PathBuf::from("db/queries");
        let args = new_args(&["UserSearch", "name"]);
        assert_eq!(target_dir(&args, &config), PathBuf::from("/srv/app/db/queries"));

        let args = new_args(&["UserSearch", "--dir", "custom"]);
        assert_eq!(target_dir(&args, &config), PathBuf::from("custom"));
    }

    #[test]
    fn test_params_bind_in_order_by_default() {
        let q = definition_from_args(&run_args(&[
            "UserSearch", "--db", "x.db", "--param", "name=Ada", "--param", "email=a@b.c",
        ]));
        assert_eq!(
            q.bindings(),
            &[
                ("name".to_string(), "$1".to_string()),
                ("email".to_string(), "$2".to_string())
            ]
        );
    }

    #[test]
    fn test_explicit_binds_and_casts() {
        let q = definition_from_args(&run_args(&[
            "UserSearch", "--db", "x.db", "--bind", "name=:name", "--cast", "active=boolean",
        ]));
        assert_eq!(q.bindings(), &[("name".to_string(), ":name".to_string())]);
        assert!(q.directives().contains_key("active"));
    }
}
