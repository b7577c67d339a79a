use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "query-records")]
pub struct Args {
    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Execute a query file against an SQLite database and print NDJSON.
    Run(RunArgs),
    /// Scaffold a new query SQL file.
    New(NewArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Query name; `UserSearch` resolves to `user_search.sql`.
    pub query: String,

    /// SQLite database file.
    #[arg(long)]
    pub db: PathBuf,

    /// Directory searched for SQL files (repeatable, in order).
    #[arg(long = "queries-dir")]
    pub queries_dir: Vec<PathBuf>,

    /// Explicit SQL file, relative to the current directory.
    #[arg(long)]
    pub sql: Option<PathBuf>,

    /// Parameter binding `name=$1` (repeatable). Defaults to `$1..$n` in --param order.
    #[arg(long = "bind", value_parser = parse_pair)]
    pub binds: Vec<(String, String)>,

    /// Parameter value `name=value` (repeatable).
    #[arg(long = "param", value_parser = parse_pair)]
    pub params: Vec<(String, String)>,

    /// Column cast `column=boolean|array|json` (repeatable).
    #[arg(long = "cast", value_parser = parse_pair)]
    pub casts: Vec<(String, String)>,

    /// Print raw rows instead of typed records.
    #[arg(long)]
    pub raw: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct NewArgs {
    /// Query name, e.g. `UserSearch`.
    pub name: String,

    /// Parameter names, bound to `$1..$n`.
    pub params: Vec<String>,

    /// Target directory. Defaults to the configured generation path.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if k.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((k.to_string(), v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from([
            "query-records",
            "run",
            "UserSearch",
            "--db",
            "app.db",
            "--param",
            "name=Ada",
            "--cast",
            "active=boolean",
            "--raw",
        ])
        .unwrap();
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.query, "UserSearch");
        assert_eq!(run.params, vec![("name".to_string(), "Ada".to_string())]);
        assert_eq!(run.casts, vec![("active".to_string(), "boolean".to_string())]);
        assert!(run.raw);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_parse_pair_rejects_missing_equals() {
        assert!(parse_pair("name").is_err());
        assert!(parse_pair("=x").is_err());
        assert_eq!(
            parse_pair("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn test_parse_new() {
        let args =
            Args::try_parse_from(["query-records", "new", "UserSearch", "name", "email"]).unwrap();
        let Command::New(new) = args.command else {
            panic!("expected new");
        };
        assert_eq!(new.params, vec!["name", "email"]);
        assert_eq!(new.dir, None);
    }
}
