use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Where query SQL files live.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base for `SqlLocation::Root` and for relative search paths.
    pub root: PathBuf,
    /// Directories searched in order.
    pub sql_paths: Vec<PathBuf>,
    /// Directory new query files are generated into.
    pub default_path: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            sql_paths: vec![PathBuf::from("lib/queries"), PathBuf::from("app/queries")],
            default_path: PathBuf::from("lib/queries"),
        }
    }
}

impl Configuration {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn search_dirs(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.sql_paths.iter().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.root.join(p)
            }
        })
    }

    /// Directory `new` writes into, resolved against `root`.
    pub fn generate_dir(&self) -> PathBuf {
        if self.default_path.is_absolute() {
            self.default_path.clone()
        } else {
            self.root.join(&self.default_path)
        }
    }

    fn find(&self, file: &Path) -> Option<PathBuf> {
        self.search_dirs().map(|d| d.join(file)).find(|p| p.is_file())
    }
}

/// Location override for a query's SQL file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SqlLocation {
    /// `<snake_case name>.sql` in the search paths.
    #[default]
    Default,
    /// A path under the configured root.
    Root(PathBuf),
    /// A path searched for in the search paths.
    Relative(PathBuf),
}

pub fn resolve(location: &SqlLocation, name: &str, config: &Configuration) -> AppResult<PathBuf> {
    match location {
        SqlLocation::Root(p) => {
            let path = config.root.join(p);
            if path.is_file() {
                Ok(path)
            } else {
                Err(AppError::SqlFileNotFound(format!(
                    "could not find SQL file at {}",
                    path.display()
                )))
            }
        }
        SqlLocation::Relative(p) => config.find(p).ok_or_else(|| {
            AppError::SqlFileNotFound(format!("could not find SQL file {}", p.display()))
        }),
        SqlLocation::Default => {
            if name.trim().is_empty() {
                return Err(AppError::InvalidRequest(
                    "a query name is required for default SQL file resolution".into(),
                ));
            }
            let file = PathBuf::from(format!("{}.sql", snake_case(name)));
            config
                .find(&file)
                .ok_or_else(|| AppError::SqlFileNotFound(format!("no SQL file for {name}")))
        }
    }
}

/// `UserSearch` → `user_search`, `Admin::HTTPLogs` → `admin/http_logs`.
pub fn snake_case(name: &str) -> String {
    let name = name.replace("::", "/");
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("UserSearch"), "user_search");
        assert_eq!(snake_case("user_search"), "user_search");
        assert_eq!(snake_case("HTTPLogs"), "http_logs");
        assert_eq!(snake_case("Admin::TopUsers2024"), "admin/top_users2024");
        assert_eq!(snake_case("daily-report"), "daily_report");
    }

    #[test]
    fn test_default_location_searches_paths_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/queries")).unwrap();
        fs::create_dir_all(dir.path().join("app/queries")).unwrap();
        fs::write(dir.path().join("app/queries/user_search.sql"), "SELECT 1").unwrap();

        let config = Configuration::with_root(dir.path());
        let p = resolve(&SqlLocation::Default, "UserSearch", &config).unwrap();
        assert_eq!(p, dir.path().join("app/queries/user_search.sql"));

        fs::write(dir.path().join("lib/queries/user_search.sql"), "SELECT 2").unwrap();
        let p = resolve(&SqlLocation::Default, "UserSearch", &config).unwrap();
        assert_eq!(p, dir.path().join("lib/queries/user_search.sql"));
    }

    #[test]
    fn test_missing_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Configuration::with_root(dir.path());
        let err = resolve(&SqlLocation::Default, "Nope", &config).unwrap_err();
        assert_eq!(err.code(), "SQL_FILE_NOT_FOUND");
    }

    #[test]
    fn test_root_location() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("db/sql")).unwrap();
        fs::write(dir.path().join("db/sql/report.sql"), "SELECT 1").unwrap();
        let config = Configuration::with_root(dir.path());

        let ok = resolve(&SqlLocation::Root("db/sql/report.sql".into()), "X", &config).unwrap();
        assert_eq!(ok, dir.path().join("db/sql/report.sql"));

        let err = resolve(&SqlLocation::Root("db/sql/missing.sql".into()), "X", &config)
            .unwrap_err();
        assert!(err.to_string().contains("missing.sql"));
    }

    #[test]
    fn test_relative_location() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib/queries/shared")).unwrap();
        fs::write(dir.path().join("lib/queries/shared/totals.sql"), "SELECT 1").unwrap();
        let config = Configuration::with_root(dir.path());

        let p = resolve(&SqlLocation::Relative("shared/totals.sql".into()), "X", &config).unwrap();
        assert_eq!(p, dir.path().join("lib/queries/shared/totals.sql"));
        assert!(resolve(&SqlLocation::Relative("other.sql".into()), "X", &config).is_err());
    }
}
