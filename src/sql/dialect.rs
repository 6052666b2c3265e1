//! Identifier quoting and placeholder rewriting per backend.
//!
//! Statement templates are stored with the portable `?` marker. The gateway calls
//! [`Dialect::rewrite_placeholders`] right before execution so templates never depend on
//! the driver in use.

use crate::error::ConfigError;
use std::borrow::Cow;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Dialect from a connection URL scheme (`mysql://`, `postgres://`, `sqlite:`).
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url
            .split_once(':')
            .map(|(s, _)| s.to_ascii_lowercase())
            .ok_or_else(|| ConfigError::DatabaseUrl(format!("missing scheme in '{}'", url)))?;
        match scheme.as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(ConfigError::DatabaseUrl(format!("unsupported scheme '{}'", other))),
        }
    }

    /// Quote an identifier. Identifiers come from model declarations, never from requests.
    pub fn quote(self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Sqlite => format!("`{}`", ident.replace('`', "``")),
            Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Replace each portable `?` with the driver's positional marker. Markers inside quoted
    /// literals and identifiers are left alone.
    pub fn rewrite_placeholders(self, sql: &str) -> Cow<'_, str> {
        match self {
            Dialect::MySql | Dialect::Sqlite => Cow::Borrowed(sql),
            Dialect::Postgres => {
                if !sql.contains('?') {
                    return Cow::Borrowed(sql);
                }
                let mut out = String::with_capacity(sql.len() + 8);
                let mut n = 0u32;
                let mut quote: Option<char> = None;
                for c in sql.chars() {
                    match quote {
                        Some(q) => {
                            if c == q {
                                quote = None;
                            }
                            out.push(c);
                        }
                        None => match c {
                            '\'' | '"' | '`' => {
                                quote = Some(c);
                                out.push(c);
                            }
                            '?' => {
                                n += 1;
                                out.push('$');
                                out.push_str(&n.to_string());
                            }
                            _ => out.push(c),
                        },
                    }
                }
                Cow::Owned(out)
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        })
    }
}

/// `?, ?, ?` for `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_quotes_with_backticks() {
        assert_eq!(Dialect::MySql.quote("users"), "`users`");
        assert_eq!(Dialect::MySql.quote("we`ird"), "`we``ird`");
    }

    #[test]
    fn postgres_quotes_with_double_quotes() {
        assert_eq!(Dialect::Postgres.quote("users"), "\"users\"");
    }

    #[test]
    fn mysql_keeps_question_marks() {
        let sql = "select `id` from `users` where `id`=?";
        assert!(matches!(Dialect::MySql.rewrite_placeholders(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn postgres_numbers_placeholders() {
        let sql = "update \"t\" set \"a\"=?, \"b\"=? where \"id\"=?";
        assert_eq!(
            Dialect::Postgres.rewrite_placeholders(sql),
            "update \"t\" set \"a\"=$1, \"b\"=$2 where \"id\"=$3"
        );
    }

    #[test]
    fn postgres_skips_markers_in_literals() {
        let sql = "select '?' as q, \"a?\" from t where x=?";
        assert_eq!(
            Dialect::Postgres.rewrite_placeholders(sql),
            "select '?' as q, \"a?\" from t where x=$1"
        );
    }

    #[test]
    fn dialect_from_url_scheme() {
        assert_eq!(Dialect::from_url("mysql://u:p@localhost/db").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("postgres://localhost/db").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_url("redis://localhost").is_err());
        assert!(Dialect::from_url("nonsense").is_err());
    }

    #[test]
    fn placeholder_list() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }
}
