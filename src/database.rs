//! Database capabilities consulted while generating statements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database-specific behavior: feature flags, identifier escaping and literal rendering.
pub trait Database {
    /// Whether the database generates values for auto-increment columns itself.
    fn supports_auto_increment(&self) -> bool;

    fn escape_table_name(&self, catalog: Option<&str>, schema: Option<&str>, table: &str)
        -> String;

    fn escape_column_name(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> String;

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn boolean_literal(&self, value: bool) -> String {
        let literal = if value { "TRUE" } else { "FALSE" };
        literal.to_string()
    }

    fn date_literal(&self, value: &DateTime<Utc>) -> String {
        format!("'{}'", value.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// How identifiers are quoted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// Identifiers are written as given.
    #[default]
    None,
    /// `"name"`
    DoubleQuote,
    /// `` `name` ``
    Backtick,
    /// `[name]`
    Bracket,
}

impl QuoteStyle {
    pub fn quote(&self, ident: &str) -> String {
        match self {
            QuoteStyle::None => ident.to_string(),
            QuoteStyle::DoubleQuote => format!("\"{}\"", ident.replace('"', "\"\"")),
            QuoteStyle::Backtick => format!("`{}`", ident.replace('`', "``")),
            QuoteStyle::Bracket => format!("[{}]", ident.replace(']', "]]")),
        }
    }
}

/// A configurable [`Database`] implementation.
///
/// Build one with the chained setters, start from a preset such as [`Dialect::sqlite`],
/// or load it from JSON where every missing field keeps its default:
///
/// ```rust
/// use turso_insert::{Dialect, QuoteStyle};
///
/// let dialect = Dialect::from_json(r#"{"name": "mysql", "quoting": "backtick"}"#).unwrap();
/// assert_eq!(dialect.quoting, QuoteStyle::Backtick);
/// assert!(dialect.supports_auto_increment);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    pub name: String,
    pub supports_auto_increment: bool,
    pub quoting: QuoteStyle,
    /// Render booleans as `1`/`0` instead of `TRUE`/`FALSE`.
    pub numeric_booleans: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::new("generic")
    }
}

impl Dialect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_auto_increment: true,
            quoting: QuoteStyle::None,
            numeric_booleans: false,
        }
    }

    pub fn sqlite() -> Self {
        Self::new("sqlite")
            .quoting(QuoteStyle::DoubleQuote)
            .numeric_booleans(true)
    }

    pub fn from_json(config: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(config)?)
    }

    pub fn auto_increment(mut self, supported: bool) -> Self {
        self.supports_auto_increment = supported;
        self
    }

    pub fn quoting(mut self, quoting: QuoteStyle) -> Self {
        self.quoting = quoting;
        self
    }

    pub fn numeric_booleans(mut self, numeric: bool) -> Self {
        self.numeric_booleans = numeric;
        self
    }
}

impl Database for Dialect {
    fn supports_auto_increment(&self) -> bool {
        self.supports_auto_increment
    }

    fn escape_table_name(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> String {
        [catalog, schema, Some(table)]
            .into_iter()
            .flatten()
            .map(|part| self.quoting.quote(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn escape_column_name(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        _table: &str,
        column: &str,
    ) -> String {
        self.quoting.quote(column)
    }

    fn boolean_literal(&self, value: bool) -> String {
        match (self.numeric_booleans, value) {
            (true, true) => "1".to_string(),
            (true, false) => "0".to_string(),
            (false, true) => "TRUE".to_string(),
            (false, false) => "FALSE".to_string(),
        }
    }
}

crate::assert_send_sync!(Dialect);
