//! Statements produced by the insert generator.

use std::fmt;
use std::io::{BufReader, Read};

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::prepared::{execute_prepared, open_large_object, PreparedStatementFactory};
use crate::value::{ColumnData, ColumnValue};
use crate::{Error, Result};

/// Identity of the insert target. Catalog and schema are optional and dialect-dependent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            table: table.into(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn escaped(&self, db: &dyn Database) -> String {
        db.escape_table_name(self.catalog.as_deref(), self.schema.as_deref(), &self.table)
    }

    pub fn escaped_column(&self, db: &dyn Database, column: &str) -> String {
        db.escape_column_name(
            self.catalog.as_deref(),
            self.schema.as_deref(),
            &self.table,
            column,
        )
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.catalog, &self.schema].into_iter().flatten() {
            write!(f, "{part}.")?;
        }
        write!(f, "{}", self.table)
    }
}

/// `INSERT INTO t(a, b) VALUES(x, y)`, or `INSERT INTO t DEFAULT VALUES` without columns.
fn insert_sql(table: &str, columns: &[String], values: &[String]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES");
    }
    format!(
        "INSERT INTO {table}({}) VALUES({})",
        columns.join(", "),
        values.join(", ")
    )
}

fn read_large_object(value: &ColumnData) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if let Some(path) = value.large_object_path() {
        let mut reader = BufReader::new(open_large_object(path)?);
        reader.read_to_end(&mut bytes).map_err(Error::Io)?;
    }
    Ok(bytes)
}

fn literal(db: &dyn Database, value: Option<&ColumnData>) -> Result<String> {
    let Some(value) = value else {
        return Ok("NULL".to_string());
    };
    Ok(match value {
        ColumnData::String(v) => db.string_literal(v),
        ColumnData::Boolean(v) => db.boolean_literal(*v),
        ColumnData::Numeric(v) if !v.is_finite() => {
            tracing::warn!("non-finite number {v} rendered as NULL");
            "NULL".to_string()
        }
        ColumnData::Numeric(v) => v.to_string(),
        ColumnData::Date(v) => db.date_literal(v),
        ColumnData::Clob(_) => {
            let text = String::from_utf8(read_large_object(value)?).map_err(|e| {
                Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?;
            db.string_literal(&text)
        }
        ColumnData::Blob(_) => {
            let bytes = read_large_object(value)?;
            let mut hex = String::with_capacity(bytes.len() * 2 + 3);
            hex.push_str("X'");
            for byte in bytes {
                hex.push_str(&format!("{byte:02X}"));
            }
            hex.push('\'');
            hex
        }
    })
}

/// An insert whose values are rendered inline as SQL literals.
///
/// Text-stream columns are read when the statement is rendered and inlined as string
/// literals. Binary streams never reach this statement through the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: TableRef,
    pub columns: Vec<(String, Option<ColumnData>)>,
}

impl InsertStatement {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    pub fn add_column_value(&mut self, name: impl Into<String>, value: Option<ColumnData>) {
        self.columns.push((name.into(), value));
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn to_sql(&self, db: &dyn Database) -> Result<String> {
        let mut names = Vec::with_capacity(self.columns.len());
        let mut values = Vec::with_capacity(self.columns.len());
        for (name, value) in &self.columns {
            names.push(self.table.escaped_column(db, name));
            values.push(literal(db, value.as_ref())?);
        }
        Ok(insert_sql(&self.table.escaped(db), &names, &values))
    }
}

/// An insert whose values are bound positionally when it is executed.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPreparedStatement {
    table: TableRef,
    columns: Vec<ColumnValue>,
    sql: String,
}

impl InsertPreparedStatement {
    /// `columns` are the bound columns in binding order; one placeholder is emitted for
    /// each of them.
    pub fn new(table: TableRef, columns: Vec<ColumnValue>, db: &dyn Database) -> Self {
        let names: Vec<String> = columns
            .iter()
            .map(|column| table.escaped_column(db, &column.name))
            .collect();
        let params = vec!["?".to_string(); columns.len()];
        let sql = insert_sql(&table.escaped(db), &names, &params);
        Self {
            table,
            columns,
            sql,
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnValue] {
        &self.columns
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The insert is never skipped on databases without support for it.
    pub fn skip_on_unsupported(&self) -> bool {
        false
    }

    /// Bind every column at positions `1..=n` and execute the statement once.
    ///
    /// # Errors
    ///
    /// - [`Error::ResourceNotFound`] if a large-object file is missing.
    /// - [`Error::Database`] if the driver rejects the statement.
    pub fn execute(&self, factory: &dyn PreparedStatementFactory) -> Result<()> {
        execute_prepared(&self.sql, &self.columns, factory)
    }
}

/// A generated insert.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    Insert(InsertStatement),
    InsertPrepared(InsertPreparedStatement),
}

impl SqlStatement {
    pub fn is_prepared(&self) -> bool {
        matches!(self, SqlStatement::InsertPrepared(_))
    }

    pub fn table(&self) -> &TableRef {
        match self {
            SqlStatement::Insert(stmt) => &stmt.table,
            SqlStatement::InsertPrepared(stmt) => &stmt.table,
        }
    }

    /// Names of the columns that take part in the insert, in order.
    pub fn column_names(&self) -> Vec<&str> {
        match self {
            SqlStatement::Insert(stmt) => stmt.column_names(),
            SqlStatement::InsertPrepared(stmt) => {
                stmt.columns.iter().map(|c| c.name.as_str()).collect()
            }
        }
    }

    /// Run the statement through `factory`. Textual inserts are executed without
    /// bindings.
    pub fn execute(
        &self,
        db: &dyn Database,
        factory: &dyn PreparedStatementFactory,
    ) -> Result<()> {
        match self {
            SqlStatement::Insert(stmt) => {
                let sql = stmt.to_sql(db)?;
                tracing::debug!("executing insert: {sql}");
                let mut prepared = factory.create(&sql).map_err(Error::Database)?;
                prepared.execute().map_err(Error::Database)
            }
            SqlStatement::InsertPrepared(stmt) => stmt.execute(factory),
        }
    }
}

crate::assert_send_sync!(TableRef, InsertStatement, InsertPreparedStatement, SqlStatement);
