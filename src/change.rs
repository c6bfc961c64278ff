//! The insert-data change and the statement generator behind it.

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::statement::{InsertPreparedStatement, InsertStatement, SqlStatement, TableRef};
use crate::value::ColumnValue;

/// Build the statement inserting one row of `columns` into `table`.
///
/// Columns flagged auto-increment are dropped when `db` generates their values; the
/// order of the remaining columns is kept.
///
/// If any column references a binary stream the result is an
/// [`SqlStatement::InsertPrepared`], since raw binary payloads cannot be embedded in
/// SQL text. Text streams alone keep the textual [`SqlStatement::Insert`] even though
/// they are streamed as well when bound; they are read and inlined when the textual
/// statement is rendered.
pub fn generate(table: &TableRef, columns: &[ColumnValue], db: &dyn Database) -> SqlStatement {
    let skip_auto_increment = db.supports_auto_increment();
    let included = columns
        .iter()
        .filter(|column| !(skip_auto_increment && column.is_auto_increment()));

    if columns.iter().any(ColumnValue::has_blob) {
        let bound: Vec<ColumnValue> = included.cloned().collect();
        tracing::debug!(
            "insert into {table} with {} bound columns uses a prepared statement",
            bound.len()
        );
        return SqlStatement::InsertPrepared(InsertPreparedStatement::new(
            table.clone(),
            bound,
            db,
        ));
    }

    let mut statement = InsertStatement::new(table.clone());
    for column in included {
        statement.add_column_value(column.name.clone(), column.value.clone());
    }
    tracing::debug!(
        "insert into {table} with {} columns uses a textual statement",
        statement.columns.len()
    );
    SqlStatement::Insert(statement)
}

/// Inserts one row into an existing table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertDataChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<ColumnValue>,
}

impl InsertDataChange {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    pub fn catalog(mut self, catalog_name: impl Into<String>) -> Self {
        self.catalog_name = Some(catalog_name.into());
        self
    }

    pub fn schema(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    pub fn column(mut self, column: ColumnValue) -> Self {
        self.columns.push(column);
        self
    }

    pub fn add_column(&mut self, column: ColumnValue) {
        self.columns.push(column);
    }

    /// Remove every column equal to `column`.
    pub fn remove_column(&mut self, column: &ColumnValue) {
        self.columns.retain(|c| c != column);
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.catalog_name.clone(),
            schema: self.schema_name.clone(),
            table: self.table_name.clone(),
        }
    }

    pub fn generate_statements(&self, db: &dyn Database) -> Vec<SqlStatement> {
        vec![generate(&self.table_ref(), &self.columns, db)]
    }

    pub fn confirmation_message(&self) -> String {
        format!("New row inserted into {}", self.table_name)
    }
}

crate::assert_send_sync!(InsertDataChange);
