//! # Insert-row statement generation
//!
//! This crate turns a table reference and an ordered list of typed column values into a
//! single executable `INSERT` statement.
//!
//! Two strategies exist:
//!
//! - a textual statement ([`InsertStatement`]) whose literals are rendered inline, used
//!   whenever no column references a large binary object;
//! - a prepared statement ([`InsertPreparedStatement`]) whose values are bound
//!   positionally at execution time, used as soon as one column carries a
//!   [`ColumnData::Blob`].
//!
//! ```rust,no_run
//! # fn run() -> turso_insert::Result<()> {
//! use turso_insert::{ColumnValue, Dialect, InsertDataChange};
//!
//! let change = InsertDataChange::new("users")
//!     .column(ColumnValue::new("id").auto_increment(true))
//!     .column(ColumnValue::string("name", "Alice"))
//!     .column(ColumnValue::numeric("age", 30));
//!
//! let conn = rusqlite::Connection::open_in_memory().unwrap();
//! for stmt in change.generate_statements(&Dialect::sqlite()) {
//!     stmt.execute(&Dialect::sqlite(), &conn)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod change;
pub mod database;
pub mod prepared;
pub mod serializer;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod statement;
pub mod value;

pub use change::{generate, InsertDataChange};
pub use database::{Database, Dialect, QuoteStyle};
pub use prepared::{PreparedStatement, PreparedStatementFactory};
pub use serializer::{ChangeLogSerializer, JsonChangeLogSerializer, SerializerRegistry};
pub use statement::{InsertPreparedStatement, InsertStatement, SqlStatement, TableRef};
pub use value::{ColumnData, ColumnValue, Numeric};

/// Assert that a type implements both Send and Sync at compile time.
/// Usage: assert_send_sync!(MyType);
/// Usage: assert_send_sync!(Type1, Type2, Type3);
macro_rules! assert_send_sync {
    ($($t:ty),+ $(,)?) => {
        #[cfg(test)]
        $(const _: () = {
            const fn _assert_send<T: ?Sized + Send>() {}
            const fn _assert_sync<T: ?Sized + Sync>() {}
            _assert_send::<$t>();
            _assert_sync::<$t>();
        };)+
    };
}

pub(crate) use assert_send_sync;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A large-object file referenced by a column could not be found when it was opened.
    #[error("{message}")]
    ResourceNotFound {
        message: String,
        #[source]
        source: std::io::Error,
    },
    /// The driver rejected the statement while preparing, binding or executing it.
    #[error("database execution failure: {0}")]
    Database(#[source] BoxError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no serializers associated with the filename or extension '{0}'")]
    NoSerializer(String),
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;
