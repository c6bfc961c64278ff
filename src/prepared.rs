//! Positional binding of column values to a prepared statement.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::value::{ColumnData, ColumnValue, Numeric};
use crate::{BoxError, Error, Result};

pub type DriverResult<T> = std::result::Result<T, BoxError>;

/// A statement handle prepared by a driver, bound with 1-based positions.
///
/// Implementations are used from a single thread for the duration of one execution.
pub trait PreparedStatement {
    fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()>;
    fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()>;
    fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()>;
    fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()>;
    fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()>;
    fn set_float(&mut self, index: usize, value: f32) -> DriverResult<()>;
    fn set_decimal(&mut self, index: usize, value: &BigDecimal) -> DriverResult<()>;
    fn set_date(&mut self, index: usize, value: NaiveDate) -> DriverResult<()>;
    /// The stream is only valid for the duration of the call.
    fn set_binary_stream(&mut self, index: usize, stream: &mut dyn Read) -> DriverResult<()>;
    /// The stream is only valid for the duration of the call.
    fn set_character_stream(&mut self, index: usize, stream: &mut dyn BufRead)
        -> DriverResult<()>;
    /// Run the statement once. Any rows produced are discarded.
    fn execute(&mut self) -> DriverResult<()>;
}

/// Source of prepared statements, usually a connection.
pub trait PreparedStatementFactory {
    fn create<'a>(&'a self, sql: &str) -> DriverResult<Box<dyn PreparedStatement + 'a>>;
}

/// Open the file behind a large-object column.
pub(crate) fn open_large_object(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::ResourceNotFound {
            message: format!("{}: {e}", path.display()),
            source: e,
        },
        _ => Error::Io(e),
    })
}

fn bind_numeric(
    stmt: &mut dyn PreparedStatement,
    index: usize,
    number: &Numeric,
) -> DriverResult<()> {
    match number {
        Numeric::Long(v) => stmt.set_long(index, *v),
        Numeric::Int(v) => stmt.set_int(index, *v),
        Numeric::Double(v) => stmt.set_double(index, *v),
        Numeric::Float(v) => stmt.set_float(index, *v),
        Numeric::Decimal(v) => stmt.set_decimal(index, v),
        Numeric::BigInteger(v) => {
            let narrowed = Numeric::big_integer_as_i32(v);
            if v != &num_bigint::BigInt::from(narrowed) {
                tracing::warn!("big integer {v} at position {index} truncated to {narrowed}");
            }
            stmt.set_int(index, narrowed)
        }
    }
}

/// Classify a driver failure. I/O errors raised while the driver consumes a stream
/// stay I/O errors; anything else is a database failure.
fn driver_error(e: BoxError) -> Error {
    match e.downcast::<std::io::Error>() {
        Ok(io) => Error::Io(*io),
        Err(e) => Error::Database(e),
    }
}

/// Bind one column at `index`. Large-object files are opened here and closed before
/// this returns, whether binding succeeded or not.
pub(crate) fn bind_column(
    stmt: &mut dyn PreparedStatement,
    index: usize,
    column: &ColumnValue,
) -> Result<()> {
    let Some(value) = &column.value else {
        tracing::trace!("position {index} ({}) left unbound", column.name);
        return Ok(());
    };
    tracing::trace!("binding {} at position {index}", column.name);
    let bound = match value {
        ColumnData::String(v) => stmt.set_string(index, v),
        ColumnData::Boolean(v) => stmt.set_boolean(index, *v),
        ColumnData::Numeric(v) => bind_numeric(stmt, index, v),
        ColumnData::Date(v) => stmt.set_date(index, v.date_naive()),
        ColumnData::Blob(path) => {
            let mut reader = BufReader::new(open_large_object(path)?);
            stmt.set_binary_stream(index, &mut reader)
        }
        ColumnData::Clob(path) => {
            let mut reader = BufReader::new(open_large_object(path)?);
            stmt.set_character_stream(index, &mut reader)
        }
    };
    bound.map_err(driver_error)
}

/// Prepare `sql` through `factory`, bind `columns` at positions 1..=n and execute once.
pub fn execute_prepared(
    sql: &str,
    columns: &[ColumnValue],
    factory: &dyn PreparedStatementFactory,
) -> Result<()> {
    tracing::debug!("executing prepared insert: {sql}");
    let mut stmt = factory.create(sql).map_err(Error::Database)?;
    for (i, column) in columns.iter().enumerate() {
        bind_column(stmt.as_mut(), i + 1, column)?;
    }
    stmt.execute().map_err(Error::Database)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use num_bigint::BigInt;
    use std::cell::RefCell;
    use std::io::Write;
    use std::path::PathBuf;
    use std::str::FromStr;

    /// A call observed by [`RecordingFactory`].
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Create(String),
        String(usize, String),
        Boolean(usize, bool),
        Long(usize, i64),
        Int(usize, i32),
        Double(usize, f64),
        Float(usize, f32),
        Decimal(usize, String),
        Date(usize, NaiveDate),
        BinaryStream(usize, Vec<u8>),
        CharacterStream(usize, String),
        Execute,
    }

    /// Records every call and optionally fails one of them.
    #[derive(Default)]
    pub(crate) struct RecordingFactory {
        pub(crate) calls: RefCell<Vec<Call>>,
        pub(crate) fail_on_stream: bool,
        pub(crate) fail_on_execute: bool,
    }

    struct RecordingStatement<'a> {
        factory: &'a RecordingFactory,
    }

    impl RecordingStatement<'_> {
        fn record(&self, call: Call) -> DriverResult<()> {
            self.factory.calls.borrow_mut().push(call);
            Ok(())
        }
    }

    impl PreparedStatement for RecordingStatement<'_> {
        fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()> {
            self.record(Call::String(index, value.to_string()))
        }
        fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()> {
            self.record(Call::Boolean(index, value))
        }
        fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()> {
            self.record(Call::Long(index, value))
        }
        fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()> {
            self.record(Call::Int(index, value))
        }
        fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()> {
            self.record(Call::Double(index, value))
        }
        fn set_float(&mut self, index: usize, value: f32) -> DriverResult<()> {
            self.record(Call::Float(index, value))
        }
        fn set_decimal(&mut self, index: usize, value: &BigDecimal) -> DriverResult<()> {
            self.record(Call::Decimal(index, value.to_string()))
        }
        fn set_date(&mut self, index: usize, value: NaiveDate) -> DriverResult<()> {
            self.record(Call::Date(index, value))
        }
        fn set_binary_stream(&mut self, index: usize, stream: &mut dyn Read) -> DriverResult<()> {
            if self.factory.fail_on_stream {
                return Err("stream rejected".into());
            }
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes)?;
            self.record(Call::BinaryStream(index, bytes))
        }
        fn set_character_stream(
            &mut self,
            index: usize,
            stream: &mut dyn BufRead,
        ) -> DriverResult<()> {
            if self.factory.fail_on_stream {
                return Err("stream rejected".into());
            }
            let mut text = String::new();
            stream.read_to_string(&mut text)?;
            self.record(Call::CharacterStream(index, text))
        }
        fn execute(&mut self) -> DriverResult<()> {
            if self.factory.fail_on_execute {
                return Err("UNIQUE constraint failed: t.id".into());
            }
            self.record(Call::Execute)
        }
    }

    impl PreparedStatementFactory for RecordingFactory {
        fn create<'a>(&'a self, sql: &str) -> DriverResult<Box<dyn PreparedStatement + 'a>> {
            self.calls.borrow_mut().push(Call::Create(sql.to_string()));
            Ok(Box::new(RecordingStatement { factory: self }))
        }
    }

    impl RecordingFactory {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    fn temp_file_with(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_binds_every_type_with_its_own_setter() {
        let blob = temp_file_with(&[0, 1, 2, 255]);
        let clob = temp_file_with("large text".as_bytes());
        let instant = Utc.with_ymd_and_hms(2024, 5, 17, 23, 59, 0).unwrap();
        let columns = vec![
            ColumnValue::string("s", "Alice"),
            ColumnValue::boolean("b", true),
            ColumnValue::numeric("l", 5i64),
            ColumnValue::numeric("i", 6i32),
            ColumnValue::numeric("d", 1.5f64),
            ColumnValue::numeric("f", 2.5f32),
            ColumnValue::numeric("m", BigDecimal::from_str("10.25").unwrap()),
            ColumnValue::numeric("n", BigInt::from(7)),
            ColumnValue::date("dt", instant),
            ColumnValue::blob("bl", blob.path()),
            ColumnValue::clob("cl", clob.path()),
        ];
        let factory = RecordingFactory::default();
        execute_prepared("INSERT", &columns, &factory).unwrap();
        assert_eq!(
            factory.calls(),
            vec![
                Call::Create("INSERT".to_string()),
                Call::String(1, "Alice".to_string()),
                Call::Boolean(2, true),
                Call::Long(3, 5),
                Call::Int(4, 6),
                Call::Double(5, 1.5),
                Call::Float(6, 2.5),
                Call::Decimal(7, "10.25".to_string()),
                Call::Int(8, 7),
                Call::Date(9, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()),
                Call::BinaryStream(10, vec![0, 1, 2, 255]),
                Call::CharacterStream(11, "large text".to_string()),
                Call::Execute,
            ]
        );
    }

    #[test]
    fn test_empty_slot_consumes_a_position() {
        let columns = vec![
            ColumnValue::string("a", "x"),
            ColumnValue::new("empty"),
            ColumnValue::string("c", "z"),
        ];
        let factory = RecordingFactory::default();
        execute_prepared("INSERT", &columns, &factory).unwrap();
        assert_eq!(
            factory.calls(),
            vec![
                Call::Create("INSERT".to_string()),
                Call::String(1, "x".to_string()),
                Call::String(3, "z".to_string()),
                Call::Execute,
            ]
        );
    }

    #[test]
    fn test_big_integer_out_of_range_is_narrowed() {
        let columns = vec![ColumnValue::numeric("n", BigInt::from(4_294_967_303i64))];
        let factory = RecordingFactory::default();
        execute_prepared("INSERT", &columns, &factory).unwrap();
        assert_eq!(factory.calls()[1], Call::Int(1, 7));
    }

    #[test]
    fn test_missing_file_is_resource_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let columns = vec![
            ColumnValue::string("name", "Alice"),
            ColumnValue::blob("photo", &missing),
        ];
        let factory = RecordingFactory::default();
        let err = execute_prepared("INSERT", &columns, &factory).unwrap_err();
        match err {
            Error::ResourceNotFound { message, source } => {
                assert!(message.contains("missing.png"), "{message}");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected ResourceNotFound, got {other:?}"),
        }
        assert!(!factory.calls().contains(&Call::Execute));
    }

    /// File descriptors of this process that refer to `path`.
    #[cfg(target_os = "linux")]
    fn open_handles_to(path: &Path) -> usize {
        let target = std::fs::canonicalize(path).unwrap();
        std::fs::read_dir("/proc/self/fd")
            .unwrap()
            .filter_map(|entry| std::fs::read_link(entry.ok()?.path()).ok())
            .filter(|link| link == &target)
            .count()
    }

    fn assert_handle_released_after_failed_bind(column: impl Fn(PathBuf) -> ColumnValue) {
        // keep the path but close the handle held by the temp file itself
        let path = temp_file_with(b"payload").into_temp_path();
        #[cfg(target_os = "linux")]
        assert_eq!(open_handles_to(&path), 0);

        let factory = RecordingFactory {
            fail_on_stream: true,
            ..Default::default()
        };
        let columns = vec![column(path.to_path_buf())];
        let err = execute_prepared("INSERT", &columns, &factory).unwrap_err();
        assert!(matches!(err, Error::Database(_)), "{err:?}");
        assert!(!factory.calls().contains(&Call::Execute));

        #[cfg(target_os = "linux")]
        assert_eq!(open_handles_to(&path), 0);
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_blob_handle_released_after_failed_bind() {
        assert_handle_released_after_failed_bind(|path| ColumnValue::blob("photo", path));
    }

    #[test]
    fn test_clob_handle_released_after_failed_bind() {
        assert_handle_released_after_failed_bind(|path| ColumnValue::clob("notes", path));
    }

    #[test]
    fn test_stream_read_failure_is_io_error() {
        let clob = temp_file_with(&[0x66, 0xFF, 0x67]);
        let columns = vec![ColumnValue::clob("notes", clob.path())];
        let factory = RecordingFactory::default();
        match execute_prepared("INSERT", &columns, &factory).unwrap_err() {
            Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
            other => panic!("expected Io, got {other:?}"),
        }
        assert!(!factory.calls().contains(&Call::Execute));
    }

    #[test]
    fn test_execute_failure_is_database_error() {
        let factory = RecordingFactory {
            fail_on_execute: true,
            ..Default::default()
        };
        let err = execute_prepared("INSERT", &[ColumnValue::numeric("id", 1)], &factory)
            .unwrap_err();
        match err {
            Error::Database(source) => assert!(source.to_string().contains("UNIQUE")),
            other => panic!("expected Database, got {other:?}"),
        }
    }
}
