//! SQLite driver for prepared inserts, backed by `rusqlite`.
//!
//! SQLite has no decimal or date storage class: decimals are bound as their text
//! rendering and dates as `YYYY-MM-DD` text. Streams are read fully before binding.

use std::io::{BufRead, Read};

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::prepared::{DriverResult, PreparedStatement, PreparedStatementFactory};

impl PreparedStatementFactory for rusqlite::Connection {
    fn create<'a>(&'a self, sql: &str) -> DriverResult<Box<dyn PreparedStatement + 'a>> {
        let stmt = self.prepare(sql)?;
        Ok(Box::new(stmt))
    }
}

impl PreparedStatement for rusqlite::Statement<'_> {
    fn set_string(&mut self, index: usize, value: &str) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, value)?)
    }

    fn set_boolean(&mut self, index: usize, value: bool) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, value)?)
    }

    fn set_long(&mut self, index: usize, value: i64) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, value)?)
    }

    fn set_int(&mut self, index: usize, value: i32) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, value)?)
    }

    fn set_double(&mut self, index: usize, value: f64) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, value)?)
    }

    fn set_float(&mut self, index: usize, value: f32) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, f64::from(value))?)
    }

    fn set_decimal(&mut self, index: usize, value: &BigDecimal) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, value.to_string())?)
    }

    fn set_date(&mut self, index: usize, value: NaiveDate) -> DriverResult<()> {
        Ok(self.raw_bind_parameter(index, value.format("%Y-%m-%d").to_string())?)
    }

    fn set_binary_stream(&mut self, index: usize, stream: &mut dyn Read) -> DriverResult<()> {
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(self.raw_bind_parameter(index, bytes)?)
    }

    fn set_character_stream(
        &mut self,
        index: usize,
        stream: &mut dyn BufRead,
    ) -> DriverResult<()> {
        let mut text = String::new();
        stream.read_to_string(&mut text)?;
        Ok(self.raw_bind_parameter(index, text)?)
    }

    fn execute(&mut self) -> DriverResult<()> {
        let changes = self.raw_execute()?;
        tracing::trace!("statement changed {changes} rows");
        Ok(())
    }
}
