//! Column values supplied to an insert.

use std::fmt;
use std::path::{Path, PathBuf};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};

/// A numeric value, keeping the width it was supplied with.
///
/// The width decides which typed setter is used when the value is bound to a
/// prepared statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Numeric {
    Long(i64),
    Int(i32),
    /// Non-finite values (`NaN`, infinities) have no SQL literal and are rendered as
    /// `NULL` in textual inserts.
    Double(f64),
    /// Rendered as `NULL` in textual inserts when not finite, like [`Numeric::Double`].
    Float(f32),
    Decimal(BigDecimal),
    /// Arbitrary-precision integer.
    ///
    /// Bound through the 32-bit integer setter. Values outside the `i32` range keep only
    /// their low 32 bits (two's complement), so large values are silently truncated.
    BigInteger(BigInt),
}

impl Numeric {
    /// Narrow a [`Numeric::BigInteger`] the way it is bound: the low 32 bits of its
    /// two's complement representation, reinterpreted as `i32`.
    pub fn big_integer_as_i32(value: &BigInt) -> i32 {
        let (sign, digits) = value.to_u32_digits();
        let low = digits.first().copied().unwrap_or(0);
        let bits = if sign == Sign::Minus {
            low.wrapping_neg()
        } else {
            low
        };
        bits as i32
    }

    /// Whether the value has a SQL numeric literal. Only floating-point values can fail.
    pub fn is_finite(&self) -> bool {
        match self {
            Numeric::Double(v) => v.is_finite(),
            Numeric::Float(v) => v.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Long(v) => write!(f, "{v}"),
            Numeric::Int(v) => write!(f, "{v}"),
            Numeric::Double(v) => write!(f, "{v}"),
            Numeric::Float(v) => write!(f, "{v}"),
            Numeric::Decimal(v) => write!(f, "{v}"),
            Numeric::BigInteger(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric::Long(value)
    }
}

impl From<i32> for Numeric {
    fn from(value: i32) -> Self {
        Numeric::Int(value)
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Double(value)
    }
}

impl From<f32> for Numeric {
    fn from(value: f32) -> Self {
        Numeric::Float(value)
    }
}

impl From<BigDecimal> for Numeric {
    fn from(value: BigDecimal) -> Self {
        Numeric::Decimal(value)
    }
}

impl From<BigInt> for Numeric {
    fn from(value: BigInt) -> Self {
        Numeric::BigInteger(value)
    }
}

/// The single populated value of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnData {
    String(String),
    Boolean(bool),
    Numeric(Numeric),
    Date(DateTime<Utc>),
    /// Large binary object, streamed from the file at this path.
    Blob(PathBuf),
    /// Large text object, streamed from the file at this path.
    Clob(PathBuf),
}

impl ColumnData {
    pub fn is_blob(&self) -> bool {
        matches!(self, ColumnData::Blob(_))
    }

    /// Path of the referenced file for large objects.
    pub fn large_object_path(&self) -> Option<&Path> {
        match self {
            ColumnData::Blob(path) | ColumnData::Clob(path) => Some(path),
            _ => None,
        }
    }
}

/// One column's value for the row being inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnValue {
    pub name: String,
    /// `None` when the column has nothing to bind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ColumnData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,
}

impl ColumnValue {
    /// A column without a value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            auto_increment: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: ColumnData) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            auto_increment: None,
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_value(name, ColumnData::String(value.into()))
    }

    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::with_value(name, ColumnData::Boolean(value))
    }

    pub fn numeric(name: impl Into<String>, value: impl Into<Numeric>) -> Self {
        Self::with_value(name, ColumnData::Numeric(value.into()))
    }

    pub fn date(name: impl Into<String>, value: DateTime<Utc>) -> Self {
        Self::with_value(name, ColumnData::Date(value))
    }

    pub fn blob(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_value(name, ColumnData::Blob(path.into()))
    }

    pub fn clob(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_value(name, ColumnData::Clob(path.into()))
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = Some(auto_increment);
        self
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment == Some(true)
    }

    pub fn has_blob(&self) -> bool {
        self.value.as_ref().is_some_and(ColumnData::is_blob)
    }
}

crate::assert_send_sync!(ColumnValue, ColumnData, Numeric);
