//! Column values and their text rendering.
//!
//! Every cell the driver returns is narrowed to one of five shapes before it
//! is printed. The `Display` impl is the only formatting rule in the tool:
//!
//! | value | text |
//! |---|---|
//! | `Absent` | `NULL` |
//! | `Boolean` | `1` / `0` |
//! | `Bytes` | raw bytes as text |
//! | `Timestamp` | `YYYYMMDD HH:MM:SS.fff`, trailing fraction zeros trimmed |
//! | `Other` | text form of the value; decimals keep their scale |

use crate::error::{Result, SqlExecError};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use tiberius::numeric::Numeric;
use tiberius::{ColumnData, FromSql, Row};

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// SQL `NULL`
    Absent,
    /// `bit`
    Boolean(bool),
    /// Binary payload, printed as text without escaping
    Bytes(Vec<u8>),
    /// Any date and/or time value
    Timestamp(NaiveDateTime),
    /// Numbers, strings, GUIDs, decimals and XML, already in text form
    Other(String),
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("NULL"),
            Self::Boolean(true) => f.write_str("1"),
            Self::Boolean(false) => f.write_str("0"),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::Timestamp(ts) => write_timestamp(f, ts),
            Self::Other(text) => f.write_str(text),
        }
    }
}

/// Writes `ts` as `YYYYMMDD HH:MM:SS` plus up to three fraction digits.
///
/// The fraction is truncated to milliseconds; trailing zeros are dropped and
/// a zero fraction drops the dot too.
fn write_timestamp(f: &mut fmt::Formatter<'_>, ts: &NaiveDateTime) -> fmt::Result {
    write!(f, "{}", ts.format("%Y%m%d %H:%M:%S"))?;

    // nanosecond() exceeds 999_999_999 only during a leap second
    let millis = (ts.nanosecond() % 1_000_000_000) / 1_000_000;
    if millis != 0 {
        let digits = format!("{millis:03}");
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }
    Ok(())
}

/// Decodes every cell of a driver row.
///
/// # Errors
/// Returns [`SqlExecError::Decode`] for the first cell that cannot be
/// converted; the caller decides whether to skip the row.
pub fn decode_row(row: &Row) -> Result<Vec<ColumnValue>> {
    row.cells()
        .enumerate()
        .map(|(index, (_column, data))| ColumnValue::decode(index, data))
        .collect()
}

impl ColumnValue {
    /// Converts one cell; `index` is only used to label errors.
    ///
    /// Temporal types go through the driver's chrono conversions; everything
    /// else is mapped straight from the wire representation.
    ///
    /// # Errors
    /// Returns [`SqlExecError::Decode`] if a temporal conversion fails.
    pub fn decode(index: usize, data: &ColumnData<'static>) -> Result<Self> {
        let value = match data {
            ColumnData::Bit(v) => v.map_or(Self::Absent, Self::Boolean),
            ColumnData::U8(v) => display(v.as_ref()),
            ColumnData::I16(v) => display(v.as_ref()),
            ColumnData::I32(v) => display(v.as_ref()),
            ColumnData::I64(v) => display(v.as_ref()),
            // money and smallmoney arrive as F64
            ColumnData::F32(v) => display(v.as_ref()),
            ColumnData::F64(v) => display(v.as_ref()),
            ColumnData::Numeric(v) => v.map_or(Self::Absent, |n| Self::Other(numeric_text(n))),
            ColumnData::Guid(v) => display(v.as_ref()),
            ColumnData::String(v) => display(v.as_ref()),
            ColumnData::Xml(v) => display(v.as_ref()),
            ColumnData::Binary(v) => v
                .as_ref()
                .map_or(Self::Absent, |bytes| Self::Bytes(bytes.to_vec())),
            ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
                temporal::<NaiveDateTime>(index, data)?.map_or(Self::Absent, Self::Timestamp)
            }
            ColumnData::Date(_) => temporal::<NaiveDate>(index, data)?
                .map_or(Self::Absent, |date| {
                    Self::Timestamp(date.and_time(NaiveTime::MIN))
                }),
            ColumnData::Time(_) => temporal::<NaiveTime>(index, data)?
                .map_or(Self::Absent, |time| Self::Timestamp(time_of_day(time))),
            ColumnData::DateTimeOffset(_) => temporal::<DateTime<FixedOffset>>(index, data)?
                .map_or(Self::Absent, |dt| Self::Timestamp(dt.naive_local())),
        };

        Ok(value)
    }
}

fn temporal<'a, T>(index: usize, data: &'a ColumnData<'static>) -> Result<Option<T>>
where
    T: FromSql<'a>,
{
    T::from_sql(data).map_err(|e| SqlExecError::decode(index, e))
}

/// `Other` from any displayable driver value, or `Absent` for NULL.
fn display<T: fmt::Display + ?Sized>(value: Option<&T>) -> ColumnValue {
    value.map_or(ColumnValue::Absent, |v| ColumnValue::Other(v.to_string()))
}

/// Exact decimal text: optional sign, integer digits, then `scale` fraction
/// digits. Scale 0 has no dot.
fn numeric_text(numeric: Numeric) -> String {
    let scale = usize::from(numeric.scale());
    let value = numeric.value();
    let sign = if value < 0 { "-" } else { "" };
    let digits = format!(
        "{:0width$}",
        value.unsigned_abs(),
        width = scale.saturating_add(1)
    );

    if scale == 0 {
        return format!("{sign}{digits}");
    }
    let (whole, fraction) = digits.split_at(digits.len().saturating_sub(scale));
    format!("{sign}{whole}.{fraction}")
}

/// A bare `time` value anchored on 0001-01-01.
fn time_of_day(time: NaiveTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or_default()
        .and_time(time)
}
