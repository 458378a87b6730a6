// src/table/types.rs

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// A point in time, either carrying a UTC offset or stated to be zone-naive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl Temporal {
    /// Midnight of `date`, zone-naive.
    pub fn from_date(date: NaiveDate) -> Self {
        Temporal::Naive(date.and_time(NaiveTime::MIN))
    }

    /// The UTC instant with any offset dropped.
    pub fn naive_utc(&self) -> NaiveDateTime {
        match self {
            Temporal::Naive(n) => *n,
            Temporal::Zoned(dt) => dt.naive_utc(),
        }
    }
}

/// Numeric or boolean values stored in a wider/narrower representation than
/// the plain JSON primitives (`u64`, `f32`, fixed-point decimals).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boxed {
    UInt(u64),
    Float32(f32),
    Decimal { value: i128, scale: i8 },
    Bool(bool),
}

impl Boxed {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Boxed::UInt(v) => Some(v as f64),
            Boxed::Float32(v) => Some(v as f64),
            Boxed::Decimal { value, scale } => Some(value as f64 / 10f64.powi(scale as i32)),
            Boxed::Bool(_) => None,
        }
    }
}

/// Values a plain JSON encoder has no representation for.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Instant(Temporal),
    Date(NaiveDate),
    Boxed(Boxed),
    /// Anything else, already rendered to text (times of day, durations, binary, nested values).
    Other(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Instant(Temporal::Naive(n)) => write!(f, "{n}"),
            Scalar::Instant(Temporal::Zoned(dt)) => write!(f, "{dt}"),
            Scalar::Date(d) => write!(f, "{d}"),
            Scalar::Boxed(Boxed::UInt(v)) => write!(f, "{v}"),
            Scalar::Boxed(Boxed::Float32(v)) => write!(f, "{v}"),
            Scalar::Boxed(Boxed::Bool(v)) => write!(f, "{v}"),
            Scalar::Boxed(Boxed::Decimal { value, scale }) => {
                write!(f, "{}", format_decimal(*value, *scale))
            }
            Scalar::Other(s) => f.write_str(s),
        }
    }
}

fn format_decimal(value: i128, scale: i8) -> String {
    if scale <= 0 {
        let zeros = "0".repeat(scale.unsigned_abs() as usize);
        return format!("{value}{zeros}");
    }
    let scale = scale as usize;
    let digits = value.unsigned_abs().to_string();
    let sign = if value < 0 { "-" } else { "" };
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int, frac) = padded.split_at(padded.len() - scale);
    format!("{sign}{int}.{frac}")
}

/// One cell of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Scalar(Scalar),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Kind of this single value; `None` for nulls.
    pub fn kind(&self) -> Option<NativeKind> {
        match self {
            Cell::Null => None,
            Cell::Bool(_) | Cell::Scalar(Scalar::Boxed(Boxed::Bool(_))) => {
                Some(NativeKind::Boolean)
            }
            Cell::Int(_) | Cell::Float(_) | Cell::Scalar(Scalar::Boxed(_)) => {
                Some(NativeKind::Numeric)
            }
            Cell::Scalar(Scalar::Instant(_)) | Cell::Scalar(Scalar::Date(_)) => {
                Some(NativeKind::Temporal)
            }
            Cell::Text(_) | Cell::Scalar(Scalar::Other(_)) => Some(NativeKind::Textual),
        }
    }

    /// The temporal value held by this cell, if it already is one.
    pub fn as_temporal(&self) -> Option<Temporal> {
        match self {
            Cell::Scalar(Scalar::Instant(t)) => Some(*t),
            Cell::Scalar(Scalar::Date(d)) => Some(Temporal::from_date(*d)),
            _ => None,
        }
    }
}

/// Column-level storage classification, fixed when the column is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Temporal,
    Numeric,
    Boolean,
    Textual,
}

impl NativeKind {
    /// Common kind of all non-null cells; mixed or all-null columns are `Textual`.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut seen: Option<NativeKind> = None;
        for kind in cells.into_iter().filter_map(Cell::kind) {
            match seen {
                None => seen = Some(kind),
                Some(prev) if prev != kind => return NativeKind::Textual,
                _ => {}
            }
        }
        seen.unwrap_or(NativeKind::Textual)
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NativeKind::Temporal => "temporal",
            NativeKind::Numeric => "numeric",
            NativeKind::Boolean => "boolean",
            NativeKind::Textual => "textual",
        };
        f.write_str(s)
    }
}
