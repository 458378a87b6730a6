// src/table/arrow.rs

use ::arrow::{
    array::{Array, ArrayRef, AsArray},
    compute::cast,
    datatypes::{
        ArrowPrimitiveType, DataType, Date32Type, Date64Type, Decimal128Type, Float16Type,
        Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, Schema, TimeUnit,
        TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
        TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
    },
    record_batch::RecordBatch,
    util::display::{ArrayFormatter, FormatOptions},
};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::warn;

use super::{Boxed, Cell, Column, NativeKind, Scalar, Table, Temporal};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Map an Arrow DataType onto the column's native kind.
///
/// - Timestamp*, Date32, Date64        → Temporal
/// - Int*, UInt*, Float*, Decimal*     → Numeric
/// - Boolean                           → Boolean
/// - Dictionary(_, v)                  → kind of `v`
/// - fallback (Utf8, Time, Binary, …)  → Textual
pub fn native_kind_of(dt: &DataType) -> NativeKind {
    match dt {
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => NativeKind::Temporal,
        DataType::Boolean => NativeKind::Boolean,
        DataType::Dictionary(_, value) => native_kind_of(value),
        dt if dt.is_numeric() => NativeKind::Numeric,
        _ => NativeKind::Textual,
    }
}

/// Resolve an Arrow timezone string into a fixed offset.
/// Named zones other than UTC are not resolvable here; Arrow stores the
/// values as UTC instants anyway, so they are kept at offset zero.
fn parse_offset(tz: &str) -> FixedOffset {
    let utc = FixedOffset::east_opt(0).expect("zero offset is valid");
    match tz {
        "UTC" | "utc" | "Z" | "Etc/UTC" | "GMT" => utc,
        other => other.parse::<FixedOffset>().unwrap_or_else(|_| {
            warn!(tz = other, "unresolved timezone, keeping values as UTC");
            utc
        }),
    }
}

fn instant(unit: &TimeUnit, v: i64) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::from_timestamp(v, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(v),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(v),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(v)),
    }
}

fn primitive<T: ArrowPrimitiveType>(array: &dyn Array, f: impl Fn(T::Native) -> Cell) -> Vec<Cell> {
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map_or(Cell::Null, &f))
        .collect()
}

fn timestamps<T>(array: &dyn Array, unit: &TimeUnit, tz: Option<&str>) -> Vec<Cell>
where
    T: ArrowPrimitiveType<Native = i64>,
{
    let offset = tz.map(parse_offset);
    primitive::<T>(array, |v| match (instant(unit, v), offset) {
        (Some(utc), Some(off)) => Cell::Scalar(Scalar::Instant(Temporal::Zoned(utc.with_timezone(&off)))),
        (Some(utc), None) => Cell::Scalar(Scalar::Instant(Temporal::Naive(utc.naive_utc()))),
        (None, _) => Cell::Null,
    })
}

fn strings<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<Cell> {
    values.map(|v| v.map_or(Cell::Null, Cell::text)).collect()
}

/// Convert one Arrow array into cells.
pub fn cells_from_array(array: &dyn Array) -> Result<Vec<Cell>> {
    let cells = match array.data_type() {
        DataType::Null => vec![Cell::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Cell::Null, Cell::Bool))
            .collect(),
        DataType::Int8 => primitive::<Int8Type>(array, |v| Cell::Int(v.into())),
        DataType::Int16 => primitive::<Int16Type>(array, |v| Cell::Int(v.into())),
        DataType::Int32 => primitive::<Int32Type>(array, |v| Cell::Int(v.into())),
        DataType::Int64 => primitive::<Int64Type>(array, Cell::Int),
        DataType::UInt8 => primitive::<UInt8Type>(array, |v| Cell::Int(v.into())),
        DataType::UInt16 => primitive::<UInt16Type>(array, |v| Cell::Int(v.into())),
        DataType::UInt32 => primitive::<UInt32Type>(array, |v| Cell::Int(v.into())),
        DataType::UInt64 => {
            primitive::<UInt64Type>(array, |v| Cell::Scalar(Scalar::Boxed(Boxed::UInt(v))))
        }
        DataType::Float16 => primitive::<Float16Type>(array, |v| {
            Cell::Scalar(Scalar::Boxed(Boxed::Float32(v.to_f32())))
        }),
        DataType::Float32 => {
            primitive::<Float32Type>(array, |v| Cell::Scalar(Scalar::Boxed(Boxed::Float32(v))))
        }
        DataType::Float64 => primitive::<Float64Type>(array, Cell::Float),
        DataType::Decimal128(_, scale) => {
            let scale = *scale;
            primitive::<Decimal128Type>(array, |value| {
                Cell::Scalar(Scalar::Boxed(Boxed::Decimal { value, scale }))
            })
        }
        DataType::Utf8 => strings(array.as_string::<i32>().iter()),
        DataType::LargeUtf8 => strings(array.as_string::<i64>().iter()),
        DataType::Utf8View => strings(array.as_string_view().iter()),
        DataType::Date32 => primitive::<Date32Type>(array, |v| {
            v.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map_or(Cell::Null, |d| Cell::Scalar(Scalar::Date(d)))
        }),
        DataType::Date64 => primitive::<Date64Type>(array, |v| {
            DateTime::from_timestamp_millis(v)
                .map_or(Cell::Null, |dt| Cell::Scalar(Scalar::Date(dt.date_naive())))
        }),
        DataType::Timestamp(unit, tz) => {
            let tz = tz.as_deref();
            match unit {
                TimeUnit::Second => timestamps::<TimestampSecondType>(array, unit, tz),
                TimeUnit::Millisecond => timestamps::<TimestampMillisecondType>(array, unit, tz),
                TimeUnit::Microsecond => timestamps::<TimestampMicrosecondType>(array, unit, tz),
                TimeUnit::Nanosecond => timestamps::<TimestampNanosecondType>(array, unit, tz),
            }
        }
        DataType::Dictionary(_, value) => {
            let flat = cast(array, value)
                .with_context(|| format!("unpacking dictionary of {value}"))?;
            cells_from_array(flat.as_ref())?
        }
        other => {
            let formatter = ArrayFormatter::try_new(array, &FormatOptions::default())
                .with_context(|| format!("no display for {other}"))?;
            (0..array.len())
                .map(|i| {
                    if array.is_null(i) {
                        Cell::Null
                    } else {
                        Cell::Scalar(Scalar::Other(formatter.value(i).to_string()))
                    }
                })
                .collect()
        }
    };
    Ok(cells)
}

/// Stitch record batches sharing `schema` into a single [`Table`].
pub fn table_from_batches(schema: &Schema, batches: &[RecordBatch]) -> Result<Table> {
    let mut columns = Vec::with_capacity(schema.fields().len());
    for (idx, field) in schema.fields().iter().enumerate() {
        let arrays: Vec<&ArrayRef> = batches.iter().map(|b| b.column(idx)).collect();
        let mut cells = Vec::with_capacity(arrays.iter().map(|a| a.len()).sum());
        for arr in arrays {
            cells.extend(
                cells_from_array(arr.as_ref())
                    .with_context(|| format!("converting column `{}`", field.name()))?,
            );
        }
        columns.push(Column::with_kind(
            field.name().as_str(),
            native_kind_of(field.data_type()),
            cells,
        ));
    }
    Table::new(columns)
}
