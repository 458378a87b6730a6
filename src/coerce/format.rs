// src/coerce/format.rs

use chrono::NaiveDateTime;

use super::directive::{EpochUnit, OutputMode};
use crate::table::{Cell, Temporal};

const ISO_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

/// `YYYY-MM-DDTHH:MM:SS` of the UTC instant; sub-seconds are truncated.
pub fn iso_seconds(t: &Temporal) -> String {
    t.naive_utc().format(ISO_SECONDS).to_string()
}

/// Units since the Unix epoch, truncated toward zero.
pub fn epoch(t: &Temporal, unit: EpochUnit) -> i64 {
    let total = epoch_nanos(&t.naive_utc());
    (total / unit.nanos()) as i64
}

fn epoch_nanos(n: &NaiveDateTime) -> i128 {
    let utc = n.and_utc();
    i128::from(utc.timestamp()) * 1_000_000_000 + i128::from(utc.timestamp_subsec_nanos())
}

/// Render one value; `None` is always JSON `null`.
pub fn render(value: Option<&Temporal>, mode: OutputMode) -> Cell {
    match (value, mode) {
        (None, _) => Cell::Null,
        (Some(t), OutputMode::Iso) => Cell::Text(iso_seconds(t)),
        (Some(t), OutputMode::Epoch(unit)) => Cell::Int(epoch(t, unit)),
    }
}

/// Render a column of (possibly missing) temporal values.
pub fn format_column<'a, I>(values: I, mode: OutputMode) -> Vec<Cell>
where
    I: IntoIterator<Item = Option<&'a Temporal>>,
{
    values.into_iter().map(|v| render(v, mode)).collect()
}
