//! Date/time coercion: decide per column whether values are dates, parse
//! them under the requested day/month convention and render them as ISO
//! text or Unix epoch integers.

pub mod classify;
pub mod date_parser;
pub mod directive;
pub mod format;
pub mod pipeline;

pub use classify::{classify, Action};
pub use date_parser::{parse_column, parse_timestamp, ParseOutcome};
pub use directive::{
    CoercionDirective, ColumnList, ConfigError, DirectiveOptions, EpochUnit, OutputMode,
    ParseFormat, DEFAULT_THRESHOLD,
};
pub use format::format_column;
pub use pipeline::{run, CoercionReport, ColumnOutcome, ColumnReport};
