// src/coerce/pipeline.rs

use rayon::prelude::*;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use super::{
    classify::{classify, Action},
    date_parser::{parse_column, ParseOutcome},
    directive::{CoercionDirective, OutputMode},
    format::format_column,
};
use crate::table::{Column, NativeKind, Table, Temporal};

/// What happened to one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOutcome {
    /// Already temporal; rendered into the output mode.
    Formatted,
    /// Text parsed as dates and replaced.
    Committed { parsed: usize, non_null: usize },
    /// Forced column in which nothing parsed; left as it was.
    NoParse { non_null: usize },
    /// Auto candidate whose success ratio missed the threshold; left as it was.
    BelowThreshold {
        parsed: usize,
        non_null: usize,
        ratio: f64,
    },
    /// Not a date candidate at all.
    Skipped(NativeKind),
}

impl ColumnOutcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, ColumnOutcome::Formatted | ColumnOutcome::Committed { .. })
    }
}

impl fmt::Display for ColumnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnOutcome::Formatted => f.write_str("formatted"),
            ColumnOutcome::Committed { parsed, non_null } => {
                write!(f, "committed ({parsed}/{non_null} parsed)")
            }
            ColumnOutcome::NoParse { non_null } => write!(f, "no dates in {non_null} values"),
            ColumnOutcome::BelowThreshold { ratio, .. } => {
                write!(f, "left as text (ratio {ratio:.2})")
            }
            ColumnOutcome::Skipped(kind) => write!(f, "skipped ({kind})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReport {
    pub name: String,
    pub outcome: ColumnOutcome,
}

/// Per-column results of one [`run`], in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoercionReport {
    pub columns: Vec<ColumnReport>,
}

impl CoercionReport {
    pub fn outcome(&self, column: &str) -> Option<&ColumnOutcome> {
        self.columns
            .iter()
            .find(|r| r.name == column)
            .map(|r| &r.outcome)
    }

    /// Names of the columns whose values were replaced.
    pub fn modified(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|r| r.outcome.is_modified())
            .map(|r| r.name.as_str())
    }
}

/// Coerce date-like columns of `table` in place.
///
/// Columns are independent, so they are processed in parallel; the outcome is
/// the same as a sequential pass. Row count and column order never change.
#[instrument(
    level = "info",
    skip_all,
    fields(rows = table.num_rows(), columns = table.num_columns(), mode = %directive.mode())
)]
pub fn run(table: &mut Table, directive: &CoercionDirective) -> CoercionReport {
    for name in directive.forced_columns() {
        if table.column(name).is_none() {
            warn!(column = %name, "forced date column not found in table");
        }
    }

    let columns: Vec<ColumnReport> = table
        .columns_mut()
        .par_iter_mut()
        .map(|column| ColumnReport {
            name: column.name().to_string(),
            outcome: coerce_column(column, directive),
        })
        .collect();

    let report = CoercionReport { columns };
    info!(
        modified = report.modified().count(),
        "date coercion finished"
    );
    report
}

/// Classify one column and commit the rendered values if the policy allows.
pub fn coerce_column(column: &mut Column, directive: &CoercionDirective) -> ColumnOutcome {
    let mode = directive.mode();
    match classify(column, directive) {
        Action::AlreadyTemporal => {
            let temporals: Vec<_> = column.values().iter().map(|c| c.as_temporal()).collect();
            commit(column, &temporals, mode);
            debug!(column = column.name(), "formatted temporal column");
            ColumnOutcome::Formatted
        }
        Action::ForcedTemporal => {
            let outcome = parse(column, directive);
            if outcome.parsed > 0 {
                commit(column, &outcome.values, mode);
                info!(
                    column = column.name(),
                    parsed = outcome.parsed,
                    non_null = outcome.non_null,
                    "forced date column converted"
                );
                ColumnOutcome::Committed {
                    parsed: outcome.parsed,
                    non_null: outcome.non_null,
                }
            } else {
                warn!(
                    column = column.name(),
                    non_null = outcome.non_null,
                    "forced date column has no parseable values, left unchanged"
                );
                ColumnOutcome::NoParse {
                    non_null: outcome.non_null,
                }
            }
        }
        Action::AutoCandidate => {
            let outcome = parse(column, directive);
            let ratio = outcome.ratio();
            if outcome.parsed > 0 && ratio >= directive.threshold() {
                commit(column, &outcome.values, mode);
                info!(column = column.name(), ratio, "detected date column");
                ColumnOutcome::Committed {
                    parsed: outcome.parsed,
                    non_null: outcome.non_null,
                }
            } else {
                debug!(
                    column = column.name(),
                    ratio,
                    threshold = directive.threshold(),
                    "date ratio below threshold, left unchanged"
                );
                ColumnOutcome::BelowThreshold {
                    parsed: outcome.parsed,
                    non_null: outcome.non_null,
                    ratio,
                }
            }
        }
        Action::Skip => {
            debug!(column = column.name(), kind = %column.kind(), "not a date candidate");
            ColumnOutcome::Skipped(column.kind())
        }
    }
}

fn parse(column: &Column, directive: &CoercionDirective) -> ParseOutcome {
    parse_column(column.values(), directive.dayfirst(), directive.parse_format())
}

fn commit(column: &mut Column, values: &[Option<Temporal>], mode: OutputMode) {
    let rendered = format_column(values.iter().map(Option::as_ref), mode);
    let kind = match mode {
        OutputMode::Iso => NativeKind::Textual,
        OutputMode::Epoch(_) => NativeKind::Numeric,
    };
    column.replace(rendered, kind);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::directive::EpochUnit;
    use crate::table::{Cell, Scalar};
    use chrono::NaiveDate;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,tab2json::coerce=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn texts(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|s| Cell::text(*s)).collect()
    }

    /// `good` parseable dates followed by `bad` junk strings.
    fn mixed(good: usize, bad: usize) -> Vec<Cell> {
        let mut cells: Vec<Cell> = (1..=good)
            .map(|d| Cell::text(format!("2024-01-{d:02}")))
            .collect();
        cells.extend((0..bad).map(|i| Cell::text(format!("n/a {i}"))));
        cells
    }

    #[test]
    fn ratio_at_threshold_commits() {
        init_test_logging();
        let mut col = Column::new("d", mixed(8, 2));
        let outcome = coerce_column(&mut col, &CoercionDirective::default());
        assert_eq!(outcome, ColumnOutcome::Committed { parsed: 8, non_null: 10 });
        assert_eq!(col.values()[0], Cell::text("2024-01-01T00:00:00"));
        assert_eq!(col.values()[9], Cell::Null);
    }

    #[test]
    fn ratio_below_threshold_leaves_column_alone() {
        let cells = mixed(7, 3);
        let mut col = Column::new("d", cells.clone());
        let outcome = coerce_column(&mut col, &CoercionDirective::default());
        assert!(matches!(
            outcome,
            ColumnOutcome::BelowThreshold { parsed: 7, non_null: 10, .. }
        ));
        assert_eq!(col.values(), cells.as_slice());
        assert_eq!(col.kind(), NativeKind::Textual);
    }

    #[test]
    fn configurable_threshold() {
        let directive = CoercionDirective::default().with_threshold(0.5).unwrap();
        let mut col = Column::new("d", mixed(5, 5));
        assert!(coerce_column(&mut col, &directive).is_modified());
    }

    #[test]
    fn forced_column_without_dates_is_untouched() {
        init_test_logging();
        let cells = texts(&["alpha", "beta", "gamma"]);
        let mut col = Column::new("notes", cells.clone());
        let directive = CoercionDirective::default().with_forced_columns(["notes"]);
        assert_eq!(
            coerce_column(&mut col, &directive),
            ColumnOutcome::NoParse { non_null: 3 }
        );
        assert_eq!(col.values(), cells.as_slice());
    }

    #[test]
    fn forced_column_ignores_ratio() {
        let mut col = Column::new("when", mixed(1, 9));
        let directive = CoercionDirective::default()
            .with_forced_columns(["when"])
            .with_auto_dates(false);
        assert_eq!(
            coerce_column(&mut col, &directive),
            ColumnOutcome::Committed { parsed: 1, non_null: 10 }
        );
    }

    #[test]
    fn forced_numeric_column_is_skipped() {
        let cells = vec![Cell::Int(1_700_000_000), Cell::Int(42)];
        let mut col = Column::new("count", cells.clone());
        let directive = CoercionDirective::default().with_forced_columns(["count"]);
        assert_eq!(
            coerce_column(&mut col, &directive),
            ColumnOutcome::Skipped(NativeKind::Numeric)
        );
        assert_eq!(col.values(), cells.as_slice());
    }

    #[test]
    fn temporal_columns_follow_output_mode() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        let cells = vec![Cell::Scalar(Scalar::Date(d)), Cell::Null];
        let mut col = Column::new("day", cells);
        let directive =
            CoercionDirective::default().with_mode(OutputMode::Epoch(EpochUnit::Seconds));
        assert_eq!(coerce_column(&mut col, &directive), ColumnOutcome::Formatted);
        assert_eq!(col.values(), &[Cell::Int(86_400), Cell::Null]);
        assert_eq!(col.kind(), NativeKind::Numeric);
    }

    #[test]
    fn run_touches_only_date_columns() {
        init_test_logging();
        let zoned = crate::coerce::date_parser::parse_timestamp("2024-03-01T10:00:00+03:00", false)
            .unwrap();
        let mut table = Table::new(vec![
            Column::new("id", vec![Cell::Int(1), Cell::Int(2)]),
            Column::new("when", texts(&["03/04/2024", "04/05/2024"])),
            Column::new("name", texts(&["Ana", "Bia"])),
            Column::new(
                "stamp",
                vec![Cell::Scalar(Scalar::Instant(zoned)), Cell::Null],
            ),
        ])
        .unwrap();
        let before = table.clone();

        let report = run(&mut table, &CoercionDirective::default().with_dayfirst(true));

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.columns()[0], before.columns()[0]);
        assert_eq!(table.columns()[2], before.columns()[2]);
        assert_eq!(
            table.columns()[1].values(),
            &texts(&["2024-04-03T00:00:00", "2024-05-04T00:00:00"])[..]
        );
        assert_eq!(
            table.columns()[3].values(),
            &[Cell::text("2024-03-01T07:00:00"), Cell::Null]
        );
        assert_eq!(report.modified().collect::<Vec<_>>(), vec!["when", "stamp"]);
        assert_eq!(
            report.outcome("id"),
            Some(&ColumnOutcome::Skipped(NativeKind::Numeric))
        );
        assert!(matches!(
            report.outcome("name"),
            Some(ColumnOutcome::BelowThreshold { parsed: 0, .. })
        ));
    }

    #[test]
    fn running_twice_is_stable() {
        init_test_logging();
        let mut table = Table::new(vec![Column::new(
            "when",
            texts(&["2024-03-01 10:00:00.9", "2024-03-02"]),
        )])
        .unwrap();
        let directive = CoercionDirective::default();
        run(&mut table, &directive);
        let once = table.clone();
        run(&mut table, &directive);
        assert_eq!(table, once);
        assert!(matches!(
            once.columns()[0].values()[0],
            Cell::Text(ref s) if s == "2024-03-01T10:00:00"
        ));
    }
}
