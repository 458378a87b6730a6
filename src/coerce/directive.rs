// src/coerce/directive.rs

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use thiserror::Error;

/// Fraction of non-null values that must parse before a text column is promoted.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Invalid coercion settings. Raised before any column is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported date output mode `{0}` (expected `iso` or `epoch`)")]
    UnsupportedOutputMode(String),

    #[error("unsupported epoch unit `{0}` (expected `s` or `ms`)")]
    UnsupportedEpochUnit(String),

    #[error("date detection threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("invalid date parse format `{0}`")]
    InvalidParseFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Millis,
}

impl EpochUnit {
    pub(crate) fn nanos(self) -> i128 {
        match self {
            EpochUnit::Seconds => 1_000_000_000,
            EpochUnit::Millis => 1_000_000,
        }
    }
}

impl FromStr for EpochUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "seconds" => Ok(EpochUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(EpochUnit::Millis),
            _ => Err(ConfigError::UnsupportedEpochUnit(s.to_string())),
        }
    }
}

/// How temporal columns are rendered into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// `YYYY-MM-DDTHH:MM:SS`
    #[default]
    Iso,
    /// Integer count of units since 1970-01-01T00:00:00 UTC.
    Epoch(EpochUnit),
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Iso => f.write_str("iso"),
            OutputMode::Epoch(EpochUnit::Seconds) => f.write_str("epoch-seconds"),
            OutputMode::Epoch(EpochUnit::Millis) => f.write_str("epoch-millis"),
        }
    }
}

impl OutputMode {
    /// Build from the caller-facing pair `date_format` + `epoch_unit`.
    pub fn parse(mode: &str, unit: Option<&str>) -> Result<Self, ConfigError> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "iso" => Ok(OutputMode::Iso),
            "epoch" => Ok(OutputMode::Epoch(unit.unwrap_or("ms").parse()?)),
            "epoch-seconds" | "epoch_s" => Ok(OutputMode::Epoch(EpochUnit::Seconds)),
            "epoch-millis" | "epoch_ms" => Ok(OutputMode::Epoch(EpochUnit::Millis)),
            _ => Err(ConfigError::UnsupportedOutputMode(mode.to_string())),
        }
    }
}

/// A chrono strftime pattern that has been checked for bad specifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFormat(String);

impl ParseFormat {
    pub fn new(fmt: impl Into<String>) -> Result<Self, ConfigError> {
        let fmt = fmt.into();
        let broken = fmt.trim().is_empty()
            || StrftimeItems::new(&fmt).any(|item| matches!(item, Item::Error));
        if broken {
            return Err(ConfigError::InvalidParseFormat(fmt));
        }
        Ok(Self(fmt))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Column names, given either as one comma-separated string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnList {
    Csv(String),
    List(Vec<String>),
}

impl ColumnList {
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ColumnList::Csv(s) => s.split(',').collect(),
            ColumnList::List(v) => v.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Raw caller input for a [`CoercionDirective`]; every field is optional so
/// a config file and command-line flags can be layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectiveOptions {
    pub date_format: Option<String>,
    pub epoch_unit: Option<String>,
    pub dayfirst: Option<bool>,
    pub date_columns: Option<ColumnList>,
    pub auto_dates: Option<bool>,
    pub date_threshold: Option<f64>,
    pub date_parse_format: Option<String>,
}

impl DirectiveOptions {
    /// Fields set in `over` win.
    pub fn overlay(self, over: DirectiveOptions) -> DirectiveOptions {
        DirectiveOptions {
            date_format: over.date_format.or(self.date_format),
            epoch_unit: over.epoch_unit.or(self.epoch_unit),
            dayfirst: over.dayfirst.or(self.dayfirst),
            date_columns: over.date_columns.or(self.date_columns),
            auto_dates: over.auto_dates.or(self.auto_dates),
            date_threshold: over.date_threshold.or(self.date_threshold),
            date_parse_format: over.date_parse_format.or(self.date_parse_format),
        }
    }

    /// Rewrite the forced column names, e.g. to match normalized headers.
    pub fn map_date_columns(mut self, f: impl Fn(&str) -> String) -> DirectiveOptions {
        if let Some(cols) = self.date_columns.take() {
            self.date_columns = Some(ColumnList::List(
                cols.names().iter().map(|n| f(n)).collect(),
            ));
        }
        self
    }
}

/// Immutable per-run settings for date/time coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionDirective {
    forced_columns: BTreeSet<String>,
    auto_dates: bool,
    dayfirst: bool,
    parse_format: Option<ParseFormat>,
    mode: OutputMode,
    threshold: f64,
}

impl Default for CoercionDirective {
    fn default() -> Self {
        Self {
            forced_columns: BTreeSet::new(),
            auto_dates: true,
            dayfirst: false,
            parse_format: None,
            mode: OutputMode::Iso,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl CoercionDirective {
    /// Validate caller input. Nothing here is deferred to processing time.
    pub fn from_options(opts: &DirectiveOptions) -> Result<Self, ConfigError> {
        let mode = OutputMode::parse(
            opts.date_format.as_deref().unwrap_or("iso"),
            opts.epoch_unit.as_deref(),
        )?;
        // a unit is validated even when the mode ignores it
        if let Some(unit) = opts.epoch_unit.as_deref() {
            unit.parse::<EpochUnit>()?;
        }
        let threshold = check_threshold(opts.date_threshold.unwrap_or(DEFAULT_THRESHOLD))?;
        let parse_format = opts
            .date_parse_format
            .as_deref()
            .map(ParseFormat::new)
            .transpose()?;

        Ok(Self {
            forced_columns: opts
                .date_columns
                .as_ref()
                .map(|c| c.names().into_iter().collect())
                .unwrap_or_default(),
            auto_dates: opts.auto_dates.unwrap_or(true),
            dayfirst: opts.dayfirst.unwrap_or(false),
            parse_format,
            mode,
            threshold,
        })
    }

    pub fn with_forced_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forced_columns = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auto_dates(mut self, enabled: bool) -> Self {
        self.auto_dates = enabled;
        self
    }

    pub fn with_dayfirst(mut self, dayfirst: bool) -> Self {
        self.dayfirst = dayfirst;
        self
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_parse_format(mut self, fmt: &str) -> Result<Self, ConfigError> {
        self.parse_format = Some(ParseFormat::new(fmt)?);
        Ok(self)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, ConfigError> {
        self.threshold = check_threshold(threshold)?;
        Ok(self)
    }

    pub fn forced_columns(&self) -> &BTreeSet<String> {
        &self.forced_columns
    }

    pub fn is_forced(&self, column: &str) -> bool {
        self.forced_columns.contains(column)
    }

    pub fn auto_dates(&self) -> bool {
        self.auto_dates
    }

    pub fn dayfirst(&self) -> bool {
        self.dayfirst
    }

    pub fn parse_format(&self) -> Option<&ParseFormat> {
        self.parse_format.as_ref()
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn check_threshold(t: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&t) {
        Ok(t)
    } else {
        Err(ConfigError::InvalidThreshold(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let d = CoercionDirective::from_options(&DirectiveOptions::default()).unwrap();
        assert_eq!(d, CoercionDirective::default());
        assert_eq!(d.mode(), OutputMode::Iso);
        assert_eq!(d.threshold(), 0.8);
        assert!(d.auto_dates());
        assert!(!d.dayfirst());
        assert!(d.parse_format().is_none());
    }

    #[test]
    fn epoch_mode_with_units() {
        assert_eq!(
            OutputMode::parse("epoch", Some("s")),
            Ok(OutputMode::Epoch(EpochUnit::Seconds))
        );
        assert_eq!(
            OutputMode::parse("epoch", None),
            Ok(OutputMode::Epoch(EpochUnit::Millis))
        );
        assert_eq!(
            OutputMode::parse("epoch", Some("ns")),
            Err(ConfigError::UnsupportedEpochUnit("ns".into()))
        );
        assert_eq!(
            OutputMode::parse("unix", None),
            Err(ConfigError::UnsupportedOutputMode("unix".into()))
        );
    }

    #[test]
    fn bad_settings_fail_fast() {
        let bad_format = DirectiveOptions {
            date_parse_format: Some("%Y-%Q".into()),
            ..Default::default()
        };
        assert!(matches!(
            CoercionDirective::from_options(&bad_format),
            Err(ConfigError::InvalidParseFormat(_))
        ));

        let bad_threshold = DirectiveOptions {
            date_threshold: Some(1.5),
            ..Default::default()
        };
        assert_eq!(
            CoercionDirective::from_options(&bad_threshold),
            Err(ConfigError::InvalidThreshold(1.5))
        );

        let bad_unit = DirectiveOptions {
            epoch_unit: Some("days".into()),
            ..Default::default()
        };
        assert!(CoercionDirective::from_options(&bad_unit).is_err());
    }

    #[test]
    fn forced_columns_from_comma_list() {
        let opts = DirectiveOptions {
            date_columns: Some(ColumnList::Csv(" created , ,updated".into())),
            ..Default::default()
        };
        let d = CoercionDirective::from_options(&opts).unwrap();
        assert!(d.is_forced("created"));
        assert!(d.is_forced("updated"));
        assert_eq!(d.forced_columns().len(), 2);
    }

    #[test]
    fn overlay_prefers_later_values() {
        let file = DirectiveOptions {
            date_format: Some("epoch".into()),
            dayfirst: Some(true),
            ..Default::default()
        };
        let cli = DirectiveOptions {
            date_format: Some("iso".into()),
            ..Default::default()
        };
        let merged = file.overlay(cli);
        assert_eq!(merged.date_format.as_deref(), Some("iso"));
        assert_eq!(merged.dayfirst, Some(true));
    }
}
