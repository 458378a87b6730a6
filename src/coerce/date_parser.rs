// src/coerce/date_parser.rs

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::directive::ParseFormat;
use crate::table::{Cell, Temporal};

/// `[T ]HH:MM[:SS[.fff]]`, captures hour, minute, second, fraction.
const TIME_TAIL: &str = r"(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(?:[.,](\d+))?)?)?";

/// Year-first dates, optionally with a time and a UTC offset.
static YMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(\d{{4}})([-/.])(\d{{1,2}})([-/.])(\d{{1,2}}){TIME_TAIL}\s*(Z|z|[+-]\d{{2}}(?::?\d{{2}})?)?$"
    ))
    .unwrap()
});

/// `a/b/yyyy` style dates where `a`/`b` are day and month in either order.
static AMBIGUOUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(\d{{1,2}})([-/.])(\d{{1,2}})([-/.])(\d{{4}}|\d{{2}}){TIME_TAIL}$"
    ))
    .unwrap()
});

static DAY_MONTH_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[ -][A-Za-z]{3,9}\.?,?[ -]\d{4}$").unwrap());
static MONTH_NAME_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3,9}\.? \d{1,2},? \d{4}$").unwrap());

/// Result of trying to read a whole column as dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// Cells that were not null going in.
    pub non_null: usize,
    /// How many of those parsed.
    pub parsed: usize,
    /// One entry per input cell; nulls and failures are `None`.
    pub values: Vec<Option<Temporal>>,
}

impl ParseOutcome {
    pub fn ratio(&self) -> f64 {
        if self.non_null == 0 {
            0.0
        } else {
            self.parsed as f64 / self.non_null as f64
        }
    }
}

/// Parse every cell of a column. Never fails: values that do not parse come
/// back as `None` and lower the ratio. The input is left untouched.
pub fn parse_column(cells: &[Cell], dayfirst: bool, format: Option<&ParseFormat>) -> ParseOutcome {
    let mut non_null = 0;
    let mut parsed = 0;
    let values = cells
        .iter()
        .map(|cell| {
            if cell.is_null() {
                return None;
            }
            non_null += 1;
            let t = match cell {
                Cell::Text(s) => match format {
                    Some(f) => parse_with_format(s, f.as_str()),
                    None => parse_timestamp(s, dayfirst),
                },
                other => other.as_temporal(),
            };
            if t.is_some() {
                parsed += 1;
            }
            t
        })
        .collect();

    ParseOutcome {
        non_null,
        parsed,
        values,
    }
}

/// Parse `s` with an exact chrono pattern: zone-aware first, then a naive
/// date-time, then a bare date at midnight. The date-only reading is only
/// taken when the pattern captured no time of day, so a partial time such as
/// `10h` fails instead of collapsing to midnight.
pub fn parse_with_format(s: &str, fmt: &str) -> Option<Temporal> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, s.trim(), StrftimeItems::new(fmt)).ok()?;
    if let Ok(dt) = parsed.to_datetime() {
        return Some(Temporal::Zoned(dt));
    }
    if let Ok(n) = parsed.to_naive_datetime_with_offset(0) {
        return Some(Temporal::Naive(n));
    }
    if has_time_of_day(&parsed) {
        return None;
    }
    parsed.to_naive_date().ok().map(Temporal::from_date)
}

fn has_time_of_day(parsed: &Parsed) -> bool {
    parsed.hour_div_12().is_some()
        || parsed.hour_mod_12().is_some()
        || parsed.minute().is_some()
        || parsed.second().is_some()
        || parsed.nanosecond().is_some()
}

/// Best-effort parse of free-form date text.
///
/// Covers:
/// - `YYYY-MM-DD[ HH:MM[:SS[.f]]][offset]` with `-`, `/` or `.` separators
/// - `a/b/YYYY[ time]` with `dayfirst` choosing `d/m` vs `m/d`; if the
///   preferred reading is not a real date, the other order is tried
/// - `4 March 2024`, `04-Mar-2024`, `March 4, 2024`
pub fn parse_timestamp(s: &str, dayfirst: bool) -> Option<Temporal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Temporal::Zoned(dt));
    }
    if let Some(caps) = YMD.captures(s) {
        return parse_ymd(&caps);
    }
    if let Some(caps) = AMBIGUOUS.captures(s) {
        return parse_ambiguous(&caps, dayfirst);
    }
    parse_month_name(s)
}

fn num(caps: &Captures, idx: usize) -> Option<u32> {
    caps.get(idx).map_or(Some(0), |m| m.as_str().parse().ok())
}

fn same_separators(caps: &Captures) -> bool {
    caps.get(2).map(|m| m.as_str()) == caps.get(4).map(|m| m.as_str())
}

/// Time of day from the `TIME_TAIL` captures starting at `first`.
fn time_of_day(caps: &Captures, first: usize) -> Option<NaiveTime> {
    let hour = num(caps, first)?;
    let minute = num(caps, first + 1)?;
    let second = num(caps, first + 2)?;
    let nanos = match caps.get(first + 3) {
        Some(frac) => {
            let digits: String = frac.as_str().chars().take(9).collect();
            format!("{digits:0<9}").parse().ok()?
        }
        None => 0,
    };
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    if s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let sign = if s.starts_with('-') { -1 } else { 1 };
    let digits: String = s[1..].chars().filter(char::is_ascii_digit).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_ymd(caps: &Captures) -> Option<Temporal> {
    if !same_separators(caps) {
        return None;
    }
    let year: i32 = caps[1].parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, num(caps, 3)?, num(caps, 5)?)?
        .and_time(time_of_day(caps, 6)?);
    match caps.get(10) {
        // an offset without a time of day is not a timestamp we accept
        Some(_) if caps.get(6).is_none() => None,
        Some(off) => parse_offset(off.as_str())?
            .from_local_datetime(&naive)
            .single()
            .map(Temporal::Zoned),
        None => Some(Temporal::Naive(naive)),
    }
}

fn parse_ambiguous(caps: &Captures, dayfirst: bool) -> Option<Temporal> {
    if !same_separators(caps) {
        return None;
    }
    let a = num(caps, 1)?;
    let b = num(caps, 3)?;
    let year_str = &caps[5];
    let mut year: i32 = year_str.parse().ok()?;
    if year_str.len() == 2 {
        year += if year < 69 { 2000 } else { 1900 };
    }

    // (month, day) readings in preference order
    let readings = if dayfirst {
        [(b, a), (a, b)]
    } else {
        [(a, b), (b, a)]
    };
    let date = readings
        .iter()
        .find_map(|&(month, day)| NaiveDate::from_ymd_opt(year, month, day))?;
    Some(Temporal::Naive(date.and_time(time_of_day(caps, 6)?)))
}

fn parse_month_name(s: &str) -> Option<Temporal> {
    let fmt = if DAY_MONTH_NAME.is_match(s) {
        "%d %B %Y"
    } else if MONTH_NAME_DAY.is_match(s) {
        "%B %d %Y"
    } else {
        return None;
    };
    let cleaned: String = s
        .replace(['-', ','], " ")
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    NaiveDate::parse_from_str(&cleaned, fmt)
        .ok()
        .map(Temporal::from_date)
}
