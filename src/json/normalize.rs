use serde_json::{Number, Value};

use crate::coerce::format::iso_seconds;
use crate::table::{Boxed, Scalar};

/// Last-resort encoding for values JSON has no native form for.
///
/// - zoned instants → UTC, offset dropped, `YYYY-MM-DDTHH:MM:SS`
/// - naive instants → `YYYY-MM-DDTHH:MM:SS`
/// - dates          → `YYYY-MM-DD`
/// - boxed numbers  → JSON number (non-finite floats become `null`)
/// - boxed booleans → JSON bool
/// - anything else  → its text
pub fn normalize_scalar(value: &Scalar) -> Value {
    match value {
        Scalar::Instant(t) => Value::String(iso_seconds(t)),
        Scalar::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        Scalar::Boxed(Boxed::Bool(b)) => Value::Bool(*b),
        Scalar::Boxed(Boxed::UInt(v)) => Value::from(*v),
        Scalar::Boxed(b) => b
            .as_f64()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        other => Value::String(other.to_string()),
    }
}
