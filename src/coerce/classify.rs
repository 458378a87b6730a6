use crate::table::{Column, NativeKind};

use super::directive::CoercionDirective;

/// What the pipeline should do with one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AlreadyTemporal,
    ForcedTemporal,
    AutoCandidate,
    Skip,
}

/// First matching rule wins. Numeric and boolean columns are never treated
/// as dates, even when listed in the directive's forced columns.
pub fn classify(column: &Column, directive: &CoercionDirective) -> Action {
    match column.kind() {
        NativeKind::Temporal => Action::AlreadyTemporal,
        NativeKind::Numeric | NativeKind::Boolean => Action::Skip,
        NativeKind::Textual if directive.is_forced(column.name()) => Action::ForcedTemporal,
        NativeKind::Textual if directive.auto_dates() => Action::AutoCandidate,
        NativeKind::Textual => Action::Skip,
    }
}
