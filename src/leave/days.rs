use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of calendar days covered, both ends included, at least 1.
    pub fn days(&self) -> f64 {
        ((self.end - self.start).num_days() + 1).max(1) as f64
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            from: Some(self.start),
            to: Some(self.end),
        }
    }
}

/// Listing/policy window. Either bound may be open.
///
/// A stored range covers the window when it shares at least one day with it:
/// `start_date <= to AND end_date >= from`. SQL rendering lives in
/// [`crate::utils::query_builder::WhereClause::push_window`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }

    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.to.is_none_or(|to| start <= to) && self.from.is_none_or(|from| end >= from)
    }
}
