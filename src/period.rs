//! Statement period checks for transaction dates.

use crate::error::{ConvertError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` date interval a statement covers.
///
/// # Invariants
///
/// - `start <= end`, enforced by [`StatementPeriod::new`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatementPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl StatementPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ConvertError::InvalidPeriod { start, end });
        }
        Ok(StatementPeriod { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl<'de> Deserialize<'de> for StatementPeriod {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Bounds {
            start: NaiveDate,
            end: NaiveDate,
        }

        let bounds = Bounds::deserialize(deserializer)?;
        StatementPeriod::new(bounds.start, bounds.end).map_err(serde::de::Error::custom)
    }
}

/// Where a date falls relative to a [`StatementPeriod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateClassification {
    Valid,
    BeforeStart,
    AfterEnd,
}

impl DateClassification {
    pub fn is_out_of_range(&self) -> bool {
        *self != DateClassification::Valid
    }
}

/// What to do with a transaction dated outside the statement period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateDecision {
    /// Keep the transaction with its source date.
    #[default]
    #[serde(alias = "keep")]
    KeepOriginal,
    /// Move the date to the nearest period boundary.
    #[serde(alias = "adjust")]
    AdjustToBoundary,
    /// Drop the transaction from the document and the balance.
    Exclude,
}

impl DateDecision {
    /// Effective date after applying this decision, or `None` when excluded.
    pub fn apply(self, date: NaiveDate, period: &StatementPeriod) -> Option<NaiveDate> {
        match self {
            DateDecision::KeepOriginal => Some(date),
            DateDecision::AdjustToBoundary => Some(adjust_to_boundary(date, period)),
            DateDecision::Exclude => None,
        }
    }
}

/// Classifies `date` against `period`.
pub fn classify(date: NaiveDate, period: &StatementPeriod) -> DateClassification {
    if date < period.start {
        DateClassification::BeforeStart
    } else if date > period.end {
        DateClassification::AfterEnd
    } else {
        DateClassification::Valid
    }
}

/// Clamps `date` into `period`. Dates already inside are returned unchanged.
pub fn adjust_to_boundary(date: NaiveDate, period: &StatementPeriod) -> NaiveDate {
    date.clamp(period.start, period.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january() -> StatementPeriod {
        StatementPeriod::new(ymd(2026, 1, 1), ymd(2026, 1, 31)).unwrap()
    }

    #[test]
    fn test_rejects_inverted_period() {
        let result = StatementPeriod::new(ymd(2026, 2, 1), ymd(2026, 1, 1));
        assert!(matches!(result, Err(ConvertError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_single_day_period() {
        let day = ymd(2026, 3, 3);
        let period = StatementPeriod::new(day, day).unwrap();
        assert_eq!(classify(day, &period), DateClassification::Valid);
    }

    #[test]
    fn test_classify_boundaries_are_valid() {
        let period = january();
        assert_eq!(classify(ymd(2026, 1, 1), &period), DateClassification::Valid);
        assert_eq!(classify(ymd(2026, 1, 31), &period), DateClassification::Valid);
        assert_eq!(classify(ymd(2025, 12, 31), &period), DateClassification::BeforeStart);
        assert_eq!(classify(ymd(2026, 2, 1), &period), DateClassification::AfterEnd);
    }

    #[test]
    fn test_adjust_clamps_to_nearest_boundary() {
        let period = january();
        assert_eq!(adjust_to_boundary(ymd(2026, 2, 5), &period), ymd(2026, 1, 31));
        assert_eq!(adjust_to_boundary(ymd(2025, 6, 1), &period), ymd(2026, 1, 1));
        assert_eq!(adjust_to_boundary(ymd(2026, 1, 15), &period), ymd(2026, 1, 15));
    }

    #[test]
    fn test_adjusted_dates_always_classify_valid() {
        let period = january();
        let mut date = ymd(2025, 11, 1);
        while date < ymd(2026, 4, 1) {
            let adjusted = adjust_to_boundary(date, &period);
            assert_eq!(classify(adjusted, &period), DateClassification::Valid);
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_decision_apply() {
        let period = january();
        let late = ymd(2026, 2, 5);
        assert_eq!(DateDecision::KeepOriginal.apply(late, &period), Some(late));
        assert_eq!(
            DateDecision::AdjustToBoundary.apply(late, &period),
            Some(ymd(2026, 1, 31))
        );
        assert_eq!(DateDecision::Exclude.apply(late, &period), None);
    }
}
