//! Budget Planning Module
//!
//! Expands recurring budget rules into calendar periods and aggregates them
//! with period-specific overrides into planned values. All budget math runs
//! at month granularity.

pub mod planning;
pub mod scheduler;
pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One calendar month. No day component; ordering is chronological.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PeriodKey {
    pub year: i32,
    /// 1-based calendar month.
    pub month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Zero-based month count since year 0, for phase arithmetic.
    pub fn month_index(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    pub fn add_months(self, months: i64) -> Self {
        let index = self.month_index() + months;
        Self {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Closed month ranges.
pub struct PeriodRange;

impl PeriodRange {
    /// The ascending month sequence from `from` to `to` inclusive; empty
    /// when `from` lies after `to`.
    pub fn enumerate(from: PeriodKey, to: PeriodKey) -> Vec<PeriodKey> {
        let mut periods = Vec::new();
        let mut current = from;
        while current <= to {
            periods.push(current);
            current = current.add_months(1);
        }
        periods
    }
}

/// Recurrence interval of a budget rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleInterval {
    Monthly,
    Quarterly,
    Custom,
}

impl RuleInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::Custom => "CUSTOM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MONTHLY" => Some(Self::Monthly),
            "QUARTERLY" => Some(Self::Quarterly),
            "CUSTOM" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A recurring amount attached to a budget purpose. Immutable once
/// scheduled; editing creates a logically new schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRule {
    pub id: String,
    pub purpose_id: String,
    pub amount: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub interval: RuleInterval,
    /// Interval length in months when `interval` is `Custom`.
    pub custom_months: Option<u32>,
}

impl BudgetRule {
    /// Step width in months. A missing or zero custom length falls back to
    /// a step of one month.
    pub fn interval_months(&self) -> u32 {
        match self.interval {
            RuleInterval::Monthly => 1,
            RuleInterval::Quarterly => 3,
            RuleInterval::Custom => self.custom_months.filter(|m| *m > 0).unwrap_or(1),
        }
    }
}

/// An explicit amount for one purpose in one month; supersedes any
/// rule-derived amount for that period. Unique per (purpose, period).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetOverride {
    pub id: String,
    pub purpose_id: String,
    pub period: PeriodKey,
    pub amount: f64,
}

/// What a budget rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurposeKind {
    Category,
    Contact,
    SavingsPlan,
}

impl PurposeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "CATEGORY",
            Self::Contact => "CONTACT",
            Self::SavingsPlan => "SAVINGS_PLAN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CATEGORY" => Some(Self::Category),
            "CONTACT" => Some(Self::Contact),
            "SAVINGS_PLAN" => Some(Self::SavingsPlan),
            _ => None,
        }
    }
}

/// The object planned-vs-actual spending is tracked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPurpose {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub kind: PurposeKind,
}

/// Planned value of one purpose in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedValue {
    pub purpose_id: String,
    pub period: PeriodKey,
    pub amount: f64,
}

/// Immutable planned-value grid covering every (purpose, period) cell of a
/// queried range, zero-filled where neither a rule nor an override applies.
#[derive(Debug, Clone, Default)]
pub struct PlannedValues {
    values: BTreeMap<(String, PeriodKey), f64>,
}

impl PlannedValues {
    pub(crate) fn from_map(values: BTreeMap<(String, PeriodKey), f64>) -> Self {
        Self { values }
    }

    pub fn get(&self, purpose_id: &str, period: PeriodKey) -> Option<f64> {
        self.values.get(&(purpose_id.to_string(), period)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PlannedValue> + '_ {
        self.values.iter().map(|((purpose_id, period), amount)| PlannedValue {
            purpose_id: purpose_id.clone(),
            period: *period,
            amount: *amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_months_wraps_years() {
        let period = PeriodKey::new(2025, 11);
        assert_eq!(period.add_months(1), PeriodKey::new(2025, 12));
        assert_eq!(period.add_months(2), PeriodKey::new(2026, 1));
        assert_eq!(period.add_months(14), PeriodKey::new(2027, 1));
        assert_eq!(period.add_months(-11), PeriodKey::new(2024, 12));
    }

    #[test]
    fn test_period_ordering() {
        assert!(PeriodKey::new(2024, 12) < PeriodKey::new(2025, 1));
        assert!(PeriodKey::new(2025, 2) < PeriodKey::new(2025, 10));
    }

    #[test]
    fn test_enumerate_inclusive_no_gaps() {
        let periods = PeriodRange::enumerate(PeriodKey::new(2024, 11), PeriodKey::new(2025, 2));
        assert_eq!(
            periods,
            vec![
                PeriodKey::new(2024, 11),
                PeriodKey::new(2024, 12),
                PeriodKey::new(2025, 1),
                PeriodKey::new(2025, 2),
            ]
        );
    }

    #[test]
    fn test_enumerate_single_month() {
        let p = PeriodKey::new(2025, 6);
        assert_eq!(PeriodRange::enumerate(p, p), vec![p]);
    }

    #[test]
    fn test_enumerate_empty_when_inverted() {
        assert!(
            PeriodRange::enumerate(PeriodKey::new(2025, 3), PeriodKey::new(2025, 2)).is_empty()
        );
    }

    #[test]
    fn test_interval_months_fallback() {
        let mut rule = BudgetRule {
            id: "r1".to_string(),
            purpose_id: "p1".to_string(),
            amount: -5.0,
            start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            end_date: None,
            interval: RuleInterval::Custom,
            custom_months: None,
        };
        assert_eq!(rule.interval_months(), 1);
        rule.custom_months = Some(0);
        assert_eq!(rule.interval_months(), 1);
        rule.custom_months = Some(6);
        assert_eq!(rule.interval_months(), 6);
        rule.interval = RuleInterval::Quarterly;
        assert_eq!(rule.interval_months(), 3);
    }

    #[test]
    fn test_period_display() {
        assert_eq!(PeriodKey::new(2025, 3).to_string(), "2025-03");
    }
}
