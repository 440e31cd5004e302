//! Due-period expansion for budget rules.

use crate::budget::{BudgetRule, PeriodKey};

/// The periods a rule is due within `[from, to]`.
///
/// The rule's active window is intersected with the query window; the first
/// candidate is found by stepping forward from the rule's anchor month, so
/// phase alignment to the start month is preserved regardless of where the
/// query window begins.
pub fn due_periods(rule: &BudgetRule, from: PeriodKey, to: PeriodKey) -> Vec<PeriodKey> {
    let step = rule.interval_months() as i64;
    let anchor = PeriodKey::from_date(rule.start_date);

    let window_start = anchor.max(from);
    let window_end = match rule.end_date {
        Some(end) => PeriodKey::from_date(end).min(to),
        None => to,
    };
    if window_start > window_end {
        return Vec::new();
    }

    let mut current = anchor;
    while current < window_start {
        current = current.add_months(step);
    }

    let mut periods = Vec::new();
    while current <= window_end {
        periods.push(current);
        current = current.add_months(step);
    }
    periods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::RuleInterval;
    use chrono::NaiveDate;

    fn rule(
        start: (i32, u32, u32),
        end: Option<(i32, u32, u32)>,
        interval: RuleInterval,
        custom_months: Option<u32>,
    ) -> BudgetRule {
        BudgetRule {
            id: "r1".to_string(),
            purpose_id: "p1".to_string(),
            amount: -5.0,
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: end.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            interval,
            custom_months,
        }
    }

    fn p(year: i32, month: u32) -> PeriodKey {
        PeriodKey::new(year, month)
    }

    #[test]
    fn test_monthly_rule_covers_every_month() {
        let r = rule((2025, 2, 1), None, RuleInterval::Monthly, None);
        assert_eq!(
            due_periods(&r, p(2025, 2), p(2025, 4)),
            vec![p(2025, 2), p(2025, 3), p(2025, 4)]
        );
    }

    #[test]
    fn test_quarterly_phase_alignment() {
        // anchored in March: Mar/Jun/Sep/Dec, wherever the window starts
        let r = rule((2025, 3, 1), None, RuleInterval::Quarterly, None);
        assert_eq!(
            due_periods(&r, p(2025, 1), p(2025, 12)),
            vec![p(2025, 3), p(2025, 6), p(2025, 9), p(2025, 12)]
        );
        assert_eq!(
            due_periods(&r, p(2025, 4), p(2025, 10)),
            vec![p(2025, 6), p(2025, 9)]
        );
        for period in due_periods(&r, p(2025, 4), p(2026, 8)) {
            assert_eq!(
                period.month_index().rem_euclid(3),
                p(2025, 3).month_index().rem_euclid(3)
            );
        }
    }

    #[test]
    fn test_custom_interval_step() {
        let r = rule((2025, 1, 15), None, RuleInterval::Custom, Some(5));
        assert_eq!(
            due_periods(&r, p(2025, 1), p(2026, 1)),
            vec![p(2025, 1), p(2025, 6), p(2025, 11)]
        );
    }

    #[test]
    fn test_misconfigured_custom_steps_monthly() {
        let r = rule((2025, 1, 1), None, RuleInterval::Custom, Some(0));
        assert_eq!(
            due_periods(&r, p(2025, 1), p(2025, 3)),
            vec![p(2025, 1), p(2025, 2), p(2025, 3)]
        );
    }

    #[test]
    fn test_rule_end_date_caps_window() {
        let r = rule(
            (2025, 1, 1),
            Some((2025, 3, 31)),
            RuleInterval::Monthly,
            None,
        );
        assert_eq!(
            due_periods(&r, p(2025, 1), p(2025, 12)),
            vec![p(2025, 1), p(2025, 2), p(2025, 3)]
        );
    }

    #[test]
    fn test_disjoint_windows_yield_nothing() {
        let r = rule(
            (2025, 1, 1),
            Some((2025, 3, 31)),
            RuleInterval::Monthly,
            None,
        );
        assert!(due_periods(&r, p(2025, 4), p(2025, 12)).is_empty());
        assert!(due_periods(&r, p(2024, 1), p(2024, 12)).is_empty());
    }

    #[test]
    fn test_rule_starting_inside_window() {
        let r = rule((2025, 6, 10), None, RuleInterval::Monthly, None);
        assert_eq!(
            due_periods(&r, p(2025, 4), p(2025, 7)),
            vec![p(2025, 6), p(2025, 7)]
        );
    }
}
