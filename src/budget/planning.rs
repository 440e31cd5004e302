//! Planned-value aggregation.
//!
//! Rule amounts accumulate additively per (purpose, period); overrides then
//! overwrite their cell with an absolute value. The result covers the full
//! requested grid, zero-filled.

use std::collections::BTreeMap;

use crate::budget::{
    scheduler, BudgetOverride, BudgetRule, PeriodKey, PeriodRange, PlannedValues,
};
use crate::error::PlanningError;

/// Storage collaborator supplying purposes, rules and overrides for an
/// owner and period range.
pub trait PlanningRepository {
    /// The owner's purpose ids, optionally narrowed to a filter set.
    fn purpose_ids(
        &self,
        owner_id: &str,
        filter: Option<&[String]>,
    ) -> Result<Vec<String>, PlanningError>;

    /// All rules of the given purposes whose active window touches the range.
    fn rules(
        &self,
        purpose_ids: &[String],
        from: PeriodKey,
        to: PeriodKey,
    ) -> Result<Vec<BudgetRule>, PlanningError>;

    /// All overrides of the given purposes within the range.
    fn overrides(
        &self,
        purpose_ids: &[String],
        from: PeriodKey,
        to: PeriodKey,
    ) -> Result<Vec<BudgetOverride>, PlanningError>;
}

pub struct PlanningService<'a, R: PlanningRepository> {
    repository: &'a R,
}

impl<'a, R: PlanningRepository> PlanningService<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Planned values for every (purpose, period) cell in `[from, to]`.
    pub fn calculate_planned_values(
        &self,
        owner_id: &str,
        purpose_filter: Option<&[String]>,
        from: PeriodKey,
        to: PeriodKey,
    ) -> Result<PlannedValues, PlanningError> {
        if owner_id.trim().is_empty() {
            return Err(PlanningError::InvalidArgument(
                "owner id must not be empty".to_string(),
            ));
        }

        let purposes = self.repository.purpose_ids(owner_id, purpose_filter)?;
        if purposes.is_empty() {
            // nothing to plan; skip the rule/override loads entirely
            return Ok(PlannedValues::default());
        }

        let rules = self.repository.rules(&purposes, from, to)?;
        let overrides = self.repository.overrides(&purposes, from, to)?;

        let mut cells: BTreeMap<(String, PeriodKey), f64> = BTreeMap::new();
        for rule in &rules {
            for period in scheduler::due_periods(rule, from, to) {
                *cells
                    .entry((rule.purpose_id.clone(), period))
                    .or_insert(0.0) += rule.amount;
            }
        }
        for override_value in &overrides {
            // overrides are absolute values, not deltas
            cells.insert(
                (override_value.purpose_id.clone(), override_value.period),
                override_value.amount,
            );
        }

        let mut grid = BTreeMap::new();
        for purpose_id in &purposes {
            for period in PeriodRange::enumerate(from, to) {
                let amount = cells
                    .get(&(purpose_id.clone(), period))
                    .copied()
                    .unwrap_or(0.0);
                grid.insert((purpose_id.clone(), period), amount);
            }
        }
        Ok(PlannedValues::from_map(grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::RuleInterval;
    use chrono::NaiveDate;
    use std::cell::Cell;

    struct FakeRepository {
        purposes: Vec<String>,
        rules: Vec<BudgetRule>,
        overrides: Vec<BudgetOverride>,
        rule_loads: Cell<usize>,
    }

    impl FakeRepository {
        fn new(
            purposes: &[&str],
            rules: Vec<BudgetRule>,
            overrides: Vec<BudgetOverride>,
        ) -> Self {
            Self {
                purposes: purposes.iter().map(|p| p.to_string()).collect(),
                rules,
                overrides,
                rule_loads: Cell::new(0),
            }
        }
    }

    impl PlanningRepository for FakeRepository {
        fn purpose_ids(
            &self,
            _owner_id: &str,
            filter: Option<&[String]>,
        ) -> Result<Vec<String>, PlanningError> {
            Ok(match filter {
                Some(filter) => self
                    .purposes
                    .iter()
                    .filter(|p| filter.contains(*p))
                    .cloned()
                    .collect(),
                None => self.purposes.clone(),
            })
        }

        fn rules(
            &self,
            _purpose_ids: &[String],
            _from: PeriodKey,
            _to: PeriodKey,
        ) -> Result<Vec<BudgetRule>, PlanningError> {
            self.rule_loads.set(self.rule_loads.get() + 1);
            Ok(self.rules.clone())
        }

        fn overrides(
            &self,
            _purpose_ids: &[String],
            _from: PeriodKey,
            _to: PeriodKey,
        ) -> Result<Vec<BudgetOverride>, PlanningError> {
            Ok(self.overrides.clone())
        }
    }

    fn monthly_rule(purpose: &str, amount: f64, start: (i32, u32)) -> BudgetRule {
        BudgetRule {
            id: format!("rule-{purpose}-{amount}"),
            purpose_id: purpose.to_string(),
            amount,
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, 1).unwrap(),
            end_date: None,
            interval: RuleInterval::Monthly,
            custom_months: None,
        }
    }

    fn p(year: i32, month: u32) -> PeriodKey {
        PeriodKey::new(year, month)
    }

    #[test]
    fn test_monthly_rule_fills_queried_months() {
        let repo = FakeRepository::new(
            &["p1"],
            vec![monthly_rule("p1", -5.0, (2025, 2))],
            vec![],
        );
        let service = PlanningService::new(&repo);
        let values = service
            .calculate_planned_values("owner", None, p(2025, 2), p(2025, 4))
            .unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values.get("p1", p(2025, 2)), Some(-5.0));
        assert_eq!(values.get("p1", p(2025, 3)), Some(-5.0));
        assert_eq!(values.get("p1", p(2025, 4)), Some(-5.0));
    }

    #[test]
    fn test_override_supersedes_rule_amount() {
        let repo = FakeRepository::new(
            &["p1"],
            vec![monthly_rule("p1", -5.0, (2025, 2))],
            vec![BudgetOverride {
                id: "o1".to_string(),
                purpose_id: "p1".to_string(),
                period: p(2025, 3),
                amount: 60.0,
            }],
        );
        let service = PlanningService::new(&repo);
        let values = service
            .calculate_planned_values("owner", None, p(2025, 2), p(2025, 4))
            .unwrap();
        assert_eq!(values.get("p1", p(2025, 2)), Some(-5.0));
        assert_eq!(values.get("p1", p(2025, 3)), Some(60.0));
        assert_eq!(values.get("p1", p(2025, 4)), Some(-5.0));
    }

    #[test]
    fn test_rule_amounts_accumulate_additively() {
        let repo = FakeRepository::new(
            &["p1"],
            vec![
                monthly_rule("p1", -5.0, (2025, 1)),
                BudgetRule {
                    id: "r2".to_string(),
                    purpose_id: "p1".to_string(),
                    amount: -10.0,
                    start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    end_date: None,
                    interval: RuleInterval::Quarterly,
                    custom_months: None,
                },
            ],
            vec![],
        );
        let service = PlanningService::new(&repo);
        let values = service
            .calculate_planned_values("owner", None, p(2025, 1), p(2025, 6))
            .unwrap();
        assert_eq!(values.get("p1", p(2025, 2)), Some(-5.0));
        assert_eq!(values.get("p1", p(2025, 3)), Some(-15.0));
        assert_eq!(values.get("p1", p(2025, 6)), Some(-15.0));
    }

    #[test]
    fn test_grid_zero_fills_unplanned_cells() {
        let repo = FakeRepository::new(
            &["p1", "p2"],
            vec![monthly_rule("p1", -5.0, (2025, 1))],
            vec![],
        );
        let service = PlanningService::new(&repo);
        let values = service
            .calculate_planned_values("owner", None, p(2025, 1), p(2025, 2))
            .unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values.get("p2", p(2025, 1)), Some(0.0));
        assert_eq!(values.get("p2", p(2025, 2)), Some(0.0));
    }

    #[test]
    fn test_empty_owner_id_is_an_argument_error() {
        let repo = FakeRepository::new(&["p1"], vec![], vec![]);
        let service = PlanningService::new(&repo);
        let result = service.calculate_planned_values("  ", None, p(2025, 1), p(2025, 2));
        assert!(matches!(result, Err(PlanningError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_purpose_set_short_circuits() {
        let repo = FakeRepository::new(
            &["p1"],
            vec![monthly_rule("p1", -5.0, (2025, 1))],
            vec![],
        );
        let service = PlanningService::new(&repo);
        let filter = vec!["does-not-exist".to_string()];
        let values = service
            .calculate_planned_values("owner", Some(&filter), p(2025, 1), p(2025, 2))
            .unwrap();
        assert!(values.is_empty());
        assert_eq!(repo.rule_loads.get(), 0, "rule load must be skipped");
    }

    #[test]
    fn test_purpose_filter_narrows_grid() {
        let repo = FakeRepository::new(
            &["p1", "p2"],
            vec![monthly_rule("p2", 7.5, (2025, 1))],
            vec![],
        );
        let service = PlanningService::new(&repo);
        let filter = vec!["p2".to_string()];
        let values = service
            .calculate_planned_values("owner", Some(&filter), p(2025, 1), p(2025, 1))
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("p2", p(2025, 1)), Some(7.5));
        assert_eq!(values.get("p1", p(2025, 1)), None);
    }
}
