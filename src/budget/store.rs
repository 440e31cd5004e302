//! SQLite-backed budget storage.

use rusqlite::{params, Connection};

use crate::budget::planning::PlanningRepository;
use crate::budget::{BudgetOverride, BudgetPurpose, BudgetRule, PeriodKey, PurposeKind, RuleInterval};
use crate::error::PlanningError;

pub struct SqlitePlanningRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePlanningRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create_purpose(&self, purpose: &BudgetPurpose) -> Result<(), PlanningError> {
        self.conn.execute(
            "INSERT INTO budget_purpose (id, owner_id, name, kind) VALUES (?, ?, ?, ?)",
            params![
                purpose.id,
                purpose.owner_id,
                purpose.name,
                purpose.kind.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn create_rule(&self, rule: &BudgetRule) -> Result<(), PlanningError> {
        self.conn.execute(
            "INSERT INTO budget_rule (id, purpose_id, amount, start_date, end_date, interval, custom_months)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                rule.id,
                rule.purpose_id,
                rule.amount,
                rule.start_date,
                rule.end_date,
                rule.interval.as_str(),
                rule.custom_months
            ],
        )?;
        Ok(())
    }

    /// Fails on a second override for the same (purpose, period); overrides
    /// are unique per cell.
    pub fn create_override(&self, value: &BudgetOverride) -> Result<(), PlanningError> {
        self.conn.execute(
            "INSERT INTO budget_override (id, purpose_id, year, month, amount)
             VALUES (?, ?, ?, ?, ?)",
            params![
                value.id,
                value.purpose_id,
                value.period.year,
                value.period.month,
                value.amount
            ],
        )?;
        Ok(())
    }

    pub fn delete_override(&self, id: &str) -> Result<bool, PlanningError> {
        let deleted = self
            .conn
            .execute("DELETE FROM budget_override WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    pub fn purposes(&self, owner_id: &str) -> Result<Vec<BudgetPurpose>, PlanningError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, name, kind FROM budget_purpose WHERE owner_id = ? ORDER BY name",
        )?;
        let rows = stmt.query_map(params![owner_id], |row| {
            let kind: String = row.get(3)?;
            Ok(BudgetPurpose {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                name: row.get(2)?,
                // unknown kinds degrade to plain categories
                kind: PurposeKind::from_str(&kind).unwrap_or(PurposeKind::Category),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn id_placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

impl PlanningRepository for SqlitePlanningRepository<'_> {
    fn purpose_ids(
        &self,
        owner_id: &str,
        filter: Option<&[String]>,
    ) -> Result<Vec<String>, PlanningError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM budget_purpose WHERE owner_id = ? ORDER BY id")?;
        let rows = stmt.query_map(params![owner_id], |row| row.get::<_, String>(0))?;
        let ids = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(match filter {
            Some(filter) => ids.into_iter().filter(|id| filter.contains(id)).collect(),
            None => ids,
        })
    }

    fn rules(
        &self,
        purpose_ids: &[String],
        from: PeriodKey,
        to: PeriodKey,
    ) -> Result<Vec<BudgetRule>, PlanningError> {
        if purpose_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, purpose_id, amount, start_date, end_date, interval, custom_months
             FROM budget_rule
             WHERE purpose_id IN ({})
               AND start_date < ?
               AND (end_date IS NULL OR end_date >= ?)",
            id_placeholders(purpose_ids.len())
        );
        let mut bindings: Vec<String> = purpose_ids.to_vec();
        bindings.push(to.add_months(1).first_day().to_string());
        bindings.push(from.first_day().to_string());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bindings.iter()), |row| {
            let interval: String = row.get(5)?;
            Ok(BudgetRule {
                id: row.get(0)?,
                purpose_id: row.get(1)?,
                amount: row.get(2)?,
                start_date: row.get(3)?,
                end_date: row.get(4)?,
                // unknown interval labels degrade to monthly
                interval: RuleInterval::from_str(&interval).unwrap_or(RuleInterval::Monthly),
                custom_months: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn overrides(
        &self,
        purpose_ids: &[String],
        from: PeriodKey,
        to: PeriodKey,
    ) -> Result<Vec<BudgetOverride>, PlanningError> {
        if purpose_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, purpose_id, year, month, amount
             FROM budget_override
             WHERE purpose_id IN ({})",
            id_placeholders(purpose_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(purpose_ids.iter()), |row| {
            Ok(BudgetOverride {
                id: row.get(0)?,
                purpose_id: row.get(1)?,
                period: PeriodKey::new(row.get(2)?, row.get(3)?),
                amount: row.get(4)?,
            })
        })?;
        let all = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(all
            .into_iter()
            .filter(|o| o.period >= from && o.period <= to)
            .collect())
    }
}
