use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Position;
use crate::org::{OrgDirectory, UnitScope};

/// Number of directorates listed in the budget ranking.
pub const TOP_DIRECTORATES: usize = 10;

/// Fund-centre budgets within this share of the HR salary cost count as aligned.
pub const ALIGNMENT_TOLERANCE_PCT: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum VoteType {
    Salary,
    #[serde(rename = "O&M")]
    OperatingAndMaintenance,
    Capital,
}

impl VoteType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Salary => "Salary",
            Self::OperatingAndMaintenance => "O&M",
            Self::Capital => "Capital",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Salary" => Some(Self::Salary),
            "O&M" => Some(Self::OperatingAndMaintenance),
            "Capital" => Some(Self::Capital),
            _ => None,
        }
    }
}

/// One fund-centre line of the fiscal-year finance extract, in whole dollars.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinanceRecord {
    pub directorate_code: String,
    #[serde(default)]
    pub directorate_name: String,
    pub fund_centre_code: String,
    pub vote_type: VoteType,
    pub budget: i64,
    pub forecast: i64,
    pub actuals: i64,
    #[serde(default)]
    pub commitments: i64,
    #[serde(default)]
    pub fiscal_year: Option<String>,
}

impl FinanceRecord {
    /// Forecast not yet spent or committed.
    #[must_use]
    pub fn free_balance(&self) -> i64 {
        self.forecast.saturating_sub(self.actuals).saturating_sub(self.commitments)
    }
}

/// Finance lines visible under `scope`.
///
/// Finance is held per directorate: a directorate restriction matches its code,
/// a branch restriction matches every directorate the org directory lists under
/// that branch. Division restrictions do not narrow finance lines.
#[must_use]
pub fn scope_finance<'a>(
    records: &'a [FinanceRecord],
    scope: &UnitScope,
    directory: &OrgDirectory,
) -> Vec<&'a FinanceRecord> {
    if let Some(directorate) = scope.directorate.as_deref().filter(|code| !code.is_empty()) {
        return records.iter().filter(|record| record.directorate_code == directorate).collect();
    }
    if let Some(branch) = scope.branch.as_deref().filter(|code| !code.is_empty()) {
        let directorates = directory.directorates_for_branch(Some(branch));
        return records
            .iter()
            .filter(|record| directorates.iter().any(|unit| unit.code == record.directorate_code))
            .collect();
    }
    records.iter().collect()
}

/// Spending pace of actuals against forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BurnStatus {
    OnTrack,
    Watch,
    AtRisk,
}

impl BurnStatus {
    /// Above 85% is at risk, 70% to 85% is watched.
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        if rate > 85.0 {
            Self::AtRisk
        } else if rate >= 70.0 {
            Self::Watch
        } else {
            Self::OnTrack
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FinanceTotals {
    pub budget: i64,
    pub forecast: i64,
    pub actuals: i64,
    pub commitments: i64,
    /// Budget minus forecast; negative is a projected deficit.
    pub surplus_deficit: i64,
    /// Actuals as a percentage of forecast; 0 when nothing is forecast.
    pub burn_rate: f64,
}

impl FinanceTotals {
    #[must_use]
    pub fn compute<'a>(records: impl IntoIterator<Item = &'a FinanceRecord>) -> Self {
        let mut totals = Self::default();
        for record in records {
            totals.budget = totals.budget.saturating_add(record.budget);
            totals.forecast = totals.forecast.saturating_add(record.forecast);
            totals.actuals = totals.actuals.saturating_add(record.actuals);
            totals.commitments = totals.commitments.saturating_add(record.commitments);
        }
        totals.surplus_deficit = totals.budget.saturating_sub(totals.forecast);
        if totals.forecast > 0 {
            #[allow(clippy::cast_precision_loss)]
            let rate = totals.actuals as f64 / totals.forecast as f64 * 100.0;
            totals.burn_rate = rate;
        }
        totals
    }

    #[must_use]
    pub fn burn_status(&self) -> BurnStatus {
        BurnStatus::from_rate(self.burn_rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct VoteBreakdown {
    pub vote_type: VoteType,
    pub budget: i64,
    pub forecast: i64,
    pub actuals: i64,
}

/// Budget, forecast and actuals per vote type, in vote order.
#[must_use]
pub fn by_vote_type<'a>(
    records: impl IntoIterator<Item = &'a FinanceRecord>,
) -> Vec<VoteBreakdown> {
    let mut out: Vec<VoteBreakdown> = Vec::new();
    for record in records {
        let index = match out.iter().position(|row| row.vote_type == record.vote_type) {
            Some(index) => index,
            None => {
                out.push(VoteBreakdown {
                    vote_type: record.vote_type,
                    budget: 0,
                    forecast: 0,
                    actuals: 0,
                });
                out.len() - 1
            }
        };
        let row = &mut out[index];
        row.budget = row.budget.saturating_add(record.budget);
        row.forecast = row.forecast.saturating_add(record.forecast);
        row.actuals = row.actuals.saturating_add(record.actuals);
    }
    out.sort_by_key(|row| row.vote_type);
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct DirectorateBudget {
    pub code: String,
    pub name: String,
    pub budget: i64,
}

/// Largest directorate budgets first, capped at `limit`.
#[must_use]
pub fn top_directorates<'a>(
    records: impl IntoIterator<Item = &'a FinanceRecord>,
    limit: usize,
) -> Vec<DirectorateBudget> {
    let mut by_code: HashMap<&str, DirectorateBudget> = HashMap::new();
    for record in records {
        let entry = by_code.entry(record.directorate_code.as_str()).or_insert_with(|| {
            DirectorateBudget {
                code: record.directorate_code.clone(),
                name: record.directorate_name.clone(),
                budget: 0,
            }
        });
        entry.budget = entry.budget.saturating_add(record.budget);
    }

    let mut out = by_code.into_values().collect::<Vec<_>>();
    out.sort_by(|left, right| {
        right.budget.cmp(&left.budget).then_with(|| left.code.cmp(&right.code))
    });
    out.truncate(limit);
    out
}

/// Salary budget of one fund centre set against the HR cost of its positions.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct FundCentreReconciliation {
    pub fund_centre_code: String,
    pub directorate_name: String,
    pub positions: usize,
    pub occupied: usize,
    pub vacant: usize,
    /// Salaries of occupied positions; a missing salary counts as 0.
    pub hr_salary_cost: u64,
    pub finance_budget: i64,
    /// Finance budget minus HR salary cost.
    pub variance: i64,
    /// `|variance|` is under [`ALIGNMENT_TOLERANCE_PCT`] percent of the budget.
    pub aligned: bool,
}

/// Join Salary vote lines to positions by fund centre.
///
/// One row per fund centre carrying a Salary line, in first-seen order; the
/// first Salary line of a fund centre supplies its budget.
#[must_use]
pub fn reconcile_fund_centres<'a>(
    records: impl IntoIterator<Item = &'a FinanceRecord>,
    positions: &[Position],
) -> Vec<FundCentreReconciliation> {
    let mut salary_lines: Vec<&FinanceRecord> = Vec::new();
    for record in records {
        if record.vote_type == VoteType::Salary
            && !salary_lines.iter().any(|seen| seen.fund_centre_code == record.fund_centre_code)
        {
            salary_lines.push(record);
        }
    }

    salary_lines
        .into_iter()
        .map(|line| {
            let mut row = FundCentreReconciliation {
                fund_centre_code: line.fund_centre_code.clone(),
                directorate_name: line.directorate_name.clone(),
                positions: 0,
                occupied: 0,
                vacant: 0,
                hr_salary_cost: 0,
                finance_budget: line.budget,
                variance: 0,
                aligned: false,
            };
            let in_centre = positions
                .iter()
                .filter(|position| position.fund_centre_code == line.fund_centre_code);
            for position in in_centre {
                row.positions += 1;
                if position.is_vacant() {
                    row.vacant += 1;
                } else {
                    row.occupied += 1;
                    row.hr_salary_cost =
                        row.hr_salary_cost.saturating_add(position.salary_or_zero());
                }
            }
            let cost = i64::try_from(row.hr_salary_cost).unwrap_or(i64::MAX);
            row.variance = line.budget.saturating_sub(cost);
            row.aligned = i128::from(row.variance).abs() * 100
                < i128::from(line.budget) * i128::from(ALIGNMENT_TOLERANCE_PCT);
            row
        })
        .collect()
}

/// Everything the finance report shows for one slice of finance lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FinanceOverview {
    pub totals: FinanceTotals,
    pub by_vote_type: Vec<VoteBreakdown>,
    pub top_directorates: Vec<DirectorateBudget>,
    pub reconciliation: Vec<FundCentreReconciliation>,
}

impl FinanceOverview {
    #[must_use]
    pub fn compute(records: &[&FinanceRecord], positions: &[Position]) -> Self {
        let lines = records.iter().copied();
        let overview = Self {
            totals: FinanceTotals::compute(lines.clone()),
            by_vote_type: by_vote_type(lines.clone()),
            top_directorates: top_directorates(lines.clone(), TOP_DIRECTORATES),
            reconciliation: reconcile_fund_centres(lines, positions),
        };
        tracing::debug!(
            lines = records.len(),
            fund_centres = overview.reconciliation.len(),
            "computed finance overview"
        );
        overview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{occupied, vacant};
    use crate::org::OrgUnit;

    fn line(
        directorate: &str,
        vote_type: VoteType,
        budget: i64,
        forecast: i64,
        actuals: i64,
    ) -> FinanceRecord {
        FinanceRecord {
            directorate_code: directorate.to_string(),
            directorate_name: format!("Directorate {directorate}"),
            fund_centre_code: format!("FC-{directorate}"),
            vote_type,
            budget,
            forecast,
            actuals,
            commitments: 0,
            fiscal_year: Some("2025-26".to_string()),
        }
    }

    fn in_fund_centre(mut position: Position, fund_centre: &str) -> Position {
        position.fund_centre_code = fund_centre.to_string();
        position
    }

    #[test]
    fn totals_compute_surplus_and_burn_rate() {
        let records = vec![
            line("102001", VoteType::Salary, 1_000, 800, 600),
            line("102001", VoteType::OperatingAndMaintenance, 500, 700, 100),
        ];
        let totals = FinanceTotals::compute(&records);
        assert_eq!(totals.budget, 1_500);
        assert_eq!(totals.forecast, 1_500);
        assert_eq!(totals.actuals, 700);
        assert_eq!(totals.surplus_deficit, 0);
        assert!((totals.burn_rate - 700.0 / 15.0).abs() < 1e-9);
        assert_eq!(totals.burn_status(), BurnStatus::OnTrack);
    }

    #[test]
    fn burn_rate_is_zero_without_forecast() {
        let totals = FinanceTotals::compute(&[line("102001", VoteType::Capital, 10, 0, 5)]);
        assert!(totals.burn_rate.abs() < f64::EPSILON);
        assert!(FinanceTotals::compute(std::iter::empty()).burn_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn burn_status_bands() {
        assert_eq!(BurnStatus::from_rate(69.9), BurnStatus::OnTrack);
        assert_eq!(BurnStatus::from_rate(70.0), BurnStatus::Watch);
        assert_eq!(BurnStatus::from_rate(85.0), BurnStatus::Watch);
        assert_eq!(BurnStatus::from_rate(85.1), BurnStatus::AtRisk);
    }

    #[test]
    fn vote_breakdown_follows_vote_order() {
        let records = vec![
            line("A", VoteType::Capital, 5, 5, 1),
            line("A", VoteType::Salary, 10, 9, 4),
            line("B", VoteType::Salary, 20, 18, 6),
        ];
        let rows = by_vote_type(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vote_type, VoteType::Salary);
        assert_eq!((rows[0].budget, rows[0].forecast, rows[0].actuals), (30, 27, 10));
        assert_eq!(rows[1].vote_type, VoteType::Capital);
    }

    #[test]
    fn directorates_ranked_by_budget_and_capped() {
        let records = vec![
            line("A", VoteType::Salary, 10, 0, 0),
            line("B", VoteType::Salary, 30, 0, 0),
            line("A", VoteType::OperatingAndMaintenance, 25, 0, 0),
            line("C", VoteType::Salary, 5, 0, 0),
        ];
        let ranked = top_directorates(&records, 2);
        let codes = ranked.iter().map(|row| row.code.as_str()).collect::<Vec<_>>();
        assert_eq!(codes, vec!["A", "B"]);
        assert_eq!(ranked[0].budget, 35);
    }

    #[test]
    fn reconciliation_joins_salary_lines_to_positions() {
        let records = vec![
            line("102001", VoteType::Salary, 200_000, 190_000, 90_000),
            line("102001", VoteType::OperatingAndMaintenance, 50_000, 50_000, 10_000),
            line("103001", VoteType::Salary, 100_000, 100_000, 40_000),
        ];
        let positions = vec![
            in_fund_centre(occupied("A", None, 3, 95_000), "FC-102001"),
            in_fund_centre(occupied("B", None, 3, 90_000), "FC-102001"),
            in_fund_centre(vacant("C", None, 2, 70_000), "FC-102001"),
            in_fund_centre(occupied("D", None, 3, 60_000), "FC-103001"),
        ];

        let rows = reconcile_fund_centres(&records, &positions);
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.fund_centre_code, "FC-102001");
        assert_eq!((first.positions, first.occupied, first.vacant), (3, 2, 1));
        assert_eq!(first.hr_salary_cost, 185_000);
        assert_eq!(first.variance, 15_000);
        assert!(first.aligned);

        let second = &rows[1];
        assert_eq!(second.hr_salary_cost, 60_000);
        assert_eq!(second.variance, 40_000);
        assert!(!second.aligned);
    }

    #[test]
    fn scope_narrows_by_directorate_or_branch() {
        let units = vec![
            OrgUnit {
                branch_code: "PPB".to_string(),
                branch_name: "Policy".to_string(),
                directorate_code: "102001".to_string(),
                directorate_name: "Strategic Policy".to_string(),
                division_code: "102001-01".to_string(),
                division_name: "Analysis".to_string(),
                fund_centre_code: "FC-102001".to_string(),
            },
            OrgUnit {
                branch_code: "CSB".to_string(),
                branch_name: "Corporate".to_string(),
                directorate_code: "101001".to_string(),
                directorate_name: "Finance".to_string(),
                division_code: "101001-01".to_string(),
                division_name: "Planning".to_string(),
                fund_centre_code: "FC-101001".to_string(),
            },
        ];
        let directory = OrgDirectory::new(&units);
        let records = vec![
            line("102001", VoteType::Salary, 1, 1, 1),
            line("101001", VoteType::Salary, 2, 2, 2),
        ];

        let all = scope_finance(&records, &UnitScope::default(), &directory);
        assert_eq!(all.len(), 2);

        let branch = scope_finance(&records, &UnitScope::branch("CSB"), &directory);
        assert_eq!(branch.iter().map(|r| r.budget).collect::<Vec<_>>(), vec![2]);

        let directorate =
            UnitScope { directorate: Some("102001".to_string()), ..UnitScope::default() };
        let scoped = scope_finance(&records, &directorate, &directory);
        assert_eq!(scoped.iter().map(|r| r.budget).collect::<Vec<_>>(), vec![1]);

        assert!(scope_finance(&records, &UnitScope::branch("XXX"), &directory).is_empty());
    }

    #[test]
    fn deserializes_finance_extract_row() {
        let raw = r#"{
            "directorateCode": "102001",
            "directorateName": "Strategic Policy",
            "fundCentreCode": "FC-102001",
            "voteType": "O&M",
            "budget": 1200000,
            "forecast": 1100000,
            "actuals": 400000,
            "commitments": 100000,
            "fiscalYear": "2025-26"
        }"#;
        let record: FinanceRecord = match serde_json::from_str(raw) {
            Ok(record) => record,
            Err(err) => panic!("fixture should deserialize: {err}"),
        };
        assert_eq!(record.vote_type, VoteType::OperatingAndMaintenance);
        assert_eq!(record.free_balance(), 600_000);
        assert_eq!(VoteType::parse(record.vote_type.as_str()), Some(record.vote_type));
    }
}
