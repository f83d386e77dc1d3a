use serde::{Deserialize, Serialize};

use crate::criteria::FilterCriteria;
use crate::model::{FundingSource, Position, TenureType};
use crate::summary::{tally, Tally};
use crate::RosterError;

/// Removal priority, lowest tier removed first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Sunset = 1,
    TimeBounded = 2,
    Standard = 3,
    Critical = 4,
}

impl PriorityTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sunset => "sunset",
            Self::TimeBounded => "time_bounded",
            Self::Standard => "standard",
            Self::Critical => "critical",
        }
    }

    #[must_use]
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// Tier of an occupied position. Criticality overrides every other signal.
#[must_use]
pub fn priority_tier(position: &Position) -> PriorityTier {
    if position.is_critical {
        return PriorityTier::Critical;
    }
    if position.funding_source == FundingSource::Sunset {
        return PriorityTier::Sunset;
    }
    if position.tenure_type.is_some_and(TenureType::is_time_bounded) {
        return PriorityTier::TimeBounded;
    }
    PriorityTier::Standard
}

#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct ScenarioParameters {
    reduction_pct: u8,
    branch: Option<String>,
}

impl ScenarioParameters {
    /// # Errors
    /// Returns [`RosterError::InvalidParameter`] unless `reduction_pct` is in 1..=100.
    pub fn new(reduction_pct: u8, branch: Option<&str>) -> Result<Self, RosterError> {
        if !(1..=100).contains(&reduction_pct) {
            return Err(RosterError::InvalidParameter(format!(
                "reduction_pct MUST be between 1 and 100, got {reduction_pct}"
            )));
        }
        Ok(Self {
            reduction_pct,
            branch: branch.filter(|code| !code.is_empty()).map(str::to_string),
        })
    }

    #[must_use]
    pub fn reduction_pct(&self) -> u8 {
        self.reduction_pct
    }

    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }
}

/// Occupied positions eligible for ranking: the `criteria` slice minus vacant
/// seats, narrowed to the scenario branch when one is set.
#[must_use]
pub fn scenario_pool<'a>(
    positions: &'a [Position],
    criteria: &FilterCriteria,
    parameters: &ScenarioParameters,
) -> Vec<&'a Position> {
    let predicate = criteria.predicate();
    positions
        .iter()
        .filter(|position| predicate(position))
        .filter(|position| !position.is_vacant())
        .filter(|position| parameters.branch().map_or(true, |code| position.branch_code == code))
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScenarioOutcome<'a> {
    pub pool_size: usize,
    pub affected: Vec<&'a Position>,
    pub salary_savings: u64,
    pub critical_impacted: usize,
    pub indeterminate_impacted: usize,
    pub by_branch: Vec<Tally>,
    pub by_classification: Vec<Tally>,
}

/// Number of positions a `reduction_pct` cut removes from a pool of `pool_size`.
#[must_use]
pub fn reduction_count(pool_size: usize, reduction_pct: u8) -> usize {
    let pct = usize::from(reduction_pct.clamp(1, 100));
    (pool_size * pct).div_ceil(100)
}

/// Order `pool` by removal priority and take the first `ceil(len * pct / 100)`.
///
/// Ties within a tier go to the lower salary, then to pool order. The pool is
/// expected to hold occupied positions only; see [`scenario_pool`].
#[must_use]
pub fn rank_for_reduction<'a>(pool: &[&'a Position], reduction_pct: u8) -> ScenarioOutcome<'a> {
    if pool.is_empty() {
        return ScenarioOutcome::default();
    }

    let mut ranked = pool.to_vec();
    ranked.sort_by(|left, right| {
        priority_tier(left)
            .cmp(&priority_tier(right))
            .then_with(|| left.salary_or_zero().cmp(&right.salary_or_zero()))
    });
    ranked.truncate(reduction_count(pool.len(), reduction_pct));

    let outcome = ScenarioOutcome {
        pool_size: pool.len(),
        salary_savings: ranked.iter().map(|position| position.salary_or_zero()).sum(),
        critical_impacted: ranked.iter().filter(|position| position.is_critical).count(),
        indeterminate_impacted: ranked
            .iter()
            .filter(|position| position.tenure_type == Some(TenureType::Indeterminate))
            .count(),
        by_branch: tally(ranked.iter().map(|position| position.branch_code.as_str())),
        by_classification: tally(
            ranked.iter().map(|position| position.classification_group.as_str()),
        ),
        affected: ranked,
    };
    tracing::debug!(
        pool = outcome.pool_size,
        affected = outcome.affected.len(),
        reduction_pct,
        "scenario ranked"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::fixtures::{occupied, vacant};

    fn ids<'a>(outcome: &ScenarioOutcome<'a>) -> Vec<&'a str> {
        outcome.affected.iter().map(|position| position.position_id.as_str()).collect()
    }

    fn tiered_pool() -> Vec<Position> {
        let mut critical_sunset = occupied("CRIT", None, 3, 10_000);
        critical_sunset.is_critical = true;
        critical_sunset.funding_source = FundingSource::Sunset;
        let mut sunset = occupied("SUN", None, 3, 90_000);
        sunset.funding_source = FundingSource::Sunset;
        let mut term = occupied("TERM", None, 3, 50_000);
        term.tenure_type = Some(TenureType::Term);
        let indeterminate = occupied("IND", None, 3, 40_000);
        vec![critical_sunset, indeterminate, term, sunset]
    }

    #[test]
    fn tiers_follow_removal_policy() {
        let pool = tiered_pool();
        let tiers = pool.iter().map(priority_tier).collect::<Vec<_>>();
        assert_eq!(
            tiers,
            vec![
                PriorityTier::Critical,
                PriorityTier::Standard,
                PriorityTier::TimeBounded,
                PriorityTier::Sunset
            ]
        );
        assert_eq!(PriorityTier::Sunset.rank(), 1);
        assert_eq!(PriorityTier::Critical.rank(), 4);
    }

    #[test]
    fn half_reduction_takes_sunset_then_term() {
        let positions = tiered_pool();
        let pool = positions.iter().collect::<Vec<_>>();
        let outcome = rank_for_reduction(&pool, 50);

        assert_eq!(ids(&outcome), vec!["SUN", "TERM"]);
        assert_eq!(outcome.salary_savings, 140_000);
        assert_eq!(outcome.critical_impacted, 0);
        // SUN is sunset-funded but still held indeterminately.
        assert_eq!(outcome.indeterminate_impacted, 1);
    }

    #[test]
    fn full_reduction_reaches_critical_last() {
        let positions = tiered_pool();
        let pool = positions.iter().collect::<Vec<_>>();
        let outcome = rank_for_reduction(&pool, 100);

        assert_eq!(ids(&outcome), vec!["SUN", "TERM", "IND", "CRIT"]);
        assert_eq!(outcome.critical_impacted, 1);
        assert_eq!(outcome.indeterminate_impacted, 3);
    }

    #[test]
    fn ties_break_on_salary_then_pool_order() {
        let mut missing = occupied("NONE", None, 2, 0);
        missing.salary = None;
        let positions = vec![
            occupied("B", None, 2, 70_000),
            occupied("A", None, 2, 70_000),
            missing,
            occupied("C", None, 2, 20_000),
        ];
        let pool = positions.iter().collect::<Vec<_>>();
        assert_eq!(ids(&rank_for_reduction(&pool, 100)), vec!["NONE", "C", "B", "A"]);
    }

    #[test]
    fn empty_pool_yields_empty_outcome() {
        let outcome = rank_for_reduction(&[], 40);
        assert!(outcome.affected.is_empty());
        assert_eq!(outcome.salary_savings, 0);
        assert_eq!(outcome.pool_size, 0);
    }

    #[test]
    fn parameters_reject_out_of_range_percentages() {
        assert!(matches!(
            ScenarioParameters::new(0, None),
            Err(RosterError::InvalidParameter(message)) if message.contains("between 1 and 100")
        ));
        assert!(ScenarioParameters::new(101, None).is_err());
        assert!(ScenarioParameters::new(100, Some("")).is_ok_and(|p| p.branch().is_none()));
    }

    #[test]
    fn pool_excludes_vacant_and_other_branches() {
        let mut other_branch = occupied("CSB-1", None, 2, 1);
        other_branch.branch_code = "CSB".to_string();
        let positions =
            vec![occupied("PPB-1", None, 2, 1), vacant("PPB-2", None, 2, 1), other_branch];

        let everywhere = ScenarioParameters::new(10, None).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(scenario_pool(&positions, &FilterCriteria::default(), &everywhere).len(), 2);

        let ppb = ScenarioParameters::new(10, Some("PPB")).unwrap_or_else(|err| panic!("{err}"));
        let pool = scenario_pool(&positions, &FilterCriteria::default(), &ppb);
        assert_eq!(pool.iter().map(|p| p.position_id.as_str()).collect::<Vec<_>>(), vec!["PPB-1"]);
    }

    #[test]
    fn breakdowns_count_affected_positions() {
        let mut csb = occupied("CSB-1", None, 2, 1);
        csb.branch_code = "CSB".to_string();
        csb.classification_group = "AS".to_string();
        let positions = vec![occupied("PPB-1", None, 2, 2), occupied("PPB-2", None, 2, 3), csb];
        let pool = positions.iter().collect::<Vec<_>>();
        let outcome = rank_for_reduction(&pool, 100);

        assert_eq!(outcome.by_branch, vec![Tally::new("PPB", 2), Tally::new("CSB", 1)]);
        assert_eq!(outcome.by_classification, vec![Tally::new("EC", 2), Tally::new("AS", 1)]);
    }

    proptest! {
        #[test]
        fn property_affected_count_is_ceiling_of_share(size in 0_usize..200, pct in 1_u8..=100) {
            let positions = (0..size)
                .map(|index| occupied(&format!("P{index}"), None, 2, (index as u64) * 7 % 13))
                .collect::<Vec<_>>();
            let pool = positions.iter().collect::<Vec<_>>();
            let outcome = rank_for_reduction(&pool, pct);

            let expected = (size * usize::from(pct)).div_ceil(100);
            prop_assert_eq!(outcome.affected.len(), expected);
            let salaries = outcome.affected.iter().map(|p| p.salary_or_zero()).collect::<Vec<_>>();
            prop_assert!(salaries.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }
}
