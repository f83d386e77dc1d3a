use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Position;
use crate::summary::{tally, Tally};

/// Label used when a gender is not disclosed.
pub const UNDISCLOSED_GENDER: &str = "Prefer not to say";

/// Workforce availability targets, in percent of occupied positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EquityTargets {
    pub women: f64,
    pub visible_minority: f64,
    pub indigenous: f64,
    pub disability: f64,
}

impl Default for EquityTargets {
    fn default() -> Self {
        Self { women: 48.0, visible_minority: 22.0, indigenous: 5.0, disability: 9.0 }
    }
}

/// Representation counts over occupied positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct EquityCounts {
    pub total: usize,
    pub women: usize,
    pub visible_minority: usize,
    pub indigenous: usize,
    pub disability: usize,
}

impl EquityCounts {
    /// Count one occupied position; vacant seats are ignored.
    pub fn record(&mut self, position: &Position) {
        if position.is_vacant() {
            return;
        }
        self.total += 1;
        if position.ee_gender.as_deref() == Some("Woman") {
            self.women += 1;
        }
        if position.ee_visible_minority {
            self.visible_minority += 1;
        }
        if position.ee_indigenous {
            self.indigenous += 1;
        }
        if position.ee_disability {
            self.disability += 1;
        }
    }

    #[must_use]
    pub fn rates(&self) -> EquityRates {
        let pct = |count: usize| {
            if self.total == 0 {
                return 0.0;
            }
            #[allow(clippy::cast_precision_loss)]
            let rate = count as f64 / self.total as f64 * 100.0;
            rate
        };
        EquityRates {
            women: pct(self.women),
            visible_minority: pct(self.visible_minority),
            indigenous: pct(self.indigenous),
            disability: pct(self.disability),
        }
    }
}

/// Representation in percent; all zero for an empty group.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EquityRates {
    pub women: f64,
    pub visible_minority: f64,
    pub indigenous: f64,
    pub disability: f64,
}

impl EquityRates {
    /// Designated groups whose representation is under target.
    #[must_use]
    pub fn below_target(&self, targets: &EquityTargets) -> Vec<&'static str> {
        [
            ("women", self.women, targets.women),
            ("visible_minority", self.visible_minority, targets.visible_minority),
            ("indigenous", self.indigenous, targets.indigenous),
            ("disability", self.disability, targets.disability),
        ]
        .into_iter()
        .filter(|(_, actual, target)| actual < target)
        .map(|(name, _, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquityGroup {
    pub key: String,
    pub counts: EquityCounts,
    pub rates: EquityRates,
}

/// Employment equity picture for one slice of the roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EquityProfile {
    pub counts: EquityCounts,
    pub rates: EquityRates,
    pub below_target: Vec<String>,
    pub by_gender: Vec<Tally>,
    /// Sorted by branch code; only branches with occupied positions.
    pub by_branch: Vec<EquityGroup>,
    /// Sorted by classification group; only groups with occupied positions.
    pub by_classification: Vec<EquityGroup>,
}

impl EquityProfile {
    #[must_use]
    pub fn compute(positions: &[Position], targets: &EquityTargets) -> Self {
        let mut counts = EquityCounts::default();
        let mut branches: BTreeMap<&str, EquityCounts> = BTreeMap::new();
        let mut groups: BTreeMap<&str, EquityCounts> = BTreeMap::new();
        for position in positions.iter().filter(|position| !position.is_vacant()) {
            counts.record(position);
            branches.entry(position.branch_code.as_str()).or_default().record(position);
            groups.entry(position.classification_group.as_str()).or_default().record(position);
        }

        let rates = counts.rates();
        Self {
            below_target: rates.below_target(targets).into_iter().map(str::to_string).collect(),
            by_gender: tally(
                positions
                    .iter()
                    .filter(|position| !position.is_vacant())
                    .map(|position| position.ee_gender.as_deref().unwrap_or(UNDISCLOSED_GENDER)),
            ),
            by_branch: into_groups(branches),
            by_classification: into_groups(groups),
            counts,
            rates,
        }
    }
}

fn into_groups(map: BTreeMap<&str, EquityCounts>) -> Vec<EquityGroup> {
    map.into_iter()
        .map(|(key, counts)| EquityGroup { key: key.to_string(), rates: counts.rates(), counts })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{occupied, vacant};

    fn person(id: &str, branch: &str, group: &str, gender: Option<&str>) -> Position {
        let mut position = occupied(id, None, 3, 1);
        position.branch_code = branch.to_string();
        position.classification_group = group.to_string();
        position.ee_gender = gender.map(str::to_string);
        position
    }

    #[test]
    fn counts_ignore_vacant_positions() {
        let mut seat = vacant("SEAT", None, 2, 1);
        seat.ee_visible_minority = true;
        let mut counts = EquityCounts::default();
        counts.record(&seat);
        assert_eq!(counts, EquityCounts::default());
        assert!(counts.rates().women.abs() < f64::EPSILON);
    }

    #[test]
    fn profile_breaks_down_by_branch_and_group() {
        let mut minority = person("B", "PPB", "EC", Some("Man"));
        minority.ee_visible_minority = true;
        let mut indigenous = person("C", "CSB", "AS", Some("Woman"));
        indigenous.ee_indigenous = true;
        indigenous.ee_disability = true;
        let positions = vec![
            person("A", "PPB", "EC", Some("Woman")),
            minority,
            indigenous,
            person("D", "PPB", "AS", None),
            vacant("E", None, 1, 1),
        ];

        let profile = EquityProfile::compute(&positions, &EquityTargets::default());
        assert_eq!(profile.counts.total, 4);
        assert_eq!(profile.counts.women, 2);
        assert!((profile.rates.women - 50.0).abs() < 1e-9);
        assert!((profile.rates.indigenous - 25.0).abs() < 1e-9);
        assert_eq!(
            profile.by_gender,
            vec![Tally::new("Woman", 2), Tally::new("Man", 1), Tally::new(UNDISCLOSED_GENDER, 1)]
        );

        let branches = profile.by_branch.iter().map(|g| g.key.as_str()).collect::<Vec<_>>();
        assert_eq!(branches, vec!["CSB", "PPB"]);
        assert_eq!(profile.by_branch[1].counts.total, 3);
        assert_eq!(profile.by_branch[1].counts.visible_minority, 1);

        let groups = profile.by_classification.iter().map(|g| g.key.as_str()).collect::<Vec<_>>();
        assert_eq!(groups, vec!["AS", "EC"]);
        assert_eq!(profile.by_classification[0].counts.disability, 1);
    }

    #[test]
    fn groups_under_target_are_flagged() {
        let positions =
            vec![person("A", "PPB", "EC", Some("Woman")), person("B", "PPB", "EC", None)];
        let profile = EquityProfile::compute(&positions, &EquityTargets::default());
        assert_eq!(profile.below_target, vec!["visible_minority", "indigenous", "disability"]);

        let empty = EquityProfile::compute(&[], &EquityTargets::default());
        assert_eq!(empty.counts.total, 0);
        assert!(empty.by_branch.is_empty());
    }
}
