use serde::{Deserialize, Serialize};

use crate::model::{FundingSource, OccupancyStatus, Position};
use crate::org::UnitScope;

/// A lower-cased, trimmed free-text needle. `None` from [`TextQuery::new`]
/// means the query imposes no constraint.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TextQuery(String);

impl TextQuery {
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring match against identifier, title, incumbent
    /// name, and classification. A vacant seat has no incumbent to match.
    #[must_use]
    pub fn matches(&self, position: &Position) -> bool {
        let needle = self.0.as_str();
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);

        contains(&position.position_id)
            || contains(&position.position_title)
            || position.incumbent_name.as_deref().is_some_and(contains)
            || contains(&position.classification)
    }
}

/// Independent optional constraints, combined conjunctively.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct FilterCriteria {
    #[serde(default)]
    pub units: UnitScope,
    pub occupancy_status: Option<OccupancyStatus>,
    pub classification_group: Option<String>,
    pub funding_source: Option<FundingSource>,
    pub text: Option<String>,
}

impl FilterCriteria {
    #[must_use]
    pub fn text_query(&self) -> Option<TextQuery> {
        self.text.as_deref().and_then(TextQuery::new)
    }

    /// Build the single predicate these criteria describe.
    ///
    /// The free-text needle is normalized once here rather than per position.
    pub fn predicate(&self) -> impl Fn(&Position) -> bool + '_ {
        let text = self.text_query();
        move |position: &Position| {
            self.matches_categorical(position)
                && text.as_ref().map_or(true, |query| query.matches(position))
        }
    }

    #[must_use]
    pub fn matches(&self, position: &Position) -> bool {
        (self.predicate())(position)
    }

    fn matches_categorical(&self, position: &Position) -> bool {
        if !self.units.matches(position) {
            return false;
        }

        if self.occupancy_status.is_some_and(|status| status != position.occupancy_status) {
            return false;
        }

        if let Some(group) = self.classification_group.as_deref() {
            if !group.is_empty() && group != position.classification_group {
                return false;
            }
        }

        if self.funding_source.is_some_and(|source| source != position.funding_source) {
            return false;
        }

        true
    }

    /// Positions that satisfy every populated field, in input order.
    #[must_use]
    pub fn apply<'a>(&self, positions: &'a [Position]) -> Vec<&'a Position> {
        let predicate = self.predicate();
        positions.iter().filter(|position| predicate(position)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{occupied, titled, vacant};

    #[test]
    fn empty_criteria_match_everything() {
        let criteria = FilterCriteria::default();
        assert!(criteria.matches(&occupied("P1", None, 3, 10)));
        assert!(criteria.matches(&vacant("P2", None, 3, 10)));
    }

    #[test]
    fn text_matches_case_insensitively_across_fields() {
        let position = titled(occupied("POS-0042", None, 4, 10), "Senior Policy Analyst");
        for needle in ["pos-0042", "SENIOR", "incumbent pos", "ec-04"] {
            let criteria =
                FilterCriteria { text: Some(needle.to_string()), ..FilterCriteria::default() };
            assert!(criteria.matches(&position), "needle `{needle}` should match");
        }

        let criteria =
            FilterCriteria { text: Some("economist".to_string()), ..FilterCriteria::default() };
        assert!(!criteria.matches(&position));
    }

    #[test]
    fn vacant_position_never_matches_on_incumbent_name() {
        let seat = vacant("P9", None, 2, 10);
        let criteria =
            FilterCriteria { text: Some("incumbent".to_string()), ..FilterCriteria::default() };
        assert!(!criteria.matches(&seat));
    }

    #[test]
    fn whitespace_text_imposes_no_constraint() {
        let criteria =
            FilterCriteria { text: Some("   ".to_string()), ..FilterCriteria::default() };
        assert!(criteria.text_query().is_none());
        assert!(criteria.matches(&occupied("P1", None, 1, 1)));
    }

    #[test]
    fn categorical_fields_compose_conjunctively() {
        let mut sunset = occupied("P1", None, 3, 10);
        sunset.funding_source = FundingSource::Sunset;
        let base = occupied("P2", None, 3, 10);
        let seat = vacant("P3", None, 3, 10);
        let positions = vec![sunset, base, seat];

        let criteria = FilterCriteria {
            occupancy_status: Some(OccupancyStatus::Occupied),
            funding_source: Some(FundingSource::Sunset),
            classification_group: Some("EC".to_string()),
            ..FilterCriteria::default()
        };
        let ids =
            criteria.apply(&positions).iter().map(|p| p.position_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["P1"]);

        let criteria = FilterCriteria {
            classification_group: Some("AS".to_string()),
            ..FilterCriteria::default()
        };
        assert!(criteria.apply(&positions).is_empty());
    }

    #[test]
    fn unit_scope_participates_in_criteria() {
        let positions = vec![occupied("P1", None, 1, 1)];
        let criteria =
            FilterCriteria { units: UnitScope::branch("CSB"), ..FilterCriteria::default() };
        assert!(criteria.apply(&positions).is_empty());
    }
}
