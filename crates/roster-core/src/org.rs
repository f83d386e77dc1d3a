use serde::{Deserialize, Serialize};

use crate::model::Position;

/// One division row of the flattened org hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnit {
    pub branch_code: String,
    pub branch_name: String,
    pub directorate_code: String,
    pub directorate_name: String,
    pub division_code: String,
    pub division_name: String,
    pub fund_centre_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct UnitRef {
    pub code: String,
    pub name: String,
}

/// Cascading branch → directorate → division lookups over [`OrgUnit`] rows.
///
/// Rows are kept in input order; every listing preserves first-seen order.
#[derive(Debug, Clone, Default)]
pub struct OrgDirectory {
    units: Vec<OrgUnit>,
}

impl OrgDirectory {
    #[must_use]
    pub fn new(units: &[OrgUnit]) -> Self {
        Self { units: units.to_vec() }
    }

    #[must_use]
    pub fn branches(&self) -> Vec<UnitRef> {
        let mut out: Vec<UnitRef> = Vec::new();
        for unit in &self.units {
            if !out.iter().any(|seen| seen.code == unit.branch_code) {
                out.push(UnitRef {
                    code: unit.branch_code.clone(),
                    name: unit.branch_name.clone(),
                });
            }
        }
        out
    }

    /// Directorates under `branch_code`; empty when the branch is absent or unknown.
    #[must_use]
    pub fn directorates_for_branch(&self, branch_code: Option<&str>) -> Vec<UnitRef> {
        let Some(branch_code) = branch_code.filter(|code| !code.is_empty()) else {
            return Vec::new();
        };

        let mut out: Vec<UnitRef> = Vec::new();
        for unit in self.units.iter().filter(|unit| unit.branch_code == branch_code) {
            if !out.iter().any(|seen| seen.code == unit.directorate_code) {
                out.push(UnitRef {
                    code: unit.directorate_code.clone(),
                    name: unit.directorate_name.clone(),
                });
            }
        }
        out
    }

    /// Divisions under one directorate of one branch; empty unless both codes resolve.
    #[must_use]
    pub fn divisions_for_directorate(
        &self,
        branch_code: Option<&str>,
        directorate_code: Option<&str>,
    ) -> Vec<UnitRef> {
        let (Some(branch_code), Some(directorate_code)) = (
            branch_code.filter(|code| !code.is_empty()),
            directorate_code.filter(|code| !code.is_empty()),
        ) else {
            return Vec::new();
        };

        self.units
            .iter()
            .filter(|unit| {
                unit.branch_code == branch_code && unit.directorate_code == directorate_code
            })
            .map(|unit| UnitRef {
                code: unit.division_code.clone(),
                name: unit.division_name.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn branch_name(&self, branch_code: &str) -> Option<&str> {
        self.units
            .iter()
            .find(|unit| unit.branch_code == branch_code)
            .map(|unit| unit.branch_name.as_str())
    }

    #[must_use]
    pub fn directorate_name(&self, directorate_code: &str) -> Option<&str> {
        self.units
            .iter()
            .find(|unit| unit.directorate_code == directorate_code)
            .map(|unit| unit.directorate_name.as_str())
    }
}

/// Optional branch / directorate / division restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct UnitScope {
    pub branch: Option<String>,
    pub directorate: Option<String>,
    pub division: Option<String>,
}

impl UnitScope {
    #[must_use]
    pub fn branch(code: &str) -> Self {
        Self { branch: Some(code.to_string()), ..Self::default() }
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.branch.is_none() && self.directorate.is_none() && self.division.is_none()
    }

    #[must_use]
    pub fn matches(&self, position: &Position) -> bool {
        fn field_matches(expected: Option<&String>, actual: &str) -> bool {
            expected.map_or(true, |expected| expected.is_empty() || expected == actual)
        }

        field_matches(self.branch.as_ref(), &position.branch_code)
            && field_matches(self.directorate.as_ref(), &position.directorate_code)
            && field_matches(self.division.as_ref(), &position.division_code)
    }

    #[must_use]
    pub fn apply<'a>(&self, positions: &'a [Position]) -> Vec<&'a Position> {
        positions.iter().filter(|position| self.matches(position)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::occupied;

    fn unit(branch: &str, directorate: &str, division: &str) -> OrgUnit {
        OrgUnit {
            branch_code: branch.to_string(),
            branch_name: format!("{branch} Branch"),
            directorate_code: directorate.to_string(),
            directorate_name: format!("Directorate {directorate}"),
            division_code: division.to_string(),
            division_name: format!("Division {division}"),
            fund_centre_code: format!("FC-{directorate}"),
        }
    }

    fn directory() -> OrgDirectory {
        OrgDirectory::new(&[
            unit("CSB", "101001", "101001-01"),
            unit("CSB", "101001", "101001-02"),
            unit("CSB", "101002", "101002-01"),
            unit("PPB", "102001", "102001-01"),
        ])
    }

    #[test]
    fn branches_are_deduplicated_in_first_seen_order() {
        let codes = directory().branches().into_iter().map(|b| b.code).collect::<Vec<_>>();
        assert_eq!(codes, vec!["CSB", "PPB"]);
    }

    #[test]
    fn cascade_lookups_require_parent_codes() {
        let directory = directory();
        assert!(directory.directorates_for_branch(None).is_empty());
        assert!(directory.directorates_for_branch(Some("NOPE")).is_empty());
        assert_eq!(directory.directorates_for_branch(Some("CSB")).len(), 2);

        assert!(directory.divisions_for_directorate(Some("CSB"), None).is_empty());
        assert!(directory.divisions_for_directorate(Some("PPB"), Some("101001")).is_empty());
        let divisions = directory.divisions_for_directorate(Some("CSB"), Some("101001"));
        assert_eq!(
            divisions.iter().map(|d| d.code.as_str()).collect::<Vec<_>>(),
            vec!["101001-01", "101001-02"]
        );
    }

    #[test]
    fn name_lookups_resolve_codes() {
        let directory = directory();
        assert_eq!(directory.branch_name("PPB"), Some("PPB Branch"));
        assert_eq!(directory.directorate_name("101002"), Some("Directorate 101002"));
        assert_eq!(directory.directorate_name("999999"), None);
    }

    #[test]
    fn unit_scope_is_conjunctive_and_empty_codes_are_ignored() {
        let position = occupied("P1", None, 3, 10);
        assert!(UnitScope::default().matches(&position));
        assert!(UnitScope::branch("PPB").matches(&position));
        assert!(!UnitScope::branch("CSB").matches(&position));

        let scope = UnitScope {
            branch: Some("PPB".to_string()),
            directorate: Some(String::new()),
            division: Some("102001-02".to_string()),
        };
        assert!(!scope.matches(&position));
    }
}
