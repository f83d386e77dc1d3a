use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::RosterError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum OccupancyStatus {
    Occupied,
    #[serde(rename = "Occupied - Acting", alias = "Occupied-Acting")]
    OccupiedActing,
    Vacant,
}

impl OccupancyStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Occupied => "Occupied",
            Self::OccupiedActing => "Occupied - Acting",
            Self::Vacant => "Vacant",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Occupied" => Some(Self::Occupied),
            "Occupied - Acting" | "Occupied-Acting" => Some(Self::OccupiedActing),
            "Vacant" => Some(Self::Vacant),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_vacant(self) -> bool {
        self == Self::Vacant
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TenureType {
    Indeterminate,
    Term,
    Casual,
    Student,
    Assignment,
    Secondment,
}

impl TenureType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indeterminate => "Indeterminate",
            Self::Term => "Term",
            Self::Casual => "Casual",
            Self::Student => "Student",
            Self::Assignment => "Assignment",
            Self::Secondment => "Secondment",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Indeterminate" => Some(Self::Indeterminate),
            "Term" => Some(Self::Term),
            "Casual" => Some(Self::Casual),
            "Student" => Some(Self::Student),
            "Assignment" => Some(Self::Assignment),
            "Secondment" => Some(Self::Secondment),
            _ => None,
        }
    }

    /// Tenures that carry an end date.
    #[must_use]
    pub fn is_time_bounded(self) -> bool {
        !matches!(self, Self::Indeterminate)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FundingSource {
    #[serde(rename = "A-Base")]
    ABase,
    #[serde(rename = "B-Base")]
    BBase,
    Program,
    Sunset,
}

impl FundingSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ABase => "A-Base",
            Self::BBase => "B-Base",
            Self::Program => "Program",
            Self::Sunset => "Sunset",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A-Base" => Some(Self::ABase),
            "B-Base" => Some(Self::BBase),
            "Program" => Some(Self::Program),
            "Sunset" => Some(Self::Sunset),
            _ => None,
        }
    }
}

impl Display for OccupancyStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for TenureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for FundingSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Location {
    pub city: String,
    pub province: String,
    pub region: String,
}

/// One slot in the organization, occupied or vacant.
///
/// Dates are kept as the ISO `YYYY-MM-DD` text the record store delivers; the
/// date-window helpers parse them on demand and treat unparseable text as absent.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub position_id: String,
    pub position_title: String,
    pub classification_group: String,
    pub classification_level: u8,
    pub classification: String,
    pub occupancy_status: OccupancyStatus,
    #[serde(default)]
    pub incumbent_name: Option<String>,
    #[serde(default)]
    pub incumbent_id: Option<String>,
    #[serde(default)]
    pub tenure_type: Option<TenureType>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub language_profile: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub branch_code: String,
    #[serde(default)]
    pub directorate_code: String,
    #[serde(default)]
    pub division_code: String,
    #[serde(default)]
    pub fund_centre_code: String,
    #[serde(default)]
    pub reporting_to_position_id: Option<String>,
    pub funding_source: FundingSource,
    #[serde(default)]
    pub funding_sunset_date: Option<String>,
    #[serde(default)]
    pub salary: Option<u64>,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub is_doublebanked: bool,
    /// Self-identified gender; absent when not disclosed.
    #[serde(default, rename = "ee_gender", alias = "eeGender")]
    pub ee_gender: Option<String>,
    #[serde(default, rename = "ee_visibleMinority", alias = "eeVisibleMinority")]
    pub ee_visible_minority: bool,
    #[serde(default, rename = "ee_indigenous", alias = "eeIndigenous")]
    pub ee_indigenous: bool,
    #[serde(default, rename = "ee_disability", alias = "eeDisability")]
    pub ee_disability: bool,
}

impl Position {
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.occupancy_status.is_vacant()
    }

    #[must_use]
    pub fn salary_or_zero(&self) -> u64 {
        self.salary.unwrap_or(0)
    }

    /// Check the per-record shape rules a roster export must satisfy.
    ///
    /// # Errors
    /// Returns [`RosterError::Validation`] when identity, occupancy, tenure, or
    /// funding fields contradict each other.
    pub fn validate(&self) -> Result<(), RosterError> {
        if self.position_id.trim().is_empty() {
            return Err(RosterError::Validation("positionId MUST be non-empty".to_string()));
        }

        let fail = |message: &str| {
            Err(RosterError::Validation(format!("{}: {message}", self.position_id)))
        };

        if self.reporting_to_position_id.as_deref() == Some(self.position_id.as_str()) {
            return fail("position MUST NOT report to itself");
        }

        if self.is_vacant() {
            if self.incumbent_name.is_some() || self.incumbent_id.is_some() {
                return fail("vacant position MUST NOT carry an incumbent");
            }
            if self.tenure_type.is_some() {
                return fail("vacant position MUST NOT carry a tenure type");
            }
        } else {
            if self.incumbent_name.is_none() || self.incumbent_id.is_none() {
                return fail("occupied position MUST carry an incumbent name and id");
            }
            if self.tenure_type.is_none() {
                return fail("occupied position MUST carry a tenure type");
            }
        }

        if self.end_date.is_some()
            && !self.tenure_type.is_some_and(TenureType::is_time_bounded)
        {
            return fail("endDate is only allowed for time-bounded tenures");
        }

        if self.funding_sunset_date.is_some() && self.funding_source != FundingSource::Sunset {
            return fail("fundingSunsetDate is only allowed for Sunset funding");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{occupied, vacant};

    fn assert_validation_error_contains(position: &Position, expected_substring: &str) {
        match position.validate() {
            Ok(()) => panic!("expected validation error containing `{expected_substring}`"),
            Err(err) => assert!(
                err.to_string().contains(expected_substring),
                "unexpected error: {err}"
            ),
        }
    }

    #[test]
    fn well_formed_positions_validate() {
        assert_eq!(occupied("P1", None, 3, 100).validate(), Ok(()));
        assert_eq!(vacant("P2", Some("P1"), 2, 0).validate(), Ok(()));
    }

    #[test]
    fn vacant_position_with_incumbent_is_rejected() {
        let mut position = vacant("P1", None, 1, 0);
        position.incumbent_name = Some("Jean Roy".to_string());
        assert_validation_error_contains(&position, "MUST NOT carry an incumbent");
    }

    #[test]
    fn occupied_position_without_tenure_is_rejected() {
        let mut position = occupied("P1", None, 1, 10);
        position.tenure_type = None;
        assert_validation_error_contains(&position, "MUST carry a tenure type");
    }

    #[test]
    fn end_date_requires_time_bounded_tenure() {
        let mut position = occupied("P1", None, 1, 10);
        position.end_date = Some("2026-06-01".to_string());
        assert_validation_error_contains(&position, "time-bounded");

        position.tenure_type = Some(TenureType::Term);
        assert_eq!(position.validate(), Ok(()));
    }

    #[test]
    fn sunset_date_requires_sunset_funding() {
        let mut position = occupied("P1", None, 1, 10);
        position.funding_sunset_date = Some("2027-03-31".to_string());
        assert_validation_error_contains(&position, "Sunset funding");
    }

    #[test]
    fn self_reference_is_rejected() {
        let position = occupied("P1", Some("P1"), 1, 10);
        assert_validation_error_contains(&position, "report to itself");
    }

    #[test]
    fn deserializes_camel_case_export_with_acting_alias() {
        let raw = r#"{
            "positionId": "POS-0001",
            "positionTitle": "Policy Analyst",
            "classificationGroup": "EC",
            "classificationLevel": 4,
            "classification": "EC-04",
            "occupancyStatus": "Occupied-Acting",
            "incumbentName": "Marie Tremblay",
            "incumbentId": "EMP-05002",
            "tenureType": "Term",
            "endDate": "2026-05-01",
            "location": { "city": "Gatineau", "province": "QC", "region": "NCR" },
            "branchCode": "PPB",
            "reportingToPositionId": null,
            "fundingSource": "B-Base",
            "salary": 87000,
            "isCritical": true
        }"#;

        let position: Position = match serde_json::from_str(raw) {
            Ok(position) => position,
            Err(err) => panic!("fixture should deserialize: {err}"),
        };
        assert_eq!(position.occupancy_status, OccupancyStatus::OccupiedActing);
        assert_eq!(position.funding_source, FundingSource::BBase);
        assert_eq!(position.location.city, "Gatineau");
        assert_eq!(position.salary, Some(87_000));
        assert!(!position.is_doublebanked);
        assert_eq!(position.ee_gender, None);
        assert!(!position.ee_visible_minority);
        assert_eq!(position.validate(), Ok(()));
    }

    #[test]
    fn deserializes_equity_self_identification_fields() {
        let raw = r#"{
            "positionId": "POS-0002",
            "positionTitle": "Program Officer",
            "classificationGroup": "PM",
            "classificationLevel": 4,
            "classification": "PM-04",
            "occupancyStatus": "Occupied",
            "incumbentName": "Sana Ahmed",
            "incumbentId": "EMP-05003",
            "tenureType": "Indeterminate",
            "fundingSource": "A-Base",
            "ee_gender": "Woman",
            "ee_visibleMinority": true,
            "ee_indigenous": false,
            "ee_disability": true
        }"#;

        let position: Position = match serde_json::from_str(raw) {
            Ok(position) => position,
            Err(err) => panic!("fixture should deserialize: {err}"),
        };
        assert_eq!(position.ee_gender.as_deref(), Some("Woman"));
        assert!(position.ee_visible_minority);
        assert!(!position.ee_indigenous);
        assert!(position.ee_disability);
    }
}
