use crate::model::{FundingSource, Location, OccupancyStatus, Position, TenureType};

pub(crate) fn occupied(id: &str, parent: Option<&str>, level: u8, salary: u64) -> Position {
    Position {
        position_id: id.to_string(),
        position_title: "Policy Analyst".to_string(),
        classification_group: "EC".to_string(),
        classification_level: level,
        classification: format!("EC-{level:02}"),
        occupancy_status: OccupancyStatus::Occupied,
        incumbent_name: Some(format!("Incumbent {id}")),
        incumbent_id: Some(format!("EMP-{id}")),
        tenure_type: Some(TenureType::Indeterminate),
        start_date: Some("2019-04-01".to_string()),
        end_date: None,
        language_profile: "BBB".to_string(),
        location: Location {
            city: "Ottawa".to_string(),
            province: "ON".to_string(),
            region: "NCR".to_string(),
        },
        branch_code: "PPB".to_string(),
        directorate_code: "102001".to_string(),
        division_code: "102001-01".to_string(),
        fund_centre_code: "FC-102001".to_string(),
        reporting_to_position_id: parent.map(str::to_string),
        funding_source: FundingSource::ABase,
        funding_sunset_date: None,
        salary: Some(salary),
        is_critical: false,
        is_doublebanked: false,
        ee_gender: None,
        ee_visible_minority: false,
        ee_indigenous: false,
        ee_disability: false,
    }
}

pub(crate) fn vacant(id: &str, parent: Option<&str>, level: u8, salary: u64) -> Position {
    Position {
        occupancy_status: OccupancyStatus::Vacant,
        incumbent_name: None,
        incumbent_id: None,
        tenure_type: None,
        start_date: None,
        ..occupied(id, parent, level, salary)
    }
}

pub(crate) fn titled(mut position: Position, title: &str) -> Position {
    position.position_title = title.to_string();
    position
}
