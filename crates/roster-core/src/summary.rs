use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::model::{FundingSource, OccupancyStatus, Position, TenureType};
use crate::window::ends_within_days;

/// Horizon for the "terms ending soon" headline figure.
pub const TERMS_ENDING_HORIZON_DAYS: u32 = 180;

/// A labelled count in a breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Tally {
    pub key: String,
    pub count: usize,
}

impl Tally {
    #[must_use]
    pub fn new(key: &str, count: usize) -> Self {
        Self { key: key.to_string(), count }
    }
}

/// Count occurrences of each key, largest count first, then by key.
#[must_use]
pub fn tally<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<Tally> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut out = counts.into_iter().map(|(key, count)| Tally::new(key, count)).collect::<Vec<_>>();
    out.sort_by(|left, right| right.count.cmp(&left.count).then_with(|| left.key.cmp(&right.key)));
    out
}

/// Headline workforce figures for one slice of the roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RosterSummary {
    pub total: usize,
    pub occupied: usize,
    pub vacant: usize,
    pub acting: usize,
    pub indeterminate: usize,
    pub term_casual: usize,
    pub critical: usize,
    pub critical_vacant: usize,
    pub sunset: usize,
    pub double_banked: usize,
    pub terms_ending_soon: usize,
    pub total_salary: u64,
    /// Vacant share of all positions in percent; 0 for an empty slice.
    pub vacancy_rate: f64,
    pub by_language_profile: Vec<Tally>,
}

impl RosterSummary {
    #[must_use]
    pub fn compute(positions: &[Position], reference: Date) -> Self {
        let mut summary = Self { total: positions.len(), ..Self::default() };

        for position in positions {
            if position.is_vacant() {
                summary.vacant += 1;
            } else {
                summary.occupied += 1;
                if position.tenure_type == Some(TenureType::Indeterminate) {
                    summary.indeterminate += 1;
                }
            }
            if position.occupancy_status == OccupancyStatus::OccupiedActing {
                summary.acting += 1;
            }
            if position.tenure_type.is_some_and(TenureType::is_time_bounded) {
                summary.term_casual += 1;
            }
            if position.is_critical {
                summary.critical += 1;
                if position.is_vacant() {
                    summary.critical_vacant += 1;
                }
            }
            if position.funding_source == FundingSource::Sunset {
                summary.sunset += 1;
            }
            if position.is_doublebanked {
                summary.double_banked += 1;
            }
            if ends_within_days(position.end_date.as_deref(), TERMS_ENDING_HORIZON_DAYS, reference)
            {
                summary.terms_ending_soon += 1;
            }
            summary.total_salary = summary.total_salary.saturating_add(position.salary_or_zero());
        }

        if summary.total > 0 {
            #[allow(clippy::cast_precision_loss)]
            let rate = summary.vacant as f64 / summary.total as f64 * 100.0;
            summary.vacancy_rate = rate;
        }
        summary.by_language_profile = tally(positions.iter().map(|position| {
            if position.language_profile.is_empty() {
                "Unknown"
            } else {
                position.language_profile.as_str()
            }
        }));
        summary
    }
}
