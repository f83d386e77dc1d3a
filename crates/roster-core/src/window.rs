use time::macros::format_description;
use time::{Date, Duration};

use crate::model::{FundingSource, Position};

/// Parse a `YYYY-MM-DD` roster date. Out-of-range calendar dates are `None`.
#[must_use]
pub fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// True when `date_text` is a valid date in `[reference, reference + days]`.
#[must_use]
pub fn ends_within_days(date_text: Option<&str>, days: u32, reference: Date) -> bool {
    let Some(date) = date_text.and_then(parse_date) else {
        return false;
    };
    let Some(horizon) = reference.checked_add(Duration::days(i64::from(days))) else {
        return date >= reference;
    };
    date >= reference && date <= horizon
}

/// Positions whose end date falls in the window, soonest first, capped at
/// `limit`.
#[must_use]
pub fn terms_ending_within(
    positions: &[Position],
    days: u32,
    reference: Date,
    limit: usize,
) -> Vec<&Position> {
    let mut ending = positions
        .iter()
        .filter(|position| ends_within_days(position.end_date.as_deref(), days, reference))
        .collect::<Vec<_>>();
    ending.sort_by_key(|position| position.end_date.as_deref().and_then(parse_date));
    ending.truncate(limit);
    ending
}

/// Sunset-funded positions ordered by sunset date, capped at `limit`.
///
/// A missing sunset date sorts first.
#[must_use]
pub fn sunsetting_positions(positions: &[Position], limit: usize) -> Vec<&Position> {
    let mut sunsetting = positions
        .iter()
        .filter(|position| position.funding_source == FundingSource::Sunset)
        .collect::<Vec<_>>();
    sunsetting.sort_by(|left, right| {
        left.funding_sunset_date
            .as_deref()
            .unwrap_or_default()
            .cmp(right.funding_sunset_date.as_deref().unwrap_or_default())
    });
    sunsetting.truncate(limit);
    sunsetting
}
