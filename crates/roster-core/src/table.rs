use std::borrow::Cow;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::collate;
use crate::criteria::FilterCriteria;
use crate::model::Position;
use crate::summary::{tally, Tally};
use crate::RosterError;

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Sortable columns of the position table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    PositionId,
    PositionTitle,
    ClassificationGroup,
    ClassificationLevel,
    Classification,
    OccupancyStatus,
    IncumbentName,
    IncumbentId,
    TenureType,
    StartDate,
    EndDate,
    LanguageProfile,
    #[serde(rename = "location.city")]
    LocationCity,
    BranchCode,
    DirectorateCode,
    DivisionCode,
    FundCentreCode,
    ReportingToPositionId,
    FundingSource,
    FundingSunsetDate,
    Salary,
    IsCritical,
    IsDoublebanked,
}

impl SortKey {
    pub const ALL: [Self; 23] = [
        Self::PositionId,
        Self::PositionTitle,
        Self::ClassificationGroup,
        Self::ClassificationLevel,
        Self::Classification,
        Self::OccupancyStatus,
        Self::IncumbentName,
        Self::IncumbentId,
        Self::TenureType,
        Self::StartDate,
        Self::EndDate,
        Self::LanguageProfile,
        Self::LocationCity,
        Self::BranchCode,
        Self::DirectorateCode,
        Self::DivisionCode,
        Self::FundCentreCode,
        Self::ReportingToPositionId,
        Self::FundingSource,
        Self::FundingSunsetDate,
        Self::Salary,
        Self::IsCritical,
        Self::IsDoublebanked,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PositionId => "positionId",
            Self::PositionTitle => "positionTitle",
            Self::ClassificationGroup => "classificationGroup",
            Self::ClassificationLevel => "classificationLevel",
            Self::Classification => "classification",
            Self::OccupancyStatus => "occupancyStatus",
            Self::IncumbentName => "incumbentName",
            Self::IncumbentId => "incumbentId",
            Self::TenureType => "tenureType",
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::LanguageProfile => "languageProfile",
            Self::LocationCity => "location.city",
            Self::BranchCode => "branchCode",
            Self::DirectorateCode => "directorateCode",
            Self::DivisionCode => "divisionCode",
            Self::FundCentreCode => "fundCentreCode",
            Self::ReportingToPositionId => "reportingToPositionId",
            Self::FundingSource => "fundingSource",
            Self::FundingSunsetDate => "fundingSunsetDate",
            Self::Salary => "salary",
            Self::IsCritical => "isCritical",
            Self::IsDoublebanked => "isDoublebanked",
        }
    }

    /// Resolve a column name.
    ///
    /// # Errors
    /// Returns [`RosterError::InvalidSortKey`] for names that are not a column.
    pub fn parse(value: &str) -> Result<Self, RosterError> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| RosterError::InvalidSortKey(value.to_string()))
    }

    fn value_of(self, position: &Position) -> SortValue<'_> {
        fn text(value: &str) -> SortValue<'_> {
            SortValue::Text(Cow::Borrowed(value))
        }
        fn optional(value: Option<&str>) -> SortValue<'_> {
            text(value.unwrap_or_default())
        }
        fn flag(value: bool) -> SortValue<'static> {
            SortValue::Text(Cow::Borrowed(if value { "true" } else { "false" }))
        }

        match self {
            Self::PositionId => text(&position.position_id),
            Self::PositionTitle => text(&position.position_title),
            Self::ClassificationGroup => text(&position.classification_group),
            Self::ClassificationLevel => {
                SortValue::Number(u64::from(position.classification_level))
            }
            Self::Classification => text(&position.classification),
            Self::OccupancyStatus => text(position.occupancy_status.as_str()),
            Self::IncumbentName => optional(position.incumbent_name.as_deref()),
            Self::IncumbentId => optional(position.incumbent_id.as_deref()),
            Self::TenureType => optional(position.tenure_type.map(|tenure| tenure.as_str())),
            Self::StartDate => optional(position.start_date.as_deref()),
            Self::EndDate => optional(position.end_date.as_deref()),
            Self::LanguageProfile => text(&position.language_profile),
            Self::LocationCity => text(&position.location.city),
            Self::BranchCode => text(&position.branch_code),
            Self::DirectorateCode => text(&position.directorate_code),
            Self::DivisionCode => text(&position.division_code),
            Self::FundCentreCode => text(&position.fund_centre_code),
            Self::ReportingToPositionId => optional(position.reporting_to_position_id.as_deref()),
            Self::FundingSource => text(position.funding_source.as_str()),
            Self::FundingSunsetDate => optional(position.funding_sunset_date.as_deref()),
            Self::Salary => position.salary.map_or(text(""), SortValue::Number),
            Self::IsCritical => flag(position.is_critical),
            Self::IsDoublebanked => flag(position.is_doublebanked),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

enum SortValue<'p> {
    Number(u64),
    Text(Cow<'p, str>),
}

impl SortValue<'_> {
    fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Number(value) => Cow::Owned(value.to_string()),
            Self::Text(value) => Cow::Borrowed(value.as_ref()),
        }
    }
}

// Numbers compare numerically only against numbers; any other pairing falls
// back to collated text, where an absent value is the empty string.
fn compare_values(left: &SortValue<'_>, right: &SortValue<'_>) -> Ordering {
    match (left, right) {
        (SortValue::Number(left), SortValue::Number(right)) => left.cmp(right),
        _ => collate::compare(&left.text(), &right.text()),
    }
}

/// Order two positions by `key` in `direction`.
#[must_use]
pub fn compare_positions(
    left: &Position,
    right: &Position,
    key: SortKey,
    direction: SortDirection,
) -> Ordering {
    direction.apply(compare_values(&key.value_of(left), &key.value_of(right)))
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct TableQuery {
    pub criteria: FilterCriteria,
    pub sort_key: SortKey,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            criteria: FilterCriteria::default(),
            sort_key: SortKey::PositionId,
            direction: SortDirection::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Aggregates over the whole filtered set, not only the current page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct TableTotals {
    pub occupied: usize,
    pub vacant: usize,
    pub total_salary: u64,
    pub by_classification_group: Vec<Tally>,
    pub by_funding_source: Vec<Tally>,
}

impl TableTotals {
    fn compute(positions: &[&Position]) -> Self {
        let vacant = positions.iter().filter(|position| position.is_vacant()).count();
        Self {
            occupied: positions.len() - vacant,
            vacant,
            total_salary: positions.iter().map(|position| position.salary_or_zero()).sum(),
            by_classification_group: tally(
                positions.iter().map(|position| position.classification_group.as_str()),
            ),
            by_funding_source: tally(
                positions.iter().map(|position| position.funding_source.as_str()),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TablePage<'a> {
    pub rows: Vec<&'a Position>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
    pub totals: TableTotals,
}

/// Filter, sort, and slice one page of the roster.
///
/// Filtering keeps input order and the sort is stable, so equal keys stay in
/// roster order. Page 0 is read as page 1 and a zero page size as the default.
/// A page past the end yields no rows with the usual metadata.
#[must_use]
pub fn table_view<'a>(positions: &'a [Position], query: &TableQuery) -> TablePage<'a> {
    let page = query.page.max(1);
    let page_size = if query.page_size == 0 { DEFAULT_PAGE_SIZE } else { query.page_size };

    let mut rows = query.criteria.apply(positions);
    rows.sort_by(|left, right| compare_positions(left, right, query.sort_key, query.direction));

    let total_count = rows.len();
    let total_pages = total_count.div_ceil(page_size).max(1);
    let totals = TableTotals::compute(&rows);
    let start = (page - 1).saturating_mul(page_size).min(total_count);
    let end = start.saturating_add(page_size).min(total_count);
    let rows = rows[start..end].to_vec();

    tracing::debug!(
        sort_key = query.sort_key.as_str(),
        total_count,
        page,
        rows = rows.len(),
        "table page computed"
    );
    TablePage { rows, page, page_size, total_count, total_pages, totals }
}

/// Interactive table parameters.
///
/// Any change to the filters or the sort key sends the view back to page 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct TableState {
    query: TableQuery,
}

impl TableState {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self { query: TableQuery { page_size, ..TableQuery::default() } }
    }

    #[must_use]
    pub fn query(&self) -> &TableQuery {
        &self.query
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.query.page
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.query.criteria = criteria;
        self.query.page = 1;
    }

    /// Edit the filters in place; the page resets even if nothing changed.
    pub fn update_criteria(&mut self, edit: impl FnOnce(&mut FilterCriteria)) {
        edit(&mut self.query.criteria);
        self.query.page = 1;
    }

    /// Header click: the active key flips direction, a new key sorts ascending.
    pub fn sort_by(&mut self, key: SortKey) {
        if self.query.sort_key == key {
            self.query.direction = self.query.direction.flipped();
        } else {
            self.query.sort_key = key;
            self.query.direction = SortDirection::Asc;
        }
        self.query.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.query.page = page.max(1);
    }

    #[must_use]
    pub fn view<'a>(&self, positions: &'a [Position]) -> TablePage<'a> {
        table_view(positions, &self.query)
    }
}
