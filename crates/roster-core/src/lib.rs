//! Workforce roster analytics: reporting hierarchy, subtree rollups, search,
//! tabular paging, and reduction scenarios over an immutable position roster.

mod collate;
pub mod criteria;
pub mod equity;
pub mod finance;
pub mod model;
pub mod org;
pub mod rollup;
pub mod scenario;
pub mod search;
pub mod summary;
pub mod table;
pub mod tree;
pub mod view_state;
pub mod window;

#[cfg(test)]
mod fixtures;

pub use criteria::{FilterCriteria, TextQuery};
pub use equity::{
    EquityCounts, EquityGroup, EquityProfile, EquityRates, EquityTargets, UNDISCLOSED_GENDER,
};
pub use finance::{
    by_vote_type, reconcile_fund_centres, scope_finance, top_directorates, BurnStatus,
    DirectorateBudget, FinanceOverview, FinanceRecord, FinanceTotals, FundCentreReconciliation,
    VoteBreakdown, VoteType, ALIGNMENT_TOLERANCE_PCT, TOP_DIRECTORATES,
};
pub use model::{FundingSource, Location, OccupancyStatus, Position, TenureType};
pub use org::{OrgDirectory, OrgUnit, UnitRef, UnitScope};
pub use rollup::{compute_rollups, rollup_forest, Rollup, RollupIndex};
pub use scenario::{
    priority_tier, rank_for_reduction, reduction_count, scenario_pool, PriorityTier,
    ScenarioOutcome, ScenarioParameters,
};
pub use search::{filter_forest, filter_tree, search_forest, SearchResult};
pub use summary::{tally, RosterSummary, Tally, TERMS_ENDING_HORIZON_DAYS};
pub use table::{
    compare_positions, table_view, SortDirection, SortKey, TablePage, TableQuery, TableState,
    TableTotals, DEFAULT_PAGE_SIZE,
};
pub use tree::{build_tree, forest_preorder, Forest, TreeNode};
pub use view_state::{collapsible_ids, selected_rollup, visible_rows, ViewState, VisibleRow};
pub use window::{ends_within_days, parse_date, sunsetting_positions, terms_ending_within};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum RosterError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid sort key: {0}")]
    InvalidSortKey(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("record store error: {0}")]
    Store(String),
}

/// Source of roster snapshots.
///
/// Each call returns a snapshot that stays fixed for the computation it feeds.
pub trait RecordStore {
    /// The full roster.
    ///
    /// # Errors
    /// Returns [`RosterError::Store`] on read or decode failures and
    /// [`RosterError::Validation`] for malformed records.
    fn positions(&self) -> Result<Vec<Position>, RosterError>;

    /// Org-unit lookup rows, used for display names and unit cascades.
    ///
    /// # Errors
    /// Returns [`RosterError::Store`] on read or decode failures.
    fn org_units(&self) -> Result<Vec<OrgUnit>, RosterError>;

    /// Fiscal-year finance lines keyed by directorate and fund centre.
    ///
    /// # Errors
    /// Returns [`RosterError::Store`] on read or decode failures.
    fn finance(&self) -> Result<Vec<FinanceRecord>, RosterError>;
}
