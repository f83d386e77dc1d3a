use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use roster_core::{
    build_tree, parse_date, rank_for_reduction, scenario_pool, scope_finance, search_forest,
    sunsetting_positions, table_view, terms_ending_within, visible_rows, BurnStatus,
    EquityProfile, EquityTargets, FilterCriteria, FinanceOverview, FinanceRecord,
    OccupancyStatus, OrgDirectory, OrgUnit, Position, PriorityTier, RecordStore, Rollup,
    RosterError, RosterSummary, ScenarioParameters, SortDirection, SortKey, TableQuery,
    TableTotals, Tally, TenureType, UnitRef, UnitScope, ViewState, DEFAULT_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const API_CONTRACT_VERSION: &str = "api.v1";

/// Window used by the summary report's term listing, matching the planning view.
pub const DEFAULT_TERM_WINDOW_DAYS: u32 = 365;
pub const DEFAULT_LISTING_LIMIT: usize = 30;

/// On-disk roster export.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterSnapshot {
    pub positions: Vec<Position>,
    #[serde(default, alias = "orgUnits")]
    pub org_units: Vec<OrgUnit>,
    #[serde(default, alias = "financeData")]
    pub finance: Vec<FinanceRecord>,
}

impl RosterSnapshot {
    /// Decode a roster export without validating it.
    ///
    /// # Errors
    /// Returns [`RosterError::Store`] when `raw` is not a roster export.
    pub fn decode(raw: &str) -> Result<Self, RosterError> {
        serde_json::from_str(raw).map_err(|err| {
            RosterError::Store(format!("roster export MUST be a JSON roster snapshot: {err}"))
        })
    }

    /// Check every position plus identifier uniqueness.
    ///
    /// # Errors
    /// Returns the first [`RosterError::Validation`] found.
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut seen = HashSet::with_capacity(self.positions.len());
        for position in &self.positions {
            position.validate()?;
            if !seen.insert(position.position_id.as_str()) {
                return Err(RosterError::Validation(format!(
                    "{}: positionId MUST be unique",
                    position.position_id
                )));
            }
        }
        Ok(())
    }
}

/// Record store over a JSON roster file, read and validated once at open.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    snapshot: RosterSnapshot,
}

impl JsonRecordStore {
    /// # Errors
    /// Returns an error when the file cannot be read, is not a roster export,
    /// or holds an invalid position.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read roster file {}", path.display()))?;
        let snapshot = RosterSnapshot::decode(&raw)
            .with_context(|| format!("failed to parse roster file {}", path.display()))?;
        snapshot
            .validate()
            .with_context(|| format!("invalid roster file {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            positions = snapshot.positions.len(),
            org_units = snapshot.org_units.len(),
            finance = snapshot.finance.len(),
            "opened roster file"
        );
        Ok(Self { snapshot })
    }
}

impl RecordStore for JsonRecordStore {
    fn positions(&self) -> Result<Vec<Position>, RosterError> {
        Ok(self.snapshot.positions.clone())
    }

    fn org_units(&self) -> Result<Vec<OrgUnit>, RosterError> {
        Ok(self.snapshot.org_units.clone())
    }

    fn finance(&self) -> Result<Vec<FinanceRecord>, RosterError> {
        Ok(self.snapshot.finance.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    positions: Vec<Position>,
    org_units: Vec<OrgUnit>,
    finance: Vec<FinanceRecord>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new(positions: Vec<Position>, org_units: Vec<OrgUnit>) -> Self {
        Self { positions, org_units, finance: Vec::new() }
    }

    #[must_use]
    pub fn with_finance(mut self, finance: Vec<FinanceRecord>) -> Self {
        self.finance = finance;
        self
    }
}

impl RecordStore for InMemoryRecordStore {
    fn positions(&self) -> Result<Vec<Position>, RosterError> {
        Ok(self.positions.clone())
    }

    fn org_units(&self) -> Result<Vec<OrgUnit>, RosterError> {
        Ok(self.org_units.clone())
    }

    fn finance(&self) -> Result<Vec<FinanceRecord>, RosterError> {
        Ok(self.finance.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeRequest {
    #[serde(default)]
    pub units: UnitScope,
    pub query: Option<String>,
    /// Collapse every node that has children before applying `toggled`.
    #[serde(default)]
    pub collapse_all: bool,
    #[serde(default)]
    pub toggled: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub position_id: String,
    pub position_title: String,
    pub classification: String,
    pub occupancy_status: OccupancyStatus,
    pub incumbent_name: Option<String>,
    pub directorate_name: Option<String>,
    pub has_children: bool,
    pub collapsed: bool,
    pub selected: bool,
    pub rollup: Rollup,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedNode {
    pub position_id: String,
    /// Nearest manager first.
    pub ancestors: Vec<String>,
    pub rollup: Option<Rollup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeReport {
    pub snapshot_id: String,
    pub query: Option<String>,
    pub root_count: usize,
    pub position_count: usize,
    pub direct_matches: usize,
    pub cycle_breaks: Vec<String>,
    pub total: Rollup,
    pub rows: Vec<TreeRow>,
    pub selected: Option<SelectedNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableRequest {
    #[serde(default)]
    pub criteria: FilterCriteria,
    pub sort_key: String,
    #[serde(default)]
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableRequest {
    fn default() -> Self {
        Self {
            criteria: FilterCriteria::default(),
            sort_key: SortKey::PositionId.as_str().to_string(),
            direction: SortDirection::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableReport {
    pub snapshot_id: String,
    pub sort_key: SortKey,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
    pub totals: TableTotals,
    pub rows: Vec<Position>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioRequest {
    #[serde(default)]
    pub criteria: FilterCriteria,
    pub reduction_pct: u8,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AffectedPosition {
    pub position_id: String,
    pub position_title: String,
    pub classification: String,
    pub branch_code: String,
    pub branch_name: Option<String>,
    pub tenure_type: Option<TenureType>,
    pub tier: PriorityTier,
    pub salary: Option<u64>,
    pub is_critical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioReport {
    pub snapshot_id: String,
    pub reduction_pct: u8,
    pub branch: Option<String>,
    pub pool_size: usize,
    pub affected: Vec<AffectedPosition>,
    pub salary_savings: u64,
    pub critical_impacted: usize,
    pub indeterminate_impacted: usize,
    pub by_branch: Vec<Tally>,
    pub by_classification: Vec<Tally>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryRequest {
    #[serde(default)]
    pub units: UnitScope,
    /// `YYYY-MM-DD`; today (UTC) when absent.
    pub reference_date: Option<String>,
    pub term_window_days: u32,
    pub limit: usize,
}

impl Default for SummaryRequest {
    fn default() -> Self {
        Self {
            units: UnitScope::default(),
            reference_date: None,
            term_window_days: DEFAULT_TERM_WINDOW_DAYS,
            limit: DEFAULT_LISTING_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatedPosition {
    pub position_id: String,
    pub position_title: String,
    pub branch_code: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryReport {
    pub snapshot_id: String,
    pub reference_date: String,
    pub summary: RosterSummary,
    pub terms_ending: Vec<DatedPosition>,
    pub sunsetting: Vec<DatedPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectorateEntry {
    pub code: String,
    pub name: String,
    pub divisions: Vec<UnitRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchEntry {
    pub code: String,
    pub name: String,
    pub directorates: Vec<DirectorateEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinanceRequest {
    #[serde(default)]
    pub units: UnitScope,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinanceReport {
    pub snapshot_id: String,
    pub finance_lines: usize,
    pub burn_status: BurnStatus,
    #[serde(flatten)]
    pub overview: FinanceOverview,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EquityRequest {
    #[serde(default)]
    pub units: UnitScope,
    /// Availability targets; the published defaults when absent.
    pub targets: Option<EquityTargets>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquityReport {
    pub snapshot_id: String,
    pub targets: EquityTargets,
    #[serde(flatten)]
    pub profile: EquityProfile,
}

/// Roster analytics over one [`RecordStore`].
#[derive(Debug, Clone)]
pub struct RosterApi<S> {
    store: S,
}

impl<S: RecordStore> RosterApi<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn scoped_positions(&self, units: &UnitScope) -> Result<Vec<Position>> {
        let positions = self.store.positions()?;
        if units.is_unrestricted() {
            return Ok(positions);
        }
        Ok(positions.into_iter().filter(|position| units.matches(position)).collect())
    }

    /// Build the reporting hierarchy for a unit scope, prune it by the search
    /// query, and flatten it under the requested view state.
    ///
    /// # Errors
    /// Returns an error when the record store cannot supply positions.
    pub fn tree_report(&self, input: TreeRequest) -> Result<TreeReport> {
        let positions = self.scoped_positions(&input.units)?;
        let units = self.store.org_units()?;
        let directory = OrgDirectory::new(&units);
        let forest = build_tree(&positions);
        let query = input.query.as_deref().unwrap_or_default();
        let result = search_forest(&forest.roots, query);

        let mut state = ViewState::new();
        if input.collapse_all {
            state.collapse_all(roster_core::collapsible_ids(&result.roots));
        }
        for id in &input.toggled {
            state.toggle(id);
        }
        state.select(input.selected.as_deref());

        let rows = visible_rows(&result.roots, &state)
            .into_iter()
            .filter_map(|row| {
                let position = forest.position(row.id)?;
                Some(TreeRow {
                    depth: row.depth,
                    position_id: position.position_id.clone(),
                    position_title: position.position_title.clone(),
                    classification: position.classification.clone(),
                    occupancy_status: position.occupancy_status,
                    incumbent_name: position.incumbent_name.clone(),
                    directorate_name: directory
                        .directorate_name(&position.directorate_code)
                        .map(str::to_string),
                    has_children: row.has_children,
                    collapsed: row.collapsed,
                    selected: row.selected,
                    rollup: result.rollups.get(row.id).unwrap_or_default(),
                })
            })
            .collect::<Vec<_>>();

        let selected = state.selected().map(|id| SelectedNode {
            position_id: id.to_string(),
            ancestors: forest.ancestors(id).into_iter().map(str::to_string).collect(),
            rollup: roster_core::selected_rollup(&state, &result.rollups),
        });

        let snapshot_id = compute_snapshot_id(
            &positions,
            &[
                "report=tree".to_string(),
                scope_part(&input.units),
                format!("query={query}"),
                format!("collapse_all={}", input.collapse_all),
                format!("toggled={}", input.toggled.join(",")),
                format!("selected={}", input.selected.as_deref().unwrap_or_default()),
            ],
        )?;

        Ok(TreeReport {
            snapshot_id,
            query: input.query,
            root_count: result.roots.len(),
            position_count: result.rollups.total().total_positions,
            direct_matches: result.direct_matches,
            cycle_breaks: forest.cycle_breaks().iter().map(|id| (*id).to_string()).collect(),
            total: result.rollups.total(),
            rows,
            selected,
        })
    }

    /// One sorted page of the filtered roster.
    ///
    /// # Errors
    /// Returns an error for an unknown sort key or when the record store fails.
    pub fn table_report(&self, input: TableRequest) -> Result<TableReport> {
        let sort_key = SortKey::parse(&input.sort_key)?;
        let positions = self.store.positions()?;
        let query = TableQuery {
            criteria: input.criteria,
            sort_key,
            direction: input.direction,
            page: input.page,
            page_size: input.page_size,
        };
        let page = table_view(&positions, &query);

        let snapshot_id = compute_snapshot_id(
            &positions,
            &[
                "report=table".to_string(),
                criteria_part(&query.criteria)?,
                format!("sort={}:{}", sort_key.as_str(), query.direction.as_str()),
                format!("page={}:{}", page.page, page.page_size),
            ],
        )?;

        Ok(TableReport {
            snapshot_id,
            sort_key,
            direction: query.direction,
            page: page.page,
            page_size: page.page_size,
            total_count: page.total_count,
            total_pages: page.total_pages,
            totals: page.totals,
            rows: page.rows.into_iter().cloned().collect(),
        })
    }

    /// Rank the occupied pool and report who a reduction would affect.
    ///
    /// # Errors
    /// Returns an error when `reduction_pct` is outside 1..=100 or the record
    /// store fails.
    pub fn scenario_report(&self, input: ScenarioRequest) -> Result<ScenarioReport> {
        let parameters = ScenarioParameters::new(input.reduction_pct, input.branch.as_deref())?;
        let positions = self.store.positions()?;
        let units = self.store.org_units()?;
        let directory = OrgDirectory::new(&units);
        let pool = scenario_pool(&positions, &input.criteria, &parameters);
        let outcome = rank_for_reduction(&pool, parameters.reduction_pct());

        let snapshot_id = compute_snapshot_id(
            &positions,
            &[
                "report=scenario".to_string(),
                criteria_part(&input.criteria)?,
                format!("reduction_pct={}", parameters.reduction_pct()),
                format!("branch={}", parameters.branch().unwrap_or_default()),
            ],
        )?;

        Ok(ScenarioReport {
            snapshot_id,
            reduction_pct: parameters.reduction_pct(),
            branch: parameters.branch().map(str::to_string),
            pool_size: outcome.pool_size,
            affected: outcome
                .affected
                .iter()
                .map(|position| AffectedPosition {
                    position_id: position.position_id.clone(),
                    position_title: position.position_title.clone(),
                    classification: position.classification.clone(),
                    branch_code: position.branch_code.clone(),
                    branch_name: directory.branch_name(&position.branch_code).map(str::to_string),
                    tenure_type: position.tenure_type,
                    tier: roster_core::priority_tier(position),
                    salary: position.salary,
                    is_critical: position.is_critical,
                })
                .collect(),
            salary_savings: outcome.salary_savings,
            critical_impacted: outcome.critical_impacted,
            indeterminate_impacted: outcome.indeterminate_impacted,
            by_branch: outcome.by_branch,
            by_classification: outcome.by_classification,
        })
    }

    /// Headline figures plus the upcoming term-end and sunset listings.
    ///
    /// # Errors
    /// Returns an error when `reference_date` is not a valid `YYYY-MM-DD` date
    /// or the record store fails.
    pub fn summary_report(&self, input: SummaryRequest) -> Result<SummaryReport> {
        let reference = match input.reference_date.as_deref() {
            Some(text) => parse_date(text)
                .ok_or_else(|| anyhow!("reference_date must be YYYY-MM-DD, got `{text}`"))?,
            None => OffsetDateTime::now_utc().date(),
        };
        let positions = self.scoped_positions(&input.units)?;
        let reference_date = format_date(reference)?;

        let snapshot_id = compute_snapshot_id(
            &positions,
            &[
                "report=summary".to_string(),
                scope_part(&input.units),
                format!("reference_date={reference_date}"),
                format!("term_window_days={}", input.term_window_days),
                format!("limit={}", input.limit),
            ],
        )?;

        Ok(SummaryReport {
            snapshot_id,
            reference_date,
            summary: RosterSummary::compute(&positions, reference),
            terms_ending: terms_ending_within(
                &positions,
                input.term_window_days,
                reference,
                input.limit,
            )
            .into_iter()
            .map(|position| dated(position, position.end_date.as_deref()))
            .collect(),
            sunsetting: sunsetting_positions(&positions, input.limit)
                .into_iter()
                .map(|position| dated(position, position.funding_sunset_date.as_deref()))
                .collect(),
        })
    }

    /// Budget totals, burn rate, vote and directorate breakdowns, and the
    /// fund-centre salary reconciliation for a unit scope.
    ///
    /// # Errors
    /// Returns an error when the record store fails.
    pub fn finance_report(&self, input: FinanceRequest) -> Result<FinanceReport> {
        let positions = self.scoped_positions(&input.units)?;
        let units = self.store.org_units()?;
        let records = self.store.finance()?;
        let lines = scope_finance(&records, &input.units, &OrgDirectory::new(&units));
        let overview = FinanceOverview::compute(&lines, &positions);

        let mut parts = vec!["report=finance".to_string(), scope_part(&input.units)];
        for line in &lines {
            let encoded =
                serde_json::to_string(line).context("failed to encode finance line")?;
            parts.push(format!("finance={encoded}"));
        }
        let snapshot_id = compute_snapshot_id(&positions, &parts)?;

        Ok(FinanceReport {
            snapshot_id,
            finance_lines: lines.len(),
            burn_status: overview.totals.burn_status(),
            overview,
        })
    }

    /// Employment equity representation over occupied positions in a unit scope.
    ///
    /// # Errors
    /// Returns an error when the record store fails.
    pub fn equity_report(&self, input: EquityRequest) -> Result<EquityReport> {
        let positions = self.scoped_positions(&input.units)?;
        let targets = input.targets.unwrap_or_default();
        let profile = EquityProfile::compute(&positions, &targets);

        let snapshot_id = compute_snapshot_id(
            &positions,
            &[
                "report=equity".to_string(),
                scope_part(&input.units),
                format!(
                    "targets={}/{}/{}/{}",
                    targets.women, targets.visible_minority, targets.indigenous, targets.disability
                ),
            ],
        )?;

        Ok(EquityReport { snapshot_id, targets, profile })
    }

    /// The branch → directorate → division cascade with display names.
    ///
    /// # Errors
    /// Returns an error when the record store cannot supply org units.
    pub fn org_units(&self) -> Result<Vec<BranchEntry>> {
        let units = self.store.org_units()?;
        let directory = OrgDirectory::new(&units);
        Ok(directory
            .branches()
            .into_iter()
            .map(|branch| {
                let directorates = directory
                    .directorates_for_branch(Some(branch.code.as_str()))
                    .into_iter()
                    .map(|directorate| {
                        let divisions = directory.divisions_for_directorate(
                            Some(branch.code.as_str()),
                            Some(directorate.code.as_str()),
                        );
                        DirectorateEntry {
                            code: directorate.code,
                            name: directorate.name,
                            divisions,
                        }
                    })
                    .collect();
                BranchEntry { code: branch.code, name: branch.name, directorates }
            })
            .collect())
    }
}

fn dated(position: &Position, date: Option<&str>) -> DatedPosition {
    DatedPosition {
        position_id: position.position_id.clone(),
        position_title: position.position_title.clone(),
        branch_code: position.branch_code.clone(),
        date: date.map(str::to_string),
    }
}

fn format_date(date: Date) -> Result<String> {
    date.format(format_description!("[year]-[month]-[day]"))
        .context("failed to format reference date")
}

fn scope_part(units: &UnitScope) -> String {
    format!(
        "units={}/{}/{}",
        units.branch.as_deref().unwrap_or_default(),
        units.directorate.as_deref().unwrap_or_default(),
        units.division.as_deref().unwrap_or_default()
    )
}

fn criteria_part(criteria: &FilterCriteria) -> Result<String> {
    let encoded = serde_json::to_string(criteria).context("failed to encode filter criteria")?;
    Ok(format!("criteria={encoded}"))
}

/// Deterministic report id over the roster contents and request parameters.
///
/// Positions are hashed in identifier order, so the id follows any change to
/// a record but not the order the store returned them in.
///
/// # Errors
/// Returns an error when a position cannot be encoded.
pub fn compute_snapshot_id(positions: &[Position], parts: &[String]) -> Result<String> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0_u8]);
    }

    let mut sorted = positions.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| left.position_id.cmp(&right.position_id));
    for position in sorted {
        let encoded = serde_json::to_vec(position)
            .with_context(|| format!("failed to encode position {}", position.position_id))?;
        hasher.update(&encoded);
        hasher.update([0_u8]);
    }

    let digest_hex = hex::encode(hasher.finalize());
    Ok(format!("snap_{}", &digest_hex[..16]))
}
