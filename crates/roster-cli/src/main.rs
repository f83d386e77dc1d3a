use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use roster_api::{
    EquityRequest, FinanceRequest, JsonRecordStore, RosterApi, ScenarioRequest, SummaryRequest,
    TableRequest, TreeRequest, API_CONTRACT_VERSION, DEFAULT_LISTING_LIMIT,
    DEFAULT_TERM_WINDOW_DAYS,
};
use roster_core::{
    FilterCriteria, FundingSource, OccupancyStatus, SortDirection, UnitScope, DEFAULT_PAGE_SIZE,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "rk")]
#[command(about = "Workforce roster analytics CLI")]
struct Cli {
    /// Roster export with `positions` and `org_units` arrays.
    #[arg(long, global = true, default_value = "./roster.json")]
    roster: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reporting hierarchy with subtree rollups.
    Tree(TreeArgs),
    /// One sorted, filtered page of positions.
    Table(TableArgs),
    /// Reduction scenario ranking.
    Scenario(ScenarioArgs),
    /// Headline figures and upcoming term ends.
    Summary(SummaryArgs),
    /// Budget, burn rate, and fund-centre salary reconciliation.
    Finance(UnitArgs),
    /// Employment equity representation over occupied positions.
    Equity(UnitArgs),
    /// Branch, directorate, and division cascade.
    Units,
}

#[derive(Debug, Clone, Args)]
struct UnitArgs {
    #[arg(long)]
    branch: Option<String>,
    #[arg(long)]
    directorate: Option<String>,
    #[arg(long)]
    division: Option<String>,
}

impl UnitArgs {
    fn into_scope(self) -> UnitScope {
        UnitScope { branch: self.branch, directorate: self.directorate, division: self.division }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OccupancyArg {
    Occupied,
    Acting,
    Vacant,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FundingArg {
    ABase,
    BBase,
    Program,
    Sunset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Args)]
struct FilterArgs {
    #[command(flatten)]
    units: UnitArgs,
    #[arg(long)]
    status: Option<OccupancyArg>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    funding: Option<FundingArg>,
    #[arg(long)]
    search: Option<String>,
}

impl FilterArgs {
    fn into_criteria(self) -> FilterCriteria {
        FilterCriteria {
            units: self.units.into_scope(),
            occupancy_status: self.status.map(to_occupancy),
            classification_group: self.group,
            funding_source: self.funding.map(to_funding),
            text: self.search,
        }
    }
}

#[derive(Debug, Args)]
struct TreeArgs {
    #[command(flatten)]
    units: UnitArgs,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = false)]
    collapse_all: bool,
    /// Toggle a node's collapsed state; repeatable.
    #[arg(long = "toggle")]
    toggled: Vec<String>,
    #[arg(long)]
    select: Option<String>,
}

#[derive(Debug, Args)]
struct TableArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Column name, e.g. `salary` or `location.city`.
    #[arg(long, default_value = "positionId")]
    sort: String,
    #[arg(long, value_enum, default_value_t = DirectionArg::Asc)]
    direction: DirectionArg,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,
}

#[derive(Debug, Args)]
struct ScenarioArgs {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, default_value_t = 5)]
    reduction_pct: u8,
    /// Restrict the pool to one branch after filtering.
    #[arg(long)]
    target_branch: Option<String>,
}

#[derive(Debug, Args)]
struct SummaryArgs {
    #[command(flatten)]
    units: UnitArgs,
    /// Reference date `YYYY-MM-DD`; defaults to today (UTC).
    #[arg(long)]
    as_of: Option<String>,
    #[arg(long, default_value_t = DEFAULT_TERM_WINDOW_DAYS)]
    window_days: u32,
    #[arg(long, default_value_t = DEFAULT_LISTING_LIMIT)]
    limit: usize,
}

fn to_occupancy(value: OccupancyArg) -> OccupancyStatus {
    match value {
        OccupancyArg::Occupied => OccupancyStatus::Occupied,
        OccupancyArg::Acting => OccupancyStatus::OccupiedActing,
        OccupancyArg::Vacant => OccupancyStatus::Vacant,
    }
}

fn to_funding(value: FundingArg) -> FundingSource {
    match value {
        FundingArg::ABase => FundingSource::ABase,
        FundingArg::BBase => FundingSource::BBase,
        FundingArg::Program => FundingSource::Program,
        FundingArg::Sunset => FundingSource::Sunset,
    }
}

fn to_direction(value: DirectionArg) -> SortDirection {
    match value {
        DirectionArg::Asc => SortDirection::Asc,
        DirectionArg::Desc => SortDirection::Desc,
    }
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            object.insert(
                "api_contract_version".to_string(),
                Value::String(API_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "api_contract_version": API_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let api = RosterApi::new(JsonRecordStore::open(&cli.roster)?);
    tracing::debug!(roster = %cli.roster.display(), "roster loaded");

    match cli.command {
        Command::Tree(args) => {
            let report = api.tree_report(TreeRequest {
                units: args.units.into_scope(),
                query: args.search,
                collapse_all: args.collapse_all,
                toggled: args.toggled,
                selected: args.select,
            })?;
            emit_json(serde_json::to_value(report)?)
        }
        Command::Table(args) => {
            let report = api.table_report(TableRequest {
                criteria: args.filter.into_criteria(),
                sort_key: args.sort,
                direction: to_direction(args.direction),
                page: args.page,
                page_size: args.page_size,
            })?;
            emit_json(serde_json::to_value(report)?)
        }
        Command::Scenario(args) => {
            let report = api.scenario_report(ScenarioRequest {
                criteria: args.filter.into_criteria(),
                reduction_pct: args.reduction_pct,
                branch: args.target_branch,
            })?;
            emit_json(serde_json::to_value(report)?)
        }
        Command::Summary(args) => {
            let report = api.summary_report(SummaryRequest {
                units: args.units.into_scope(),
                reference_date: args.as_of,
                term_window_days: args.window_days,
                limit: args.limit,
            })?;
            emit_json(serde_json::to_value(report)?)
        }
        Command::Finance(units) => {
            let report = api.finance_report(FinanceRequest { units: units.into_scope() })?;
            emit_json(serde_json::to_value(report)?)
        }
        Command::Equity(units) => {
            let report =
                api.equity_report(EquityRequest { units: units.into_scope(), targets: None })?;
            emit_json(serde_json::to_value(report)?)
        }
        Command::Units => {
            let branches = api.org_units()?;
            emit_json(serde_json::json!({ "branches": branches }))
        }
    }
}
