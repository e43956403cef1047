use crate::infra::{load_config, open_service, parse_date, parse_granularity, parse_import_kind};
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use resource_flow::error::AppError;
use resource_flow::planning::period::{default_window_end, first_of_month};
use resource_flow::planning::sample::seed;
use resource_flow::planning::{
    write_breakdown_csv, BreakdownQuery, DashboardReport, DashboardRequest, ImportKind,
    MonthlyDemandAllocation, PeopleFilter, PeriodGranularity, PersonBreakdown, PlanningService,
    ProjectId,
};
use resource_flow::store::SqliteStore;
use resource_flow::telemetry;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct InitArgs {
    /// Load the sample teams, people, projects, demand, and allocations
    #[arg(long)]
    pub(crate) seed: bool,
    /// Anchor date for the sample data (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Record kind: teams, people, projects, demands, or allocations
    #[arg(value_parser = parse_import_kind)]
    pub(crate) kind: ImportKind,
    /// CSV file with a header row naming the record fields
    pub(crate) file: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Csv,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// First day of the reporting window (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Last day of the reporting window (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) to: Option<NaiveDate>,
    /// monthly, quarterly, or annual (defaults to RESOURCE_FLOW_GRANULARITY)
    #[arg(long, value_parser = parse_granularity)]
    pub(crate) granularity: Option<PeriodGranularity>,
    /// Only include demand of this project
    #[arg(long)]
    pub(crate) project: Option<i64>,
    /// Emit one row per allocated person instead of one per demand
    #[arg(long)]
    pub(crate) per_person: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DashboardArgs {
    /// First day of the window (defaults to the first of the current month)
    #[arg(long, value_parser = parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Last day of the window (defaults to twelve months after the start)
    #[arg(long, value_parser = parse_date)]
    pub(crate) to: Option<NaiveDate>,
    #[arg(long, value_parser = parse_granularity)]
    pub(crate) granularity: Option<PeriodGranularity>,
    /// Reference date for upcoming key dates (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

pub(crate) fn run_init(args: InitArgs, database: Option<PathBuf>) -> Result<(), AppError> {
    let config = load_config(database)?;
    telemetry::init(&config.telemetry)?;

    let store = Arc::new(SqliteStore::open(&config.storage.database)?);
    let version = store.schema_version()?;
    println!(
        "Database ready at {} (schema version {})",
        config.storage.database.display(),
        version
    );

    if !args.seed {
        return Ok(());
    }

    let service = PlanningService::new(store, config.planning);
    if !service.list_people(&PeopleFilter::default())?.is_empty() {
        println!("Sample data skipped: database already holds people");
        return Ok(());
    }

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let summary = seed(&service, today)?;
    println!(
        "Sample data loaded: {} teams, {} people, {} projects, {} demands, {} allocations",
        summary.teams, summary.people, summary.projects, summary.demands, summary.allocations
    );
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs, database: Option<PathBuf>) -> Result<(), AppError> {
    let config = load_config(database)?;
    telemetry::init(&config.telemetry)?;
    let service = open_service(&config)?;

    let reader = BufReader::new(File::open(&args.file)?);
    let summary = service.import(args.kind, reader)?;
    println!(
        "Imported {} {} from {}",
        summary.created.len(),
        summary.kind.as_str(),
        args.file.display()
    );
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs, database: Option<PathBuf>) -> Result<(), AppError> {
    let config = load_config(database)?;
    telemetry::init(&config.telemetry)?;
    let service = open_service(&config)?;

    let query = BreakdownQuery {
        start: args.from,
        end: args.to,
        project_id: args.project.map(ProjectId),
        granularity: args.granularity,
        breakdown: args.per_person.then_some(PersonBreakdown::PerPerson),
    };
    let rows = service.breakdown(&query)?;

    match args.format {
        OutputFormat::Csv => write_breakdown_csv(std::io::stdout().lock(), &rows)?,
        OutputFormat::Table => render_breakdown_table(&rows),
    }
    Ok(())
}

pub(crate) fn run_dashboard(
    args: DashboardArgs,
    database: Option<PathBuf>,
) -> Result<(), AppError> {
    let config = load_config(database)?;
    telemetry::init(&config.telemetry)?;
    let service = open_service(&config)?;

    let today = Local::now().date_naive();
    let request = dashboard_request(&args, config.planning.granularity, today);
    let report = service.dashboard(&request)?;
    render_dashboard(&report);
    Ok(())
}

fn dashboard_request(
    args: &DashboardArgs,
    default_granularity: PeriodGranularity,
    today: NaiveDate,
) -> DashboardRequest {
    let start = args.from.unwrap_or_else(|| first_of_month(today));
    DashboardRequest {
        start,
        end: args.to.unwrap_or_else(|| default_window_end(start)),
        granularity: args.granularity.unwrap_or(default_granularity),
        as_of: args.as_of.unwrap_or(today),
    }
}

fn render_breakdown_table(rows: &[MonthlyDemandAllocation]) {
    if rows.is_empty() {
        println!("No demand overlaps the requested window");
        return;
    }

    println!(
        "{:<9} {:>7} {:>6} {:>6} {:<26} {:>9} {:>9} {:>9}  {}",
        "Period", "Project", "Demand", "Person", "Role", "Demand", "Allocated", "Gap", "Status"
    );
    for row in rows {
        println!(
            "{:<9} {:>7} {:>6} {:>6} {:<26} {:>9} {:>9} {:>9}  {}",
            row.period_label,
            row.project_id.to_string(),
            row.demand_id.to_string(),
            row.person_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            truncate(row.role_required.as_deref().unwrap_or("-"), 26),
            row.fte_demand.to_string(),
            row.fte_allocated.to_string(),
            row.fte_gap.to_string(),
            row.status.label()
        );
    }

    let demand: Decimal = rows.iter().map(|row| row.fte_demand).sum();
    let allocated: Decimal = rows.iter().map(|row| row.fte_allocated).sum();
    println!(
        "\n{} rows; {} FTE-periods demanded, {} allocated",
        rows.len(),
        demand,
        allocated
    );
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut shortened: String = value.chars().take(width.saturating_sub(1)).collect();
    shortened.push('~');
    shortened
}

fn render_dashboard(report: &DashboardReport) {
    println!(
        "Resource dashboard {} to {} ({})",
        report.range_start,
        report.range_end,
        report.granularity.as_str()
    );
    println!(
        "People: {} | Active projects: {} | Open demand lines: {} | Allocation: {}%",
        report.headline.total_people,
        report.headline.active_projects,
        report.headline.open_demands,
        report.headline.overall_allocation_pct
    );

    println!("\nProject health");
    for entry in &report.project_health {
        println!("- {}: {}", entry.status_label, entry.count);
    }

    println!("\nTeam utilization");
    for team in &report.team_utilization {
        let utilization = team
            .utilization_pct
            .map(|pct| format!("{pct}%"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "- {} ({} members): {} of {} FTE allocated, {}",
            team.team_name, team.members, team.allocation_fte, team.capacity_fte, utilization
        );
    }

    println!("\nResource trend");
    for entry in &report.resource_trend {
        println!(
            "- {}: demand {} | allocated {} | gap {} ({})",
            entry.period_label,
            entry.demand_fte,
            entry.allocation_fte,
            entry.gap_fte,
            entry.gap_band_label
        );
    }

    if !report.upcoming.is_empty() {
        println!("\nUpcoming key dates");
        for date in &report.upcoming {
            println!("- {} (in {} days): {}", date.date, date.days_until, date.event);
        }
    }

    if !report.observations.is_empty() {
        println!("\nObservations");
        for note in &report.observations {
            println!("- {}", note);
        }
    }
}
