use crate::report::{
    run_dashboard, run_import, run_init, run_report, DashboardArgs, ImportArgs, InitArgs,
    ReportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use resource_flow::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Resource Flow",
    about = "Plan people against project demand and review monthly fulfillment",
    version
)]
struct Cli {
    /// SQLite database path (overrides RESOURCE_FLOW_DB; `:memory:` for a scratch database)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Create or migrate the database, optionally loading sample data
    Init(InitArgs),
    /// Load records from a CSV export
    Import(ImportArgs),
    /// Print the demand fulfillment breakdown as a table or CSV
    Report(ReportArgs),
    /// Print the planning dashboard summary
    Dashboard(DashboardArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let database = cli.database;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args, database).await,
        Command::Init(args) => run_init(args, database),
        Command::Import(args) => run_import(args, database),
        Command::Report(args) => run_report(args, database),
        Command::Dashboard(args) => run_dashboard(args, database),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_flow::planning::{ImportKind, PeriodGranularity};

    #[test]
    fn report_arguments_parse() {
        let cli = Cli::try_parse_from([
            "resource-flow-api",
            "--database",
            ":memory:",
            "report",
            "--from",
            "2024-01-01",
            "--to",
            "2024-06-30",
            "--granularity",
            "quarterly",
            "--format",
            "csv",
        ])
        .expect("arguments parse");

        assert_eq!(cli.database, Some(PathBuf::from(":memory:")));
        match cli.command {
            Some(Command::Report(args)) => {
                assert_eq!(args.granularity, Some(PeriodGranularity::Quarterly));
                assert_eq!(
                    args.from,
                    Some(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"))
                );
            }
            other => panic!("expected report command, got {other:?}"),
        }
    }

    #[test]
    fn import_requires_known_kind() {
        let cli = Cli::try_parse_from(["resource-flow-api", "import", "demands", "demand.csv"])
            .expect("arguments parse");
        match cli.command {
            Some(Command::Import(args)) => {
                assert_eq!(args.kind, ImportKind::Demands);
                assert_eq!(args.file, PathBuf::from("demand.csv"));
            }
            other => panic!("expected import command, got {other:?}"),
        }

        assert!(Cli::try_parse_from(["resource-flow-api", "import", "skills", "x.csv"]).is_err());
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["resource-flow-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
