use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use resource_flow::config::AppConfig;
use resource_flow::error::AppError;
use resource_flow::planning::{ImportKind, PeriodGranularity, PlanningService};
use resource_flow::store::SqliteStore;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type SqlitePlanningService = PlanningService<SqliteStore>;

/// Loads configuration, applying a `--database` override when one was given.
pub(crate) fn load_config(database: Option<PathBuf>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(database) = database {
        config.storage.database = database;
    }
    Ok(config)
}

/// Opens the configured database and wraps it in a planning service.
pub(crate) fn open_service(config: &AppConfig) -> Result<Arc<SqlitePlanningService>, AppError> {
    let store = SqliteStore::open(&config.storage.database)?;
    tracing::info!(
        database = %config.storage.database.display(),
        proration = config.planning.proration.as_str(),
        unlinked = config.planning.unlinked.as_str(),
        "planning store opened"
    );
    Ok(Arc::new(PlanningService::new(
        Arc::new(store),
        config.planning,
    )))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_granularity(raw: &str) -> Result<PeriodGranularity, String> {
    PeriodGranularity::parse(raw)
        .ok_or_else(|| format!("unknown granularity '{raw}' (monthly, quarterly, annual)"))
}

pub(crate) fn parse_import_kind(raw: &str) -> Result<ImportKind, String> {
    ImportKind::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ImportKind::ordered()
            .into_iter()
            .map(ImportKind::as_str)
            .collect();
        format!("unknown import kind '{raw}' ({})", known.join(", "))
    })
}
