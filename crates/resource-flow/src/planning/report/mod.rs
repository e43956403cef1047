mod export;
mod insights;
mod summary;
pub mod views;

pub use export::{write_breakdown_csv, ExportError};
pub use summary::{build_dashboard, DashboardRequest, ResourceReport};

pub(crate) use insights::{generate_observations, upcoming_key_dates};

/// Number of upcoming key dates shown on the dashboard.
pub const KEY_DATE_LIMIT: usize = 10;
