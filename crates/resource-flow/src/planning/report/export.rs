use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use super::super::aggregate::MonthlyDemandAllocation;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const BREAKDOWN_HEADERS: [&str; 11] = [
    "period",
    "period_start",
    "period_end",
    "project_id",
    "demand_id",
    "person_id",
    "role_required",
    "fte_demand",
    "fte_allocated",
    "fte_gap",
    "status",
];

/// FTE columns are written as decimal text so trailing zeros survive.
#[derive(Debug, Serialize)]
struct BreakdownCsvRow<'a> {
    period: &'a str,
    period_start: NaiveDate,
    period_end: NaiveDate,
    project_id: i64,
    demand_id: i64,
    person_id: Option<i64>,
    role_required: Option<&'a str>,
    fte_demand: String,
    fte_allocated: String,
    fte_gap: String,
    status: &'static str,
}

/// Writes aggregation rows with a header line, even when `rows` is empty.
pub fn write_breakdown_csv<W: Write>(
    writer: W,
    rows: &[MonthlyDemandAllocation],
) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(BREAKDOWN_HEADERS)?;
    for row in rows {
        csv_writer.serialize(BreakdownCsvRow {
            period: &row.period_label,
            period_start: row.period_start,
            period_end: row.period_end,
            project_id: row.project_id.0,
            demand_id: row.demand_id.0,
            person_id: row.person_id.map(|id| id.0),
            role_required: row.role_required.as_deref(),
            fte_demand: row.fte_demand.to_string(),
            fte_allocated: row.fte_allocated.to_string(),
            fte_gap: row.fte_gap.to_string(),
            status: row.status.as_str(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
