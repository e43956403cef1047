use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::super::domain::{ProjectStatus, TeamId};
use super::super::fulfillment::GapBand;
use super::super::period::PeriodGranularity;

#[derive(Debug, Clone, Serialize)]
pub struct HeadlineMetrics {
    pub total_people: usize,
    pub active_projects: usize,
    pub open_demands: usize,
    pub overall_allocation_pct: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectHealthEntry {
    pub status: ProjectStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamUtilizationEntry {
    pub team_id: TeamId,
    pub team_name: String,
    pub members: usize,
    pub allocation_fte: Decimal,
    pub capacity_fte: Decimal,
    pub available_fte: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceTrendEntry {
    pub period_label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub demand_fte: Decimal,
    pub allocation_fte: Decimal,
    pub capacity_fte: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization_pct: Option<Decimal>,
    pub gap_fte: Decimal,
    pub gap_band: GapBand,
    pub gap_band_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillCoverageEntry {
    pub skill: String,
    pub demand_fte: Decimal,
    pub people: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDateKind {
    ProjectStart,
    ProjectEnd,
    DemandStart,
    DemandEnd,
}

impl KeyDateKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProjectStart => "Project Start",
            Self::ProjectEnd => "Project End",
            Self::DemandStart => "Demand Start",
            Self::DemandEnd => "Demand End",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyDateView {
    pub date: NaiveDate,
    pub days_until: i64,
    pub kind: KeyDateKind,
    pub kind_label: &'static str,
    pub event: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub granularity: PeriodGranularity,
    pub headline: HeadlineMetrics,
    pub project_health: Vec<ProjectHealthEntry>,
    pub team_utilization: Vec<TeamUtilizationEntry>,
    pub resource_trend: Vec<ResourceTrendEntry>,
    pub skills: Vec<SkillCoverageEntry>,
    pub upcoming: Vec<KeyDateView>,
    pub observations: Vec<String>,
}
