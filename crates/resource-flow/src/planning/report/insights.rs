use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::super::domain::PlanningSnapshot;
use super::super::fulfillment::GapBand;
use super::views::{DashboardReport, KeyDateKind, KeyDateView};

pub(crate) fn upcoming_key_dates(
    snapshot: &PlanningSnapshot,
    as_of: NaiveDate,
    limit: usize,
) -> Vec<KeyDateView> {
    let project_names: HashMap<_, _> = snapshot
        .projects
        .iter()
        .map(|project| (project.id, project.name.as_str()))
        .collect();

    let mut events: Vec<(NaiveDate, KeyDateKind, String)> = Vec::new();
    for project in &snapshot.projects {
        events.push((project.start_date, KeyDateKind::ProjectStart, project.name.clone()));
        if let Some(end) = project.end_date {
            events.push((end, KeyDateKind::ProjectEnd, project.name.clone()));
        }
    }

    for demand in &snapshot.demands {
        let role = demand.role_required.as_deref().unwrap_or("Unspecified role");
        let project = project_names
            .get(&demand.project_id)
            .copied()
            .unwrap_or("unknown project");
        let subject = format!("{role} for {project}");
        events.push((demand.start_date, KeyDateKind::DemandStart, subject.clone()));
        events.push((demand.end_date, KeyDateKind::DemandEnd, subject));
    }

    events.retain(|(date, _, _)| *date >= as_of);
    events.sort();

    events
        .into_iter()
        .take(limit)
        .map(|(date, kind, subject)| KeyDateView {
            date,
            days_until: (date - as_of).num_days(),
            kind,
            kind_label: kind.label(),
            event: format!("{}: {}", kind.label(), subject),
        })
        .collect()
}

pub(crate) fn generate_observations(report: &DashboardReport) -> Vec<String> {
    let mut observations = Vec::new();

    let critical: Vec<&str> = report
        .resource_trend
        .iter()
        .filter(|entry| entry.gap_band == GapBand::Critical)
        .map(|entry| entry.period_label.as_str())
        .collect();
    if !critical.is_empty() {
        observations.push(format!(
            "Critical staffing gap in {}",
            critical.join(", ")
        ));
    }

    if let Some(worst) = report
        .resource_trend
        .iter()
        .filter(|entry| entry.gap_fte < Decimal::ZERO)
        .min_by_key(|entry| entry.gap_fte)
    {
        observations.push(format!(
            "Largest shortfall is {} FTE in {}",
            -worst.gap_fte,
            worst.period_label
        ));
    }

    for team in &report.team_utilization {
        if team.allocation_fte > team.capacity_fte {
            observations.push(format!(
                "{} is allocated {} FTE against {} FTE of capacity",
                team.team_name, team.allocation_fte, team.capacity_fte
            ));
        }
    }

    let uncovered: Vec<&str> = report
        .skills
        .iter()
        .filter(|skill| skill.people == 0 && skill.demand_fte > Decimal::ZERO)
        .take(5)
        .map(|skill| skill.skill.as_str())
        .collect();
    if !uncovered.is_empty() {
        observations.push(format!(
            "No active people list {}",
            uncovered.join(", ")
        ));
    }

    observations
}
