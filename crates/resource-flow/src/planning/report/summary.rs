use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::super::domain::{PlanningSnapshot, ProjectStatus, TeamId};
use super::super::fulfillment::GapBand;
use super::super::period::{Period, PeriodGranularity, ProrationPolicy, FTE_SCALE};
use super::views::{
    DashboardReport, HeadlineMetrics, ProjectHealthEntry, ResourceTrendEntry,
    SkillCoverageEntry, TeamUtilizationEntry,
};

/// Window and resolution of a dashboard. `as_of` anchors the upcoming key dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DashboardRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub granularity: PeriodGranularity,
    pub as_of: NaiveDate,
}

#[derive(Debug, Default, Clone)]
pub struct TeamLoad {
    pub name: String,
    pub members: usize,
    pub allocation: Decimal,
    pub capacity: Decimal,
}

#[derive(Debug, Default, Clone)]
pub struct PeriodLoad {
    pub demand: Decimal,
    pub allocation: Decimal,
}

#[derive(Debug, Default, Clone)]
pub struct SkillLoad {
    pub demand: Decimal,
    pub people: usize,
}

/// Intermediate tallies; [`ResourceReport::summary`] orders and rounds them for display.
#[derive(Debug, Default)]
pub struct ResourceReport {
    pub total_people: usize,
    pub active_projects: usize,
    pub open_demands: usize,
    pub project_health: HashMap<ProjectStatus, usize>,
    pub team_load: BTreeMap<TeamId, TeamLoad>,
    pub period_load: Vec<(Period, PeriodLoad)>,
    pub capacity: Decimal,
    pub skill_load: BTreeMap<String, SkillLoad>,
}

impl ResourceReport {
    pub fn collect(
        snapshot: &PlanningSnapshot,
        request: &DashboardRequest,
        proration: ProrationPolicy,
    ) -> Self {
        let mut report = Self {
            total_people: snapshot.people.len(),
            active_projects: snapshot
                .projects
                .iter()
                .filter(|project| project.status.is_live())
                .count(),
            open_demands: snapshot
                .demands
                .iter()
                .filter(|demand| demand.status.is_open())
                .count(),
            capacity: snapshot
                .people
                .iter()
                .filter(|person| person.active)
                .map(|person| person.capacity)
                .sum(),
            ..Self::default()
        };

        for project in &snapshot.projects {
            *report.project_health.entry(project.status).or_insert(0) += 1;
        }

        report.collect_team_load(snapshot, request);
        report.collect_period_load(snapshot, request, proration);
        report.collect_skill_load(snapshot, request);
        report
    }

    fn collect_team_load(&mut self, snapshot: &PlanningSnapshot, request: &DashboardRequest) {
        for team in &snapshot.teams {
            self.team_load.insert(
                team.id,
                TeamLoad {
                    name: team.name.clone(),
                    ..TeamLoad::default()
                },
            );
        }

        let mut membership = HashMap::new();
        for person in &snapshot.people {
            let Some(team_id) = person.team_id else {
                continue;
            };
            let Some(load) = self.team_load.get_mut(&team_id) else {
                continue;
            };
            membership.insert(person.id, team_id);
            if person.active {
                load.members += 1;
                load.capacity += person.capacity;
            }
        }

        for allocation in &snapshot.allocations {
            if allocation.start_date > request.end || allocation.end_date < request.start {
                continue;
            }
            if let Some(load) = membership
                .get(&allocation.person_id)
                .and_then(|team_id| self.team_load.get_mut(team_id))
            {
                load.allocation += allocation.fte_allocated;
            }
        }
    }

    fn collect_period_load(
        &mut self,
        snapshot: &PlanningSnapshot,
        request: &DashboardRequest,
        proration: ProrationPolicy,
    ) {
        for period in Period::covering(request.granularity, request.start, request.end) {
            let total = proration.weight(period.start, period.end);
            let mut load = PeriodLoad::default();

            for demand in &snapshot.demands {
                if let Some((from, to)) = period.overlap(demand.start_date, demand.end_date) {
                    load.demand += share(demand.fte_required, proration.weight(from, to), total);
                }
            }
            for allocation in &snapshot.allocations {
                if let Some((from, to)) =
                    period.overlap(allocation.start_date, allocation.end_date)
                {
                    load.allocation +=
                        share(allocation.fte_allocated, proration.weight(from, to), total);
                }
            }

            self.period_load.push((period, load));
        }
    }

    fn collect_skill_load(&mut self, snapshot: &PlanningSnapshot, request: &DashboardRequest) {
        for demand in &snapshot.demands {
            if demand.start_date > request.end || demand.end_date < request.start {
                continue;
            }
            for skill in &demand.skills_required {
                self.skill_load.entry(skill.clone()).or_default().demand += demand.fte_required;
            }
        }

        for person in snapshot.people.iter().filter(|person| person.active) {
            for skill in &person.skills {
                self.skill_load.entry(skill.clone()).or_default().people += 1;
            }
        }
    }

    pub fn summary(&self, request: &DashboardRequest) -> DashboardReport {
        let project_health = ProjectStatus::ordered()
            .into_iter()
            .map(|status| ProjectHealthEntry {
                status,
                status_label: status.label(),
                count: self.project_health.get(&status).copied().unwrap_or(0),
            })
            .collect();

        let team_utilization: Vec<TeamUtilizationEntry> = self
            .team_load
            .iter()
            .map(|(team_id, load)| TeamUtilizationEntry {
                team_id: *team_id,
                team_name: load.name.clone(),
                members: load.members,
                allocation_fte: load.allocation.round_dp(FTE_SCALE),
                capacity_fte: load.capacity.round_dp(FTE_SCALE),
                available_fte: (load.capacity - load.allocation).round_dp(FTE_SCALE),
                utilization_pct: percentage(load.allocation, load.capacity),
            })
            .collect();

        let team_allocation: Decimal = self.team_load.values().map(|load| load.allocation).sum();
        let team_capacity: Decimal = self.team_load.values().map(|load| load.capacity).sum();

        let resource_trend = self
            .period_load
            .iter()
            .map(|(period, load)| {
                let demand_fte = load.demand.round_dp(FTE_SCALE);
                let allocation_fte = load.allocation.round_dp(FTE_SCALE);
                let gap_fte = allocation_fte - demand_fte;
                let gap_band = GapBand::from_gap(gap_fte);
                ResourceTrendEntry {
                    period_label: period.label(),
                    period_start: period.start,
                    period_end: period.end,
                    demand_fte,
                    allocation_fte,
                    capacity_fte: self.capacity.round_dp(FTE_SCALE),
                    utilization_pct: percentage(load.allocation, self.capacity),
                    gap_fte,
                    gap_band,
                    gap_band_label: gap_band.label(),
                }
            })
            .collect();

        let skills = self
            .skill_load
            .iter()
            .map(|(skill, load)| SkillCoverageEntry {
                skill: skill.clone(),
                demand_fte: load.demand.round_dp(FTE_SCALE),
                people: load.people,
            })
            .collect();

        DashboardReport {
            range_start: request.start,
            range_end: request.end,
            granularity: request.granularity,
            headline: HeadlineMetrics {
                total_people: self.total_people,
                active_projects: self.active_projects,
                open_demands: self.open_demands,
                overall_allocation_pct: percentage(team_allocation, team_capacity)
                    .unwrap_or(Decimal::ZERO),
            },
            project_health,
            team_utilization,
            resource_trend,
            skills,
            upcoming: Vec::new(),
            observations: Vec::new(),
        }
    }
}

fn share(fte: Decimal, covered: i64, total: i64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    fte * Decimal::from(covered) / Decimal::from(total)
}

fn percentage(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    Some((part / whole * Decimal::ONE_HUNDRED).round_dp(1))
}

/// Builds the full dashboard, including upcoming key dates and observations.
pub fn build_dashboard(
    snapshot: &PlanningSnapshot,
    request: &DashboardRequest,
    proration: ProrationPolicy,
) -> DashboardReport {
    let mut report = ResourceReport::collect(snapshot, request, proration).summary(request);
    report.upcoming = super::upcoming_key_dates(snapshot, request.as_of, super::KEY_DATE_LIMIT);
    report.observations = super::generate_observations(&report);
    report
}
