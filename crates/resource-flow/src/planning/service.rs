use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::aggregate::{
    AggregationOptions, Aggregator, MonthlyDemandAllocation, PersonBreakdown,
    UnlinkedAllocationPolicy,
};
use super::domain::{
    Allocation, AllocationId, AllocationInput, Demand, DemandId, DemandInput, DemandStatus,
    Person, PersonId, PersonInput, Project, ProjectId, ProjectInput, Team, TeamId, TeamInput,
};
use super::import::{ImportBatch, ImportError, ImportKind, ImportSummary};
use super::period::{
    is_supported_date, Period, PeriodGranularity, EARLIEST_SUPPORTED_DATE, LATEST_SUPPORTED_DATE,
};
use super::report::views::DashboardReport;
use super::report::{build_dashboard, DashboardRequest};
use super::repository::{
    AllocationFilter, DemandFilter, PeopleFilter, PlanningRepository, ProjectFilter,
    RepositoryError,
};
use super::validation::{PlanningError, RecordKind, RecordRef};

/// Query parameters of a demand breakdown. Missing fields fall back to the service options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BreakdownQuery {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub granularity: Option<PeriodGranularity>,
    #[serde(default)]
    pub breakdown: Option<PersonBreakdown>,
}

/// Service layering validation, reference checks, and derived demand status over storage.
pub struct PlanningService<R> {
    repository: Arc<R>,
    options: AggregationOptions,
}

impl<R> PlanningService<R>
where
    R: PlanningRepository + 'static,
{
    pub fn new(repository: Arc<R>, options: AggregationOptions) -> Self {
        Self {
            repository,
            options,
        }
    }

    pub fn options(&self) -> AggregationOptions {
        self.options
    }

    // People

    pub fn create_person(&self, input: PersonInput) -> Result<Person, ServiceError> {
        input.validate(None)?;
        self.ensure_team(RecordRef::new(RecordKind::Person, None), input.team_id)?;
        let person = self.repository.insert_person(input)?;
        tracing::info!(person = %person.id, "person created");
        Ok(person)
    }

    pub fn update_person(&self, id: PersonId, input: PersonInput) -> Result<Person, ServiceError> {
        self.get_person(id)?;
        input.validate(Some(id.0))?;
        self.ensure_team(RecordRef::stored(RecordKind::Person, id.0), input.team_id)?;
        let person = input.into_record(id);
        self.repository.update_person(&person)?;
        Ok(person)
    }

    pub fn get_person(&self, id: PersonId) -> Result<Person, ServiceError> {
        let person = self
            .repository
            .fetch_person(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(person)
    }

    pub fn list_people(&self, filter: &PeopleFilter) -> Result<Vec<Person>, ServiceError> {
        Ok(self.repository.list_people(filter)?)
    }

    pub fn delete_person(&self, id: PersonId) -> Result<(), ServiceError> {
        let person = self.get_person(id)?;
        let allocations = self
            .repository
            .list_allocations(&AllocationFilter::for_person(id))?;
        if !allocations.is_empty() {
            return Err(ServiceError::InUse {
                record: person.record_ref(),
                dependents: RecordKind::Allocation,
                count: allocations.len(),
            });
        }
        self.repository.delete_person(id)?;
        tracing::info!(person = %id, "person deleted");
        Ok(())
    }

    // Teams

    pub fn create_team(&self, input: TeamInput) -> Result<Team, ServiceError> {
        self.ensure_person(RecordRef::new(RecordKind::Team, None), input.manager_id)?;
        let team = self.repository.insert_team(input)?;
        tracing::info!(team = %team.id, "team created");
        Ok(team)
    }

    pub fn update_team(&self, id: TeamId, input: TeamInput) -> Result<Team, ServiceError> {
        self.get_team(id)?;
        self.ensure_person(RecordRef::stored(RecordKind::Team, id.0), input.manager_id)?;
        let team = input.into_record(id);
        self.repository.update_team(&team)?;
        Ok(team)
    }

    pub fn get_team(&self, id: TeamId) -> Result<Team, ServiceError> {
        let team = self
            .repository
            .fetch_team(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(team)
    }

    pub fn list_teams(&self) -> Result<Vec<Team>, ServiceError> {
        Ok(self.repository.list_teams()?)
    }

    pub fn delete_team(&self, id: TeamId) -> Result<(), ServiceError> {
        self.get_team(id)?;
        let members = self.repository.list_people(&PeopleFilter {
            team_id: Some(id),
            ..PeopleFilter::default()
        })?;
        if !members.is_empty() {
            return Err(ServiceError::InUse {
                record: RecordRef::stored(RecordKind::Team, id.0),
                dependents: RecordKind::Person,
                count: members.len(),
            });
        }
        self.repository.delete_team(id)?;
        tracing::info!(team = %id, "team deleted");
        Ok(())
    }

    // Projects

    pub fn create_project(&self, input: ProjectInput) -> Result<Project, ServiceError> {
        input.validate(None)?;
        self.ensure_person(RecordRef::new(RecordKind::Project, None), input.owner_id)?;
        let project = self.repository.insert_project(input)?;
        tracing::info!(project = %project.id, "project created");
        Ok(project)
    }

    pub fn update_project(
        &self,
        id: ProjectId,
        input: ProjectInput,
    ) -> Result<Project, ServiceError> {
        self.get_project(id)?;
        input.validate(Some(id.0))?;
        self.ensure_person(RecordRef::stored(RecordKind::Project, id.0), input.owner_id)?;
        let project = input.into_record(id);
        self.repository.update_project(&project)?;
        Ok(project)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project, ServiceError> {
        let project = self
            .repository
            .fetch_project(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(project)
    }

    pub fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, ServiceError> {
        Ok(self.repository.list_projects(filter)?)
    }

    pub fn delete_project(&self, id: ProjectId) -> Result<(), ServiceError> {
        self.get_project(id)?;
        let record = RecordRef::stored(RecordKind::Project, id.0);

        let demands = self.repository.list_demands(&DemandFilter {
            project_id: Some(id),
            ..DemandFilter::default()
        })?;
        if !demands.is_empty() {
            return Err(ServiceError::InUse {
                record,
                dependents: RecordKind::Demand,
                count: demands.len(),
            });
        }

        let allocations = self
            .repository
            .list_allocations(&AllocationFilter::for_project(id))?;
        if !allocations.is_empty() {
            return Err(ServiceError::InUse {
                record,
                dependents: RecordKind::Allocation,
                count: allocations.len(),
            });
        }

        self.repository.delete_project(id)?;
        tracing::info!(project = %id, "project deleted");
        Ok(())
    }

    // Demands

    pub fn create_demand(&self, input: DemandInput) -> Result<Demand, ServiceError> {
        input.validate(None)?;
        self.ensure_project(RecordRef::new(RecordKind::Demand, None), input.project_id)?;
        let demand = self
            .repository
            .insert_demand(input, DemandStatus::Unfilled)?;
        tracing::info!(demand = %demand.id, project = %demand.project_id, "demand created");
        Ok(demand)
    }

    /// Replaces a demand. A demand with linked allocations cannot move to another project.
    pub fn update_demand(&self, id: DemandId, input: DemandInput) -> Result<Demand, ServiceError> {
        let current = self.get_demand(id)?;
        input.validate(Some(id.0))?;
        let record = RecordRef::stored(RecordKind::Demand, id.0);
        self.ensure_project(record, input.project_id)?;

        let linked = self
            .repository
            .list_allocations(&AllocationFilter::for_demand(id))?;
        if input.project_id != current.project_id && !linked.is_empty() {
            return Err(ServiceError::InUse {
                record,
                dependents: RecordKind::Allocation,
                count: linked.len(),
            });
        }

        let allocated: Decimal = linked.iter().map(|allocation| allocation.fte_allocated).sum();
        let status = DemandStatus::from_allocated_total(input.fte_required, allocated);
        let demand = input.into_record(id, status);
        self.repository.update_demand(&demand)?;
        Ok(demand)
    }

    pub fn get_demand(&self, id: DemandId) -> Result<Demand, ServiceError> {
        let demand = self
            .repository
            .fetch_demand(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(demand)
    }

    pub fn list_demands(&self, filter: &DemandFilter) -> Result<Vec<Demand>, ServiceError> {
        Ok(self.repository.list_demands(filter)?)
    }

    pub fn delete_demand(&self, id: DemandId) -> Result<(), ServiceError> {
        let demand = self.get_demand(id)?;
        let allocations = self
            .repository
            .list_allocations(&AllocationFilter::for_demand(id))?;
        if !allocations.is_empty() {
            return Err(ServiceError::InUse {
                record: demand.record_ref(),
                dependents: RecordKind::Allocation,
                count: allocations.len(),
            });
        }
        self.repository.delete_demand(id)?;
        tracing::info!(demand = %id, "demand deleted");
        Ok(())
    }

    // Allocations

    pub fn create_allocation(&self, input: AllocationInput) -> Result<Allocation, ServiceError> {
        input.validate(None)?;
        self.ensure_allocation_references(RecordRef::new(RecordKind::Allocation, None), &input)?;

        let allocation = self.repository.insert_allocation(input)?;
        tracing::info!(
            allocation = %allocation.id,
            person = %allocation.person_id,
            project = %allocation.project_id,
            "allocation created"
        );
        if let Some(demand_id) = allocation.demand_id {
            self.refresh_demand_status(demand_id)?;
        }
        Ok(allocation)
    }

    pub fn update_allocation(
        &self,
        id: AllocationId,
        input: AllocationInput,
    ) -> Result<Allocation, ServiceError> {
        let previous = self.get_allocation(id)?;
        input.validate(Some(id.0))?;
        self.ensure_allocation_references(RecordRef::stored(RecordKind::Allocation, id.0), &input)?;

        let allocation = input.into_record(id);
        self.repository.update_allocation(&allocation)?;

        if let Some(demand_id) = previous.demand_id {
            if allocation.demand_id != Some(demand_id) {
                self.refresh_demand_status(demand_id)?;
            }
        }
        if let Some(demand_id) = allocation.demand_id {
            self.refresh_demand_status(demand_id)?;
        }
        Ok(allocation)
    }

    pub fn get_allocation(&self, id: AllocationId) -> Result<Allocation, ServiceError> {
        let allocation = self
            .repository
            .fetch_allocation(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(allocation)
    }

    pub fn list_allocations(
        &self,
        filter: &AllocationFilter,
    ) -> Result<Vec<Allocation>, ServiceError> {
        Ok(self.repository.list_allocations(filter)?)
    }

    pub fn delete_allocation(&self, id: AllocationId) -> Result<(), ServiceError> {
        let allocation = self.get_allocation(id)?;
        self.repository.delete_allocation(id)?;
        tracing::info!(allocation = %id, "allocation deleted");
        if let Some(demand_id) = allocation.demand_id {
            self.refresh_demand_status(demand_id)?;
        }
        Ok(())
    }

    // Reports

    /// Aggregated fulfillment rows for the periods overlapping the requested window.
    ///
    /// Every returned period is computed from all records touching it, so a row does not
    /// depend on where the window cuts into its period.
    pub fn breakdown(
        &self,
        query: &BreakdownQuery,
    ) -> Result<Vec<MonthlyDemandAllocation>, ServiceError> {
        check_window(query.start, query.end)?;

        let options = AggregationOptions {
            granularity: query.granularity.unwrap_or(self.options.granularity),
            breakdown: query.breakdown.unwrap_or(self.options.breakdown),
            ..self.options
        };

        let from = query
            .start
            .map(|start| Period::containing(options.granularity, start).start);
        let to = query
            .end
            .map(|end| Period::containing(options.granularity, end).end);

        let allocations = self.repository.list_allocations(&AllocationFilter {
            project_id: query.project_id,
            from,
            to,
            ..AllocationFilter::default()
        })?;

        // Role matching may attach an allocation to any demand overlapping it.
        let (demand_from, demand_to) = match options.unlinked {
            UnlinkedAllocationPolicy::Exclude => (from, to),
            UnlinkedAllocationPolicy::MatchProjectRole => (
                from.map(|from| {
                    allocations
                        .iter()
                        .map(|allocation| allocation.start_date)
                        .fold(from, NaiveDate::min)
                }),
                to.map(|to| {
                    allocations
                        .iter()
                        .map(|allocation| allocation.end_date)
                        .fold(to, NaiveDate::max)
                }),
            ),
        };
        let mut demands = self.repository.list_demands(&DemandFilter {
            project_id: query.project_id,
            from: demand_from,
            to: demand_to,
            ..DemandFilter::default()
        })?;

        let loaded: BTreeSet<DemandId> = demands.iter().map(|demand| demand.id).collect();
        let missing: BTreeSet<DemandId> = allocations
            .iter()
            .filter_map(|allocation| allocation.demand_id)
            .filter(|demand_id| !loaded.contains(demand_id))
            .collect();
        for demand_id in missing {
            if let Some(demand) = self.repository.fetch_demand(demand_id)? {
                demands.push(demand);
            }
        }

        let mut aggregator = Aggregator::new(options);
        if options.unlinked == UnlinkedAllocationPolicy::MatchProjectRole {
            let roles = self
                .repository
                .list_people(&PeopleFilter::default())?
                .into_iter()
                .filter_map(|person| person.role.map(|role| (person.id, role)))
                .collect();
            aggregator = aggregator.with_person_roles(roles);
        }

        let mut rows = aggregator.aggregate(&demands, &allocations)?;
        rows.retain(|row| {
            query.start.map_or(true, |start| row.period_end >= start)
                && query.end.map_or(true, |end| row.period_start <= end)
        });
        Ok(rows)
    }

    pub fn dashboard(&self, request: &DashboardRequest) -> Result<DashboardReport, ServiceError> {
        check_window(Some(request.start), Some(request.end))?;
        check_window(Some(request.as_of), None)?;
        let snapshot = self.repository.snapshot()?;
        Ok(build_dashboard(&snapshot, request, self.options.proration))
    }

    /// Creates every row of a CSV export, stopping at the first row that fails.
    ///
    /// Rows created before the failure stay stored.
    pub fn import<I: Read>(
        &self,
        kind: ImportKind,
        reader: I,
    ) -> Result<ImportSummary, ServiceError> {
        let batch = ImportBatch::parse(kind, reader)?;
        let mut created = Vec::with_capacity(batch.len());

        match batch {
            ImportBatch::People(rows) => {
                for (line, input) in rows {
                    created.push(at_line(line, self.create_person(input))?.id.0);
                }
            }
            ImportBatch::Teams(rows) => {
                for (line, input) in rows {
                    created.push(at_line(line, self.create_team(input))?.id.0);
                }
            }
            ImportBatch::Projects(rows) => {
                for (line, input) in rows {
                    created.push(at_line(line, self.create_project(input))?.id.0);
                }
            }
            ImportBatch::Demands(rows) => {
                for (line, input) in rows {
                    created.push(at_line(line, self.create_demand(input))?.id.0);
                }
            }
            ImportBatch::Allocations(rows) => {
                for (line, input) in rows {
                    created.push(at_line(line, self.create_allocation(input))?.id.0);
                }
            }
        }

        tracing::info!(kind = kind.as_str(), created = created.len(), "import finished");
        Ok(ImportSummary { kind, created })
    }

    fn allocated_total(&self, demand_id: DemandId) -> Result<Decimal, ServiceError> {
        Ok(self
            .repository
            .list_allocations(&AllocationFilter::for_demand(demand_id))?
            .iter()
            .map(|allocation| allocation.fte_allocated)
            .sum())
    }

    fn refresh_demand_status(&self, demand_id: DemandId) -> Result<(), ServiceError> {
        let Some(mut demand) = self.repository.fetch_demand(demand_id)? else {
            return Ok(());
        };
        let allocated = self.allocated_total(demand_id)?;
        let status = DemandStatus::from_allocated_total(demand.fte_required, allocated);
        if status != demand.status {
            tracing::debug!(
                demand = %demand_id,
                from = demand.status.as_str(),
                to = status.as_str(),
                "demand status changed"
            );
            demand.status = status;
            self.repository.update_demand(&demand)?;
        }
        Ok(())
    }

    fn ensure_team(&self, record: RecordRef, team_id: Option<TeamId>) -> Result<(), ServiceError> {
        if let Some(team_id) = team_id {
            if self.repository.fetch_team(team_id)?.is_none() {
                return Err(unknown(record, RecordKind::Team, team_id.0));
            }
        }
        Ok(())
    }

    fn ensure_person(
        &self,
        record: RecordRef,
        person_id: Option<PersonId>,
    ) -> Result<(), ServiceError> {
        if let Some(person_id) = person_id {
            if self.repository.fetch_person(person_id)?.is_none() {
                return Err(unknown(record, RecordKind::Person, person_id.0));
            }
        }
        Ok(())
    }

    fn ensure_project(&self, record: RecordRef, project_id: ProjectId) -> Result<(), ServiceError> {
        if self.repository.fetch_project(project_id)?.is_none() {
            return Err(unknown(record, RecordKind::Project, project_id.0));
        }
        Ok(())
    }

    fn ensure_allocation_references(
        &self,
        record: RecordRef,
        input: &AllocationInput,
    ) -> Result<(), ServiceError> {
        self.ensure_person(record, Some(input.person_id))?;
        self.ensure_project(record, input.project_id)?;

        if let Some(demand_id) = input.demand_id {
            let demand = self
                .repository
                .fetch_demand(demand_id)?
                .ok_or_else(|| unknown(record, RecordKind::Demand, demand_id.0))?;
            if demand.project_id != input.project_id {
                return Err(ServiceError::DemandProjectMismatch {
                    demand: demand_id,
                    demand_project: demand.project_id,
                    allocation_project: input.project_id,
                });
            }
        }
        Ok(())
    }
}

fn check_window(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ServiceError> {
    if let Some(date) = start
        .into_iter()
        .chain(end)
        .find(|date| !is_supported_date(*date))
    {
        return Err(ServiceError::UnsupportedDate { date });
    }
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ServiceError::InvalidRange { start, end });
        }
    }
    Ok(())
}

fn unknown(record: RecordRef, kind: RecordKind, id: i64) -> ServiceError {
    ServiceError::Planning(PlanningError::UnknownReference {
        record,
        reference: RecordRef::stored(kind, id),
    })
}

fn at_line<T>(line: u64, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
    result.map_err(|source| ServiceError::ImportRow {
        line,
        source: Box::new(source),
    })
}

/// Error raised by the planning service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("{record} is still referenced by {count} {}", .dependents.plural())]
    InUse {
        record: RecordRef,
        dependents: RecordKind,
        count: usize,
    },
    #[error(
        "demand {demand} belongs to project {demand_project}, not project {allocation_project}"
    )]
    DemandProjectMismatch {
        demand: DemandId,
        demand_project: ProjectId,
        allocation_project: ProjectId,
    },
    #[error("range starts on {start} which is after its end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error(
        "date {date} is outside the supported range {} to {}",
        EARLIEST_SUPPORTED_DATE,
        LATEST_SUPPORTED_DATE
    )]
    UnsupportedDate { date: NaiveDate },
    #[error("line {line}: {source}")]
    ImportRow {
        line: u64,
        source: Box<ServiceError>,
    },
}
