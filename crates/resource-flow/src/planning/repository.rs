use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Allocation, AllocationId, AllocationInput, Demand, DemandId, DemandInput, DemandStatus,
    Person, PersonId, PersonInput, PlanningSnapshot, Project, ProjectId, ProjectInput,
    ProjectStatus, Team, TeamId, TeamInput,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeopleFilter {
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl PeopleFilter {
    pub fn matches(&self, person: &Person) -> bool {
        self.team_id.map_or(true, |team| person.team_id == Some(team))
            && self.active.map_or(true, |active| person.active == active)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFilter {
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.status.map_or(true, |status| project.status == status)
    }
}

/// Demand lines, optionally narrowed to a project, a status, or those overlapping a date range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandFilter {
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub status: Option<DemandStatus>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DemandFilter {
    pub fn matches(&self, demand: &Demand) -> bool {
        self.project_id.map_or(true, |id| demand.project_id == id)
            && self.status.map_or(true, |status| demand.status == status)
            && overlaps(self.from, self.to, demand.start_date, demand.end_date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationFilter {
    #[serde(default)]
    pub person_id: Option<PersonId>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub demand_id: Option<DemandId>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl AllocationFilter {
    pub fn for_person(person_id: PersonId) -> Self {
        Self {
            person_id: Some(person_id),
            ..Self::default()
        }
    }

    pub fn for_project(project_id: ProjectId) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    pub fn for_demand(demand_id: DemandId) -> Self {
        Self {
            demand_id: Some(demand_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, allocation: &Allocation) -> bool {
        self.person_id.map_or(true, |id| allocation.person_id == id)
            && self.project_id.map_or(true, |id| allocation.project_id == id)
            && self
                .demand_id
                .map_or(true, |id| allocation.demand_id == Some(id))
            && overlaps(self.from, self.to, allocation.start_date, allocation.end_date)
    }
}

fn overlaps(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
) -> bool {
    from.map_or(true, |from| end >= from) && to.map_or(true, |to| start <= to)
}

/// Storage abstraction so the planning service can be exercised in isolation.
///
/// Inserts assign identifiers; updates and deletes return [`RepositoryError::NotFound`] when
/// the row does not exist.
pub trait PlanningRepository: Send + Sync {
    fn insert_person(&self, input: PersonInput) -> Result<Person, RepositoryError>;
    fn update_person(&self, person: &Person) -> Result<(), RepositoryError>;
    fn fetch_person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError>;
    fn list_people(&self, filter: &PeopleFilter) -> Result<Vec<Person>, RepositoryError>;
    fn delete_person(&self, id: PersonId) -> Result<(), RepositoryError>;

    fn insert_team(&self, input: TeamInput) -> Result<Team, RepositoryError>;
    fn update_team(&self, team: &Team) -> Result<(), RepositoryError>;
    fn fetch_team(&self, id: TeamId) -> Result<Option<Team>, RepositoryError>;
    fn list_teams(&self) -> Result<Vec<Team>, RepositoryError>;
    fn delete_team(&self, id: TeamId) -> Result<(), RepositoryError>;

    fn insert_project(&self, input: ProjectInput) -> Result<Project, RepositoryError>;
    fn update_project(&self, project: &Project) -> Result<(), RepositoryError>;
    fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError>;
    fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, RepositoryError>;
    fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError>;

    fn insert_demand(
        &self,
        input: DemandInput,
        status: DemandStatus,
    ) -> Result<Demand, RepositoryError>;
    fn update_demand(&self, demand: &Demand) -> Result<(), RepositoryError>;
    fn fetch_demand(&self, id: DemandId) -> Result<Option<Demand>, RepositoryError>;
    fn list_demands(&self, filter: &DemandFilter) -> Result<Vec<Demand>, RepositoryError>;
    fn delete_demand(&self, id: DemandId) -> Result<(), RepositoryError>;

    fn insert_allocation(&self, input: AllocationInput) -> Result<Allocation, RepositoryError>;
    fn update_allocation(&self, allocation: &Allocation) -> Result<(), RepositoryError>;
    fn fetch_allocation(&self, id: AllocationId) -> Result<Option<Allocation>, RepositoryError>;
    fn list_allocations(
        &self,
        filter: &AllocationFilter,
    ) -> Result<Vec<Allocation>, RepositoryError>;
    fn delete_allocation(&self, id: AllocationId) -> Result<(), RepositoryError>;

    /// Loads every table in one pass for report generation.
    fn snapshot(&self) -> Result<PlanningSnapshot, RepositoryError> {
        Ok(PlanningSnapshot {
            people: self.list_people(&PeopleFilter::default())?,
            teams: self.list_teams()?,
            projects: self.list_projects(&ProjectFilter::default())?,
            demands: self.list_demands(&DemandFilter::default())?,
            allocations: self.list_allocations(&AllocationFilter::default())?,
        })
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
