use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::planning::domain::{
    Allocation, AllocationId, AllocationInput, Demand, DemandId, DemandInput, DemandStatus,
    Person, PersonId, PersonInput, Priority, Project, ProjectId, ProjectInput, ProjectStatus,
    Team, TeamId, TeamInput,
};
use crate::planning::repository::{
    AllocationFilter, DemandFilter, PeopleFilter, PlanningRepository, ProjectFilter,
    RepositoryError,
};
use crate::planning::{planning_router, AggregationOptions, PlanningService};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn fte(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

pub(super) fn person_input(name: &str, role: &str, team_id: Option<TeamId>) -> PersonInput {
    PersonInput {
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        role: Some(role.to_string()),
        skills: vec!["SQL".to_string()],
        team_id,
        capacity: Decimal::ONE,
        active: true,
    }
}

pub(super) fn project_input(name: &str) -> ProjectInput {
    ProjectInput {
        name: name.to_string(),
        description: None,
        priority: Priority::High,
        status: ProjectStatus::Active,
        start_date: date(2024, 1, 1),
        end_date: Some(date(2024, 12, 31)),
        owner_id: None,
    }
}

pub(super) fn demand_input(
    project_id: ProjectId,
    fte_required: Decimal,
    start: NaiveDate,
    end: NaiveDate,
) -> DemandInput {
    DemandInput {
        project_id,
        role_required: Some("Data Engineer".to_string()),
        skills_required: vec!["SQL".to_string(), "Spark".to_string()],
        fte_required,
        start_date: start,
        end_date: end,
        priority: Priority::High,
    }
}

pub(super) fn allocation_input(
    person_id: PersonId,
    demand: &Demand,
    fte_allocated: Decimal,
) -> AllocationInput {
    AllocationInput {
        person_id,
        project_id: demand.project_id,
        demand_id: Some(demand.id),
        fte_allocated,
        start_date: demand.start_date,
        end_date: demand.end_date,
        notes: None,
    }
}

pub(super) fn build_service() -> (PlanningService<MemoryRepository>, Arc<MemoryRepository>) {
    build_service_with(AggregationOptions::default())
}

pub(super) fn build_service_with(
    options: AggregationOptions,
) -> (PlanningService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = PlanningService::new(repository.clone(), options);
    (service, repository)
}

/// A team, one data engineer, a project, and a January demand for 2 FTE.
pub(super) struct Fixture {
    pub(super) team: Team,
    pub(super) person: Person,
    pub(super) project: Project,
    pub(super) demand: Demand,
}

pub(super) fn seed_fixture(service: &PlanningService<MemoryRepository>) -> Fixture {
    let team = service
        .create_team(TeamInput {
            name: "Data".to_string(),
            description: None,
            manager_id: None,
            department: Some("Technology".to_string()),
        })
        .expect("team created");
    let person = service
        .create_person(person_input("Ada", "Data Engineer", Some(team.id)))
        .expect("person created");
    let project = service
        .create_project(project_input("Atlas"))
        .expect("project created");
    let demand = service
        .create_demand(demand_input(
            project.id,
            Decimal::from(2),
            date(2024, 1, 10),
            date(2024, 1, 20),
        ))
        .expect("demand created");

    Fixture {
        team,
        person,
        project,
        demand,
    }
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    people: BTreeMap<PersonId, Person>,
    teams: BTreeMap<TeamId, Team>,
    projects: BTreeMap<ProjectId, Project>,
    demands: BTreeMap<DemandId, Demand>,
    allocations: BTreeMap<AllocationId, Allocation>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: Option<&str>, except: Option<PersonId>) -> bool {
        let Some(email) = email else {
            return false;
        };
        self.people
            .values()
            .any(|person| Some(person.id) != except && person.email.as_deref() == Some(email))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRepository {
    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        f(&mut guard)
    }
}

fn replace<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V) -> Result<(), RepositoryError> {
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

fn remove<K: Ord, V>(map: &mut BTreeMap<K, V>, key: &K) -> Result<(), RepositoryError> {
    map.remove(key).map(|_| ()).ok_or(RepositoryError::NotFound)
}

impl PlanningRepository for MemoryRepository {
    fn insert_person(&self, input: PersonInput) -> Result<Person, RepositoryError> {
        self.with(|tables| {
            if tables.email_taken(input.email.as_deref(), None) {
                return Err(RepositoryError::Conflict);
            }
            let person = input.into_record(PersonId(tables.next_id()));
            tables.people.insert(person.id, person.clone());
            Ok(person)
        })
    }

    fn update_person(&self, person: &Person) -> Result<(), RepositoryError> {
        self.with(|tables| {
            if tables.email_taken(person.email.as_deref(), Some(person.id)) {
                return Err(RepositoryError::Conflict);
            }
            replace(&mut tables.people, person.id, person.clone())
        })
    }

    fn fetch_person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        Ok(self.with(|tables| tables.people.get(&id).cloned()))
    }

    fn list_people(&self, filter: &PeopleFilter) -> Result<Vec<Person>, RepositoryError> {
        Ok(self.with(|tables| {
            tables
                .people
                .values()
                .filter(|person| filter.matches(person))
                .cloned()
                .collect()
        }))
    }

    fn delete_person(&self, id: PersonId) -> Result<(), RepositoryError> {
        self.with(|tables| remove(&mut tables.people, &id))
    }

    fn insert_team(&self, input: TeamInput) -> Result<Team, RepositoryError> {
        Ok(self.with(|tables| {
            let team = input.into_record(TeamId(tables.next_id()));
            tables.teams.insert(team.id, team.clone());
            team
        }))
    }

    fn update_team(&self, team: &Team) -> Result<(), RepositoryError> {
        self.with(|tables| replace(&mut tables.teams, team.id, team.clone()))
    }

    fn fetch_team(&self, id: TeamId) -> Result<Option<Team>, RepositoryError> {
        Ok(self.with(|tables| tables.teams.get(&id).cloned()))
    }

    fn list_teams(&self) -> Result<Vec<Team>, RepositoryError> {
        Ok(self.with(|tables| tables.teams.values().cloned().collect()))
    }

    fn delete_team(&self, id: TeamId) -> Result<(), RepositoryError> {
        self.with(|tables| remove(&mut tables.teams, &id))
    }

    fn insert_project(&self, input: ProjectInput) -> Result<Project, RepositoryError> {
        Ok(self.with(|tables| {
            let project = input.into_record(ProjectId(tables.next_id()));
            tables.projects.insert(project.id, project.clone());
            project
        }))
    }

    fn update_project(&self, project: &Project) -> Result<(), RepositoryError> {
        self.with(|tables| replace(&mut tables.projects, project.id, project.clone()))
    }

    fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(self.with(|tables| tables.projects.get(&id).cloned()))
    }

    fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, RepositoryError> {
        Ok(self.with(|tables| {
            tables
                .projects
                .values()
                .filter(|project| filter.matches(project))
                .cloned()
                .collect()
        }))
    }

    fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError> {
        self.with(|tables| remove(&mut tables.projects, &id))
    }

    fn insert_demand(
        &self,
        input: DemandInput,
        status: DemandStatus,
    ) -> Result<Demand, RepositoryError> {
        Ok(self.with(|tables| {
            let demand = input.into_record(DemandId(tables.next_id()), status);
            tables.demands.insert(demand.id, demand.clone());
            demand
        }))
    }

    fn update_demand(&self, demand: &Demand) -> Result<(), RepositoryError> {
        self.with(|tables| replace(&mut tables.demands, demand.id, demand.clone()))
    }

    fn fetch_demand(&self, id: DemandId) -> Result<Option<Demand>, RepositoryError> {
        Ok(self.with(|tables| tables.demands.get(&id).cloned()))
    }

    fn list_demands(&self, filter: &DemandFilter) -> Result<Vec<Demand>, RepositoryError> {
        Ok(self.with(|tables| {
            tables
                .demands
                .values()
                .filter(|demand| filter.matches(demand))
                .cloned()
                .collect()
        }))
    }

    fn delete_demand(&self, id: DemandId) -> Result<(), RepositoryError> {
        self.with(|tables| remove(&mut tables.demands, &id))
    }

    fn insert_allocation(&self, input: AllocationInput) -> Result<Allocation, RepositoryError> {
        Ok(self.with(|tables| {
            let allocation = input.into_record(AllocationId(tables.next_id()));
            tables.allocations.insert(allocation.id, allocation.clone());
            allocation
        }))
    }

    fn update_allocation(&self, allocation: &Allocation) -> Result<(), RepositoryError> {
        self.with(|tables| replace(&mut tables.allocations, allocation.id, allocation.clone()))
    }

    fn fetch_allocation(&self, id: AllocationId) -> Result<Option<Allocation>, RepositoryError> {
        Ok(self.with(|tables| tables.allocations.get(&id).cloned()))
    }

    fn list_allocations(
        &self,
        filter: &AllocationFilter,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        Ok(self.with(|tables| {
            tables
                .allocations
                .values()
                .filter(|allocation| filter.matches(allocation))
                .cloned()
                .collect()
        }))
    }

    fn delete_allocation(&self, id: AllocationId) -> Result<(), RepositoryError> {
        self.with(|tables| remove(&mut tables.allocations, &id))
    }
}

/// Repository whose every call fails, for exercising the 500 path.
pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl PlanningRepository for UnavailableRepository {
    fn insert_person(&self, _input: PersonInput) -> Result<Person, RepositoryError> {
        offline()
    }
    fn update_person(&self, _person: &Person) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_person(&self, _id: PersonId) -> Result<Option<Person>, RepositoryError> {
        offline()
    }
    fn list_people(&self, _filter: &PeopleFilter) -> Result<Vec<Person>, RepositoryError> {
        offline()
    }
    fn delete_person(&self, _id: PersonId) -> Result<(), RepositoryError> {
        offline()
    }
    fn insert_team(&self, _input: TeamInput) -> Result<Team, RepositoryError> {
        offline()
    }
    fn update_team(&self, _team: &Team) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_team(&self, _id: TeamId) -> Result<Option<Team>, RepositoryError> {
        offline()
    }
    fn list_teams(&self) -> Result<Vec<Team>, RepositoryError> {
        offline()
    }
    fn delete_team(&self, _id: TeamId) -> Result<(), RepositoryError> {
        offline()
    }
    fn insert_project(&self, _input: ProjectInput) -> Result<Project, RepositoryError> {
        offline()
    }
    fn update_project(&self, _project: &Project) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_project(&self, _id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        offline()
    }
    fn list_projects(&self, _filter: &ProjectFilter) -> Result<Vec<Project>, RepositoryError> {
        offline()
    }
    fn delete_project(&self, _id: ProjectId) -> Result<(), RepositoryError> {
        offline()
    }
    fn insert_demand(
        &self,
        _input: DemandInput,
        _status: DemandStatus,
    ) -> Result<Demand, RepositoryError> {
        offline()
    }
    fn update_demand(&self, _demand: &Demand) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_demand(&self, _id: DemandId) -> Result<Option<Demand>, RepositoryError> {
        offline()
    }
    fn list_demands(&self, _filter: &DemandFilter) -> Result<Vec<Demand>, RepositoryError> {
        offline()
    }
    fn delete_demand(&self, _id: DemandId) -> Result<(), RepositoryError> {
        offline()
    }
    fn insert_allocation(&self, _input: AllocationInput) -> Result<Allocation, RepositoryError> {
        offline()
    }
    fn update_allocation(&self, _allocation: &Allocation) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_allocation(&self, _id: AllocationId) -> Result<Option<Allocation>, RepositoryError> {
        offline()
    }
    fn list_allocations(
        &self,
        _filter: &AllocationFilter,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        offline()
    }
    fn delete_allocation(&self, _id: AllocationId) -> Result<(), RepositoryError> {
        offline()
    }
}

pub(super) fn router_with_service(service: PlanningService<MemoryRepository>) -> axum::Router {
    planning_router(Arc::new(service))
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = read_body(response).await;
    serde_json::from_slice(&body).expect("json payload")
}
