use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{migrations, StoreError};
use crate::planning::domain::{
    split_skills, Allocation, AllocationId, AllocationInput, Demand, DemandId, DemandInput,
    DemandStatus, Person, PersonId, PersonInput, Priority, Project, ProjectId, ProjectInput,
    ProjectStatus, Team, TeamId, TeamInput,
};
use crate::planning::repository::{
    AllocationFilter, DemandFilter, PeopleFilter, PlanningRepository, ProjectFilter,
    RepositoryError,
};

const PERSON_COLUMNS: &str = "id, name, email, role, skills, team_id, capacity, active";
const TEAM_COLUMNS: &str = "id, name, description, manager_id, department";
const PROJECT_COLUMNS: &str =
    "id, name, description, priority, status, start_date, end_date, owner_id";
const DEMAND_COLUMNS: &str = "id, project_id, role_required, skills_required, fte_required, \
                              start_date, end_date, priority, status";
const ALLOCATION_COLUMNS: &str =
    "id, person_id, project_id, demand_id, fte_allocated, start_date, end_date, notes";

/// Single SQLite connection shared behind a mutex. Every access goes through
/// [`SqliteStore::with_conn`], which holds the lock only for the closure.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`; `:memory:` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
            }
        }

        tracing::debug!(path = %path.display(), "opening sqlite database");
        Self::prepare(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        migrations::run_migrations(&conn)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&conn)?)
    }

    pub fn schema_version(&self) -> Result<i32, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        migrations::current_version(&conn)
    }

    fn list<T>(
        &self,
        table: &str,
        columns: &str,
        clauses: &[&str],
        values: Vec<Value>,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {columns} FROM {table}{filter} ORDER BY id");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), map)?;
            rows.collect()
        })
    }

    fn fetch<T>(
        &self,
        table: &str,
        columns: &str,
        id: i64,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT {columns} FROM {table} WHERE id = ?1");
        self.with_conn(|conn| conn.query_row(&sql, [id], map).optional())
    }

    fn delete(&self, table: &str, id: i64) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {table} WHERE id = ?1");
        let changed = self.with_conn(|conn| conn.execute(&sql, [id]))?;
        expect_changed(changed)
    }
}

fn expect_changed(changed: usize) -> Result<(), RepositoryError> {
    if changed == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized {column} value '{value}'")]
struct ColumnValueError {
    column: &'static str,
    value: String,
}

fn conversion_error(
    row: &Row<'_>,
    column: &'static str,
    err: Box<dyn std::error::Error + Send + Sync>,
) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, err)
}

fn decimal_column(row: &Row<'_>, column: &'static str) -> rusqlite::Result<Decimal> {
    let text: String = row.get(column)?;
    Decimal::from_str(&text).map_err(|err| conversion_error(row, column, Box::new(err)))
}

fn enum_column<T>(
    row: &Row<'_>,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let text: String = row.get(column)?;
    parse(&text).ok_or_else(|| {
        conversion_error(row, column, Box::new(ColumnValueError { column, value: text }))
    })
}

fn skills_text(skills: &[String]) -> String {
    skills.join(";")
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: PersonId(row.get("id")?),
        name: row.get("name")?,
        email: row.get("email")?,
        role: row.get("role")?,
        skills: split_skills(&row.get::<_, String>("skills")?),
        team_id: row.get::<_, Option<i64>>("team_id")?.map(TeamId),
        capacity: decimal_column(row, "capacity")?,
        active: row.get("active")?,
    })
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: TeamId(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        manager_id: row.get::<_, Option<i64>>("manager_id")?.map(PersonId),
        department: row.get("department")?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        priority: enum_column(row, "priority", Priority::parse)?,
        status: enum_column(row, "status", ProjectStatus::parse)?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        owner_id: row.get::<_, Option<i64>>("owner_id")?.map(PersonId),
    })
}

fn demand_from_row(row: &Row<'_>) -> rusqlite::Result<Demand> {
    Ok(Demand {
        id: DemandId(row.get("id")?),
        project_id: ProjectId(row.get("project_id")?),
        role_required: row.get("role_required")?,
        skills_required: split_skills(&row.get::<_, String>("skills_required")?),
        fte_required: decimal_column(row, "fte_required")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        priority: enum_column(row, "priority", Priority::parse)?,
        status: enum_column(row, "status", DemandStatus::parse)?,
    })
}

fn allocation_from_row(row: &Row<'_>) -> rusqlite::Result<Allocation> {
    Ok(Allocation {
        id: AllocationId(row.get("id")?),
        person_id: PersonId(row.get("person_id")?),
        project_id: ProjectId(row.get("project_id")?),
        demand_id: row.get::<_, Option<i64>>("demand_id")?.map(DemandId),
        fte_allocated: decimal_column(row, "fte_allocated")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        notes: row.get("notes")?,
    })
}

impl PlanningRepository for SqliteStore {
    fn insert_person(&self, input: PersonInput) -> Result<Person, RepositoryError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO people (name, email, role, skills, team_id, capacity, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    input.name,
                    input.email,
                    input.role,
                    skills_text(&input.skills),
                    input.team_id.map(|id| id.0),
                    input.capacity.to_string(),
                    input.active,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(input.into_record(PersonId(id)))
    }

    fn update_person(&self, person: &Person) -> Result<(), RepositoryError> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE people
                 SET name = ?2, email = ?3, role = ?4, skills = ?5, team_id = ?6,
                     capacity = ?7, active = ?8, updated_at = datetime('now')
                 WHERE id = ?1",
                params![
                    person.id.0,
                    person.name,
                    person.email,
                    person.role,
                    skills_text(&person.skills),
                    person.team_id.map(|id| id.0),
                    person.capacity.to_string(),
                    person.active,
                ],
            )
        })?;
        expect_changed(changed)
    }

    fn fetch_person(&self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        Ok(self.fetch("people", PERSON_COLUMNS, id.0, person_from_row)?)
    }

    fn list_people(&self, filter: &PeopleFilter) -> Result<Vec<Person>, RepositoryError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(team_id) = filter.team_id {
            clauses.push("team_id = ?");
            values.push(Value::Integer(team_id.0));
        }
        if let Some(active) = filter.active {
            clauses.push("active = ?");
            values.push(Value::Integer(i64::from(active)));
        }
        Ok(self.list("people", PERSON_COLUMNS, &clauses, values, person_from_row)?)
    }

    fn delete_person(&self, id: PersonId) -> Result<(), RepositoryError> {
        self.delete("people", id.0)
    }

    fn insert_team(&self, input: TeamInput) -> Result<Team, RepositoryError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO teams (name, description, manager_id, department)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    input.name,
                    input.description,
                    input.manager_id.map(|id| id.0),
                    input.department,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(input.into_record(TeamId(id)))
    }

    fn update_team(&self, team: &Team) -> Result<(), RepositoryError> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE teams
                 SET name = ?2, description = ?3, manager_id = ?4, department = ?5,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                params![
                    team.id.0,
                    team.name,
                    team.description,
                    team.manager_id.map(|id| id.0),
                    team.department,
                ],
            )
        })?;
        expect_changed(changed)
    }

    fn fetch_team(&self, id: TeamId) -> Result<Option<Team>, RepositoryError> {
        Ok(self.fetch("teams", TEAM_COLUMNS, id.0, team_from_row)?)
    }

    fn list_teams(&self) -> Result<Vec<Team>, RepositoryError> {
        Ok(self.list("teams", TEAM_COLUMNS, &[], Vec::new(), team_from_row)?)
    }

    fn delete_team(&self, id: TeamId) -> Result<(), RepositoryError> {
        self.delete("teams", id.0)
    }

    fn insert_project(&self, input: ProjectInput) -> Result<Project, RepositoryError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects
                     (name, description, priority, status, start_date, end_date, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    input.name,
                    input.description,
                    input.priority.as_str(),
                    input.status.as_str(),
                    input.start_date,
                    input.end_date,
                    input.owner_id.map(|id| id.0),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(input.into_record(ProjectId(id)))
    }

    fn update_project(&self, project: &Project) -> Result<(), RepositoryError> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE projects
                 SET name = ?2, description = ?3, priority = ?4, status = ?5,
                     start_date = ?6, end_date = ?7, owner_id = ?8,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                params![
                    project.id.0,
                    project.name,
                    project.description,
                    project.priority.as_str(),
                    project.status.as_str(),
                    project.start_date,
                    project.end_date,
                    project.owner_id.map(|id| id.0),
                ],
            )
        })?;
        expect_changed(changed)
    }

    fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(self.fetch("projects", PROJECT_COLUMNS, id.0, project_from_row)?)
    }

    fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, RepositoryError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        Ok(self.list("projects", PROJECT_COLUMNS, &clauses, values, project_from_row)?)
    }

    fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError> {
        self.delete("projects", id.0)
    }

    fn insert_demand(
        &self,
        input: DemandInput,
        status: DemandStatus,
    ) -> Result<Demand, RepositoryError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO demands
                     (project_id, role_required, skills_required, fte_required,
                      start_date, end_date, priority, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    input.project_id.0,
                    input.role_required,
                    skills_text(&input.skills_required),
                    input.fte_required.to_string(),
                    input.start_date,
                    input.end_date,
                    input.priority.as_str(),
                    status.as_str(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(input.into_record(DemandId(id), status))
    }

    fn update_demand(&self, demand: &Demand) -> Result<(), RepositoryError> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE demands
                 SET project_id = ?2, role_required = ?3, skills_required = ?4,
                     fte_required = ?5, start_date = ?6, end_date = ?7, priority = ?8,
                     status = ?9, updated_at = datetime('now')
                 WHERE id = ?1",
                params![
                    demand.id.0,
                    demand.project_id.0,
                    demand.role_required,
                    skills_text(&demand.skills_required),
                    demand.fte_required.to_string(),
                    demand.start_date,
                    demand.end_date,
                    demand.priority.as_str(),
                    demand.status.as_str(),
                ],
            )
        })?;
        expect_changed(changed)
    }

    fn fetch_demand(&self, id: DemandId) -> Result<Option<Demand>, RepositoryError> {
        Ok(self.fetch("demands", DEMAND_COLUMNS, id.0, demand_from_row)?)
    }

    fn list_demands(&self, filter: &DemandFilter) -> Result<Vec<Demand>, RepositoryError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(project_id) = filter.project_id {
            clauses.push("project_id = ?");
            values.push(Value::Integer(project_id.0));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(from) = filter.from {
            clauses.push("end_date >= ?");
            values.push(date_value(from));
        }
        if let Some(to) = filter.to {
            clauses.push("start_date <= ?");
            values.push(date_value(to));
        }
        Ok(self.list("demands", DEMAND_COLUMNS, &clauses, values, demand_from_row)?)
    }

    fn delete_demand(&self, id: DemandId) -> Result<(), RepositoryError> {
        self.delete("demands", id.0)
    }

    fn insert_allocation(&self, input: AllocationInput) -> Result<Allocation, RepositoryError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO allocations
                     (person_id, project_id, demand_id, fte_allocated, start_date, end_date, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    input.person_id.0,
                    input.project_id.0,
                    input.demand_id.map(|id| id.0),
                    input.fte_allocated.to_string(),
                    input.start_date,
                    input.end_date,
                    input.notes,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(input.into_record(AllocationId(id)))
    }

    fn update_allocation(&self, allocation: &Allocation) -> Result<(), RepositoryError> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE allocations
                 SET person_id = ?2, project_id = ?3, demand_id = ?4, fte_allocated = ?5,
                     start_date = ?6, end_date = ?7, notes = ?8, updated_at = datetime('now')
                 WHERE id = ?1",
                params![
                    allocation.id.0,
                    allocation.person_id.0,
                    allocation.project_id.0,
                    allocation.demand_id.map(|id| id.0),
                    allocation.fte_allocated.to_string(),
                    allocation.start_date,
                    allocation.end_date,
                    allocation.notes,
                ],
            )
        })?;
        expect_changed(changed)
    }

    fn fetch_allocation(&self, id: AllocationId) -> Result<Option<Allocation>, RepositoryError> {
        Ok(self.fetch("allocations", ALLOCATION_COLUMNS, id.0, allocation_from_row)?)
    }

    fn list_allocations(
        &self,
        filter: &AllocationFilter,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(person_id) = filter.person_id {
            clauses.push("person_id = ?");
            values.push(Value::Integer(person_id.0));
        }
        if let Some(project_id) = filter.project_id {
            clauses.push("project_id = ?");
            values.push(Value::Integer(project_id.0));
        }
        if let Some(demand_id) = filter.demand_id {
            clauses.push("demand_id = ?");
            values.push(Value::Integer(demand_id.0));
        }
        if let Some(from) = filter.from {
            clauses.push("end_date >= ?");
            values.push(date_value(from));
        }
        if let Some(to) = filter.to {
            clauses.push("start_date <= ?");
            values.push(date_value(to));
        }
        Ok(self.list(
            "allocations",
            ALLOCATION_COLUMNS,
            &clauses,
            values,
            allocation_from_row,
        )?)
    }

    fn delete_allocation(&self, id: AllocationId) -> Result<(), RepositoryError> {
        self.delete("allocations", id.0)
    }
}
