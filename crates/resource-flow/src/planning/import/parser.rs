use std::io::Read;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::super::domain::{
    split_skills, AllocationInput, DemandId, DemandInput, PersonId, PersonInput, Priority,
    ProjectId, ProjectInput, ProjectStatus, TeamId, TeamInput,
};
use super::ImportError;

/// Deserializes every data row, keeping the 1-based source line for error reporting.
pub(crate) fn parse_rows<R, T>(reader: R) -> Result<Vec<(u64, T)>, ImportError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let row = record.deserialize(Some(&headers))?;
        rows.push((line, row));
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PersonRow {
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    role: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    skills: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    team_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    capacity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    active: Option<String>,
}

impl PersonRow {
    pub(crate) fn into_input(self, line: u64) -> Result<PersonInput, ImportError> {
        Ok(PersonInput {
            name: self.name,
            email: self.email,
            role: self.role,
            skills: self.skills.as_deref().map(split_skills).unwrap_or_default(),
            team_id: optional_id(line, "team_id", self.team_id.as_deref())?.map(TeamId),
            capacity: match self.capacity.as_deref() {
                Some(value) => decimal(line, "capacity", value)?,
                None => Decimal::ONE,
            },
            active: match self.active.as_deref() {
                Some(value) => boolean(line, "active", value)?,
                None => true,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamRow {
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    manager_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
}

impl TeamRow {
    pub(crate) fn into_input(self, line: u64) -> Result<TeamInput, ImportError> {
        Ok(TeamInput {
            name: self.name,
            description: self.description,
            manager_id: optional_id(line, "manager_id", self.manager_id.as_deref())?
                .map(PersonId),
            department: self.department,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectRow {
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    priority: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    start_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    end_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    owner_id: Option<String>,
}

impl ProjectRow {
    pub(crate) fn into_input(self, line: u64) -> Result<ProjectInput, ImportError> {
        Ok(ProjectInput {
            name: self.name,
            description: self.description,
            priority: priority(line, self.priority.as_deref())?,
            status: match self.status.as_deref() {
                Some(value) => ProjectStatus::parse(value)
                    .ok_or_else(|| ImportError::invalid(line, "status", value))?,
                None => ProjectStatus::default(),
            },
            start_date: date(line, "start_date", &self.start_date)?,
            end_date: self
                .end_date
                .as_deref()
                .map(|value| date(line, "end_date", value))
                .transpose()?,
            owner_id: optional_id(line, "owner_id", self.owner_id.as_deref())?.map(PersonId),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DemandRow {
    project_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    role_required: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    skills_required: Option<String>,
    fte_required: String,
    start_date: String,
    end_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    priority: Option<String>,
}

impl DemandRow {
    pub(crate) fn into_input(self, line: u64) -> Result<DemandInput, ImportError> {
        Ok(DemandInput {
            project_id: ProjectId(id(line, "project_id", &self.project_id)?),
            role_required: self.role_required,
            skills_required: self
                .skills_required
                .as_deref()
                .map(split_skills)
                .unwrap_or_default(),
            fte_required: decimal(line, "fte_required", &self.fte_required)?,
            start_date: date(line, "start_date", &self.start_date)?,
            end_date: date(line, "end_date", &self.end_date)?,
            priority: priority(line, self.priority.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AllocationRow {
    person_id: String,
    project_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    demand_id: Option<String>,
    fte_allocated: String,
    start_date: String,
    end_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

impl AllocationRow {
    pub(crate) fn into_input(self, line: u64) -> Result<AllocationInput, ImportError> {
        Ok(AllocationInput {
            person_id: PersonId(id(line, "person_id", &self.person_id)?),
            project_id: ProjectId(id(line, "project_id", &self.project_id)?),
            demand_id: optional_id(line, "demand_id", self.demand_id.as_deref())?.map(DemandId),
            fte_allocated: decimal(line, "fte_allocated", &self.fte_allocated)?,
            start_date: date(line, "start_date", &self.start_date)?,
            end_date: date(line, "end_date", &self.end_date)?,
            notes: self.notes,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn id(line: u64, field: &'static str, value: &str) -> Result<i64, ImportError> {
    value
        .trim()
        .parse()
        .map_err(|_| ImportError::invalid(line, field, value))
}

fn optional_id(
    line: u64,
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<i64>, ImportError> {
    value.map(|value| id(line, field, value)).transpose()
}

fn decimal(line: u64, field: &'static str, value: &str) -> Result<Decimal, ImportError> {
    Decimal::from_str(value.trim()).map_err(|_| ImportError::invalid(line, field, value))
}

fn date(line: u64, field: &'static str, value: &str) -> Result<NaiveDate, ImportError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ImportError::invalid(line, field, value))
}

fn boolean(line: u64, field: &'static str, value: &str) -> Result<bool, ImportError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(ImportError::invalid(line, field, value)),
    }
}

fn priority(line: u64, value: Option<&str>) -> Result<Priority, ImportError> {
    match value {
        Some(value) => {
            Priority::parse(value).ok_or_else(|| ImportError::invalid(line, "priority", value))
        }
        None => Ok(Priority::default()),
    }
}
