use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a person row.
    PersonId
);
record_id!(
    /// Identifier of a team row.
    TeamId
);
record_id!(
    /// Identifier of a project row.
    ProjectId
);
record_id!(
    /// Identifier of a demand line.
    DemandId
);
record_id!(
    /// Identifier of an allocation row.
    AllocationId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const fn ordered() -> [Self; 3] {
        [Self::High, Self::Medium, Self::Low]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|priority| priority.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Planning, Self::Active, Self::Completed, Self::OnHold]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::OnHold => "On Hold",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str() == value)
    }

    /// Planning and active projects both count towards the live portfolio.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Planning | Self::Active)
    }
}

/// Stored fulfillment state of a demand line, refreshed whenever a linked allocation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DemandStatus {
    #[default]
    Unfilled,
    PartiallyFilled,
    Filled,
}

impl DemandStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Unfilled, Self::PartiallyFilled, Self::Filled]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unfilled => "Unfilled",
            Self::PartiallyFilled => "Partially Filled",
            Self::Filled => "Filled",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unfilled => "unfilled",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str() == value)
    }

    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Filled)
    }

    /// Status derived from the raw (unprorated) sum of linked allocation FTE.
    pub fn from_allocated_total(fte_required: Decimal, total_allocated: Decimal) -> Self {
        if total_allocated.is_zero() {
            Self::Unfilled
        } else if total_allocated < fte_required {
            Self::PartiallyFilled
        } else {
            Self::Filled
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub skills: Vec<String>,
    pub team_id: Option<TeamId>,
    pub capacity: Decimal,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: Option<PersonId>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub owner_id: Option<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub id: DemandId,
    pub project_id: ProjectId,
    pub role_required: Option<String>,
    pub skills_required: Vec<String>,
    pub fte_required: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub priority: Priority,
    pub status: DemandStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub person_id: PersonId,
    pub project_id: ProjectId,
    pub demand_id: Option<DemandId>,
    pub fte_allocated: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

fn default_capacity() -> Decimal {
    Decimal::ONE
}

fn default_active() -> bool {
    true
}

/// Writable fields of a person, used for both creation and replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default = "default_capacity")]
    pub capacity: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl PersonInput {
    pub fn into_record(self, id: PersonId) -> Person {
        Person {
            id,
            name: self.name,
            email: self.email,
            role: self.role,
            skills: self.skills,
            team_id: self.team_id,
            capacity: self.capacity,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manager_id: Option<PersonId>,
    #[serde(default)]
    pub department: Option<String>,
}

impl TeamInput {
    pub fn into_record(self, id: TeamId) -> Team {
        Team {
            id,
            name: self.name,
            description: self.description,
            manager_id: self.manager_id,
            department: self.department,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub owner_id: Option<PersonId>,
}

impl ProjectInput {
    pub fn into_record(self, id: ProjectId) -> Project {
        Project {
            id,
            name: self.name,
            description: self.description,
            priority: self.priority,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
            owner_id: self.owner_id,
        }
    }
}

/// Demand fields a planner may set. The fulfillment status is derived, never submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandInput {
    pub project_id: ProjectId,
    #[serde(default)]
    pub role_required: Option<String>,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub fte_required: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
}

impl DemandInput {
    pub fn into_record(self, id: DemandId, status: DemandStatus) -> Demand {
        Demand {
            id,
            project_id: self.project_id,
            role_required: self.role_required,
            skills_required: self.skills_required,
            fte_required: self.fte_required,
            start_date: self.start_date,
            end_date: self.end_date,
            priority: self.priority,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInput {
    pub person_id: PersonId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub demand_id: Option<DemandId>,
    pub fte_allocated: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AllocationInput {
    pub fn into_record(self, id: AllocationId) -> Allocation {
        Allocation {
            id,
            person_id: self.person_id,
            project_id: self.project_id,
            demand_id: self.demand_id,
            fte_allocated: self.fte_allocated,
            start_date: self.start_date,
            end_date: self.end_date,
            notes: self.notes,
        }
    }
}

/// Every row of the five planning tables, loaded together for report generation.
#[derive(Debug, Clone, Default)]
pub struct PlanningSnapshot {
    pub people: Vec<Person>,
    pub teams: Vec<Team>,
    pub projects: Vec<Project>,
    pub demands: Vec<Demand>,
    pub allocations: Vec<Allocation>,
}

/// Splits a delimited skills cell into trimmed, non-empty entries.
pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_status_follows_raw_allocation_total() {
        let required = Decimal::new(2, 0);
        assert_eq!(
            DemandStatus::from_allocated_total(required, Decimal::ZERO),
            DemandStatus::Unfilled
        );
        assert_eq!(
            DemandStatus::from_allocated_total(required, Decimal::new(15, 1)),
            DemandStatus::PartiallyFilled
        );
        assert_eq!(
            DemandStatus::from_allocated_total(required, Decimal::new(25, 1)),
            DemandStatus::Filled
        );
    }

    #[test]
    fn enums_parse_their_storage_names() {
        assert_eq!(ProjectStatus::parse("On_Hold"), Some(ProjectStatus::OnHold));
        assert_eq!(
            DemandStatus::parse("partially_filled"),
            Some(DemandStatus::PartiallyFilled)
        );
        assert_eq!(Priority::parse(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn split_skills_accepts_commas_and_semicolons() {
        assert_eq!(
            split_skills("Python, SQL;;Spark "),
            vec!["Python".to_string(), "SQL".to_string(), "Spark".to_string()]
        );
        assert!(split_skills("  ").is_empty());
    }
}
