//! Demonstration data for a fresh database, with dates placed around `today`.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    split_skills, AllocationInput, DemandInput, PersonId, PersonInput, Priority, ProjectId,
    ProjectInput, ProjectStatus, TeamId, TeamInput,
};
use super::repository::PlanningRepository;
use super::service::{PlanningService, ServiceError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub teams: usize,
    pub people: usize,
    pub projects: usize,
    pub demands: usize,
    pub allocations: usize,
}

const TEAMS: [(&str, &str, &str); 4] = [
    ("Engineering", "Software development team", "Technology"),
    ("Design", "UX and UI design team", "Product"),
    ("Product", "Product management team", "Product"),
    ("Data Science", "Data analysis and ML team", "Technology"),
];

/// (name, role, skills, team index)
const PEOPLE: [(&str, &str, &str, usize); 8] = [
    ("John Smith", "Software Engineer", "Python,JavaScript,React", 0),
    ("Jane Doe", "Senior Developer", "Java,Kubernetes,Docker", 0),
    ("Bob Johnson", "UX Designer", "Figma,Sketch,UI Design", 1),
    ("Alice Brown", "Product Manager", "Agile,Roadmapping,User Research", 2),
    ("Charlie Davis", "Data Scientist", "Python,R,Machine Learning,SQL", 3),
    ("Eva Wilson", "Backend Developer", "Java,Spring,Databases", 0),
    ("Frank Miller", "Frontend Developer", "JavaScript,React,CSS,HTML", 0),
    ("Grace Lee", "UI Designer", "Illustrator,Photoshop,Wireframing", 1),
];

/// (name, description, start offset, end offset, status)
const PROJECTS: [(&str, &str, i64, i64, ProjectStatus); 4] = [
    (
        "Website Redesign",
        "Redesign company website with new branding",
        -30,
        90,
        ProjectStatus::Active,
    ),
    (
        "Mobile App Development",
        "Create new mobile app for customers",
        -15,
        120,
        ProjectStatus::Active,
    ),
    (
        "Data Platform",
        "Build new data analytics platform",
        15,
        180,
        ProjectStatus::Planning,
    ),
    (
        "CRM Integration",
        "Integrate with new CRM system",
        45,
        90,
        ProjectStatus::Planning,
    ),
];

/// (project index, role, skills, FTE in tenths, start offset, end offset, priority)
const DEMANDS: [(usize, &str, &str, i64, i64, i64, Priority); 6] = [
    (0, "Frontend Developer", "React,JavaScript,HTML,CSS", 10, -30, 90, Priority::High),
    (0, "UX Designer", "Figma,Sketch,User Research", 5, -30, 45, Priority::Medium),
    (1, "Mobile Developer", "Swift,Kotlin,React Native", 20, -15, 120, Priority::High),
    (2, "Data Engineer", "Python,SQL,ETL,Spark", 10, 15, 180, Priority::High),
    (2, "Machine Learning Engineer", "Python,ML,TensorFlow", 5, 45, 180, Priority::Medium),
    (3, "Backend Developer", "Java,Spring,API Design", 10, 45, 90, Priority::High),
];

/// (person index, demand index, FTE in tenths, start offset, end offset, notes)
const ALLOCATIONS: [(usize, usize, i64, i64, i64, &str); 4] = [
    (6, 0, 8, -30, 90, "Frontend work for website redesign"),
    (2, 1, 5, -30, 45, "UX design for website"),
    (5, 2, 5, -15, 120, "Backend support for mobile app"),
    (6, 2, 5, -15, 60, "Frontend components for mobile app"),
];

fn offset(today: NaiveDate, days: i64) -> NaiveDate {
    today + Duration::days(days)
}

/// Creates the demonstration records through the service so demand statuses are derived.
pub fn seed<R>(service: &PlanningService<R>, today: NaiveDate) -> Result<SeedSummary, ServiceError>
where
    R: PlanningRepository + 'static,
{
    let mut team_ids: Vec<TeamId> = Vec::with_capacity(TEAMS.len());
    for (name, description, department) in TEAMS {
        let team = service.create_team(TeamInput {
            name: name.to_string(),
            description: Some(description.to_string()),
            manager_id: None,
            department: Some(department.to_string()),
        })?;
        team_ids.push(team.id);
    }

    let mut person_ids: Vec<PersonId> = Vec::with_capacity(PEOPLE.len());
    for (name, role, skills, team) in PEOPLE {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        let person = service.create_person(PersonInput {
            name: name.to_string(),
            email: Some(email),
            role: Some(role.to_string()),
            skills: split_skills(skills),
            team_id: team_ids.get(team).copied(),
            capacity: Decimal::ONE,
            active: true,
        })?;
        person_ids.push(person.id);
    }

    let mut project_ids: Vec<ProjectId> = Vec::with_capacity(PROJECTS.len());
    for (name, description, start, end, status) in PROJECTS {
        let project = service.create_project(ProjectInput {
            name: name.to_string(),
            description: Some(description.to_string()),
            priority: Priority::Medium,
            status,
            start_date: offset(today, start),
            end_date: Some(offset(today, end)),
            owner_id: None,
        })?;
        project_ids.push(project.id);
    }

    let mut demands = Vec::with_capacity(DEMANDS.len());
    for (project, role, skills, tenths, start, end, priority) in DEMANDS {
        let Some(project_id) = project_ids.get(project).copied() else {
            continue;
        };
        let demand = service.create_demand(DemandInput {
            project_id,
            role_required: Some(role.to_string()),
            skills_required: split_skills(skills),
            fte_required: Decimal::new(tenths, 1),
            start_date: offset(today, start),
            end_date: offset(today, end),
            priority,
        })?;
        demands.push(demand);
    }

    let mut allocations = 0;
    for (person, demand, tenths, start, end, notes) in ALLOCATIONS {
        let (Some(person_id), Some(demand)) = (person_ids.get(person), demands.get(demand)) else {
            continue;
        };
        service.create_allocation(AllocationInput {
            person_id: *person_id,
            project_id: demand.project_id,
            demand_id: Some(demand.id),
            fte_allocated: Decimal::new(tenths, 1),
            start_date: offset(today, start),
            end_date: offset(today, end),
            notes: Some(notes.to_string()),
        })?;
        allocations += 1;
    }

    let summary = SeedSummary {
        teams: team_ids.len(),
        people: person_ids.len(),
        projects: project_ids.len(),
        demands: demands.len(),
        allocations,
    };
    tracing::info!(?summary, "sample data seeded");
    Ok(summary)
}
