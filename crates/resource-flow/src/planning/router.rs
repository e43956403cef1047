use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    AllocationId, AllocationInput, DemandId, DemandInput, PersonId, PersonInput, ProjectId,
    ProjectInput, TeamId, TeamInput,
};
use super::period::{first_of_month, PeriodGranularity};
use super::report::{write_breakdown_csv, DashboardRequest};
use super::repository::{
    AllocationFilter, DemandFilter, PeopleFilter, PlanningRepository, ProjectFilter,
    RepositoryError,
};
use super::service::{BreakdownQuery, PlanningService, ServiceError};

type SharedService<R> = State<Arc<PlanningService<R>>>;

/// Router builder exposing CRUD endpoints and the planning reports.
pub fn planning_router<R>(service: Arc<PlanningService<R>>) -> Router
where
    R: PlanningRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/people",
            get(list_people::<R>).post(create_person::<R>),
        )
        .route(
            "/api/v1/people/:id",
            get(get_person::<R>)
                .put(update_person::<R>)
                .delete(delete_person::<R>),
        )
        .route("/api/v1/teams", get(list_teams::<R>).post(create_team::<R>))
        .route(
            "/api/v1/teams/:id",
            get(get_team::<R>)
                .put(update_team::<R>)
                .delete(delete_team::<R>),
        )
        .route(
            "/api/v1/projects",
            get(list_projects::<R>).post(create_project::<R>),
        )
        .route(
            "/api/v1/projects/:id",
            get(get_project::<R>)
                .put(update_project::<R>)
                .delete(delete_project::<R>),
        )
        .route(
            "/api/v1/demands",
            get(list_demands::<R>).post(create_demand::<R>),
        )
        .route(
            "/api/v1/demands/:id",
            get(get_demand::<R>)
                .put(update_demand::<R>)
                .delete(delete_demand::<R>),
        )
        .route(
            "/api/v1/allocations",
            get(list_allocations::<R>).post(create_allocation::<R>),
        )
        .route(
            "/api/v1/allocations/:id",
            get(get_allocation::<R>)
                .put(update_allocation::<R>)
                .delete(delete_allocation::<R>),
        )
        .route("/api/v1/planning/breakdown", get(breakdown_handler::<R>))
        .route(
            "/api/v1/planning/breakdown.csv",
            get(breakdown_csv_handler::<R>),
        )
        .route("/api/v1/planning/dashboard", get(dashboard_handler::<R>))
        .with_state(service)
}

pub(crate) fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Planning(_)
        | ServiceError::DemandProjectMismatch { .. }
        | ServiceError::InvalidRange { .. }
        | ServiceError::UnsupportedDate { .. }
        | ServiceError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ServiceError::Repository(RepositoryError::Conflict) | ServiceError::InUse { .. } => {
            StatusCode::CONFLICT
        }
        ServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ServiceError::ImportRow { source, .. } => status_for(source),
    }
}

fn error_response(error: ServiceError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "planning request failed");
    }
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

fn no_content(result: Result<(), ServiceError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_people<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Query(filter): Query<PeopleFilter>,
) -> Response {
    respond(StatusCode::OK, service.list_people(&filter))
}

pub(crate) async fn create_person<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Json(input): Json<PersonInput>,
) -> Response {
    respond(StatusCode::CREATED, service.create_person(input))
}

pub(crate) async fn get_person<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    respond(StatusCode::OK, service.get_person(PersonId(id)))
}

pub(crate) async fn update_person<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
    Json(input): Json<PersonInput>,
) -> Response {
    respond(StatusCode::OK, service.update_person(PersonId(id), input))
}

pub(crate) async fn delete_person<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    no_content(service.delete_person(PersonId(id)))
}

pub(crate) async fn list_teams<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
) -> Response {
    respond(StatusCode::OK, service.list_teams())
}

pub(crate) async fn create_team<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Json(input): Json<TeamInput>,
) -> Response {
    respond(StatusCode::CREATED, service.create_team(input))
}

pub(crate) async fn get_team<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    respond(StatusCode::OK, service.get_team(TeamId(id)))
}

pub(crate) async fn update_team<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
    Json(input): Json<TeamInput>,
) -> Response {
    respond(StatusCode::OK, service.update_team(TeamId(id), input))
}

pub(crate) async fn delete_team<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    no_content(service.delete_team(TeamId(id)))
}

pub(crate) async fn list_projects<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Query(filter): Query<ProjectFilter>,
) -> Response {
    respond(StatusCode::OK, service.list_projects(&filter))
}

pub(crate) async fn create_project<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Json(input): Json<ProjectInput>,
) -> Response {
    respond(StatusCode::CREATED, service.create_project(input))
}

pub(crate) async fn get_project<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    respond(StatusCode::OK, service.get_project(ProjectId(id)))
}

pub(crate) async fn update_project<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
    Json(input): Json<ProjectInput>,
) -> Response {
    respond(StatusCode::OK, service.update_project(ProjectId(id), input))
}

pub(crate) async fn delete_project<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    no_content(service.delete_project(ProjectId(id)))
}

pub(crate) async fn list_demands<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Query(filter): Query<DemandFilter>,
) -> Response {
    respond(StatusCode::OK, service.list_demands(&filter))
}

pub(crate) async fn create_demand<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Json(input): Json<DemandInput>,
) -> Response {
    respond(StatusCode::CREATED, service.create_demand(input))
}

pub(crate) async fn get_demand<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    respond(StatusCode::OK, service.get_demand(DemandId(id)))
}

pub(crate) async fn update_demand<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
    Json(input): Json<DemandInput>,
) -> Response {
    respond(StatusCode::OK, service.update_demand(DemandId(id), input))
}

pub(crate) async fn delete_demand<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    no_content(service.delete_demand(DemandId(id)))
}

pub(crate) async fn list_allocations<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Query(filter): Query<AllocationFilter>,
) -> Response {
    respond(StatusCode::OK, service.list_allocations(&filter))
}

pub(crate) async fn create_allocation<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Json(input): Json<AllocationInput>,
) -> Response {
    respond(StatusCode::CREATED, service.create_allocation(input))
}

pub(crate) async fn get_allocation<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    respond(StatusCode::OK, service.get_allocation(AllocationId(id)))
}

pub(crate) async fn update_allocation<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
    Json(input): Json<AllocationInput>,
) -> Response {
    respond(
        StatusCode::OK,
        service.update_allocation(AllocationId(id), input),
    )
}

pub(crate) async fn delete_allocation<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Path(id): Path<i64>,
) -> Response {
    no_content(service.delete_allocation(AllocationId(id)))
}

pub(crate) async fn breakdown_handler<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Query(query): Query<BreakdownQuery>,
) -> Response {
    respond(StatusCode::OK, service.breakdown(&query))
}

pub(crate) async fn breakdown_csv_handler<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Query(query): Query<BreakdownQuery>,
) -> Response {
    let rows = match service.breakdown(&query) {
        Ok(rows) => rows,
        Err(error) => return error_response(error),
    };

    let mut body = Vec::new();
    if let Err(error) = write_breakdown_csv(&mut body, &rows) {
        tracing::error!(error = %error, "failed to render breakdown csv");
        let payload = json!({
            "error": error.to_string(),
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Dashboard window; defaults to the twelve months starting with the current one.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DashboardQuery {
    #[serde(default)]
    start: Option<NaiveDate>,
    #[serde(default)]
    end: Option<NaiveDate>,
    #[serde(default)]
    granularity: Option<PeriodGranularity>,
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

impl DashboardQuery {
    fn into_request(self, default_granularity: PeriodGranularity) -> DashboardRequest {
        let today = Local::now().date_naive();
        let start = self.start.unwrap_or_else(|| first_of_month(today));
        DashboardRequest {
            start,
            end: self
                .end
                .unwrap_or_else(|| super::period::default_window_end(start)),
            granularity: self.granularity.unwrap_or(default_granularity),
            as_of: self.as_of.unwrap_or(today),
        }
    }
}

pub(crate) async fn dashboard_handler<R: PlanningRepository + 'static>(
    State(service): SharedService<R>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let request = query.into_request(service.options().granularity);
    respond(StatusCode::OK, service.dashboard(&request))
}
