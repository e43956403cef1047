//! Resource planning: people, teams, projects, demand lines, and allocations, plus the
//! period aggregation that compares demanded and allocated FTE.

pub mod aggregate;
pub mod domain;
pub mod fulfillment;
pub mod import;
pub mod period;
pub mod report;
pub mod repository;
pub mod router;
pub mod sample;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use aggregate::{
    aggregate, AggregationOptions, Aggregator, MonthlyDemandAllocation, PersonBreakdown,
    UnlinkedAllocationPolicy,
};
pub use domain::{
    Allocation, AllocationId, AllocationInput, Demand, DemandId, DemandInput, DemandStatus,
    Person, PersonId, PersonInput, PlanningSnapshot, Priority, Project, ProjectId, ProjectInput,
    ProjectStatus, Team, TeamId, TeamInput,
};
pub use fulfillment::{classify, FulfillmentStatus, GapBand};
pub use import::{ImportError, ImportKind, ImportSummary};
pub use period::{Period, PeriodGranularity, ProrationPolicy};
pub use report::views::DashboardReport;
pub use report::{build_dashboard, write_breakdown_csv, DashboardRequest, ExportError};
pub use repository::{
    AllocationFilter, DemandFilter, PeopleFilter, PlanningRepository, ProjectFilter,
    RepositoryError,
};
pub use router::planning_router;
pub use service::{BreakdownQuery, PlanningService, ServiceError};
pub use validation::{PlanningError, RecordKind, RecordRef};
