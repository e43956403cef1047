use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use super::domain::{
    Allocation, AllocationInput, Demand, DemandInput, Person, PersonInput, ProjectInput,
};
use super::period::{is_supported_date, EARLIEST_SUPPORTED_DATE, LATEST_SUPPORTED_DATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Person,
    Team,
    Project,
    Demand,
    Allocation,
}

impl RecordKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Team => "team",
            Self::Project => "project",
            Self::Demand => "demand",
            Self::Allocation => "allocation",
        }
    }

    pub const fn plural(self) -> &'static str {
        match self {
            Self::Person => "people",
            Self::Team => "teams",
            Self::Project => "projects",
            Self::Demand => "demands",
            Self::Allocation => "allocations",
        }
    }
}

/// Names the record an error is about; `id` is `None` for records not yet stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordRef {
    pub kind: RecordKind,
    pub id: Option<i64>,
}

impl RecordRef {
    pub const fn new(kind: RecordKind, id: Option<i64>) -> Self {
        Self { kind, id }
    }

    pub const fn stored(kind: RecordKind, id: i64) -> Self {
        Self { kind, id: Some(id) }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} {}", self.kind.label(), id),
            None => write!(f, "new {}", self.kind.label()),
        }
    }
}

/// Input-validation failures shared by data entry and aggregation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanningError {
    #[error("{record} starts on {start} which is after its end date {end}")]
    InvalidInterval {
        record: RecordRef,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error(
        "{record} date {date} is outside the supported range {} to {}",
        EARLIEST_SUPPORTED_DATE,
        LATEST_SUPPORTED_DATE
    )]
    UnsupportedDate { record: RecordRef, date: NaiveDate },
    #[error("{record} has negative FTE {value}")]
    NegativeFte { record: RecordRef, value: Decimal },
    #[error("{record} references unknown {reference}")]
    UnknownReference {
        record: RecordRef,
        reference: RecordRef,
    },
    #[error("{record} must have a capacity greater than zero (got {value})")]
    InvalidCapacity { record: RecordRef, value: Decimal },
}

pub fn check_date(record: RecordRef, date: NaiveDate) -> Result<(), PlanningError> {
    if !is_supported_date(date) {
        return Err(PlanningError::UnsupportedDate { record, date });
    }
    Ok(())
}

pub fn check_interval(
    record: RecordRef,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), PlanningError> {
    check_date(record, start)?;
    check_date(record, end)?;
    if start > end {
        return Err(PlanningError::InvalidInterval { record, start, end });
    }
    Ok(())
}

pub fn check_fte(record: RecordRef, value: Decimal) -> Result<(), PlanningError> {
    if value < Decimal::ZERO {
        return Err(PlanningError::NegativeFte { record, value });
    }
    Ok(())
}

pub fn check_capacity(record: RecordRef, value: Decimal) -> Result<(), PlanningError> {
    if value <= Decimal::ZERO {
        return Err(PlanningError::InvalidCapacity { record, value });
    }
    Ok(())
}

impl PersonInput {
    pub fn validate(&self, id: Option<i64>) -> Result<(), PlanningError> {
        check_capacity(RecordRef::new(RecordKind::Person, id), self.capacity)
    }
}

impl Person {
    pub fn record_ref(&self) -> RecordRef {
        RecordRef::stored(RecordKind::Person, self.id.0)
    }
}

impl ProjectInput {
    pub fn validate(&self, id: Option<i64>) -> Result<(), PlanningError> {
        match self.end_date {
            Some(end) => check_interval(
                RecordRef::new(RecordKind::Project, id),
                self.start_date,
                end,
            ),
            None => check_date(RecordRef::new(RecordKind::Project, id), self.start_date),
        }
    }
}

impl DemandInput {
    pub fn validate(&self, id: Option<i64>) -> Result<(), PlanningError> {
        let record = RecordRef::new(RecordKind::Demand, id);
        check_interval(record, self.start_date, self.end_date)?;
        check_fte(record, self.fte_required)
    }
}

impl Demand {
    pub fn record_ref(&self) -> RecordRef {
        RecordRef::stored(RecordKind::Demand, self.id.0)
    }

    pub fn validate(&self) -> Result<(), PlanningError> {
        let record = self.record_ref();
        check_interval(record, self.start_date, self.end_date)?;
        check_fte(record, self.fte_required)
    }
}

impl AllocationInput {
    pub fn validate(&self, id: Option<i64>) -> Result<(), PlanningError> {
        let record = RecordRef::new(RecordKind::Allocation, id);
        check_interval(record, self.start_date, self.end_date)?;
        check_fte(record, self.fte_allocated)
    }
}

impl Allocation {
    pub fn record_ref(&self) -> RecordRef {
        RecordRef::stored(RecordKind::Allocation, self.id.0)
    }

    pub fn validate(&self) -> Result<(), PlanningError> {
        let record = self.record_ref();
        check_interval(record, self.start_date, self.end_date)?;
        check_fte(record, self.fte_allocated)
    }
}
