//! Expands demand and allocation intervals into per-period fulfillment rows.
//!
//! Every slice is tracked as an FTE-weight numerator (FTE multiplied by the covered day
//! weight). Statuses are classified on those numerators, and the figures returned to
//! callers are the numerators divided by the period weight and rounded to [`FTE_SCALE`].

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{Allocation, Demand, DemandId, PersonId, ProjectId};
use super::fulfillment::{classify, FulfillmentStatus};
use super::period::{Period, PeriodGranularity, ProrationPolicy, FTE_SCALE};
use super::validation::PlanningError;

/// Treatment of allocations that carry no `demand_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnlinkedAllocationPolicy {
    /// Leave them out of demand rows entirely.
    #[default]
    Exclude,
    /// Attach them to a demand of the same project whose required role matches the person's
    /// role and whose interval overlaps the allocation.
    MatchProjectRole,
}

impl UnlinkedAllocationPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exclude => "exclude",
            Self::MatchProjectRole => "match_project_role",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exclude" => Some(Self::Exclude),
            "match_project_role" | "project_role" => Some(Self::MatchProjectRole),
            _ => None,
        }
    }
}

/// Whether allocated FTE is reported per demand or split per allocated person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersonBreakdown {
    #[default]
    Combined,
    /// One row per allocated person. Each row repeats the demand's full `fte_demand` and its
    /// demand-level `status`, while `fte_gap` is the demand minus that person's share. The
    /// demand's own gap is `fte_demand` minus the sum of `fte_allocated` over its rows.
    PerPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregationOptions {
    #[serde(default)]
    pub granularity: PeriodGranularity,
    #[serde(default)]
    pub proration: ProrationPolicy,
    #[serde(default)]
    pub unlinked: UnlinkedAllocationPolicy,
    #[serde(default)]
    pub breakdown: PersonBreakdown,
}

/// One computed fulfillment row. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyDemandAllocation {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub period_label: String,
    pub project_id: ProjectId,
    pub demand_id: DemandId,
    pub person_id: Option<PersonId>,
    pub role_required: Option<String>,
    pub fte_demand: Decimal,
    pub fte_allocated: Decimal,
    pub fte_gap: Decimal,
    pub status: FulfillmentStatus,
}

/// A record's share of one period: the covered weight and the period's total weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub period: Period,
    pub covered: i64,
    pub total: i64,
}

impl Slice {
    /// FTE-weight numerator of `fte` over the covered part of the period.
    pub fn units(&self, fte: Decimal) -> Decimal {
        fte * Decimal::from(self.covered)
    }

    /// Prorated FTE of `fte` over this period, unrounded.
    pub fn prorate(&self, fte: Decimal) -> Decimal {
        to_fte(self.units(fte), self.total)
    }
}

/// Splits the closed interval `[start, end]` into period slices.
pub fn slices(
    granularity: PeriodGranularity,
    policy: ProrationPolicy,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Slice> {
    Period::covering(granularity, start, end)
        .into_iter()
        .filter_map(|period| {
            let (from, to) = period.overlap(start, end)?;
            Some(Slice {
                period,
                covered: policy.weight(from, to),
                total: policy.weight(period.start, period.end),
            })
        })
        .collect()
}

fn to_fte(units: Decimal, total: i64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    units / Decimal::from(total)
}

fn present(units: Decimal, total: i64) -> Decimal {
    to_fte(units, total).round_dp(FTE_SCALE)
}

fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase()
}

#[derive(Debug)]
struct DemandSlot {
    period: Period,
    total: i64,
    role_required: Option<String>,
    demand_units: Decimal,
    allocated_units: BTreeMap<PersonId, Decimal>,
}

impl DemandSlot {
    fn new(period: Period, total: i64, role_required: Option<String>) -> Self {
        Self {
            period,
            total,
            role_required,
            demand_units: Decimal::ZERO,
            allocated_units: BTreeMap::new(),
        }
    }

    fn allocated_total(&self) -> Decimal {
        self.allocated_units.values().copied().sum()
    }

    fn row(
        &self,
        project_id: ProjectId,
        demand_id: DemandId,
        person_id: Option<PersonId>,
        allocated_units: Decimal,
        status: FulfillmentStatus,
    ) -> MonthlyDemandAllocation {
        let fte_demand = present(self.demand_units, self.total);
        let fte_allocated = present(allocated_units, self.total);
        MonthlyDemandAllocation {
            period_start: self.period.start,
            period_end: self.period.end,
            period_label: self.period.label(),
            project_id,
            demand_id,
            person_id,
            role_required: self.role_required.clone(),
            fte_demand,
            fte_allocated,
            fte_gap: fte_demand - fte_allocated,
            status,
        }
    }
}

type SlotKey = (NaiveDate, ProjectId, DemandId);

/// Derives [`MonthlyDemandAllocation`] rows from demand and allocation records.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    options: AggregationOptions,
    person_roles: HashMap<PersonId, String>,
}

impl Aggregator {
    pub fn new(options: AggregationOptions) -> Self {
        Self {
            options,
            person_roles: HashMap::new(),
        }
    }

    /// Roles used by [`UnlinkedAllocationPolicy::MatchProjectRole`]; people without a role
    /// never match.
    pub fn with_person_roles(mut self, roles: HashMap<PersonId, String>) -> Self {
        self.person_roles = roles
            .into_iter()
            .map(|(person, role)| (person, normalize_role(&role)))
            .collect();
        self
    }

    pub fn options(&self) -> AggregationOptions {
        self.options
    }

    pub fn aggregate(
        &self,
        demands: &[Demand],
        allocations: &[Allocation],
    ) -> Result<Vec<MonthlyDemandAllocation>, PlanningError> {
        for demand in demands {
            demand.validate()?;
        }
        for allocation in allocations {
            allocation.validate()?;
        }

        let by_id: BTreeMap<DemandId, &Demand> =
            demands.iter().map(|demand| (demand.id, demand)).collect();
        let mut slots: BTreeMap<SlotKey, DemandSlot> = BTreeMap::new();

        for demand in demands {
            for slice in self.slices(demand.start_date, demand.end_date) {
                slots
                    .entry((slice.period.start, demand.project_id, demand.id))
                    .or_insert_with(|| {
                        DemandSlot::new(slice.period, slice.total, demand.role_required.clone())
                    })
                    .demand_units += slice.units(demand.fte_required);
            }
        }

        for allocation in allocations {
            let Some(demand) = self.resolve(allocation, &by_id, demands) else {
                continue;
            };

            for slice in self.slices(allocation.start_date, allocation.end_date) {
                *slots
                    .entry((slice.period.start, demand.project_id, demand.id))
                    .or_insert_with(|| {
                        DemandSlot::new(slice.period, slice.total, demand.role_required.clone())
                    })
                    .allocated_units
                    .entry(allocation.person_id)
                    .or_insert(Decimal::ZERO) += slice.units(allocation.fte_allocated);
            }
        }

        let mut rows = Vec::with_capacity(slots.len());
        for ((_, project_id, demand_id), slot) in &slots {
            let allocated = slot.allocated_total();
            let status = classify(slot.demand_units, allocated);

            match self.options.breakdown {
                PersonBreakdown::PerPerson if !slot.allocated_units.is_empty() => {
                    for (person_id, units) in &slot.allocated_units {
                        rows.push(slot.row(
                            *project_id,
                            *demand_id,
                            Some(*person_id),
                            *units,
                            status,
                        ));
                    }
                }
                _ => rows.push(slot.row(*project_id, *demand_id, None, allocated, status)),
            }
        }

        tracing::debug!(
            demands = demands.len(),
            allocations = allocations.len(),
            rows = rows.len(),
            granularity = self.options.granularity.as_str(),
            "aggregated demand breakdown"
        );
        Ok(rows)
    }

    fn slices(&self, start: NaiveDate, end: NaiveDate) -> Vec<Slice> {
        slices(
            self.options.granularity,
            self.options.proration,
            start,
            end,
        )
    }

    fn resolve<'a>(
        &self,
        allocation: &Allocation,
        by_id: &BTreeMap<DemandId, &'a Demand>,
        demands: &'a [Demand],
    ) -> Option<&'a Demand> {
        match allocation.demand_id {
            Some(demand_id) => {
                let demand = by_id.get(&demand_id).copied();
                if demand.is_none() {
                    tracing::debug!(
                        allocation = %allocation.id,
                        demand = %demand_id,
                        "skipping allocation linked to a demand outside the input set"
                    );
                }
                demand
            }
            None => match self.options.unlinked {
                UnlinkedAllocationPolicy::Exclude => None,
                UnlinkedAllocationPolicy::MatchProjectRole => {
                    self.match_project_role(allocation, demands)
                }
            },
        }
    }

    fn match_project_role<'a>(
        &self,
        allocation: &Allocation,
        demands: &'a [Demand],
    ) -> Option<&'a Demand> {
        let role = self.person_roles.get(&allocation.person_id)?;
        demands
            .iter()
            .filter(|demand| demand.project_id == allocation.project_id)
            .filter(|demand| {
                demand
                    .role_required
                    .as_deref()
                    .is_some_and(|required| normalize_role(required) == *role)
            })
            .filter(|demand| {
                demand.start_date <= allocation.end_date && allocation.start_date <= demand.end_date
            })
            .min_by_key(|demand| (demand.start_date, demand.id))
    }
}

/// Aggregates with calendar-day proration, excluding unlinked allocations.
pub fn aggregate(
    demands: &[Demand],
    allocations: &[Allocation],
    granularity: PeriodGranularity,
) -> Result<Vec<MonthlyDemandAllocation>, PlanningError> {
    Aggregator::new(AggregationOptions {
        granularity,
        ..AggregationOptions::default()
    })
    .aggregate(demands, allocations)
}
