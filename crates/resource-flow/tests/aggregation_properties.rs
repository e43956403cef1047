use chrono::NaiveDate;
use resource_flow::planning::aggregate::slices;
use resource_flow::planning::{
    aggregate, classify, AggregationOptions, Aggregator, Allocation, AllocationId, Demand,
    DemandId, DemandStatus, FulfillmentStatus, PeriodGranularity, PersonId, PlanningError,
    Priority, ProjectId, ProrationPolicy,
};
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn fte(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

fn demand(id: i64, fte_required: Decimal, start: NaiveDate, end: NaiveDate) -> Demand {
    Demand {
        id: DemandId(id),
        project_id: ProjectId(1),
        role_required: Some("Analyst".to_string()),
        skills_required: Vec::new(),
        fte_required,
        start_date: start,
        end_date: end,
        priority: Priority::Medium,
        status: DemandStatus::Unfilled,
    }
}

fn linked_allocation(
    id: i64,
    demand_id: i64,
    fte_allocated: Decimal,
    start: NaiveDate,
    end: NaiveDate,
) -> Allocation {
    Allocation {
        id: AllocationId(id),
        person_id: PersonId(id),
        project_id: ProjectId(1),
        demand_id: Some(DemandId(demand_id)),
        fte_allocated,
        start_date: start,
        end_date: end,
        notes: None,
    }
}

#[test]
fn full_period_demand_keeps_its_requirement() {
    for (granularity, start, end) in [
        (PeriodGranularity::Monthly, date(2024, 2, 1), date(2024, 2, 29)),
        (PeriodGranularity::Quarterly, date(2024, 4, 1), date(2024, 6, 30)),
        (PeriodGranularity::Annual, date(2023, 1, 1), date(2023, 12, 31)),
    ] {
        let rows = aggregate(&[demand(1, fte("1.5"), start, end)], &[], granularity)
            .expect("aggregation");
        assert_eq!(rows.len(), 1, "{granularity:?}");
        assert_eq!(rows[0].fte_demand, fte("1.5"), "{granularity:?}");
    }
}

#[test]
fn partial_period_is_prorated_linearly() {
    let rows = aggregate(
        &[demand(1, Decimal::from(2), date(2024, 2, 1), date(2024, 2, 10))],
        &[],
        PeriodGranularity::Monthly,
    )
    .expect("aggregation");

    // 2 FTE over 10 of 29 days.
    assert_eq!(rows[0].fte_demand, fte("0.690"));
}

#[test]
fn single_day_interval_emits_one_row() {
    let rows = aggregate(
        &[demand(1, fte("3.1"), date(2024, 1, 15), date(2024, 1, 15))],
        &[],
        PeriodGranularity::Monthly,
    )
    .expect("aggregation");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fte_demand, fte("0.100"));
    assert_eq!(rows[0].status, FulfillmentStatus::Unfilled);
}

#[test]
fn monthly_rows_sum_to_covered_months() {
    let rows = aggregate(
        &[demand(1, Decimal::ONE, date(2024, 1, 16), date(2024, 3, 15))],
        &[],
        PeriodGranularity::Monthly,
    )
    .expect("aggregation");

    let labels: Vec<&str> = rows.iter().map(|row| row.period_label.as_str()).collect();
    assert_eq!(labels, vec!["2024-01", "2024-02", "2024-03"]);
    let total: Decimal = rows.iter().map(|row| row.fte_demand).sum();
    assert_eq!(total, Decimal::from(2));
}

#[test]
fn slice_numerators_cover_every_day_once() {
    let start = date(2023, 11, 20);
    let end = date(2024, 5, 3);
    let required = fte("0.75");

    for granularity in PeriodGranularity::ordered() {
        let units: Decimal = slices(granularity, ProrationPolicy::CalendarDays, start, end)
            .iter()
            .map(|slice| slice.units(required))
            .sum();
        let days = (end - start).num_days() + 1;
        assert_eq!(units, required * Decimal::from(days), "{granularity:?}");
    }
}

#[test]
fn aggregation_is_idempotent() {
    let demands = [
        demand(1, Decimal::from(2), date(2024, 1, 10), date(2024, 4, 20)),
        demand(2, fte("0.5"), date(2024, 2, 1), date(2024, 2, 29)),
    ];
    let allocations = [
        linked_allocation(1, 1, Decimal::ONE, date(2024, 1, 1), date(2024, 3, 31)),
        linked_allocation(2, 2, fte("0.5"), date(2024, 2, 1), date(2024, 2, 29)),
    ];
    let aggregator = Aggregator::new(AggregationOptions::default());

    let first = aggregator
        .aggregate(&demands, &allocations)
        .expect("first run");
    let second = aggregator
        .aggregate(&demands, &allocations)
        .expect("second run");
    assert_eq!(first, second);

    let february: Vec<_> = first
        .iter()
        .filter(|row| row.period_label == "2024-02")
        .collect();
    assert_eq!(february.len(), 2);
    assert_eq!(february[1].status, FulfillmentStatus::Filled);
}

#[test]
fn working_day_proration_ignores_weekends() {
    let options = AggregationOptions {
        proration: ProrationPolicy::WorkingDays,
        ..AggregationOptions::default()
    };
    // 2024-01-06 and 2024-01-07 are a Saturday and a Sunday.
    let weekend = demand(1, Decimal::ONE, date(2024, 1, 6), date(2024, 1, 7));
    let rows = Aggregator::new(options)
        .aggregate(&[weekend], &[])
        .expect("aggregation");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fte_demand, Decimal::ZERO);
}

#[test]
fn negative_allocation_is_rejected() {
    let demands = [demand(1, Decimal::ONE, date(2024, 1, 1), date(2024, 1, 31))];
    let allocations = [linked_allocation(
        1,
        1,
        fte("-1"),
        date(2024, 1, 1),
        date(2024, 1, 31),
    )];

    assert!(matches!(
        aggregate(&demands, &allocations, PeriodGranularity::Monthly),
        Err(PlanningError::NegativeFte { .. })
    ));
}

#[test]
fn classification_table() {
    let five = Decimal::from(5);
    assert_eq!(classify(five, Decimal::ZERO), FulfillmentStatus::Unfilled);
    assert_eq!(classify(five, Decimal::from(3)), FulfillmentStatus::PartiallyFilled);
    assert_eq!(classify(five, five), FulfillmentStatus::Filled);
    assert_eq!(classify(five, Decimal::from(6)), FulfillmentStatus::OverAllocated);
}

#[test]
fn dates_past_the_supported_calendar_are_rejected() {
    let far = demand(1, Decimal::ONE, date(2024, 1, 1), NaiveDate::MAX);
    assert!(matches!(
        aggregate(&[far], &[], PeriodGranularity::Monthly),
        Err(PlanningError::UnsupportedDate { .. })
    ));

    let last = demand(2, Decimal::ONE, date(9999, 12, 1), date(9999, 12, 31));
    let rows = aggregate(&[last], &[], PeriodGranularity::Annual).expect("aggregation");
    assert_eq!(rows[0].period_label, "9999");
    assert_eq!(rows[0].fte_demand, fte("0.085"));
}
