use super::common::*;
use rust_decimal::Decimal;

use crate::planning::domain::{DemandStatus, PersonId, ProjectId};
use crate::planning::repository::RepositoryError;
use crate::planning::{
    AggregationOptions, BreakdownQuery, FulfillmentStatus, ImportKind, PeriodGranularity,
    PersonBreakdown, PlanningError, RecordKind, ServiceError, UnlinkedAllocationPolicy,
};

#[test]
fn demand_status_tracks_linked_allocations() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    assert_eq!(fixture.demand.status, DemandStatus::Unfilled);

    let first = service
        .create_allocation(allocation_input(fixture.person.id, &fixture.demand, Decimal::ONE))
        .expect("allocation created");
    let demand = service.get_demand(fixture.demand.id).expect("demand");
    assert_eq!(demand.status, DemandStatus::PartiallyFilled);

    let second_person = service
        .create_person(person_input("Grace", "Data Engineer", None))
        .expect("person");
    service
        .create_allocation(allocation_input(second_person.id, &fixture.demand, Decimal::ONE))
        .expect("second allocation");
    let demand = service.get_demand(fixture.demand.id).expect("demand");
    assert_eq!(demand.status, DemandStatus::Filled);

    service
        .delete_allocation(first.id)
        .expect("allocation deleted");
    let demand = service.get_demand(fixture.demand.id).expect("demand");
    assert_eq!(demand.status, DemandStatus::PartiallyFilled);
}

#[test]
fn moving_an_allocation_refreshes_both_demands() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    let other = service
        .create_demand(demand_input(
            fixture.project.id,
            Decimal::ONE,
            date(2024, 2, 1),
            date(2024, 2, 29),
        ))
        .expect("second demand");

    let allocation = service
        .create_allocation(allocation_input(fixture.person.id, &fixture.demand, Decimal::from(2)))
        .expect("allocation");
    assert_eq!(
        service.get_demand(fixture.demand.id).expect("demand").status,
        DemandStatus::Filled
    );

    service
        .update_allocation(allocation.id, allocation_input(fixture.person.id, &other, Decimal::ONE))
        .expect("allocation moved");

    assert_eq!(
        service.get_demand(fixture.demand.id).expect("demand").status,
        DemandStatus::Unfilled
    );
    assert_eq!(
        service.get_demand(other.id).expect("demand").status,
        DemandStatus::Filled
    );
}

#[test]
fn demand_with_allocations_cannot_change_project() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    let borealis = service
        .create_project(project_input("Borealis"))
        .expect("project");
    service
        .create_allocation(allocation_input(fixture.person.id, &fixture.demand, Decimal::ONE))
        .expect("allocation");

    let moved = demand_input(
        borealis.id,
        Decimal::from(2),
        fixture.demand.start_date,
        fixture.demand.end_date,
    );
    match service.update_demand(fixture.demand.id, moved) {
        Err(ServiceError::InUse {
            dependents, count, ..
        }) => {
            assert_eq!(dependents, RecordKind::Allocation);
            assert_eq!(count, 1);
        }
        other => panic!("expected in-use error, got {other:?}"),
    }
    assert_eq!(
        service.get_demand(fixture.demand.id).expect("demand").project_id,
        fixture.project.id
    );

    // Same project, smaller requirement: the stored status follows the linked allocation.
    let shrunk = demand_input(
        fixture.project.id,
        Decimal::ONE,
        fixture.demand.start_date,
        fixture.demand.end_date,
    );
    let updated = service
        .update_demand(fixture.demand.id, shrunk)
        .expect("demand updated");
    assert_eq!(updated.status, DemandStatus::Filled);
}

#[test]
fn demand_without_allocations_can_change_project() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    let borealis = service
        .create_project(project_input("Borealis"))
        .expect("project");

    let moved = demand_input(
        borealis.id,
        Decimal::from(2),
        fixture.demand.start_date,
        fixture.demand.end_date,
    );
    let updated = service
        .update_demand(fixture.demand.id, moved)
        .expect("demand moved");
    assert_eq!(updated.project_id, borealis.id);
    assert_eq!(updated.status, DemandStatus::Unfilled);
}

#[test]
fn create_rejects_reversed_interval() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);

    let result = service.create_demand(demand_input(
        fixture.project.id,
        Decimal::ONE,
        date(2024, 3, 1),
        date(2024, 2, 1),
    ));
    assert!(matches!(
        result,
        Err(ServiceError::Planning(PlanningError::InvalidInterval { .. }))
    ));
}

#[test]
fn create_rejects_negative_fte() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);

    let result = service.create_allocation(allocation_input(
        fixture.person.id,
        &fixture.demand,
        fte("-0.5"),
    ));
    assert!(matches!(
        result,
        Err(ServiceError::Planning(PlanningError::NegativeFte { .. }))
    ));
}

#[test]
fn create_rejects_unknown_references() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);

    let result = service.create_allocation(allocation_input(
        PersonId(999),
        &fixture.demand,
        Decimal::ONE,
    ));
    match result {
        Err(ServiceError::Planning(PlanningError::UnknownReference { reference, .. })) => {
            assert_eq!(reference.kind, RecordKind::Person);
        }
        other => panic!("expected unknown person reference, got {other:?}"),
    }

    let result = service.create_demand(demand_input(
        ProjectId(999),
        Decimal::ONE,
        date(2024, 1, 1),
        date(2024, 1, 31),
    ));
    assert!(matches!(
        result,
        Err(ServiceError::Planning(PlanningError::UnknownReference { .. }))
    ));
}

#[test]
fn allocation_must_share_its_demand_project() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    let other = service
        .create_project(project_input("Borealis"))
        .expect("project");

    let mut input = allocation_input(fixture.person.id, &fixture.demand, Decimal::ONE);
    input.project_id = other.id;

    assert!(matches!(
        service.create_allocation(input),
        Err(ServiceError::DemandProjectMismatch { .. })
    ));
}

#[test]
fn duplicate_email_is_a_conflict() {
    let (service, _) = build_service();
    service
        .create_person(person_input("Ada", "Analyst", None))
        .expect("first person");

    assert!(matches!(
        service.create_person(person_input("Ada", "Analyst", None)),
        Err(ServiceError::Repository(RepositoryError::Conflict))
    ));
}

#[test]
fn referenced_records_cannot_be_deleted() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    service
        .create_allocation(allocation_input(fixture.person.id, &fixture.demand, Decimal::ONE))
        .expect("allocation");

    match service.delete_project(fixture.project.id) {
        Err(ServiceError::InUse {
            dependents, count, ..
        }) => {
            assert_eq!(dependents, RecordKind::Demand);
            assert_eq!(count, 1);
        }
        other => panic!("expected in-use error, got {other:?}"),
    }
    assert!(matches!(
        service.delete_team(fixture.team.id),
        Err(ServiceError::InUse { .. })
    ));
    assert!(matches!(
        service.delete_person(fixture.person.id),
        Err(ServiceError::InUse { .. })
    ));

    let error = service
        .delete_demand(fixture.demand.id)
        .expect_err("demand in use");
    assert!(error.to_string().contains("1 allocations"));
}

#[test]
fn missing_records_surface_not_found() {
    let (service, _) = build_service();
    assert!(matches!(
        service.get_project(ProjectId(7)),
        Err(ServiceError::Repository(RepositoryError::NotFound))
    ));
    assert!(matches!(
        service.update_project(ProjectId(7), project_input("Ghost")),
        Err(ServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn breakdown_matches_prorated_january_example() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    service
        .create_allocation(allocation_input(fixture.person.id, &fixture.demand, Decimal::ONE))
        .expect("allocation");

    let rows = service
        .breakdown(&BreakdownQuery::default())
        .expect("breakdown");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fte_demand, fte("0.710"));
    assert_eq!(rows[0].fte_allocated, fte("0.355"));
    assert_eq!(rows[0].status, FulfillmentStatus::PartiallyFilled);
}

#[test]
fn breakdown_window_keeps_only_overlapping_periods() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    service
        .create_demand(demand_input(
            fixture.project.id,
            Decimal::ONE,
            date(2024, 1, 1),
            date(2024, 4, 30),
        ))
        .expect("long demand");

    let rows = service
        .breakdown(&BreakdownQuery {
            start: Some(date(2024, 2, 1)),
            end: Some(date(2024, 3, 31)),
            ..BreakdownQuery::default()
        })
        .expect("breakdown");

    let labels: Vec<&str> = rows.iter().map(|row| row.period_label.as_str()).collect();
    assert_eq!(labels, vec!["2024-02", "2024-03"]);
}

#[test]
fn windowed_breakdown_matches_full_breakdown_inside_the_window() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    let quarter = service
        .create_demand(demand_input(
            fixture.project.id,
            Decimal::ONE,
            date(2024, 1, 1),
            date(2024, 3, 31),
        ))
        .expect("quarter demand");

    let mut january = allocation_input(fixture.person.id, &quarter, Decimal::ONE);
    january.end_date = date(2024, 1, 31);
    service.create_allocation(january).expect("january allocation");

    // Runs past the end of its demand, into February.
    let mut overrun = allocation_input(fixture.person.id, &fixture.demand, Decimal::ONE);
    overrun.end_date = date(2024, 2, 29);
    service.create_allocation(overrun).expect("overrunning allocation");

    let (start, end) = (date(2024, 2, 1), date(2024, 3, 31));
    for granularity in PeriodGranularity::ordered() {
        let mut expected = service
            .breakdown(&BreakdownQuery {
                granularity: Some(granularity),
                ..BreakdownQuery::default()
            })
            .expect("full breakdown");
        expected.retain(|row| row.period_end >= start && row.period_start <= end);

        let windowed = service
            .breakdown(&BreakdownQuery {
                start: Some(start),
                end: Some(end),
                granularity: Some(granularity),
                ..BreakdownQuery::default()
            })
            .expect("windowed breakdown");
        assert_eq!(windowed, expected, "{granularity:?}");
    }

    let quarterly = service
        .breakdown(&BreakdownQuery {
            start: Some(start),
            end: Some(end),
            granularity: Some(PeriodGranularity::Quarterly),
            ..BreakdownQuery::default()
        })
        .expect("quarterly breakdown");
    let row = quarterly
        .iter()
        .find(|row| row.demand_id == quarter.id)
        .expect("quarter demand row");
    assert_eq!(row.fte_allocated, fte("0.341"));
    assert_eq!(row.status, FulfillmentStatus::PartiallyFilled);

    let monthly = service
        .breakdown(&BreakdownQuery {
            start: Some(start),
            end: Some(end),
            ..BreakdownQuery::default()
        })
        .expect("monthly breakdown");
    assert!(monthly.iter().any(|row| row.demand_id == fixture.demand.id
        && row.period_label == "2024-02"
        && row.status == FulfillmentStatus::OverAllocated));
}

#[test]
fn breakdown_rejects_dates_outside_the_calendar() {
    let (service, _) = build_service();
    let result = service.breakdown(&BreakdownQuery {
        start: Some(date(2024, 1, 1)),
        end: Some(chrono::NaiveDate::MAX),
        ..BreakdownQuery::default()
    });
    assert!(matches!(result, Err(ServiceError::UnsupportedDate { .. })));

    let fixture = seed_fixture(&service);
    let result = service.create_demand(demand_input(
        fixture.project.id,
        Decimal::ONE,
        date(2024, 1, 1),
        chrono::NaiveDate::MAX,
    ));
    assert!(matches!(
        result,
        Err(ServiceError::Planning(PlanningError::UnsupportedDate { .. }))
    ));
}

#[test]
fn breakdown_rejects_reversed_window() {
    let (service, _) = build_service();
    let result = service.breakdown(&BreakdownQuery {
        start: Some(date(2024, 3, 1)),
        end: Some(date(2024, 1, 1)),
        ..BreakdownQuery::default()
    });
    assert!(matches!(result, Err(ServiceError::InvalidRange { .. })));
}

#[test]
fn breakdown_honours_query_granularity_and_person_split() {
    let (service, _) = build_service();
    let fixture = seed_fixture(&service);
    let grace = service
        .create_person(person_input("Grace", "Data Engineer", None))
        .expect("person");
    for person in [fixture.person.id, grace.id] {
        service
            .create_allocation(allocation_input(person, &fixture.demand, Decimal::ONE))
            .expect("allocation");
    }

    let rows = service
        .breakdown(&BreakdownQuery {
            granularity: Some(PeriodGranularity::Quarterly),
            breakdown: Some(PersonBreakdown::PerPerson),
            ..BreakdownQuery::default()
        })
        .expect("breakdown");

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.period_label == "2024-Q1"));
    assert!(rows.iter().all(|row| row.status == FulfillmentStatus::Filled));
    assert_eq!(rows[0].person_id, Some(fixture.person.id));
    assert_eq!(rows[1].person_id, Some(grace.id));
}

#[test]
fn unlinked_allocation_joins_demand_when_role_matching_is_enabled() {
    let (service, _) = build_service_with(AggregationOptions {
        unlinked: UnlinkedAllocationPolicy::MatchProjectRole,
        ..AggregationOptions::default()
    });
    let fixture = seed_fixture(&service);
    let mut input = allocation_input(fixture.person.id, &fixture.demand, Decimal::from(2));
    input.demand_id = None;
    service.create_allocation(input).expect("unlinked allocation");

    let rows = service
        .breakdown(&BreakdownQuery::default())
        .expect("breakdown");
    assert_eq!(rows[0].status, FulfillmentStatus::Filled);
}

#[test]
fn import_creates_rows_and_reports_failing_line() {
    let (service, _) = build_service();
    let csv = "name,email,role,skills,team_id,capacity,active\n\
               Ada,ada@example.com,Data Engineer,\"Python,SQL\",,0.8,true\n\
               Grace,grace@example.com,Analyst,,,,\n";
    let summary = service
        .import(ImportKind::People, csv.as_bytes())
        .expect("import succeeds");
    assert_eq!(summary.created.len(), 2);

    let people = service
        .list_people(&Default::default())
        .expect("list people");
    assert_eq!(people[0].capacity, fte("0.8"));
    assert_eq!(people[0].skills, vec!["Python".to_string(), "SQL".to_string()]);
    assert_eq!(people[1].capacity, Decimal::ONE);

    let broken = "project_id,fte_required,start_date,end_date\n\
                  999,1,2024-01-01,2024-01-31\n";
    match service.import(ImportKind::Demands, broken.as_bytes()) {
        Err(ServiceError::ImportRow { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected row failure, got {other:?}"),
    }
}
