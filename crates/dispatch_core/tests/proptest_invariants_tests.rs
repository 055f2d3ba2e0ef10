mod support;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bevy_ecs::prelude::World;
use dispatch_core::config::{DispatchConfig, Goal, StrategyKind};
use dispatch_core::events::DispatchEvent;
use dispatch_core::model::{secs, RequestId, SimTime, VehicleId};
use dispatch_core::network::{GridNetwork, GridParams};
use dispatch_core::scenario::{
    build_scenario, random_demand, random_fleet, ScenarioParams,
};
use dispatch_core::telemetry::{EventLog, RideEventKind};
use proptest::prelude::*;

use support::schedule::ScheduleRunner;

#[derive(Debug, Clone)]
struct Case {
    seed: u64,
    vehicles: usize,
    passengers: usize,
    strategy: StrategyKind,
    goal: Goal,
    delay_secs: u64,
    step_secs: u64,
    max_search_secs: u64,
}

fn case() -> impl Strategy<Value = Case> {
    (
        any::<u64>(),
        1usize..6,
        1usize..16,
        prop_oneof![Just(StrategyKind::RuleBased), Just(StrategyKind::Assignment)],
        prop_oneof![
            Just(Goal::MinWaitTime),
            Just(Goal::MinPickupTime),
            Just(Goal::DemandSupplyEquil)
        ],
        prop_oneof![Just(0u64), Just(5), Just(20)],
        prop_oneof![Just(1u64), Just(5), Just(15)],
        30u64..180,
    )
        .prop_map(
            |(seed, vehicles, passengers, strategy, goal, delay_secs, step_secs, max_search_secs)| {
                Case {
                    seed,
                    vehicles,
                    passengers,
                    strategy,
                    goal,
                    delay_secs,
                    step_secs,
                    max_search_secs,
                }
            },
        )
}

fn run(case: &Case) -> World {
    let network = Arc::new(GridNetwork::grid(4, 4, GridParams::default()));
    let vehicles = random_fleet(&network, case.vehicles, 3_000, case.seed);
    let passengers = random_demand(&network, case.passengers, 300, case.seed);
    let dispatch = DispatchConfig::default()
        .with_strategy(case.strategy)
        .with_goal(case.goal)
        .with_confirmation_delay_secs(case.delay_secs)
        .with_reoptimization_step_secs(case.step_secs);
    let params = ScenarioParams::default()
        .with_dispatch(dispatch)
        .with_max_search_secs(case.max_search_secs);

    let mut world = World::new();
    build_scenario(&mut world, network, &vehicles, &passengers, params).expect("scenario");
    ScheduleRunner::new().run_full(&mut world);
    world
}

/// Replays confirmation events and fails on a second open confirmation for
/// the same request or vehicle, or on a timer completion before the delay.
fn check_confirmations(log: &EventLog, delay: SimTime) -> Result<(), TestCaseError> {
    let mut open_requests: HashMap<RequestId, SimTime> = HashMap::new();
    let mut open_vehicles: HashSet<VehicleId> = HashSet::new();
    for event in log.dispatch_events() {
        match *event {
            DispatchEvent::ConfirmationCreated {
                time,
                request,
                vehicle,
                ..
            } => {
                prop_assert!(
                    open_requests.insert(request, time).is_none(),
                    "{request} has two open confirmations"
                );
                prop_assert!(
                    open_vehicles.insert(vehicle),
                    "{vehicle} has two open confirmations"
                );
            }
            DispatchEvent::ConfirmationCompleted {
                time,
                request,
                vehicle,
                accepted,
                ..
            } => {
                let created = open_requests.remove(&request);
                prop_assert!(created.is_some(), "{request} completed without being opened");
                prop_assert!(open_vehicles.remove(&vehicle));
                if accepted {
                    prop_assert!(time >= created.unwrap_or(0) + delay);
                }
            }
        }
    }
    prop_assert!(open_requests.is_empty());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn dispatch_invariants_hold(case in case()) {
        let world = run(&case);
        let log = world.resource::<EventLog>();
        check_confirmations(log, secs(case.delay_secs))?;

        let records = log.ride_records();
        prop_assert_eq!(records.len(), case.passengers);
        for (id, record) in &records {
            let submitted = record.submitted_at.expect("submitted");
            let deadline = submitted + secs(case.max_search_secs);
            match (record.scheduled_at, record.rejected_at) {
                (Some(at), None) => {
                    prop_assert!(at < deadline, "{id} committed after its deadline");
                    prop_assert!(record.is_completed(), "{id} never dropped off");
                }
                (None, Some(at)) => prop_assert_eq!(at, deadline),
                other => prop_assert!(false, "{} ended as {:?}", id, other),
            }
        }

        let scheduled = log
            .ride_events()
            .filter(|e| e.kind == RideEventKind::Scheduled)
            .count();
        let unique: HashSet<_> = log
            .ride_events()
            .filter(|e| e.kind == RideEventKind::Scheduled)
            .map(|e| e.request)
            .collect();
        prop_assert_eq!(scheduled, unique.len(), "a request was committed twice");
    }
}
