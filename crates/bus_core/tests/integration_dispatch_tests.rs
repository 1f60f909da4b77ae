mod support;

use bevy_ecs::prelude::World;
use bus_core::clock::SimulationClock;
use bus_core::dispatcher::Dispatcher;
use bus_core::ecs::{BusState, PassengerColor, Position};
use bus_core::launch::{try_launch_bus, LaunchResponse};
use bus_core::presentation::{PresentationEvent, RecordingPresentation};
use bus_core::telemetry::SimTelemetry;
use bus_core::test_helpers::single_batch_level;

use support::schedule::ScheduleRunner;
use support::world::{buses, TestWorldBuilder};

/// One second at the default 20 ms tick.
const ONE_SECOND: usize = 50;

fn occupant(world: &World, slot: usize) -> Option<bevy_ecs::prelude::Entity> {
    world.resource::<Dispatcher>().occupant(slot)
}

#[test]
fn schedule_is_sized_from_demand() {
    let world = TestWorldBuilder::new()
        .with_config(single_batch_level(PassengerColor::Red, 12))
        .build();
    let dispatcher = world.resource::<Dispatcher>();
    assert_eq!(dispatcher.pending_count(), 3);
    assert!(dispatcher.schedule().all(|c| *c == PassengerColor::Red));
}

#[test]
fn same_seed_gives_same_schedule() {
    let config = bus_core::test_helpers::two_color_level();
    let first: Vec<_> = TestWorldBuilder::new()
        .with_config(config.clone())
        .build()
        .resource::<Dispatcher>()
        .schedule()
        .copied()
        .collect();
    let second: Vec<_> = TestWorldBuilder::new()
        .with_config(config)
        .build()
        .resource::<Dispatcher>()
        .schedule()
        .copied()
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn spawns_one_bus_per_second_into_lowest_free_slot() {
    let mut world = TestWorldBuilder::new()
        .with_config(single_batch_level(PassengerColor::Red, 15))
        .build();
    let mut runner = ScheduleRunner::new();

    runner.ticks(&mut world, ONE_SECOND - 1);
    assert!(occupant(&world, 0).is_none(), "nothing before the initial delay");

    runner.tick(&mut world);
    assert_eq!(world.resource::<SimulationClock>().now(), 1000);
    assert!(occupant(&world, 0).is_some());
    assert!(occupant(&world, 1).is_none());

    runner.ticks(&mut world, ONE_SECOND);
    assert!(occupant(&world, 1).is_some());

    runner.ticks(&mut world, ONE_SECOND);
    assert!(occupant(&world, 2).is_some());
    assert_eq!(world.resource::<Dispatcher>().pending_count(), 0);
    assert_eq!(world.resource::<SimTelemetry>().buses_spawned, 3);

    // A new bus slides in from behind its slot over 1.5 s and faces the route.
    runner.ticks(&mut world, 2 * ONE_SECOND);
    let slot_2 = occupant(&world, 2).expect("slot 2 bus");
    let spot = world.resource::<Dispatcher>().slot_position(2).expect("spot");
    assert_eq!(world.get::<Position>(slot_2).expect("position").0, spot);
}

#[test]
fn admission_gate_rejects_without_side_effects() {
    let recorder = RecordingPresentation::default();
    let mut world = TestWorldBuilder::new()
        .with_config(single_batch_level(PassengerColor::Green, 10).with_max_active(1))
        .with_recorder(&recorder)
        .build();
    let mut runner = ScheduleRunner::new();
    runner.ticks(&mut world, 2 * ONE_SECOND);

    let first = occupant(&world, 0).expect("first bus");
    let second = occupant(&world, 1).expect("second bus");

    assert_eq!(try_launch_bus(&mut world, first), LaunchResponse::Accepted);
    assert_eq!(world.resource::<Dispatcher>().active_count(), 1);

    assert_eq!(try_launch_bus(&mut world, second), LaunchResponse::GateClosed);
    assert_eq!(world.resource::<Dispatcher>().active_count(), 1);
    assert!(matches!(
        world.get::<BusState>(second),
        Some(BusState::Queued {
            launch_accepted: false,
            ..
        })
    ));

    assert_eq!(
        try_launch_bus(&mut world, first),
        LaunchResponse::AlreadyLaunched
    );
    assert_eq!(world.resource::<Dispatcher>().active_count(), 1);

    let telemetry = world.resource::<SimTelemetry>();
    assert_eq!(telemetry.launches_accepted, 1);
    assert_eq!(telemetry.launches_rejected, 1);
    assert_eq!(
        recorder.count(|e| matches!(
            e,
            PresentationEvent::LaunchRejected {
                reason: LaunchResponse::GateClosed,
                ..
            }
        )),
        1
    );
}

#[test]
fn only_front_slots_may_launch() {
    let mut world = TestWorldBuilder::new()
        .with_config(single_batch_level(PassengerColor::Yellow, 15))
        .build();
    let mut runner = ScheduleRunner::new();
    runner.ticks(&mut world, 3 * ONE_SECOND);

    let back = occupant(&world, 2).expect("slot 2 bus");
    assert_eq!(try_launch_bus(&mut world, back), LaunchResponse::NotAtFront);
    assert_eq!(world.resource::<Dispatcher>().active_count(), 0);

    let stranger = world.spawn_empty().id();
    assert_eq!(try_launch_bus(&mut world, stranger), LaunchResponse::UnknownBus);
}

#[test]
fn merging_bus_frees_its_slot_and_its_lane_moves_up() {
    let mut world = TestWorldBuilder::new()
        .with_config(single_batch_level(PassengerColor::Red, 15))
        .build();
    let mut runner = ScheduleRunner::new();
    runner.ticks(&mut world, 4 * ONE_SECOND);

    let front_left = occupant(&world, 0).expect("slot 0");
    let front_right = occupant(&world, 1).expect("slot 1");
    let back_left = occupant(&world, 2).expect("slot 2");
    assert_eq!(try_launch_bus(&mut world, front_left), LaunchResponse::Accepted);

    let merged = runner.run_until(&mut world, 5 * ONE_SECOND, |world| {
        matches!(world.get::<BusState>(front_left), Some(BusState::OnRoute))
    });
    assert!(merged.is_some(), "launched bus should reach the route");

    assert_eq!(occupant(&world, 0), Some(back_left), "left lane moved up");
    assert_eq!(occupant(&world, 1), Some(front_right), "right lane untouched");
    assert_eq!(occupant(&world, 2), None);

    runner.ticks(&mut world, ONE_SECOND);
    let spot = world.resource::<Dispatcher>().slot_position(0).expect("spot");
    assert_eq!(world.get::<Position>(back_left).expect("position").0, spot);

    assert!(buses(&mut world)
        .iter()
        .all(|(_, _, state)| !matches!(state, BusState::Merging(_))));
}
