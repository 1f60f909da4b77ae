//! Simulation runner: advances the clock one tick at a time and runs the schedule.
//!
//! Clock progression happens here, outside systems. Each tick advances
//! [SimulationClock] by its tick length, moves every event that fell due into
//! [DueEvents], then runs the schedule once.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{DueEvents, EventKind, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::level::LevelStatus;
use crate::scenario::DispatchTiming;
use crate::systems::{
    boarding::{passenger_boarding_system, queue_layout_system},
    bus_spawner::bus_spawner_system,
    departure::departure_system,
    exit::exiting_bus_system,
    fleet_view::refresh_fleet_view_system,
    level_status::level_status_system,
    loading::loading_bus_system,
    merging::merging_bus_system,
    presentation_sync::presentation_sync_system,
    queued::queued_bus_system,
    route_follow::route_follow_system,
    spatial_index::{update_spatial_index_buses_system, update_spatial_index_queues_system},
    telemetry_snapshot::capture_snapshot_system,
};
use crate::telemetry::{SimSnapshotConfig, SimSnapshots};

fn is_spawn_due(events: Option<Res<DueEvents>>) -> bool {
    events
        .map(|e| e.contains(EventKind::SpawnBus))
        .unwrap_or(false)
}

fn is_level_check_due(events: Option<Res<DueEvents>>) -> bool {
    events
        .map(|e| e.contains(EventKind::CheckLevelStatus))
        .unwrap_or(false)
}

/// Condition: telemetry snapshot interval has elapsed.
fn should_capture_snapshot(
    clock: Option<Res<SimulationClock>>,
    config: Option<Res<SimSnapshotConfig>>,
    snapshots: Option<Res<SimSnapshots>>,
) -> bool {
    let (Some(clock), Some(config), Some(snapshots)) = (clock, config, snapshots) else {
        return false;
    };
    match snapshots.last_snapshot_at {
        None => true,
        Some(last) => clock.now().saturating_sub(last) >= config.interval_ms,
    }
}

/// Builds the per-tick schedule.
///
/// Order matters: spawns land first, the spatial index and fleet view are
/// refreshed from that state, then each bus state advances in lifecycle
/// order. Departures are applied before the queue layout and level check.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems(
        (
            (
                bus_spawner_system.run_if(is_spawn_due),
                apply_deferred,
                update_spatial_index_buses_system,
                update_spatial_index_queues_system,
                refresh_fleet_view_system,
            )
                .chain(),
            (
                queued_bus_system,
                merging_bus_system,
                route_follow_system,
                loading_bus_system,
                passenger_boarding_system,
                exiting_bus_system,
                departure_system,
            )
                .chain(),
            (
                apply_deferred,
                queue_layout_system,
                level_status_system.run_if(is_level_check_due),
                presentation_sync_system,
                capture_snapshot_system.run_if(should_capture_snapshot),
            )
                .chain(),
        )
            .chain(),
    );

    schedule
}

/// Arms the first spawn. A level with nothing scheduled is judged on the first tick.
/// Call after [crate::scenario::build_level] and before running ticks.
pub fn initialize_simulation(world: &mut World) {
    let delay = world
        .get_resource::<DispatchTiming>()
        .map(|t| t.initial_spawn_delay_ms)
        .unwrap_or_default();
    let has_pending = world
        .get_resource::<Dispatcher>()
        .map(Dispatcher::has_pending)
        .unwrap_or(false);

    let mut clock = world.resource_mut::<SimulationClock>();
    if has_pending {
        clock.schedule_in(delay, EventKind::SpawnBus);
    } else {
        clock.schedule_in(0, EventKind::CheckLevelStatus);
    }
}

/// Runs one tick: advance the clock, collect due events, run the schedule.
pub fn run_tick(world: &mut World, schedule: &mut Schedule) {
    let due = {
        let mut clock = world.resource_mut::<SimulationClock>();
        clock.advance();
        let mut due = Vec::new();
        while let Some(event) = clock.pop_due() {
            due.push(event.kind);
        }
        due
    };
    world.insert_resource(DueEvents(due));
    schedule.run(world);
}

/// Runs `ticks` ticks. Returns the number run.
pub fn run_ticks(world: &mut World, schedule: &mut Schedule, ticks: usize) -> usize {
    for _ in 0..ticks {
        run_tick(world, schedule);
    }
    ticks
}

fn level_status(world: &World) -> LevelStatus {
    world
        .get_resource::<LevelStatus>()
        .copied()
        .unwrap_or_default()
}

/// Runs until the level is decided or `max_ticks` elapse. Returns the
/// verdict, or `None` if the level is still running.
pub fn run_until_outcome(
    world: &mut World,
    schedule: &mut Schedule,
    max_ticks: usize,
) -> Option<LevelStatus> {
    run_until_outcome_with_hook(world, schedule, max_ticks, |_| {})
}

/// Like [run_until_outcome], invoking `hook` before every tick; the hook is
/// where a driver issues launch requests.
pub fn run_until_outcome_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    max_ticks: usize,
    mut hook: F,
) -> Option<LevelStatus>
where
    F: FnMut(&mut World),
{
    for _ in 0..max_ticks {
        let status = level_status(world);
        if status.is_finished() {
            return Some(status);
        }
        hook(world);
        run_tick(world, schedule);
    }
    let status = level_status(world);
    status.is_finished().then_some(status)
}
