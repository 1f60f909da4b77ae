//! Play a level with every front bus launched as soon as it is ready, then
//! print departures and counters.
//!
//! Run with: cargo run -p bus_core --example level_run [path/to/level.json]
//! Set RUST_LOG=bus_core=debug for per-bus tracing.

use bevy_ecs::prelude::World;
use bus_core::clock::SimulationClock;
use bus_core::launch::launch_ready_buses;
use bus_core::runner::{initialize_simulation, run_until_outcome_with_hook, simulation_schedule};
use bus_core::scenario::{build_level, LevelConfig};
use bus_core::telemetry::SimTelemetry;
use bus_core::test_helpers::two_color_level;
use tracing_subscriber::EnvFilter;

const MAX_TICKS: usize = 50 * 60 * 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bus_core=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => LevelConfig::from_path(path)?,
        None => two_color_level(),
    };

    let mut world = World::new();
    build_level(&mut world, &config)?;
    initialize_simulation(&mut world);
    let mut schedule = simulation_schedule();

    let outcome = run_until_outcome_with_hook(&mut world, &mut schedule, MAX_TICKS, |world| {
        launch_ready_buses(world);
    });

    let now = world.resource::<SimulationClock>().now();
    let telemetry = world.resource::<SimTelemetry>();

    println!("--- Level {} ---", config.level_number);
    match outcome {
        Some(status) => println!("Outcome: {status:?} after {:.1} s", now as f64 / 1000.0),
        None => println!("Still running after {:.1} s", now as f64 / 1000.0),
    }
    println!("Buses spawned: {}", telemetry.buses_spawned);
    println!(
        "Launches: {} accepted, {} rejected",
        telemetry.launches_accepted, telemetry.launches_rejected
    );
    println!(
        "Passengers: {} boarded, {} delivered, {} boarding timeouts",
        telemetry.boardings,
        telemetry.passengers_delivered(),
        telemetry.boarding_timeouts
    );

    for (i, record) in telemetry.departures.iter().enumerate() {
        println!(
            "  {:>2}  {:?}  {}/{}  queued={}  on_route={}{}",
            i + 1,
            record.color,
            record.passengers,
            record.capacity,
            seconds(record.time_in_queue()),
            seconds(record.time_on_route()),
            if record.is_full() { "" } else { "  (partial)" },
        );
    }
    Ok(())
}

fn seconds(ms: Option<u64>) -> String {
    ms.map(|ms| format!("{:.1} s", ms as f64 / 1000.0))
        .unwrap_or_else(|| "-".to_string())
}
