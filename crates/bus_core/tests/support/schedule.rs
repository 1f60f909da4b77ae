use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use bus_core::launch::launch_ready_buses;
use bus_core::level::LevelStatus;
use bus_core::runner::{run_tick, run_until_outcome_with_hook, simulation_schedule};

/// Owns a reusable `Schedule` so tests can step the simulation tick by tick.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    pub fn tick(&mut self, world: &mut World) {
        run_tick(world, &mut self.schedule);
    }

    pub fn ticks(&mut self, world: &mut World, count: usize) {
        for _ in 0..count {
            self.tick(world);
        }
    }

    /// Ticks until `done` holds, giving up after `max_ticks`. Returns the
    /// number of ticks taken.
    pub fn run_until<F>(&mut self, world: &mut World, max_ticks: usize, mut done: F) -> Option<usize>
    where
        F: FnMut(&mut World) -> bool,
    {
        for taken in 0..max_ticks {
            if done(world) {
                return Some(taken);
            }
            self.tick(world);
        }
        done(world).then_some(max_ticks)
    }

    /// Plays the level with an auto-launch policy until it is decided.
    pub fn play(&mut self, world: &mut World, max_ticks: usize) -> Option<LevelStatus> {
        run_until_outcome_with_hook(world, &mut self.schedule, max_ticks, |world| {
            launch_ready_buses(world);
        })
    }

    /// Like [ScheduleRunner::play], calling `inspect` after every tick.
    pub fn play_inspecting<F>(
        &mut self,
        world: &mut World,
        max_ticks: usize,
        mut inspect: F,
    ) -> Option<LevelStatus>
    where
        F: FnMut(&mut World),
    {
        for _ in 0..max_ticks {
            let status = *world.resource::<LevelStatus>();
            if status.is_finished() {
                return Some(status);
            }
            launch_ready_buses(world);
            self.tick(world);
            inspect(world);
        }
        let status = *world.resource::<LevelStatus>();
        status.is_finished().then_some(status)
    }
}
