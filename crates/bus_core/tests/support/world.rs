use bevy_ecs::prelude::{Entity, World};
use bus_core::ecs::{Bus, BusState, PassengerColor};
use bus_core::presentation::{Presentation, RecordingPresentation};
use bus_core::runner::initialize_simulation;
use bus_core::scenario::{build_level, LevelConfig};
use bus_core::test_helpers::empty_level;

/// Builder for a ready-to-run level world.
pub struct TestWorldBuilder {
    config: LevelConfig,
    recorder: Option<RecordingPresentation>,
    initialize: bool,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self {
            config: empty_level(),
            recorder: None,
            initialize: true,
        }
    }

    pub fn with_config(mut self, config: LevelConfig) -> Self {
        self.config = config;
        self
    }

    /// Routes presentation events into `recorder`; keep a clone to inspect them.
    pub fn with_recorder(mut self, recorder: &RecordingPresentation) -> Self {
        self.recorder = Some(recorder.clone());
        self
    }

    /// Leaves the first spawn unscheduled.
    pub fn without_initialize(mut self) -> Self {
        self.initialize = false;
        self
    }

    pub fn build(self) -> World {
        let mut world = World::new();
        if let Some(recorder) = self.recorder {
            world.insert_resource(Presentation::new(recorder));
        }
        build_level(&mut world, &self.config).expect("test level should be valid");
        if self.initialize {
            initialize_simulation(&mut world);
        }
        world
    }
}

/// Every bus with its state, in entity order.
pub fn buses(world: &mut World) -> Vec<(Entity, Bus, BusState)> {
    let mut all: Vec<_> = world
        .query::<(Entity, &Bus, &BusState)>()
        .iter(world)
        .map(|(entity, bus, state)| (entity, bus.clone(), state.clone()))
        .collect();
    all.sort_by_key(|(entity, _, _)| entity.to_bits());
    all
}

pub fn bus_of_color(world: &mut World, color: PassengerColor) -> Option<Entity> {
    buses(world)
        .into_iter()
        .find(|(_, bus, _)| bus.color == color)
        .map(|(entity, _, _)| entity)
}
