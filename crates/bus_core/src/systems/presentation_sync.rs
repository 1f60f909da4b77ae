use bevy_ecs::prelude::{Changed, Entity, Or, Query, ResMut};

use crate::ecs::{Bus, Heading, Position};
use crate::presentation::Presentation;

/// Forwards the pose of every bus that moved or turned this tick.
pub fn presentation_sync_system(
    mut presentation: ResMut<Presentation>,
    moved: Query<(Entity, &Bus, &Position, &Heading), Or<(Changed<Position>, Changed<Heading>)>>,
) {
    for (entity, bus, position, heading) in moved.iter() {
        presentation.bus_pose(entity, position.0, heading.0, bus.color);
    }
}
