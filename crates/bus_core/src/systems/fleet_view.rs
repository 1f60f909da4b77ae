use bevy_ecs::prelude::{Entity, Query, ResMut};

use crate::collision::{BusView, FleetView, TrafficRole};
use crate::demand::DemandQueue;
use crate::ecs::{Bus, BusState, Position};

/// Rebuilds the start-of-tick [FleetView] that every bus decides against.
pub fn refresh_fleet_view_system(
    mut fleet: ResMut<FleetView>,
    buses: Query<(Entity, &Bus, &BusState, &Position)>,
    queues: Query<&DemandQueue>,
) {
    fleet.clear();
    for (entity, bus, state, position) in buses.iter() {
        fleet.insert(BusView::new(
            entity,
            TrafficRole::of(state, bus.route_t),
            position.0,
        ));
    }
    for queue in queues.iter() {
        queue.tally_into(fleet.waiting_mut());
    }
}
