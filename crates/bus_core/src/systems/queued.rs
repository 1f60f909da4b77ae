//! Buses waiting in a slot: entry and re-slot animations, then hand-off to merging once launched.

use bevy_ecs::prelude::{Query, Res, ResMut, With};

use crate::clock::SimulationClock;
use crate::dispatcher::Dispatcher;
use crate::ecs::{Bus, BusState, MergePhase, Position};
use crate::motion::Tween;
use crate::scenario::BusTuning;

pub fn queued_bus_system(
    clock: Res<SimulationClock>,
    tuning: Res<BusTuning>,
    mut dispatcher: ResMut<Dispatcher>,
    mut buses: Query<(&mut BusState, &mut Position), With<Bus>>,
) {
    for shift in dispatcher.drain_moves() {
        let Ok((mut state, position)) = buses.get_mut(shift.bus) else {
            continue;
        };
        if let BusState::Queued { tween, .. } = &mut *state {
            *tween = Some(Tween::new(position.0, shift.position, tuning.slot_shift_ms));
        }
    }

    let dt_ms = clock.tick_ms();
    for (mut state, mut position) in buses.iter_mut() {
        if !matches!(*state, BusState::Queued { .. }) {
            continue;
        }
        let ready = match &mut *state {
            BusState::Queued {
                tween,
                launch_accepted,
            } => {
                if let Some(active) = tween.as_mut() {
                    position.0 = active.step(dt_ms);
                    if active.is_finished() {
                        *tween = None;
                    }
                    false
                } else {
                    *launch_accepted
                }
            }
            _ => continue,
        };
        if ready {
            *state = BusState::Merging(MergePhase::AwaitingClearance { retry_in_ms: 0 });
        }
    }
}
