//! Dispatcher: demand-sized production schedule, waiting slots, admission gate
//! and merge lock.
//!
//! Waiting slots form two interleaved lanes: even indices are lane 0 and odd
//! indices are lane 1. Slots 0 and 1 are the front of each lane and the only
//! ones a bus may launch from.

use std::collections::{BTreeMap, VecDeque};

use bevy_ecs::prelude::{Entity, Resource};
use bevy_math::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::ecs::PassengerColor;

pub const LANE_COUNT: usize = 2;

/// Lane of a slot index.
pub fn lane_of(slot: usize) -> usize {
    slot % LANE_COUNT
}

/// Slot indices from which a launch request is honored.
pub fn is_front_slot(slot: usize) -> bool {
    slot < LANE_COUNT
}

/// Buses needed per color: `ceil(count / capacity)`, priority colors first,
/// then the remaining colors in color order. Unshuffled.
pub fn plan_fleet(
    tally: &BTreeMap<PassengerColor, usize>,
    priority: &[PassengerColor],
    capacity: usize,
) -> Vec<PassengerColor> {
    let capacity = capacity.max(1);
    let mut remaining = tally.clone();
    let mut fleet = Vec::new();

    for color in priority {
        if let Some(total) = remaining.get_mut(color) {
            let needed = total.div_ceil(capacity);
            fleet.extend(std::iter::repeat(*color).take(needed));
            *total = 0;
        }
    }

    for (color, total) in remaining {
        if total > 0 {
            fleet.extend(std::iter::repeat(color).take(total.div_ceil(capacity)));
        }
    }

    fleet
}

/// Fixed-size fleet cycling through `priority`, or random colors when it is empty.
pub fn override_fleet<R: Rng>(
    count: usize,
    priority: &[PassengerColor],
    rng: &mut R,
) -> Vec<PassengerColor> {
    (0..count)
        .map(|i| {
            if priority.is_empty() {
                PassengerColor::ALL[rng.gen_range(0..PassengerColor::ALL.len())]
            } else {
                priority[i % priority.len()]
            }
        })
        .collect()
}

/// A queued bus pulled forward by lane compaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotMove {
    pub bus: Entity,
    pub from: usize,
    pub to: usize,
    pub position: Vec3,
}

#[derive(Debug, Resource)]
pub struct Dispatcher {
    schedule: VecDeque<PassengerColor>,
    slots: Vec<Option<Entity>>,
    slot_positions: Vec<Vec3>,
    active_count: usize,
    max_active: usize,
    merge_lock: Option<Entity>,
    pending_moves: Vec<SlotMove>,
}

impl Dispatcher {
    pub fn new(slot_positions: Vec<Vec3>, max_active: usize) -> Self {
        Self {
            schedule: VecDeque::new(),
            slots: vec![None; slot_positions.len()],
            slot_positions,
            active_count: 0,
            max_active,
            merge_lock: None,
            pending_moves: Vec::new(),
        }
    }

    /// Replaces the schedule with the demand-sized fleet in shuffled order.
    pub fn compute_schedule<R: Rng>(
        &mut self,
        tally: &BTreeMap<PassengerColor, usize>,
        priority: &[PassengerColor],
        capacity: usize,
        rng: &mut R,
    ) {
        let mut fleet = plan_fleet(tally, priority, capacity);
        if fleet.is_empty() {
            warn!("no waiting passengers found; no buses scheduled");
        }
        fleet.shuffle(rng);
        self.set_schedule(fleet);
        info!(buses = self.schedule.len(), "bus schedule computed");
    }

    pub fn set_schedule(&mut self, colors: Vec<PassengerColor>) {
        self.schedule = colors.into();
    }

    pub fn schedule(&self) -> impl Iterator<Item = &PassengerColor> {
        self.schedule.iter()
    }

    pub fn has_pending(&self) -> bool {
        !self.schedule.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.schedule.len()
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Dequeues the next color if a slot is free, reserving that slot.
    ///
    /// The caller must follow up with [Dispatcher::occupy] once the bus exists.
    pub fn next_spawn(&mut self) -> Option<(PassengerColor, usize)> {
        let slot = self.first_free_slot()?;
        let color = self.schedule.pop_front()?;
        Some((color, slot))
    }

    pub fn occupy(&mut self, slot: usize, bus: Entity) {
        debug_assert!(self.slots[slot].is_none(), "slot {slot} already occupied");
        self.slots[slot] = Some(bus);
    }

    pub fn slot_of(&self, bus: Entity) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(bus))
    }

    pub fn occupant(&self, slot: usize) -> Option<Entity> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn slot_position(&self, slot: usize) -> Option<Vec3> {
        self.slot_positions.get(slot).copied()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn queued_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Admission gate. Takes a capacity token iff fewer than `max_active` are out.
    pub fn request_launch(&mut self) -> bool {
        if self.active_count < self.max_active {
            self.active_count += 1;
            true
        } else {
            false
        }
    }

    /// Returns the token of a departed bus.
    pub fn release_launch(&mut self) {
        self.active_count = self.active_count.saturating_sub(1);
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }

    pub fn can_launch(&self) -> bool {
        self.active_count < self.max_active
    }

    /// Non-blocking merge lock; re-entrant for the current holder.
    pub fn try_lock_entry(&mut self, bus: Entity) -> bool {
        match self.merge_lock {
            None => {
                self.merge_lock = Some(bus);
                true
            }
            Some(holder) => holder == bus,
        }
    }

    pub fn unlock_entry(&mut self, bus: Entity) {
        if self.merge_lock == Some(bus) {
            self.merge_lock = None;
        }
    }

    pub fn merge_lock_holder(&self) -> Option<Entity> {
        self.merge_lock
    }

    /// Frees the slot of a bus that has merged onto the route and compacts its lane.
    pub fn leave_queue(&mut self, bus: Entity) {
        let Some(slot) = self.slot_of(bus) else {
            return;
        };
        self.slots[slot] = None;
        self.compact_lane(slot);
    }

    /// Pulls every occupied slot behind `freed` in the same lane forward,
    /// keeping their relative order. The other lane is untouched.
    fn compact_lane(&mut self, freed: usize) {
        let lane_slots: Vec<usize> = (freed..self.slots.len())
            .step_by(LANE_COUNT)
            .collect();
        let occupants: Vec<(usize, Entity)> = lane_slots
            .iter()
            .filter_map(|&slot| self.slots[slot].map(|bus| (slot, bus)))
            .collect();

        for &slot in &lane_slots {
            self.slots[slot] = None;
        }
        for (&target, (source, bus)) in lane_slots.iter().zip(occupants) {
            self.slots[target] = Some(bus);
            if source != target {
                debug!(?bus, from = source, to = target, "bus moved up its lane");
                self.pending_moves.push(SlotMove {
                    bus,
                    from: source,
                    to: target,
                    position: self.slot_positions[target],
                });
            }
        }
    }

    /// Slot moves produced by compaction since the last call.
    pub fn drain_moves(&mut self) -> Vec<SlotMove> {
        std::mem::take(&mut self.pending_moves)
    }

    /// Drops a bus from every piece of dispatcher bookkeeping.
    pub fn forget(&mut self, bus: Entity) {
        if let Some(slot) = self.slot_of(bus) {
            self.slots[slot] = None;
        }
        self.unlock_entry(bus);
    }
}
