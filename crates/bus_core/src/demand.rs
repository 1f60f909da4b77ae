//! Demand queues: stations holding ordered batches of same-color passengers.
//!
//! Only the front batch is ever offered to a bus. A later batch of the bus's
//! color waits until every batch in front of it has been cleared, which models
//! "one color boards at a time".

use std::collections::{BTreeMap, VecDeque};

use bevy_ecs::prelude::{Component, Entity};
use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::ecs::PassengerColor;

/// Direction in which batches stack behind the front batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueDirection {
    /// Batches stack toward -Z.
    #[default]
    Vertical,
    /// Batches stack toward +X.
    Horizontal,
}

/// Placement of batches and of passengers within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchLayout {
    pub direction: QueueDirection,
    /// Passengers per row of a batch.
    pub cols: usize,
    pub batch_spacing: f32,
    pub spacing_x: f32,
    pub spacing_z: f32,
}

impl Default for BatchLayout {
    fn default() -> Self {
        Self {
            direction: QueueDirection::Vertical,
            cols: 2,
            batch_spacing: 4.0,
            spacing_x: 0.8,
            spacing_z: 0.8,
        }
    }
}

impl BatchLayout {
    /// Offset of the batch at queue position `index` from the queue origin.
    pub fn batch_offset(&self, index: usize) -> Vec3 {
        let offset = index as f32 * self.batch_spacing;
        match self.direction {
            QueueDirection::Vertical => Vec3::new(0.0, 0.0, -offset),
            QueueDirection::Horizontal => Vec3::new(offset, 0.0, 0.0),
        }
    }

    /// Offset of the `slot`-th passenger of a batch from the batch anchor.
    pub fn slot_offset(&self, slot: usize) -> Vec3 {
        let cols = self.cols.max(1);
        let row = (slot / cols) as f32;
        let centered_col = (slot % cols) as f32 - (cols - 1) as f32 * 0.5;
        match self.direction {
            QueueDirection::Vertical => {
                Vec3::new(centered_col * self.spacing_x, 0.0, -row * self.spacing_z)
            }
            QueueDirection::Horizontal => {
                Vec3::new(row * self.spacing_x, 0.0, centered_col * self.spacing_z)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub color: PassengerColor,
    pub passengers: VecDeque<Entity>,
    /// Where the batch stands; recomputed whenever batches move up.
    pub anchor: Vec3,
}

impl Batch {
    pub fn new(color: PassengerColor, passengers: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            color,
            passengers: passengers.into_iter().collect(),
            anchor: Vec3::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passengers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Component)]
pub struct DemandQueue {
    batches: VecDeque<Batch>,
    origin: Vec3,
    pub stop_point: Option<Vec3>,
    pub detection_radius: f32,
    pub layout: BatchLayout,
    /// Junction successors (indices into the level's queue list). Data only.
    pub next_nodes: Vec<usize>,
    pub current_path_index: usize,
}

impl DemandQueue {
    pub fn new(origin: Vec3, stop_point: Option<Vec3>, detection_radius: f32) -> Self {
        Self {
            batches: VecDeque::new(),
            origin,
            stop_point,
            detection_radius,
            layout: BatchLayout::default(),
            next_nodes: Vec::new(),
            current_path_index: 0,
        }
    }

    pub fn with_layout(mut self, layout: BatchLayout) -> Self {
        self.layout = layout;
        self.reanchor();
        self
    }

    /// Appends a batch at the back of the queue. Empty batches are ignored.
    pub fn push_batch(&mut self, batch: Batch) {
        if batch.is_empty() {
            return;
        }
        self.batches.push_back(batch);
        self.reanchor();
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    pub fn front(&self) -> Option<&Batch> {
        self.batches.front()
    }

    /// True iff the front batch is non-empty and of color `color`.
    pub fn has_color(&self, color: PassengerColor) -> bool {
        self.batches
            .front()
            .map(|batch| !batch.is_empty() && batch.color == color)
            .unwrap_or(false)
    }

    /// Pops the first passenger of the front batch if it matches `color`.
    ///
    /// An emptied front batch is removed on the spot and the batches behind it
    /// move up, so the next batch is servable immediately.
    pub fn take_one(&mut self, color: PassengerColor) -> Option<Entity> {
        if !self.has_color(color) {
            return None;
        }
        let front = self.batches.front_mut()?;
        let passenger = front.passengers.pop_front();
        if front.is_empty() {
            self.batches.pop_front();
            self.reanchor();
        }
        passenger
    }

    pub fn waiting_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Adds this queue's waiting passengers to a per-color tally.
    pub fn tally_into(&self, tally: &mut BTreeMap<PassengerColor, usize>) {
        for batch in &self.batches {
            *tally.entry(batch.color).or_insert(0) += batch.len();
        }
    }

    /// Where each waiting passenger should stand, front batch first.
    pub fn standing_spots(&self) -> Vec<(Entity, Vec3)> {
        self.batches
            .iter()
            .flat_map(|batch| {
                batch
                    .passengers
                    .iter()
                    .enumerate()
                    .map(move |(slot, &p)| (p, batch.anchor + self.layout.slot_offset(slot)))
            })
            .collect()
    }

    /// Cycles the junction switch to the next successor.
    pub fn toggle_path(&mut self) {
        if self.next_nodes.len() > 1 {
            self.current_path_index = (self.current_path_index + 1) % self.next_nodes.len();
        }
    }

    pub fn next_node(&self) -> Option<usize> {
        self.next_nodes.get(self.current_path_index).copied()
    }

    fn reanchor(&mut self) {
        let origin = self.origin;
        let layout = self.layout;
        for (index, batch) in self.batches.iter_mut().enumerate() {
            batch.anchor = origin + layout.batch_offset(index);
        }
    }
}
