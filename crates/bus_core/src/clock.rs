//! Simulation clock: fixed-length ticks plus a queue of timed dispatcher events.
//!
//! Every tick advances simulated time by `tick_ms`. Events whose timestamp is
//! at or before the new time are popped by the runner and exposed to systems
//! through [DueEvents] for the duration of that tick.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

pub const ONE_SEC_MS: u64 = 1000;

/// Default tick length (50 ticks per simulated second).
pub const DEFAULT_TICK_MS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// Dispatcher production step: move the next scheduled color into a free slot.
    SpawnBus,
    /// End-of-level evaluation, polled after departures.
    CheckLevelStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; earliest timestamp must compare greatest.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.kind.cmp(&self.kind))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Resource)]
pub struct SimulationClock {
    now: u64,
    tick_ms: u64,
    ticks: u64,
    events: BinaryHeap<Event>,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::with_tick_ms(DEFAULT_TICK_MS)
    }
}

impl SimulationClock {
    pub fn with_tick_ms(tick_ms: u64) -> Self {
        debug_assert!(tick_ms > 0, "tick length must be positive");
        Self {
            now: 0,
            tick_ms,
            ticks: 0,
            events: BinaryHeap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    /// Number of ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tick length in seconds, the `dt` used by motion code.
    pub fn dt_secs(&self) -> f32 {
        self.tick_ms as f32 / ONE_SEC_MS as f32
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind) {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        self.events.push(Event { timestamp, kind });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind) {
        self.schedule_at(self.now + delay_ms, kind);
    }

    /// Moves simulated time forward by one tick and returns the new time.
    pub fn advance(&mut self) -> u64 {
        self.now += self.tick_ms;
        self.ticks += 1;
        self.now
    }

    /// Pops the next event if it is due at the current time.
    pub fn pop_due(&mut self) -> Option<Event> {
        match self.events.peek() {
            Some(event) if event.timestamp <= self.now => self.events.pop(),
            _ => None,
        }
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    pub fn has_pending(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Events that fell due at the start of the current tick.
#[derive(Debug, Default, Resource)]
pub struct DueEvents(pub Vec<EventKind>);

impl DueEvents {
    pub fn contains(&self, kind: EventKind) -> bool {
        self.0.contains(&kind)
    }
}
