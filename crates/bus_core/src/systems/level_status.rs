use bevy_ecs::prelude::{Query, Res, ResMut, With};
use tracing::{info, warn};

use crate::clock::{DueEvents, EventKind};
use crate::demand::DemandQueue;
use crate::dispatcher::Dispatcher;
use crate::ecs::Bus;
use crate::level::{evaluate_level, LevelStatus};
use crate::presentation::{Presentation, PresentationEvent};
use crate::scenario::LevelNumber;

/// Decides Complete / Failed when a [EventKind::CheckLevelStatus] comes due.
/// A finished level stays finished.
pub fn level_status_system(
    events: Res<DueEvents>,
    dispatcher: Res<Dispatcher>,
    level: Option<Res<LevelNumber>>,
    queues: Query<&DemandQueue>,
    buses: Query<(), With<Bus>>,
    mut status: ResMut<LevelStatus>,
    mut presentation: ResMut<Presentation>,
) {
    if !events.contains(EventKind::CheckLevelStatus) || status.is_finished() {
        return;
    }

    let waiting: usize = queues.iter().map(DemandQueue::waiting_count).sum();
    let remaining = dispatcher.pending_count() + buses.iter().count();
    let level = level.map(|l| l.0).unwrap_or(0);

    match evaluate_level(waiting, remaining) {
        LevelStatus::Running => {}
        LevelStatus::Complete => {
            info!(level, "level complete");
            *status = LevelStatus::Complete;
            presentation.notify(PresentationEvent::LevelComplete { level });
        }
        LevelStatus::Failed => {
            warn!(level, waiting, "level failed: passengers left with no buses");
            *status = LevelStatus::Failed;
            presentation.notify(PresentationEvent::LevelFailed { level });
        }
    }
}
