//! Level-wide state: the exit point and the end-of-level verdict.

use bevy_ecs::prelude::Resource;
use bevy_math::Vec3;

/// Where full (or finished) buses drive to before leaving the level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Resource)]
pub struct ExitPoint(pub Vec3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Resource)]
pub enum LevelStatus {
    #[default]
    Running,
    Complete,
    Failed,
}

impl LevelStatus {
    pub fn is_finished(self) -> bool {
        self != LevelStatus::Running
    }
}

/// Verdict for a level given what is left of it.
///
/// `buses_remaining` covers scheduled, queued and active buses alike.
pub fn evaluate_level(passengers_waiting: usize, buses_remaining: usize) -> LevelStatus {
    match (passengers_waiting, buses_remaining) {
        (0, 0) => LevelStatus::Complete,
        (_, 0) => LevelStatus::Failed,
        _ => LevelStatus::Running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdicts() {
        assert_eq!(evaluate_level(0, 0), LevelStatus::Complete);
        assert_eq!(evaluate_level(3, 0), LevelStatus::Failed);
        assert_eq!(evaluate_level(3, 1), LevelStatus::Running);
        // Empty queues but buses still out: keep running until they leave.
        assert_eq!(evaluate_level(0, 2), LevelStatus::Running);
        assert!(LevelStatus::Failed.is_finished());
        assert!(!LevelStatus::Running.is_finished());
    }
}
