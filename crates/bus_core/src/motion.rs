//! Kinematic helpers: timed straight-line tweens and yaw-only facing.

use bevy_math::{Quat, Vec3};

/// Straight-line move from `from` to `to` over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: Vec3,
    pub to: Vec3,
    pub duration_ms: u64,
    pub elapsed_ms: u64,
}

impl Tween {
    pub fn new(from: Vec3, to: Vec3, duration_ms: u64) -> Self {
        Self {
            from,
            to,
            duration_ms,
            elapsed_ms: 0,
        }
    }

    /// Completed fraction in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
    }

    /// Advances by `dt_ms` and returns the new position.
    pub fn step(&mut self, dt_ms: u64) -> Vec3 {
        self.elapsed_ms = (self.elapsed_ms + dt_ms).min(self.duration_ms);
        self.position()
    }

    pub fn position(&self) -> Vec3 {
        if self.is_finished() {
            self.to
        } else {
            self.from.lerp(self.to, self.progress())
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

/// Yaw rotation whose forward (+Z) points along `direction` projected onto the ground plane.
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() <= f32::EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Moves `current` toward `target` by at most `max_delta`.
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let offset = target - current;
    let distance = offset.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + offset / distance * max_delta
    }
}
