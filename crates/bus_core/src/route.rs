//! Shared route: a polyline every bus follows, parameterized by `t` in [0, 1).
//!
//! Segment `i` covers `[i / n, (i + 1) / n)` where `n` is the number of
//! segments (`points.len()` when closed, `points.len() - 1` when open).

use bevy_ecs::prelude::Resource;
use bevy_math::Vec3;

/// Step used for finite-difference headings along the route.
const DIRECTION_STEP: f32 = 0.01;

/// Segments shorter than this (squared) are treated as points when projecting.
const MIN_SEGMENT_LEN_SQ: f32 = 0.0001;

#[derive(Debug, Clone, PartialEq, Resource)]
pub struct Route {
    points: Vec<Vec3>,
    closed: bool,
}

impl Route {
    pub fn new(points: Vec<Vec3>, closed: bool) -> Self {
        Self { points, closed }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn segment_count(&self) -> usize {
        let count = self.points.len();
        if self.closed {
            count
        } else {
            count.saturating_sub(1)
        }
    }

    /// Normalizes `t` into the route's parameter space.
    pub fn wrap_param(&self, t: f32) -> f32 {
        if self.closed {
            t.rem_euclid(1.0)
        } else {
            t.clamp(0.0, 1.0)
        }
    }

    /// Position at parameter `t`, linearly interpolated between control points.
    pub fn point_at(&self, t: f32) -> Vec3 {
        let count = self.points.len();
        match count {
            0 => return Vec3::ZERO,
            1 => return self.points[0],
            _ => {}
        }

        let segments = self.segment_count();
        let scaled = self.wrap_param(t) * segments as f32;
        let mut index = scaled.floor() as usize;
        let local_t = scaled - index as f32;

        index %= count;
        if !self.closed && index >= count - 1 {
            return self.points[count - 1];
        }

        let next = (index + 1) % count;
        self.points[index].lerp(self.points[next], local_t)
    }

    /// Parameter of the point on the route closest to `position`.
    pub fn closest_param(&self, position: Vec3) -> f32 {
        let count = self.points.len();
        if count < 2 {
            return 0.0;
        }

        let segments = self.segment_count();
        let mut best_t = 0.0;
        let mut best_dist_sq = f32::MAX;

        for i in 0..segments {
            let p0 = self.points[i];
            let p1 = self.points[(i + 1) % count];
            let segment = p1 - p0;
            let len_sq = segment.length_squared();

            let local_t = if len_sq > MIN_SEGMENT_LEN_SQ {
                ((position - p0).dot(segment) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let dist_sq = position.distance_squared(p0.lerp(p1, local_t));
            if dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                best_t = (i as f32 + local_t) / segments as f32;
            }
        }

        self.wrap_param(best_t)
    }

    /// Unit direction of travel at `t`, or `None` on a degenerate stretch.
    pub fn direction_at(&self, t: f32) -> Option<Vec3> {
        let here = self.point_at(t);
        let ahead = self.point_at(t + DIRECTION_STEP);
        (ahead - here).try_normalize()
    }

    /// Polyline length, including the closing segment of a closed route.
    pub fn length(&self) -> f32 {
        let count = self.points.len();
        (0..self.segment_count())
            .map(|i| self.points[i].distance(self.points[(i + 1) % count]))
            .sum()
    }
}

/// Circular difference `a - b` folded into (-0.5, 0.5].
///
/// Positive means `a` is ahead of `b` along a closed route.
pub fn wrapped_param_diff(a: f32, b: f32) -> f32 {
    let mut diff = a - b;
    if diff > 0.5 {
        diff -= 1.0;
    } else if diff <= -0.5 {
        diff += 1.0;
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(closed: bool) -> Route {
        Route::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(10.0, 0.0, 10.0),
                Vec3::new(0.0, 0.0, 10.0),
            ],
            closed,
        )
    }

    #[test]
    fn point_at_interpolates_segments_of_closed_route() {
        let route = square(true);
        assert_eq!(route.point_at(0.0), Vec3::ZERO);
        assert!(route.point_at(0.125).distance(Vec3::new(5.0, 0.0, 0.0)) < 1e-4);
        assert!(route.point_at(0.875).distance(Vec3::new(0.0, 0.0, 5.0)) < 1e-4);
        // 1.0 wraps back to the start on a loop.
        assert!(route.point_at(1.0).distance(Vec3::ZERO) < 1e-4);
    }

    #[test]
    fn open_route_clamps_to_last_point() {
        let route = square(false);
        assert_eq!(route.point_at(1.0), Vec3::new(0.0, 0.0, 10.0));
        assert!(route.point_at(0.5).distance(Vec3::new(10.0, 0.0, 5.0)) < 1e-4);
    }

    #[test]
    fn closest_param_projects_onto_best_segment() {
        let route = square(true);
        let t = route.closest_param(Vec3::new(10.5, 0.0, 5.0));
        assert!((t - 0.375).abs() < 1e-4, "t = {t}");
        assert!(route.point_at(t).distance(Vec3::new(10.0, 0.0, 5.0)) < 1e-3);
    }

    #[test]
    fn degenerate_routes_never_fail() {
        let empty = Route::new(Vec::new(), true);
        assert_eq!(empty.point_at(0.3), Vec3::ZERO);
        assert_eq!(empty.closest_param(Vec3::ONE), 0.0);

        let single = Route::new(vec![Vec3::new(1.0, 2.0, 3.0)], true);
        assert_eq!(single.point_at(0.7), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(single.closest_param(Vec3::ZERO), 0.0);
        assert_eq!(single.length(), 0.0);
    }

    #[test]
    fn length_includes_closing_segment() {
        assert!((square(true).length() - 40.0).abs() < 1e-4);
        assert!((square(false).length() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn wrapped_diff_handles_the_seam() {
        assert!((wrapped_param_diff(0.02, 0.95) - 0.07).abs() < 1e-5);
        assert!((wrapped_param_diff(0.95, 0.02) + 0.07).abs() < 1e-5);
        // Exactly half a loop apart folds to +0.5 from both sides.
        assert_eq!(wrapped_param_diff(0.75, 0.25), 0.5);
        assert_eq!(wrapped_param_diff(0.25, 0.75), 0.5);
    }
}
