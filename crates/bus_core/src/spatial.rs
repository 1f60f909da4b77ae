//! Spatial queries: a uniform ground-plane grid standing in for physics overlaps.
//!
//! Only buses and demand queues are indexed, so decorative geometry never
//! shows up in a query. Buses are stored as spheres of a shared body radius,
//! queues as spheres of their own detection radius.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource};
use bevy_math::{Quat, Vec3};

type CellKey = (i32, i32);

/// Query volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    /// Oriented box; `half_extents` are in the box's local frame.
    Box {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
}

impl Shape {
    /// Radius of a sphere around the shape's center that contains it.
    fn bounding_radius(&self) -> f32 {
        match *self {
            Shape::Sphere { radius, .. } => radius,
            Shape::Box { half_extents, .. } => half_extents.length(),
        }
    }

    fn center(&self) -> Vec3 {
        match *self {
            Shape::Sphere { center, .. } | Shape::Box { center, .. } => center,
        }
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        match *self {
            Shape::Sphere {
                center: own,
                radius: own_radius,
            } => own.distance_squared(center) <= (own_radius + radius).powi(2),
            Shape::Box {
                center: own,
                half_extents,
                rotation,
            } => {
                let local = rotation.inverse() * (center - own);
                let closest = local.clamp(-half_extents, half_extents);
                local.distance_squared(closest) <= radius * radius
            }
        }
    }
}

/// Something an overlap query can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialHit {
    Bus(Entity),
    Node(Entity),
}

impl SpatialHit {
    pub fn bus(self) -> Option<Entity> {
        match self {
            SpatialHit::Bus(entity) => Some(entity),
            SpatialHit::Node(_) => None,
        }
    }

    pub fn node(self) -> Option<Entity> {
        match self {
            SpatialHit::Node(entity) => Some(entity),
            SpatialHit::Bus(_) => None,
        }
    }
}

/// Overlap queries used by collision sensing and stop detection.
///
/// Hits are ordered buses first, each group by entity, so callers see the
/// same order on every run.
pub trait SpatialQuery {
    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat) -> Vec<SpatialHit>;
    fn overlap_sphere(&self, center: Vec3, radius: f32) -> Vec<SpatialHit>;
}

#[derive(Debug, Resource)]
pub struct SpatialGrid {
    cell_size: f32,
    bus_radius: f32,
    buses_by_cell: HashMap<CellKey, Vec<Entity>>,
    bus_entity_to_cell: HashMap<Entity, (CellKey, Vec3)>,
    queues_by_cell: HashMap<CellKey, Vec<Entity>>,
    queue_bounds: HashMap<Entity, (Vec3, f32)>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(4.0, 0.5)
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f32, bus_radius: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            bus_radius,
            buses_by_cell: HashMap::new(),
            bus_entity_to_cell: HashMap::new(),
            queues_by_cell: HashMap::new(),
            queue_bounds: HashMap::new(),
        }
    }

    fn cell_of(&self, position: Vec3) -> CellKey {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.z / self.cell_size).floor() as i32,
        )
    }

    fn cells_around(&self, center: Vec3, radius: f32) -> impl Iterator<Item = CellKey> {
        let (min_x, min_z) = self.cell_of(center - Vec3::splat(radius));
        let (max_x, max_z) = self.cell_of(center + Vec3::splat(radius));
        (min_x..=max_x).flat_map(move |x| (min_z..=max_z).map(move |z| (x, z)))
    }

    pub fn insert_bus(&mut self, entity: Entity, position: Vec3) {
        let cell = self.cell_of(position);
        self.buses_by_cell.entry(cell).or_default().push(entity);
        self.bus_entity_to_cell.insert(entity, (cell, position));
    }

    /// Moves a bus, inserting it if it is not indexed yet.
    pub fn update_bus(&mut self, entity: Entity, position: Vec3) {
        let new_cell = self.cell_of(position);
        match self.bus_entity_to_cell.get_mut(&entity) {
            Some((cell, stored)) if *cell == new_cell => {
                *stored = position;
            }
            Some(_) => {
                self.remove_bus(entity);
                self.insert_bus(entity, position);
            }
            None => self.insert_bus(entity, position),
        }
    }

    pub fn remove_bus(&mut self, entity: Entity) {
        if let Some((cell, _)) = self.bus_entity_to_cell.remove(&entity) {
            if let Some(entities) = self.buses_by_cell.get_mut(&cell) {
                entities.retain(|&e| e != entity);
                if entities.is_empty() {
                    self.buses_by_cell.remove(&cell);
                }
            }
        }
    }

    pub fn insert_queue(&mut self, entity: Entity, position: Vec3, radius: f32) {
        self.remove_queue(entity);
        let cells: Vec<CellKey> = self.cells_around(position, radius).collect();
        for cell in cells {
            self.queues_by_cell.entry(cell).or_default().push(entity);
        }
        self.queue_bounds.insert(entity, (position, radius));
    }

    pub fn remove_queue(&mut self, entity: Entity) {
        let Some((position, radius)) = self.queue_bounds.remove(&entity) else {
            return;
        };
        let cells: Vec<CellKey> = self.cells_around(position, radius).collect();
        for cell in cells {
            if let Some(entities) = self.queues_by_cell.get_mut(&cell) {
                entities.retain(|&e| e != entity);
                if entities.is_empty() {
                    self.queues_by_cell.remove(&cell);
                }
            }
        }
    }

    pub fn bus_position(&self, entity: Entity) -> Option<Vec3> {
        self.bus_entity_to_cell.get(&entity).map(|(_, p)| *p)
    }

    pub fn bus_count(&self) -> usize {
        self.bus_entity_to_cell.len()
    }

    pub fn clear(&mut self) {
        self.buses_by_cell.clear();
        self.bus_entity_to_cell.clear();
        self.queues_by_cell.clear();
        self.queue_bounds.clear();
    }
}

fn sorted_unique(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by_key(|e| e.to_bits());
    entities.dedup();
    entities
}

impl SpatialGrid {
    pub fn buses_in(&self, shape: &Shape) -> Vec<Entity> {
        let reach = shape.bounding_radius() + self.bus_radius;
        let mut hits = Vec::new();
        for cell in self.cells_around(shape.center(), reach) {
            let Some(entities) = self.buses_by_cell.get(&cell) else {
                continue;
            };
            for &entity in entities {
                let Some((_, position)) = self.bus_entity_to_cell.get(&entity) else {
                    continue;
                };
                if shape.intersects_sphere(*position, self.bus_radius) {
                    hits.push(entity);
                }
            }
        }
        sorted_unique(hits)
    }

    pub fn nodes_in(&self, shape: &Shape) -> Vec<Entity> {
        let mut hits = Vec::new();
        for cell in self.cells_around(shape.center(), shape.bounding_radius()) {
            let Some(entities) = self.queues_by_cell.get(&cell) else {
                continue;
            };
            for &entity in entities {
                let Some(&(position, radius)) = self.queue_bounds.get(&entity) else {
                    continue;
                };
                if shape.intersects_sphere(position, radius) {
                    hits.push(entity);
                }
            }
        }
        sorted_unique(hits)
    }

    fn hits_in(&self, shape: &Shape) -> Vec<SpatialHit> {
        self.buses_in(shape)
            .into_iter()
            .map(SpatialHit::Bus)
            .chain(self.nodes_in(shape).into_iter().map(SpatialHit::Node))
            .collect()
    }
}

impl SpatialQuery for SpatialGrid {
    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat) -> Vec<SpatialHit> {
        self.hits_in(&Shape::Box {
            center,
            half_extents,
            rotation,
        })
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32) -> Vec<SpatialHit> {
        self.hits_in(&Shape::Sphere { center, radius })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_query_finds_nearby_buses_only() {
        let mut grid = SpatialGrid::new(2.0, 0.5);
        let near = Entity::from_raw(1);
        let far = Entity::from_raw(2);
        grid.insert_bus(near, Vec3::new(1.0, 0.0, 0.0));
        grid.insert_bus(far, Vec3::new(20.0, 0.0, 0.0));

        let hits = grid.buses_in(&Shape::Sphere {
            center: Vec3::ZERO,
            radius: 1.0,
        });
        assert_eq!(hits, vec![near]);
    }

    #[test]
    fn oriented_box_respects_rotation() {
        let mut grid = SpatialGrid::new(2.0, 0.1);
        let ahead_on_x = Entity::from_raw(1);
        grid.insert_bus(ahead_on_x, Vec3::new(2.0, 0.0, 0.0));

        // A box 4 long along local Z, rotated to face +X.
        let facing_x = Shape::Box {
            center: Vec3::new(2.0, 0.0, 0.0),
            half_extents: Vec3::new(0.5, 1.0, 2.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        };
        assert_eq!(grid.buses_in(&facing_x), vec![ahead_on_x]);

        let facing_z = Shape::Box {
            center: Vec3::new(0.0, 0.0, 2.0),
            half_extents: Vec3::new(0.5, 1.0, 2.0),
            rotation: Quat::IDENTITY,
        };
        assert!(grid.buses_in(&facing_z).is_empty());
    }

    #[test]
    fn moving_a_bus_across_cells_updates_the_index() {
        let mut grid = SpatialGrid::new(1.0, 0.2);
        let bus = Entity::from_raw(3);
        grid.update_bus(bus, Vec3::ZERO);
        grid.update_bus(bus, Vec3::new(10.0, 0.0, 10.0));
        assert_eq!(grid.bus_count(), 1);

        let at_origin = Shape::Sphere {
            center: Vec3::ZERO,
            radius: 0.5,
        };
        assert!(grid.buses_in(&at_origin).is_empty());
        assert_eq!(grid.bus_position(bus), Some(Vec3::new(10.0, 0.0, 10.0)));

        grid.remove_bus(bus);
        assert_eq!(grid.bus_count(), 0);
    }

    #[test]
    fn queues_spanning_cells_are_reported_once() {
        let mut grid = SpatialGrid::new(1.0, 0.2);
        let queue = Entity::from_raw(7);
        grid.insert_queue(queue, Vec3::new(0.5, 0.0, 0.5), 2.0);

        let probe = Shape::Sphere {
            center: Vec3::new(2.0, 0.0, 0.5),
            radius: 0.75,
        };
        assert_eq!(grid.nodes_in(&probe), vec![queue]);

        grid.remove_queue(queue);
        assert!(grid.nodes_in(&probe).is_empty());
    }

    #[test]
    fn trait_queries_report_buses_before_nodes() {
        let mut grid = SpatialGrid::new(2.0, 0.5);
        let bus = Entity::from_raw(9);
        let node = Entity::from_raw(1);
        grid.insert_bus(bus, Vec3::ZERO);
        grid.insert_queue(node, Vec3::new(0.5, 0.0, 0.0), 1.0);

        let hits = grid.overlap_sphere(Vec3::ZERO, 0.75);
        assert_eq!(hits, vec![SpatialHit::Bus(bus), SpatialHit::Node(node)]);
        assert_eq!(hits[0].bus(), Some(bus));
        assert_eq!(hits[1].node(), Some(node));
    }
}
