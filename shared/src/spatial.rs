//! Spatial hashing for fast obstacle lookups.
//!
//! Grass sampling asks "is anything solid within `r` of this point?" thousands of
//! times per chunk. Instead of testing every obstacle O(n), obstacles are bucketed
//! into a uniform XZ grid and a query only visits the cells its sphere touches.

use bevy::prelude::*;
use std::collections::HashMap;

/// Size of each spatial grid cell in world units.
/// Should be roughly the size of your largest obstacle footprint.
pub const SPATIAL_CELL_SIZE: f32 = 8.0;

/// A single obstacle: a box rotated about the Y axis.
#[derive(Clone, Debug)]
pub struct ObstacleEntry {
    /// Center position in world XZ coords.
    pub center: Vec2,
    /// Half-extents of the footprint.
    pub half_extents: Vec2,
    /// Yaw in radians, in the same sense as `Quat::from_rotation_y`.
    pub rotation: f32,
    /// Vertical extent (world Y) of the box.
    pub min_y: f32,
    pub max_y: f32,
}

impl ObstacleEntry {
    /// Axis-aligned footprint that contains the rotated rectangle.
    fn footprint_aabb(&self) -> (Vec2, Vec2) {
        let cos_r = self.rotation.cos();
        let sin_r = self.rotation.sin();
        let extent = Vec2::new(
            self.half_extents.x * cos_r.abs() + self.half_extents.y * sin_r.abs(),
            self.half_extents.x * sin_r.abs() + self.half_extents.y * cos_r.abs(),
        );
        (self.center - extent, self.center + extent)
    }

    /// Check whether a sphere overlaps this box.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        // Undo the box's yaw to get the sphere center in the box's local XZ frame
        let offset = Vec2::new(center.x, center.z) - self.center;
        let local = Quat::from_rotation_y(-self.rotation) * Vec3::new(offset.x, 0.0, offset.y);
        let rotated = Vec2::new(local.x, local.z);

        let closest_xz = rotated.clamp(-self.half_extents, self.half_extents);
        let closest_y = center.y.clamp(self.min_y, self.max_y);

        let d_xz = rotated - closest_xz;
        let d_y = center.y - closest_y;
        d_xz.length_squared() + d_y * d_y <= radius * radius
    }
}

/// Spatial hash grid of obstacle boxes.
#[derive(Resource, Default, Debug)]
pub struct SpatialObstacleGrid {
    /// Map from grid cell (x, z) to list of obstacles overlapping that cell.
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// All obstacles in the grid.
    obstacles: Vec<ObstacleEntry>,
}

impl SpatialObstacleGrid {
    /// Create a new empty spatial grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert world position to grid cell coordinates.
    #[inline]
    fn world_to_cell(pos: Vec2) -> (i32, i32) {
        (
            (pos.x / SPATIAL_CELL_SIZE).floor() as i32,
            (pos.y / SPATIAL_CELL_SIZE).floor() as i32,
        )
    }

    /// Clear all obstacles from the grid.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.obstacles.clear();
    }

    /// Add an obstacle to the grid.
    pub fn insert(&mut self, entry: ObstacleEntry) {
        let (min, max) = entry.footprint_aabb();
        let min_cell = Self::world_to_cell(min);
        let max_cell = Self::world_to_cell(max);

        let idx = self.obstacles.len();
        self.obstacles.push(entry);

        for cx in min_cell.0..=max_cell.0 {
            for cz in min_cell.1..=max_cell.1 {
                self.cells.entry((cx, cz)).or_default().push(idx);
            }
        }
    }

    /// Check if any obstacle overlaps a sphere.
    pub fn sphere_blocked(&self, center: Vec3, radius: f32) -> bool {
        let center_xz = Vec2::new(center.x, center.z);
        let min_cell = Self::world_to_cell(center_xz - Vec2::splat(radius));
        let max_cell = Self::world_to_cell(center_xz + Vec2::splat(radius));

        for cx in min_cell.0..=max_cell.0 {
            for cz in min_cell.1..=max_cell.1 {
                let Some(indices) = self.cells.get(&(cx, cz)) else {
                    continue;
                };
                // An obstacle spanning several cells may be tested more than once; the
                // test is cheap and the answer is the same.
                if indices
                    .iter()
                    .any(|&idx| self.obstacles[idx].intersects_sphere(center, radius))
                {
                    return true;
                }
            }
        }

        false
    }

    /// Get the number of obstacles in the grid.
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    /// Check if the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crate_at(center: Vec2, half: f32) -> ObstacleEntry {
        ObstacleEntry {
            center,
            half_extents: Vec2::splat(half),
            rotation: 0.0,
            min_y: 0.0,
            max_y: 2.0,
        }
    }

    #[test]
    fn test_sphere_touching_box_is_blocked() {
        let mut grid = SpatialObstacleGrid::new();
        grid.insert(crate_at(Vec2::ZERO, 2.0));

        // Inside the footprint
        assert!(grid.sphere_blocked(Vec3::new(1.0, 1.0, 1.0), 0.5));
        // Just outside the face, radius reaches it
        assert!(grid.sphere_blocked(Vec3::new(2.4, 1.0, 0.0), 0.5));
        // Too far away
        assert!(!grid.sphere_blocked(Vec3::new(2.6, 1.0, 0.0), 0.5));
        assert!(!grid.sphere_blocked(Vec3::new(10.0, 1.0, 10.0), 0.5));
    }

    #[test]
    fn test_vertical_extent_is_respected() {
        let mut grid = SpatialObstacleGrid::new();
        grid.insert(crate_at(Vec2::ZERO, 2.0));

        // Floating crate: sphere below its min_y by more than the radius
        assert!(!grid.sphere_blocked(Vec3::new(0.0, -1.0, 0.0), 0.5));
        assert!(grid.sphere_blocked(Vec3::new(0.0, -0.4, 0.0), 0.5));
    }

    #[test]
    fn test_rotated_box() {
        let mut grid = SpatialObstacleGrid::new();
        grid.insert(ObstacleEntry {
            center: Vec2::ZERO,
            half_extents: Vec2::new(4.0, 0.5),
            rotation: std::f32::consts::FRAC_PI_4,
            min_y: 0.0,
            max_y: 2.0,
        });

        // Along the long axis turned the way a Y rotation turns a mesh
        let along = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4) * Vec3::X * 3.5;
        assert!(grid.sphere_blocked(Vec3::new(along.x, 1.0, along.z), 0.1));
        // The mirrored direction is empty
        assert!(!grid.sphere_blocked(Vec3::new(along.x, 1.0, -along.z), 0.1));
        // Along the unrotated long axis the thin box is far away
        assert!(!grid.sphere_blocked(Vec3::new(3.5, 1.0, 0.0), 0.1));
    }

    #[test]
    fn test_query_spanning_cells() {
        let mut grid = SpatialObstacleGrid::new();
        // Lives entirely in cell (1, 0)
        grid.insert(crate_at(Vec2::new(9.0, 4.0), 0.5));

        // Query centered in cell (0, 0) but its radius reaches into (1, 0)
        assert!(grid.sphere_blocked(Vec3::new(7.9, 1.0, 4.0), 0.7));
        assert_eq!(grid.len(), 1);
    }
}
