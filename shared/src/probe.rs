//! Collision queries the grass sampler depends on.
//!
//! The sampler never talks to a physics engine directly; it goes through
//! [`SurfaceProbe`] (ground rays) and [`ObstacleFilter`] (keep-out spheres).
//! Any backend can sit behind these traits. The built-in ones answer from the
//! terrain heightfield and the [`SpatialObstacleGrid`].

use bevy::prelude::*;

use crate::spatial::SpatialObstacleGrid;
use crate::terrain::{MapBounds, TerrainGenerator};

/// Where a downward probe hit the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    /// Unit surface normal at `point`.
    pub normal: Vec3,
    /// Distance travelled from the ray origin.
    pub distance: f32,
}

/// Casts straight-down rays against whatever counts as ground.
pub trait SurfaceProbe: Send + Sync {
    /// Cast from `origin` along -Y for at most `max_distance`.
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Option<SurfaceHit>;
}

/// Answers whether placement near a point is obstructed.
pub trait ObstacleFilter: Send + Sync {
    fn sphere_blocked(&self, center: Vec3, radius: f32) -> bool;
}

/// Ground probe over the procedural heightfield, clipped to the ground bounds.
#[derive(Clone)]
pub struct HeightfieldProbe {
    pub terrain: TerrainGenerator,
    pub bounds: MapBounds,
}

impl HeightfieldProbe {
    pub fn new(terrain: TerrainGenerator, bounds: MapBounds) -> Self {
        Self { terrain, bounds }
    }
}

impl SurfaceProbe for HeightfieldProbe {
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Option<SurfaceHit> {
        if !self.bounds.contains_xz(origin) {
            return None;
        }

        let ground_y = self.terrain.get_height(origin.x, origin.z);
        let distance = origin.y - ground_y;
        // Ray starts under the surface, or the surface is out of reach
        if distance < 0.0 || distance > max_distance {
            return None;
        }

        Some(SurfaceHit {
            point: Vec3::new(origin.x, ground_y, origin.z),
            normal: self.terrain.get_normal(origin.x, origin.z),
            distance,
        })
    }
}

/// A ground that is never hit (e.g. missing ground classification).
pub struct NoGround;

impl SurfaceProbe for NoGround {
    fn cast_down(&self, _origin: Vec3, _max_distance: f32) -> Option<SurfaceHit> {
        None
    }
}

/// Nothing ever blocks placement.
pub struct NoObstacles;

impl ObstacleFilter for NoObstacles {
    fn sphere_blocked(&self, _center: Vec3, _radius: f32) -> bool {
        false
    }
}

impl ObstacleFilter for SpatialObstacleGrid {
    fn sphere_blocked(&self, center: Vec3, radius: f32) -> bool {
        SpatialObstacleGrid::sphere_blocked(self, center, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::WORLD_SEED;

    fn probe() -> HeightfieldProbe {
        HeightfieldProbe::new(
            TerrainGenerator::new(WORLD_SEED),
            MapBounds::new(Vec3::new(-100.0, -20.0, -100.0), Vec3::new(100.0, 20.0, 100.0)),
        )
    }

    #[test]
    fn test_probe_hits_heightfield() {
        let probe = probe();
        let origin = Vec3::new(12.5, 50.0, -7.25);
        let hit = probe.cast_down(origin, 100.0).expect("ground below");
        let expected = probe.terrain.get_height(origin.x, origin.z);
        assert!((hit.point.y - expected).abs() < 1e-5);
        assert!((hit.normal.length() - 1.0).abs() < 1e-4);
        assert!(hit.normal.y > 0.0);
        assert!((hit.distance - (50.0 - expected)).abs() < 1e-4);
    }

    #[test]
    fn test_probe_misses_outside_bounds_or_reach() {
        let probe = probe();
        assert!(probe.cast_down(Vec3::new(150.0, 50.0, 0.0), 100.0).is_none());
        // Surface is more than 1m below
        assert!(probe.cast_down(Vec3::new(0.0, 50.0, 0.0), 1.0).is_none());
        // Origin under the ground
        assert!(probe.cast_down(Vec3::new(0.0, -60.0, 0.0), 100.0).is_none());
        assert!(NoGround.cast_down(Vec3::ZERO, 1000.0).is_none());
    }
}
