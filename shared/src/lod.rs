//! Two-level LOD selection by screen coverage.
//!
//! Coverage is the fraction of the viewport height the chunk's bounding sphere
//! spans (1.0 = fills the screen). Level 0 draws the full instance set, level 1
//! the thinned subset, and below the cutoff the chunk is culled.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LodLevel {
    /// Full instance set.
    High,
    /// Randomly thinned subset.
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct LodDescriptor {
    /// Coverage at and above which level 0 renders.
    pub transition: f32,
    /// Coverage below which nothing renders.
    pub cutoff: f32,
}

impl LodDescriptor {
    pub fn new(transition: f32, cutoff: f32) -> Self {
        Self { transition, cutoff }
    }

    pub fn select(&self, coverage: f32) -> Option<LodLevel> {
        if coverage >= self.transition {
            Some(LodLevel::High)
        } else if coverage >= self.cutoff {
            Some(LodLevel::Low)
        } else {
            None
        }
    }
}

/// Fraction of the viewport height covered by a sphere of `radius` seen from
/// `distance` with vertical field of view `fov_y` (radians). Clamped to [0, 1].
pub fn screen_coverage(radius: f32, distance: f32, fov_y: f32) -> f32 {
    if distance <= radius {
        return 1.0;
    }
    let half_height = distance * (fov_y * 0.5).tan();
    if half_height <= f32::EPSILON {
        return 1.0;
    }
    (radius / half_height).clamp(0.0, 1.0)
}
