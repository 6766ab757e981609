//! Per-instance transform synthesis.

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use crate::probe::SurfaceHit;

/// Where one grass instance goes, relative to its chunk anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementTransform {
    /// Position local to the chunk anchor.
    pub position: Vec3,
    pub rotation: Quat,
    /// Uniform scale.
    pub scale: f32,
}

impl PlacementTransform {
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.position)
    }
}

/// Build the placement for a surface hit.
///
/// The instance is yawed randomly about its own up axis, then tilted so that
/// up follows the surface normal. Scale is uniform in `scale_range` (inclusive).
pub fn synthesize_placement(
    hit: &SurfaceHit,
    anchor: Vec3,
    scale_range: (f32, f32),
    rng: &mut impl Rng,
) -> PlacementTransform {
    let normal = hit.normal.try_normalize().unwrap_or(Vec3::Y);
    let yaw = rng.gen_range(0.0..TAU);
    let rotation = Quat::from_rotation_arc(Vec3::Y, normal) * Quat::from_rotation_y(yaw);

    let (min_scale, max_scale) = scale_range;
    let scale = if max_scale > min_scale {
        rng.gen_range(min_scale..=max_scale)
    } else {
        min_scale
    };

    PlacementTransform {
        position: hit.point - anchor,
        rotation,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hit(normal: Vec3) -> SurfaceHit {
        SurfaceHit {
            point: Vec3::new(105.0, 3.0, -42.0),
            normal,
            distance: 47.0,
        }
    }

    #[test]
    fn test_up_follows_surface_normal() {
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Vec3::new(0.3, 1.0, -0.2).normalize();
        for _ in 0..32 {
            let placement = synthesize_placement(&hit(normal), Vec3::ZERO, (1.0, 1.0), &mut rng);
            let up = placement.rotation * Vec3::Y;
            assert!(up.distance(normal) < 1e-4, "up {up:?} != normal {normal:?}");
        }
    }

    #[test]
    fn test_position_is_anchor_relative_and_scale_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let anchor = Vec3::new(100.0, 0.0, -40.0);
        for _ in 0..64 {
            let placement = synthesize_placement(&hit(Vec3::Y), anchor, (0.8, 1.2), &mut rng);
            assert_eq!(placement.position, Vec3::new(5.0, 3.0, -2.0));
            assert!((0.8..=1.2).contains(&placement.scale));
        }
    }

    #[test]
    fn test_matrix_places_origin_at_position() {
        let placement = PlacementTransform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(1.0),
            scale: 2.0,
        };
        let m = placement.to_matrix();
        assert!(m.transform_point3(Vec3::ZERO).distance(placement.position) < 1e-5);
        assert!((m.transform_vector3(Vec3::Y).length() - 2.0).abs() < 1e-5);
    }
}
