//! Per-chunk LOD switching
//!
//! Each chunk root carries its `LodDescriptor` and bounds; its two children
//! carry the level they draw. Every frame the viewer's screen coverage of the
//! chunk picks at most one child to show.

use bevy::prelude::*;
use std::f32::consts::FRAC_PI_3;

use shared::{screen_coverage, ChunkBounds, LodDescriptor, LodLevel};

use crate::grass::{GrassChunk, GrassViewer};

/// Which level a chunk child renders
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrassLod(pub LodLevel);

/// Visibility a child should have for the selected level.
pub fn child_visibility(selected: Option<LodLevel>, child: LodLevel) -> Visibility {
    if selected == Some(child) {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

pub fn update_grass_lod(
    viewer: Query<(&GlobalTransform, Option<&Projection>), With<GrassViewer>>,
    chunks: Query<(&GlobalTransform, &ChunkBounds, &LodDescriptor, &Children), With<GrassChunk>>,
    mut lod_children: Query<(&GrassLod, &mut Visibility)>,
) {
    let Ok((viewer_transform, projection)) = viewer.single() else {
        return;
    };
    let fov = match projection {
        Some(Projection::Perspective(perspective)) => perspective.fov,
        _ => FRAC_PI_3,
    };
    let eye = viewer_transform.translation();

    for (chunk_transform, bounds, lod, children) in chunks.iter() {
        let center = chunk_transform.transform_point(bounds.center());
        let coverage = screen_coverage(bounds.radius(), eye.distance(center), fov);
        let selected = lod.select(coverage);

        for child in children.iter() {
            let Ok((level, mut visibility)) = lod_children.get_mut(child) else {
                continue;
            };
            // Only write on change so visibility propagation stays quiet
            visibility.set_if_neq(child_visibility(selected, level.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_selected_child_is_visible() {
        assert_eq!(child_visibility(Some(LodLevel::High), LodLevel::High), Visibility::Inherited);
        assert_eq!(child_visibility(Some(LodLevel::High), LodLevel::Low), Visibility::Hidden);
        assert_eq!(child_visibility(Some(LodLevel::Low), LodLevel::Low), Visibility::Inherited);
        assert_eq!(child_visibility(None, LodLevel::High), Visibility::Hidden);
        assert_eq!(child_visibility(None, LodLevel::Low), Visibility::Hidden);
    }
}
