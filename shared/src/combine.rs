//! Merging many transformed copies of the template into one mesh.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, VertexAttributeValues};
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use crate::template::GrassTemplate;

/// One template sub-mesh copy to bake into a combined mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombineEntry {
    /// Index of the accepted placement this copy belongs to.
    pub instance: usize,
    /// Index into [`GrassTemplate::parts`].
    pub part: usize,
    /// Placement matrix times the part's local matrix.
    pub transform: Mat4,
}

/// Axis-aligned bounds of a chunk's geometry, in chunk-local space.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct ChunkBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl ChunkBounds {
    pub fn from_positions(positions: &[[f32; 3]]) -> Option<Self> {
        let mut iter = positions.iter().map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the sphere enclosing the box.
    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }
}

/// Bake `entries` into a single triangle-list mesh.
///
/// Indices are always 32-bit: a chunk easily exceeds 65k vertices. Normals and
/// UVs are only emitted when every template part provides them, so attribute
/// arrays always line up with positions.
pub fn combine_instances(template: &GrassTemplate, entries: &[CombineEntry]) -> Mesh {
    let with_normals = template.parts.iter().all(|p| {
        matches!(p.mesh.attribute(Mesh::ATTRIBUTE_NORMAL), Some(VertexAttributeValues::Float32x3(_)))
    });
    let with_uvs = template.parts.iter().all(|p| {
        matches!(p.mesh.attribute(Mesh::ATTRIBUTE_UV_0), Some(VertexAttributeValues::Float32x2(_)))
    });

    let vertex_estimate: usize = entries
        .iter()
        .filter_map(|e| template.parts.get(e.part))
        .map(|p| p.mesh.count_vertices())
        .sum();

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(vertex_estimate);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(if with_normals { vertex_estimate } else { 0 });
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(if with_uvs { vertex_estimate } else { 0 });
    let mut indices: Vec<u32> = Vec::new();

    for entry in entries {
        let Some(part) = template.parts.get(entry.part) else {
            continue;
        };
        let Some(VertexAttributeValues::Float32x3(src_positions)) = part.mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            continue;
        };

        let base = positions.len() as u32;
        positions.extend(
            src_positions
                .iter()
                .map(|p| entry.transform.transform_point3(Vec3::from_array(*p)).to_array()),
        );

        if with_normals {
            if let Some(VertexAttributeValues::Float32x3(src_normals)) = part.mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
                let normal_matrix = Mat3::from_mat4(entry.transform).inverse().transpose();
                normals.extend(
                    src_normals
                        .iter()
                        .map(|n| (normal_matrix * Vec3::from_array(*n)).normalize_or_zero().to_array()),
                );
            }
        }

        if with_uvs {
            if let Some(VertexAttributeValues::Float32x2(src_uvs)) = part.mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
                uvs.extend_from_slice(src_uvs);
            }
        }

        match part.mesh.indices() {
            Some(src_indices) => indices.extend(src_indices.iter().map(|i| base + i as u32)),
            None => indices.extend(base..base + src_positions.len() as u32),
        }
    }

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, VertexAttributeValues::Float32x3(positions));
    if with_normals {
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, VertexAttributeValues::Float32x3(normals));
    }
    if with_uvs {
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, VertexAttributeValues::Float32x2(uvs));
    }
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Bounds of a combined mesh's positions.
pub fn mesh_bounds(mesh: &Mesh) -> Option<ChunkBounds> {
    match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
        Some(VertexAttributeValues::Float32x3(positions)) => ChunkBounds::from_positions(positions),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplatePart;

    fn triangle() -> Mesh {
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(
                Mesh::ATTRIBUTE_POSITION,
                vec![[0.0_f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            )
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0_f32, 0.0, 1.0]; 3])
            .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, vec![[0.0_f32, 0.0], [1.0, 0.0], [0.0, 1.0]])
            .with_inserted_indices(Indices::U16(vec![0, 1, 2]))
    }

    fn template() -> GrassTemplate {
        GrassTemplate::new(
            vec![
                TemplatePart::new(triangle(), Transform::IDENTITY),
                TemplatePart::new(triangle(), Transform::from_xyz(0.0, 1.0, 0.0)),
            ],
            Handle::default(),
        )
    }

    fn entry(instance: usize, part: usize, translation: Vec3) -> CombineEntry {
        CombineEntry {
            instance,
            part,
            transform: Mat4::from_translation(translation),
        }
    }

    #[test]
    fn test_combine_offsets_indices_and_transforms_positions() {
        let template = template();
        let entries = [entry(0, 0, Vec3::ZERO), entry(1, 1, Vec3::new(10.0, 0.0, 0.0))];
        let mesh = combine_instances(&template, &entries);

        assert_eq!(mesh.count_vertices(), 6);
        let Some(Indices::U32(indices)) = mesh.indices() else {
            panic!("combined mesh must use u32 indices");
        };
        assert_eq!(indices, &vec![0, 1, 2, 3, 4, 5]);

        let Some(VertexAttributeValues::Float32x3(positions)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION) else {
            panic!("missing positions");
        };
        assert_eq!(positions[3], [10.0, 0.0, 0.0]);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
    }

    #[test]
    fn test_normals_follow_rotation() {
        let template = template();
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::ZERO,
        );
        let mesh = combine_instances(&template, &[CombineEntry { instance: 0, part: 0, transform }]);
        let Some(VertexAttributeValues::Float32x3(normals)) = mesh.attribute(Mesh::ATTRIBUTE_NORMAL) else {
            panic!("missing normals");
        };
        let n = Vec3::from_array(normals[0]);
        assert!(n.distance(Vec3::X) < 1e-5, "got {n:?}");
    }

    #[test]
    fn test_empty_entries_make_valid_empty_mesh() {
        let mesh = combine_instances(&template(), &[]);
        assert_eq!(mesh.count_vertices(), 0);
        assert!(matches!(mesh.indices(), Some(Indices::U32(i)) if i.is_empty()));
        assert!(mesh_bounds(&mesh).is_none());
    }

    #[test]
    fn test_large_combination_exceeds_u16() {
        let template = template();
        let entries: Vec<CombineEntry> = (0..30_000).map(|i| entry(i, 0, Vec3::new(i as f32, 0.0, 0.0))).collect();
        let mesh = combine_instances(&template, &entries);
        assert_eq!(mesh.count_vertices(), 90_000);
        let Some(Indices::U32(indices)) = mesh.indices() else {
            panic!("combined mesh must use u32 indices");
        };
        assert_eq!(*indices.last().unwrap(), 89_999);

        let bounds = mesh_bounds(&mesh).unwrap();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(29_999.0 + 1.0, 1.0, 0.0));
    }
}
