//! The replicated object: one or more sub-meshes sharing a material.

use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use crate::error::InitError;

/// One sub-mesh of the template and its transform relative to the template root.
#[derive(Clone)]
pub struct TemplatePart {
    pub mesh: Mesh,
    pub local: Transform,
}

impl TemplatePart {
    pub fn new(mesh: Mesh, local: Transform) -> Self {
        Self { mesh, local }
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.local.scale, self.local.rotation, self.local.translation)
    }
}

/// Source geometry for every grass instance.
///
/// Read-only once built; chunks copy instances of it, never the template itself.
#[derive(Clone)]
pub struct GrassTemplate {
    pub parts: Vec<TemplatePart>,
    pub material: Handle<StandardMaterial>,
}

impl GrassTemplate {
    pub fn new(parts: Vec<TemplatePart>, material: Handle<StandardMaterial>) -> Self {
        Self { parts, material }
    }

    /// Reject templates the mesh combiner cannot use.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.parts.is_empty() {
            return Err(InitError::EmptyTemplate);
        }
        for (index, part) in self.parts.iter().enumerate() {
            if part.mesh.primitive_topology() != PrimitiveTopology::TriangleList {
                return Err(InitError::UnsupportedTemplatePart {
                    index,
                    reason: "topology must be a triangle list",
                });
            }
            if !matches!(
                part.mesh.attribute(Mesh::ATTRIBUTE_POSITION),
                Some(VertexAttributeValues::Float32x3(_))
            ) {
                return Err(InitError::UnsupportedTemplatePart {
                    index,
                    reason: "positions must be Float32x3",
                });
            }
        }
        Ok(())
    }
}
