//! Chunk grid math and the heightfield terrain the demo grass grows on.
//!
//! Scale: 1 unit = 1 meter.
//! - Grass chunks are `chunk_size` x `chunk_size` squares (20m by default)
//! - Terrain relief stays well inside the +/-50m probe window

use bevy::prelude::*;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// World generation seed - same seed = same hills
pub const WORLD_SEED: u32 = 42;

/// Maximum terrain height variation (meters)
pub const MAX_HEIGHT: f32 = 12.0;
/// Base height offset
pub const BASE_HEIGHT: f32 = 0.0;

/// Chunk coordinate (integer grid position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Component, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Convert world position to the chunk whose center is nearest.
    ///
    /// Streaming chunks are centered on multiples of `chunk_size`, so this rounds
    /// instead of flooring.
    pub fn from_world_pos(pos: Vec3, chunk_size: f32) -> Self {
        Self {
            x: (pos.x / chunk_size).round() as i32,
            z: (pos.z / chunk_size).round() as i32,
        }
    }

    /// World position of the chunk center at height `y`.
    pub fn center(&self, chunk_size: f32, y: f32) -> Vec3 {
        Vec3::new(self.x as f32 * chunk_size, y, self.z as f32 * chunk_size)
    }

    /// Get chunks in a (Chebyshev) radius around this chunk
    pub fn chunks_in_radius(&self, radius: i32) -> Vec<ChunkCoord> {
        let side = (2 * radius.max(0) + 1) as usize;
        let mut chunks = Vec::with_capacity(side * side);
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                chunks.push(ChunkCoord::new(self.x + dx, self.z + dz));
            }
        }
        chunks
    }

    /// Grid distance where diagonal steps count as one.
    pub fn chebyshev_distance(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// Axis-aligned extent of the ground that may receive grass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl MapBounds {
    /// Horizontally infinite bounds (vertical extent collapsed to y = 0).
    pub const UNBOUNDED: MapBounds = MapBounds {
        min: Vec3::new(f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY),
        max: Vec3::new(f32::INFINITY, 0.0, f32::INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        if self.min.is_finite() && self.max.is_finite() {
            (self.min + self.max) * 0.5
        } else {
            // Infinite axes have no meaningful midpoint; only y is used from this.
            Vec3::new(0.0, (self.min.y + self.max.y) * 0.5, 0.0)
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check the horizontal footprint (min inclusive, max exclusive).
    pub fn contains_xz(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.z >= self.min.z && point.z < self.max.z
    }
}

/// Vertex data for one square patch of terrain
pub struct TerrainMeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Rolling-hills terrain generator using Perlin noise
#[derive(Clone)]
pub struct TerrainGenerator {
    height_noise: Perlin,
    detail_noise: Perlin,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            height_noise: Perlin::new(seed),
            detail_noise: Perlin::new(seed.wrapping_add(3000)),
        }
    }

    /// Ground height at a world XZ position
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        let hills = self.height_noise.get([x as f64 * 0.008, z as f64 * 0.008]) as f32;
        let detail = self.detail_noise.get([x as f64 * 0.06, z as f64 * 0.06]) as f32;
        BASE_HEIGHT + hills * MAX_HEIGHT + detail * 0.8
    }

    /// Surface normal from central differences
    pub fn get_normal(&self, x: f32, z: f32) -> Vec3 {
        let sample_dist = 0.5;

        let h_left = self.get_height(x - sample_dist, z);
        let h_right = self.get_height(x + sample_dist, z);
        let h_back = self.get_height(x, z - sample_dist);
        let h_front = self.get_height(x, z + sample_dist);

        let dx = (h_right - h_left) / (2.0 * sample_dist);
        let dz = (h_front - h_back) / (2.0 * sample_dist);

        Vec3::new(-dx, 1.0, -dz).normalize()
    }

    /// Generate vertex data for a square patch with its minimum corner at `origin`.
    /// Positions are local to `origin` (y stays absolute).
    pub fn generate_patch_vertices(&self, origin: Vec2, size: f32, resolution: usize) -> TerrainMeshData {
        let resolution = resolution.max(2);
        let spacing = size / (resolution - 1) as f32;
        let mut positions = Vec::with_capacity(resolution * resolution);
        let mut normals = Vec::with_capacity(resolution * resolution);
        let mut uvs = Vec::with_capacity(resolution * resolution);
        let mut indices = Vec::with_capacity((resolution - 1) * (resolution - 1) * 6);

        for zi in 0..resolution {
            for xi in 0..resolution {
                let local_x = xi as f32 * spacing;
                let local_z = zi as f32 * spacing;
                let world_x = origin.x + local_x;
                let world_z = origin.y + local_z;

                positions.push([local_x, self.get_height(world_x, world_z), local_z]);
                normals.push(self.get_normal(world_x, world_z).to_array());
                uvs.push([local_x / size, local_z / size]);
            }
        }

        for zi in 0..resolution - 1 {
            for xi in 0..resolution - 1 {
                let i = (zi * resolution + xi) as u32;
                let row = resolution as u32;
                // Two CCW triangles (viewed from above)
                indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }

        TerrainMeshData {
            positions,
            normals,
            uvs,
            indices,
        }
    }
}

/// Resource wrapper so the client can share the generator
#[derive(Resource, Clone)]
pub struct WorldTerrain {
    pub generator: TerrainGenerator,
}

impl WorldTerrain {
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        self.generator.get_height(x, z)
    }
}

impl Default for WorldTerrain {
    fn default() -> Self {
        Self {
            generator: TerrainGenerator::new(WORLD_SEED),
        }
    }
}
