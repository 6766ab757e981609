//! Per-chunk grass placement.
//!
//! A chunk is filled by throwing `ceil(area * density)` random candidates at
//! the ground. Each candidate is probed straight down, rejected if it misses or
//! lands near an obstacle, and otherwise becomes one instance of the template.
//! Every instance goes into the full (LOD 0) list; an independent coin flip
//! also copies it into the coarse (LOD 1) list, so the coarse set is always a
//! subset of the full one. Both lists are then baked into single meshes.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::combine::{combine_instances, mesh_bounds, ChunkBounds, CombineEntry};
use crate::config::BuildSettings;
use crate::lod::LodDescriptor;
use crate::placement::{synthesize_placement, PlacementTransform};
use crate::probe::{ObstacleFilter, SurfaceProbe};
use crate::template::GrassTemplate;
use crate::terrain::ChunkCoord;

/// Counters from one chunk build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub samples_attempted: usize,
    pub probe_misses: usize,
    pub obstacle_rejections: usize,
    pub accepted: usize,
    pub full_entries: usize,
    pub coarse_entries: usize,
}

/// Accepted placements for one chunk, before mesh merging.
#[derive(Debug, Clone, Default)]
pub struct PlacementBatch {
    pub placements: Vec<PlacementTransform>,
    pub full: Vec<CombineEntry>,
    pub coarse: Vec<CombineEntry>,
    pub stats: BuildStats,
}

/// A finished, non-empty chunk ready to hand to the renderer.
pub struct BuiltChunk {
    pub coord: ChunkCoord,
    /// World-space chunk center; all mesh positions are relative to it.
    pub anchor: Vec3,
    pub high_detail: Mesh,
    pub low_detail: Mesh,
    pub lod: LodDescriptor,
    pub bounds: ChunkBounds,
    pub stats: BuildStats,
}

/// Number of candidates thrown at a footprint.
pub fn sample_count(footprint: Vec2, density: f32) -> usize {
    if footprint.x <= 0.0 || footprint.y <= 0.0 || density <= 0.0 {
        return 0;
    }
    (footprint.x * footprint.y * density).ceil() as usize
}

/// Deterministic RNG for one chunk: the same seed and coordinate always
/// produce the same grass.
pub fn chunk_rng(seed: u64, coord: ChunkCoord) -> StdRng {
    // splitmix64 over the packed coordinate
    let packed = ((coord.x as u32 as u64) << 32) | coord.z as u32 as u64;
    let mut z = seed ^ packed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    StdRng::seed_from_u64(z ^ (z >> 31))
}

pub struct ChunkBuilder<'a> {
    settings: &'a BuildSettings,
    template: &'a GrassTemplate,
    probe: &'a dyn SurfaceProbe,
    obstacles: &'a dyn ObstacleFilter,
}

impl<'a> ChunkBuilder<'a> {
    pub fn new(
        settings: &'a BuildSettings,
        template: &'a GrassTemplate,
        probe: &'a dyn SurfaceProbe,
        obstacles: &'a dyn ObstacleFilter,
    ) -> Self {
        Self {
            settings,
            template,
            probe,
            obstacles,
        }
    }

    /// Run the sampling loop for one footprint centered on `anchor`.
    pub fn sample(&self, anchor: Vec3, footprint: Vec2, rng: &mut impl Rng) -> PlacementBatch {
        let settings = self.settings;
        let mut batch = PlacementBatch::default();
        let half = footprint * 0.5;
        let max_distance = settings.probe_height + settings.probe_depth;

        let count = sample_count(footprint, settings.density);
        batch.stats.samples_attempted = count;

        for _ in 0..count {
            let local_x = rng.gen_range(-half.x..half.x);
            let local_z = rng.gen_range(-half.y..half.y);
            let origin = anchor + Vec3::new(local_x, settings.probe_height, local_z);

            let Some(hit) = self.probe.cast_down(origin, max_distance) else {
                batch.stats.probe_misses += 1;
                continue;
            };

            if self.obstacles.sphere_blocked(hit.point, settings.obstacle_check_radius) {
                batch.stats.obstacle_rejections += 1;
                continue;
            }

            let placement =
                synthesize_placement(&hit, anchor, (settings.min_scale, settings.max_scale), rng);
            let instance = batch.placements.len();
            let base = placement.to_matrix();
            let coarse = rng.gen::<f32>() < settings.low_quality_percentage;

            for (part_index, part) in self.template.parts.iter().enumerate() {
                let entry = CombineEntry {
                    instance,
                    part: part_index,
                    transform: base * part.local_matrix(),
                };
                batch.full.push(entry);
                if coarse {
                    batch.coarse.push(entry);
                }
            }
            batch.placements.push(placement);
        }

        batch.stats.accepted = batch.placements.len();
        batch.stats.full_entries = batch.full.len();
        batch.stats.coarse_entries = batch.coarse.len();
        batch
    }

    /// Build a chunk; `None` when nothing was accepted.
    pub fn build(
        &self,
        coord: ChunkCoord,
        anchor: Vec3,
        footprint: Vec2,
        rng: &mut impl Rng,
    ) -> Option<BuiltChunk> {
        let batch = self.sample(anchor, footprint, rng);
        if batch.full.is_empty() {
            debug!(
                "Chunk {:?}: empty after {} samples ({} misses, {} blocked)",
                coord, batch.stats.samples_attempted, batch.stats.probe_misses, batch.stats.obstacle_rejections
            );
            return None;
        }

        let high_detail = combine_instances(self.template, &batch.full);
        let low_detail = combine_instances(self.template, &batch.coarse);
        let bounds = mesh_bounds(&high_detail)?;

        debug!(
            "Chunk {:?}: {} instances ({} coarse) from {} samples",
            coord,
            batch.stats.accepted,
            batch.coarse.len() / self.template.parts.len().max(1),
            batch.stats.samples_attempted
        );

        Some(BuiltChunk {
            coord,
            anchor,
            high_detail,
            low_detail,
            lod: LodDescriptor::new(self.settings.lod_transition, self.settings.lod_cutoff),
            bounds,
            stats: batch.stats,
        })
    }

    /// [`Self::build`] with the RNG seeded from the chunk coordinate.
    pub fn build_seeded(&self, coord: ChunkCoord, anchor: Vec3, footprint: Vec2) -> Option<BuiltChunk> {
        let mut rng = chunk_rng(self.settings.seed, coord);
        self.build(coord, anchor, footprint, &mut rng)
    }
}
