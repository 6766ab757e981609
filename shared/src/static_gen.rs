//! One-shot whole-map generation.

use bevy::prelude::*;

use crate::store::ChunkStore;
use crate::terrain::{ChunkCoord, MapBounds};

/// One grid cell of the static layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticCell {
    /// Cell index from the min corner, not a streaming coordinate.
    pub coord: ChunkCoord,
    pub anchor: Vec3,
    pub footprint: Vec2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticSummary {
    pub cells: usize,
    pub built: usize,
    pub empty: usize,
}

/// Tile `bounds` with square cells of `chunk_size`, starting at the min corner.
///
/// A cell is emitted while its min corner is still below `max` on both axes,
/// so the last row and column may overhang the bounds. Infinite bounds have no
/// finite tiling and yield nothing.
pub fn static_cells(bounds: &MapBounds, chunk_size: f32) -> Vec<StaticCell> {
    if !(chunk_size > 0.0) || !bounds.min.is_finite() || !bounds.max.is_finite() {
        return Vec::new();
    }

    let (columns, rows) = grid_dims(bounds.size(), chunk_size);
    let y = bounds.center().y;

    let mut cells = Vec::with_capacity(cell_count(columns, rows));
    for z in 0..rows {
        for x in 0..columns {
            let anchor = Vec3::new(
                bounds.min.x + (x as f32 + 0.5) * chunk_size,
                y,
                bounds.min.z + (z as f32 + 0.5) * chunk_size,
            );
            cells.push(StaticCell {
                coord: ChunkCoord::new(x, z),
                anchor,
                footprint: Vec2::splat(chunk_size),
            });
        }
    }
    cells
}

/// Columns and rows needed to cover `size`, rounding up.
fn grid_dims(size: Vec3, chunk_size: f32) -> (i32, i32) {
    let columns = (size.x / chunk_size).ceil().max(0.0) as i32;
    let rows = (size.z / chunk_size).ceil().max(0.0) as i32;
    (columns, rows)
}

/// Number of cells in a `columns` x `rows` grid, counted in `usize`.
fn cell_count(columns: i32, rows: i32) -> usize {
    (columns.max(0) as usize).saturating_mul(rows.max(0) as usize)
}

/// Build every cell once, inserting the non-empty ones into `store`.
pub fn generate_static<T>(
    cells: &[StaticCell],
    store: &mut ChunkStore<T>,
    mut build: impl FnMut(&StaticCell) -> Option<T>,
) -> StaticSummary {
    let mut summary = StaticSummary {
        cells: cells.len(),
        ..default()
    };

    for cell in cells {
        match build(cell) {
            Some(chunk) => {
                store.insert(cell.coord, chunk);
                summary.built += 1;
            }
            None => summary.empty += 1,
        }
    }

    info!(
        "Static grass: {} chunks built, {} empty cells out of {}",
        summary.built, summary.empty, summary.cells
    );
    summary
}
