//! Viewer-centered chunk streaming.
//!
//! The scheduler is an explicit state machine driven by the host loop:
//!
//! - [`StreamingScheduler::poll`] runs on a timer. When the viewer's chunk
//!   changes it evicts everything outside the render square immediately and
//!   queues the missing in-bounds chunks.
//! - [`StreamingScheduler::advance`] runs once per tick and builds at most
//!   `max_chunks_per_tick` queued chunks, inserting each as soon as it exists.
//!
//! The queue and its cursor live in the scheduler, so a pass spread over many
//! ticks can be abandoned ([`StreamingScheduler::cancel`]) at any tick boundary
//! without leaving the store half-updated.

use bevy::prelude::*;

use crate::config::GrassConfig;
use crate::store::ChunkStore;
use crate::terrain::{ChunkCoord, MapBounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Viewer still in the same chunk; nothing was touched.
    Unchanged,
    /// A new pass started around `coord`.
    Updated {
        coord: ChunkCoord,
        evicted: usize,
        queued: usize,
    },
}

/// What one [`StreamingScheduler::advance`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceReport {
    pub built: usize,
    /// Builds that produced nothing (not inserted, not retried).
    pub empty: usize,
    /// Queued coordinates that were already resident.
    pub skipped: usize,
    /// Coordinates still queued after this slice.
    pub remaining: usize,
}

impl SliceReport {
    pub fn pass_complete(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone)]
pub struct StreamingScheduler {
    chunk_size: f32,
    render_radius: i32,
    max_chunks_per_tick: usize,
    bounds: MapBounds,
    /// Last observed viewer chunk; `None` until the first poll.
    current: Option<ChunkCoord>,
    queue: Vec<ChunkCoord>,
    cursor: usize,
    passes: u64,
}

impl StreamingScheduler {
    pub fn new(chunk_size: f32, render_radius: i32, max_chunks_per_tick: usize, bounds: MapBounds) -> Self {
        Self {
            chunk_size,
            render_radius: render_radius.max(0),
            max_chunks_per_tick: max_chunks_per_tick.max(1),
            bounds,
            current: None,
            queue: Vec::new(),
            cursor: 0,
            passes: 0,
        }
    }

    pub fn from_config(config: &GrassConfig, bounds: MapBounds) -> Self {
        Self::new(
            config.chunk_size,
            config.streaming.render_radius,
            config.streaming.max_chunks_per_tick,
            bounds,
        )
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    pub fn current(&self) -> Option<ChunkCoord> {
        self.current
    }

    /// Number of update passes started so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn pending(&self) -> usize {
        self.queue.len() - self.cursor
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    pub fn chunk_at(&self, position: Vec3) -> ChunkCoord {
        ChunkCoord::from_world_pos(position, self.chunk_size)
    }

    /// World-space center of a chunk, at the ground's mid height.
    pub fn anchor(&self, coord: ChunkCoord) -> Vec3 {
        coord.center(self.chunk_size, self.bounds.center().y)
    }

    pub fn in_bounds(&self, coord: ChunkCoord) -> bool {
        self.bounds.contains_xz(self.anchor(coord))
    }

    /// The render square around `center`, before the bounds filter.
    pub fn desired(&self, center: ChunkCoord) -> Vec<ChunkCoord> {
        center.chunks_in_radius(self.render_radius)
    }

    /// Observe the viewer. Starts a new pass when it changed chunk (or on the
    /// first poll), evicting stale chunks through `on_evict` before returning.
    ///
    /// From the same chunk the poll stays `Unchanged` while the store is
    /// non-empty or a pass is still running. Only an empty store with no pass
    /// in flight forces a re-diff for the current chunk.
    pub fn poll<T>(
        &mut self,
        reference: Vec3,
        store: &mut ChunkStore<T>,
        on_evict: impl FnMut(ChunkCoord, T),
    ) -> PollOutcome {
        let coord = self.chunk_at(reference);
        // An empty store only forces a re-diff once the previous pass is done,
        // otherwise empty builds from the running pass would be queued again.
        if self.current == Some(coord) && (!store.is_empty() || !self.is_idle()) {
            return PollOutcome::Unchanged;
        }

        self.current = Some(coord);
        self.passes += 1;

        let radius = self.render_radius;
        let evicted = store.evict_unless(|c| c.chebyshev_distance(coord) <= radius, on_evict);

        let mut queue: Vec<ChunkCoord> = self
            .desired(coord)
            .into_iter()
            .filter(|c| !store.contains(c) && self.in_bounds(*c))
            .collect();
        // Nearest rings first so the area around the viewer fills in before the edges
        queue.sort_by_key(|c| (c.chebyshev_distance(coord), c.z, c.x));

        self.queue = queue;
        self.cursor = 0;

        debug!(
            "Grass pass {} around {:?}: evicted {}, queued {}",
            self.passes,
            coord,
            evicted,
            self.queue.len()
        );

        PollOutcome::Updated {
            coord,
            evicted,
            queued: self.queue.len(),
        }
    }

    /// Build the next slice of queued chunks.
    ///
    /// `build` receives the coordinate and its world anchor and returns `None`
    /// for an empty chunk. At most `max_chunks_per_tick` builds run per call.
    pub fn advance<T>(
        &mut self,
        store: &mut ChunkStore<T>,
        mut build: impl FnMut(ChunkCoord, Vec3) -> Option<T>,
    ) -> SliceReport {
        let mut report = SliceReport::default();

        while self.cursor < self.queue.len() && report.built + report.empty < self.max_chunks_per_tick {
            let coord = self.queue[self.cursor];
            self.cursor += 1;

            if store.contains(&coord) {
                report.skipped += 1;
                continue;
            }

            match build(coord, self.anchor(coord)) {
                Some(chunk) => {
                    store.insert(coord, chunk);
                    report.built += 1;
                }
                None => report.empty += 1,
            }
        }

        if self.cursor >= self.queue.len() {
            self.queue.clear();
            self.cursor = 0;
        }

        report.remaining = self.pending();
        report
    }

    /// Abandon the pass in flight. Chunks already inserted stay resident.
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            debug!("Grass pass {} cancelled with {} chunks pending", self.passes, self.pending());
        }
        self.queue.clear();
        self.cursor = 0;
    }

    /// Forget the last observed chunk so the next poll re-diffs unconditionally.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}
