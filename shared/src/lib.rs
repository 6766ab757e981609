//! Shared grass placement and chunk streaming logic.
//!
//! Everything in here is plain data + algorithms on top of Bevy's math and mesh
//! types. The client owns the ECS side (spawning entities, timers, LOD toggling).

pub mod chunk;
pub mod combine;
pub mod config;
pub mod error;
pub mod lod;
pub mod placement;
pub mod probe;
pub mod spatial;
pub mod static_gen;
pub mod store;
pub mod streaming;
pub mod template;
pub mod terrain;

pub use chunk::{chunk_rng, BuildStats, BuiltChunk, ChunkBuilder, PlacementBatch};
pub use combine::{combine_instances, ChunkBounds, CombineEntry};
pub use config::{BuildSettings, ConfigError, GrassConfig, GrassMode, StaticSettings, StreamingSettings};
pub use error::InitError;
pub use lod::{screen_coverage, LodDescriptor, LodLevel};
pub use placement::{synthesize_placement, PlacementTransform};
pub use probe::{HeightfieldProbe, NoGround, NoObstacles, ObstacleFilter, SurfaceHit, SurfaceProbe};
pub use spatial::{ObstacleEntry, SpatialObstacleGrid};
pub use static_gen::{generate_static, static_cells, StaticCell, StaticSummary};
pub use store::ChunkStore;
pub use streaming::{PollOutcome, SliceReport, StreamingScheduler};
pub use template::{GrassTemplate, TemplatePart};
pub use terrain::{ChunkCoord, MapBounds, TerrainGenerator, WorldTerrain};
