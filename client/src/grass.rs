//! Grass plugin - hosts the static generator and the chunk streamer
//!
//! The placement and scheduling logic lives in `shared`; this module owns the
//! ECS side: startup checks, the poll timer, per-frame creation slices, and
//! turning built chunks into entities (and back into nothing on eviction).

use bevy::light::NotShadowCaster;
use bevy::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shared::config::load_config;
use shared::static_gen::{generate_static, static_cells};
use shared::{
    BuildSettings, BuiltChunk, ChunkBuilder, ChunkCoord, ChunkStore, ConfigError, GrassConfig, GrassMode,
    GrassTemplate, InitError, LodLevel, MapBounds, PollOutcome, SpatialObstacleGrid, StreamingScheduler,
    SurfaceProbe,
};

use crate::lod::{update_grass_lod, GrassLod};
use crate::states::GrassState;

// =============================================================================
// COMPONENTS & RESOURCES
// =============================================================================

/// Parent of every grass chunk entity
#[derive(Component)]
pub struct GrassRoot;

/// Root entity of one resident chunk
#[derive(Component)]
pub struct GrassChunk {
    pub coord: ChunkCoord,
}

/// The entity whose position drives streaming and LOD
#[derive(Component)]
pub struct GrassViewer;

/// What the store holds for a resident chunk: the entity tree and both mesh assets.
#[derive(Debug)]
pub struct ResidentChunk {
    pub entity: Entity,
    pub high_detail: Handle<Mesh>,
    pub low_detail: Handle<Mesh>,
    pub instances: usize,
}

#[derive(Resource, Default)]
pub struct GrassChunks(pub ChunkStore<ResidentChunk>);

/// Instance template shared by every chunk build
#[derive(Resource, Clone)]
pub struct GrassTemplateRes(pub Arc<GrassTemplate>);

/// Ground the grass is placed on
#[derive(Resource, Clone)]
pub struct GrassGround {
    pub probe: Arc<dyn SurfaceProbe>,
    pub bounds: MapBounds,
}

/// Streaming on/off switch. Turning it off abandons the pass in flight.
#[derive(Resource)]
pub struct GrassStreamingEnabled(pub bool);

impl Default for GrassStreamingEnabled {
    fn default() -> Self {
        Self(true)
    }
}

/// Streaming runtime, only present in streaming mode after a successful setup
#[derive(Resource)]
pub struct GrassStreaming {
    pub scheduler: StreamingScheduler,
    pub build: BuildSettings,
    pub poll_timer: Timer,
}

// =============================================================================
// PLUGIN
// =============================================================================

pub struct GrassPlugin {
    /// RON file with the grass settings; defaults apply when it is missing.
    pub config_path: PathBuf,
}

impl Plugin for GrassPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(load_grass_config(&self.config_path));
        app.init_state::<GrassState>();
        app.init_resource::<GrassChunks>();
        app.init_resource::<GrassStreamingEnabled>();

        app.add_systems(OnEnter(GrassState::Running), generate_static_grass.run_if(static_mode));
        app.add_systems(
            Update,
            (
                toggle_streaming,
                handle_streaming_toggle,
                (poll_viewer, advance_streaming)
                    .chain()
                    .run_if(streaming_enabled),
            )
                .chain()
                .run_if(in_state(GrassState::Running).and(resource_exists::<GrassStreaming>)),
        );
        app.add_systems(Update, update_grass_lod.run_if(in_state(GrassState::Running)));
        app.add_systems(OnExit(GrassState::Running), cancel_streaming);
    }
}

fn static_mode(config: Res<GrassConfig>) -> bool {
    config.mode == GrassMode::Static
}

fn streaming_enabled(enabled: Res<GrassStreamingEnabled>) -> bool {
    enabled.0
}

/// Read the config file, falling back to defaults when it is absent or broken.
pub fn load_grass_config(path: &Path) -> GrassConfig {
    match load_config(path) {
        Ok(config) => {
            info!("Loaded grass config from {:?} ({:?} mode)", path, config.mode);
            config
        }
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("No grass config at {:?}, using defaults", path);
            GrassConfig::default()
        }
        Err(err) => {
            warn!("Ignoring grass config {:?}: {}", path, err);
            GrassConfig::default()
        }
    }
}

// =============================================================================
// SETUP
// =============================================================================

/// Check that everything generation needs is present.
pub fn check_grass_inputs(
    config: Option<&GrassConfig>,
    template: Option<&GrassTemplateRes>,
    ground: Option<&GrassGround>,
    viewers: usize,
) -> Result<(), InitError> {
    let config = config.ok_or(InitError::MissingConfig)?;
    let template = template.ok_or(InitError::MissingTemplate)?;
    template.0.validate()?;
    if ground.is_none() {
        return Err(InitError::MissingGround);
    }
    if config.mode == GrassMode::Streaming && viewers != 1 {
        return Err(InitError::MissingViewer(viewers));
    }
    Ok(())
}

/// Startup gate: spawn the grass root and start the chosen mode, or abort.
pub fn init_grass(
    mut commands: Commands,
    config: Option<Res<GrassConfig>>,
    template: Option<Res<GrassTemplateRes>>,
    ground: Option<Res<GrassGround>>,
    viewers: Query<(), With<GrassViewer>>,
    mut next_state: ResMut<NextState<GrassState>>,
) {
    let checked = check_grass_inputs(
        config.as_deref(),
        template.as_deref(),
        ground.as_deref(),
        viewers.iter().count(),
    );
    if let Err(err) = checked {
        error!("Grass generation disabled: {}", err);
        next_state.set(GrassState::Aborted);
        return;
    }
    let Some(config) = config else {
        return;
    };

    commands.spawn((
        Name::new("GrassRoot"),
        GrassRoot,
        Transform::default(),
        Visibility::default(),
    ));

    if config.mode == GrassMode::Streaming {
        let bounds = ground.map(|g| g.bounds).unwrap_or(MapBounds::UNBOUNDED);
        commands.insert_resource(GrassStreaming {
            scheduler: StreamingScheduler::from_config(&config, bounds),
            build: config.build_settings(GrassMode::Streaming),
            poll_timer: Timer::from_seconds(config.streaming.poll_interval_secs, TimerMode::Repeating),
        });
        info!(
            "Grass streaming: radius {} chunks of {}m, {} per frame",
            config.streaming.render_radius, config.chunk_size, config.streaming.max_chunks_per_tick
        );
    }

    next_state.set(GrassState::Running);
}

// =============================================================================
// CHUNK ENTITIES
// =============================================================================

/// Turn a built chunk into `Chunk_{x}_{z}` with one child per LOD level.
fn spawn_chunk(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    root: Entity,
    material: &Handle<StandardMaterial>,
    built: BuiltChunk,
) -> ResidentChunk {
    let coord = built.coord;
    let high_detail = meshes.add(built.high_detail);
    let low_detail = meshes.add(built.low_detail);

    let entity = commands
        .spawn((
            Name::new(format!("Chunk_{}_{}", coord.x, coord.z)),
            GrassChunk { coord },
            built.lod,
            built.bounds,
            Transform::from_translation(built.anchor),
            Visibility::default(),
        ))
        .with_children(|chunk| {
            chunk.spawn((
                Name::new("LOD0_High"),
                GrassLod(LodLevel::High),
                Mesh3d(high_detail.clone()),
                MeshMaterial3d(material.clone()),
                Transform::default(),
                Visibility::Inherited,
                NotShadowCaster,
            ));
            chunk.spawn((
                Name::new("LOD1_Low"),
                GrassLod(LodLevel::Low),
                Mesh3d(low_detail.clone()),
                MeshMaterial3d(material.clone()),
                Transform::default(),
                Visibility::Hidden,
                NotShadowCaster,
            ));
        })
        .id();
    commands.entity(root).add_child(entity);

    ResidentChunk {
        entity,
        high_detail,
        low_detail,
        instances: built.stats.accepted,
    }
}

/// Free everything a chunk owns, right now.
fn destroy_chunk(commands: &mut Commands, meshes: &mut Assets<Mesh>, chunk: ResidentChunk) {
    commands.entity(chunk.entity).despawn();
    meshes.remove(chunk.high_detail.id());
    meshes.remove(chunk.low_detail.id());
}

// =============================================================================
// STATIC MODE
// =============================================================================

fn generate_static_grass(
    mut commands: Commands,
    config: Res<GrassConfig>,
    template: Res<GrassTemplateRes>,
    ground: Res<GrassGround>,
    obstacles: Res<SpatialObstacleGrid>,
    mut chunks: ResMut<GrassChunks>,
    mut meshes: ResMut<Assets<Mesh>>,
    roots: Query<Entity, With<GrassRoot>>,
) {
    let Ok(root) = roots.single() else {
        return;
    };

    let cells = static_cells(&ground.bounds, config.chunk_size);
    if cells.is_empty() {
        warn!("Static grass needs finite ground bounds, got {:?}", ground.bounds);
        return;
    }

    let settings = config.build_settings(GrassMode::Static);
    let builder = ChunkBuilder::new(&settings, &template.0, ground.probe.as_ref(), &*obstacles);
    let material = template.0.material.clone();

    let mut instances = 0;
    generate_static(&cells, &mut chunks.0, |cell| {
        let built = builder.build_seeded(cell.coord, cell.anchor, cell.footprint)?;
        instances += built.stats.accepted;
        Some(spawn_chunk(&mut commands, &mut meshes, root, &material, built))
    });
    info!("Static grass: {} instances placed", instances);
}

// =============================================================================
// STREAMING MODE
// =============================================================================

/// Flip streaming with G
fn toggle_streaming(keyboard: Res<ButtonInput<KeyCode>>, mut enabled: ResMut<GrassStreamingEnabled>) {
    if keyboard.just_pressed(KeyCode::KeyG) {
        enabled.0 = !enabled.0;
        info!("Grass streaming {}", if enabled.0 { "enabled" } else { "disabled" });
    }
}

/// Cancel the pass in flight when streaming turns off; re-diff when it comes back.
fn handle_streaming_toggle(enabled: Res<GrassStreamingEnabled>, mut streaming: ResMut<GrassStreaming>) {
    if !enabled.is_changed() || enabled.is_added() {
        return;
    }
    if enabled.0 {
        streaming.scheduler.invalidate();
    } else {
        streaming.scheduler.cancel();
    }
}

fn cancel_streaming(streaming: Option<ResMut<GrassStreaming>>) {
    if let Some(mut streaming) = streaming {
        streaming.scheduler.cancel();
    }
}

/// Re-check the viewer's chunk on the poll timer and evict what fell out of range.
fn poll_viewer(
    mut commands: Commands,
    time: Res<Time>,
    mut streaming: ResMut<GrassStreaming>,
    mut chunks: ResMut<GrassChunks>,
    mut meshes: ResMut<Assets<Mesh>>,
    viewer: Query<&GlobalTransform, With<GrassViewer>>,
) {
    streaming.poll_timer.tick(time.delta());
    let first_poll = streaming.scheduler.current().is_none();
    if !streaming.poll_timer.just_finished() && !first_poll {
        return;
    }

    let Ok(viewer) = viewer.single() else {
        return;
    };

    let outcome = streaming
        .scheduler
        .poll(viewer.translation(), &mut chunks.0, |_, chunk| {
            destroy_chunk(&mut commands, &mut meshes, chunk)
        });

    if let PollOutcome::Updated { coord, evicted, queued } = outcome {
        debug!(
            "Viewer entered chunk {:?}: {} evicted, {} queued, {} resident",
            coord,
            evicted,
            queued,
            chunks.0.len()
        );
    }
}

/// Build this frame's share of the pending chunks.
fn advance_streaming(
    mut commands: Commands,
    template: Res<GrassTemplateRes>,
    ground: Res<GrassGround>,
    obstacles: Res<SpatialObstacleGrid>,
    mut streaming: ResMut<GrassStreaming>,
    mut chunks: ResMut<GrassChunks>,
    mut meshes: ResMut<Assets<Mesh>>,
    roots: Query<Entity, With<GrassRoot>>,
) {
    if streaming.scheduler.is_idle() {
        return;
    }
    let Ok(root) = roots.single() else {
        return;
    };

    let GrassStreaming { scheduler, build, .. } = &mut *streaming;
    let builder = ChunkBuilder::new(build, &template.0, ground.probe.as_ref(), &*obstacles);
    let footprint = Vec2::splat(scheduler.chunk_size());
    let material = template.0.material.clone();

    let report = scheduler.advance(&mut chunks.0, |coord, anchor| {
        let built = builder.build_seeded(coord, anchor, footprint)?;
        Some(spawn_chunk(&mut commands, &mut meshes, root, &material, built))
    });

    if report.pass_complete() {
        let instances: usize = chunks.0.iter().map(|(_, chunk)| chunk.instances).sum();
        info!(
            "Grass pass complete: {} chunks resident, {} instances",
            chunks.0.len(),
            instances
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::asset::RenderAssetUsages;
    use bevy::ecs::world::CommandQueue;
    use bevy::render::render_resource::PrimitiveTopology;
    use shared::{HeightfieldProbe, NoGround, NoObstacles, TemplatePart, TerrainGenerator};

    fn template() -> GrassTemplateRes {
        let mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, vec![[0.0_f32, 0.0, 0.0], [0.1, 0.0, 0.0], [0.0, 0.5, 0.0]]);
        GrassTemplateRes(Arc::new(GrassTemplate::new(
            vec![TemplatePart::new(mesh, Transform::IDENTITY)],
            Handle::default(),
        )))
    }

    fn ground() -> GrassGround {
        GrassGround {
            probe: Arc::new(NoGround),
            bounds: MapBounds::UNBOUNDED,
        }
    }

    #[test]
    fn test_missing_inputs_abort_setup() {
        let config = GrassConfig::default();
        let template = template();
        let ground = ground();

        assert!(matches!(
            check_grass_inputs(Some(&config), None, Some(&ground), 1),
            Err(InitError::MissingTemplate)
        ));
        assert!(matches!(
            check_grass_inputs(Some(&config), Some(&template), None, 1),
            Err(InitError::MissingGround)
        ));
        assert!(matches!(
            check_grass_inputs(Some(&config), Some(&template), Some(&ground), 0),
            Err(InitError::MissingViewer(0))
        ));
        assert!(check_grass_inputs(Some(&config), Some(&template), Some(&ground), 1).is_ok());

        // Static mode does not follow a viewer
        let static_config = GrassConfig {
            mode: GrassMode::Static,
            ..GrassConfig::default()
        };
        assert!(check_grass_inputs(Some(&static_config), Some(&template), Some(&ground), 0).is_ok());
    }

    #[test]
    fn test_empty_template_is_rejected() {
        let config = GrassConfig::default();
        let empty = GrassTemplateRes(Arc::new(GrassTemplate::new(Vec::new(), Handle::default())));
        assert!(matches!(
            check_grass_inputs(Some(&config), Some(&empty), Some(&ground()), 1),
            Err(InitError::EmptyTemplate)
        ));
    }

    #[test]
    fn test_evicted_chunk_frees_meshes_and_entities() {
        let mut world = World::new();
        let mut meshes = Assets::<Mesh>::default();
        let root = world.spawn(GrassRoot).id();

        let bounds = crate::world::map_bounds();
        let probe = HeightfieldProbe::new(TerrainGenerator::new(shared::terrain::WORLD_SEED), bounds);
        let template = template();
        let settings = GrassConfig::default().build_settings(GrassMode::Streaming);
        let builder = ChunkBuilder::new(&settings, &template.0, &probe, &NoObstacles);
        let material = Handle::<StandardMaterial>::default();

        let mut scheduler = StreamingScheduler::new(20.0, 0, 1, bounds);
        let mut store = ChunkStore::new();
        let mut queue = CommandQueue::default();
        {
            let mut commands = Commands::new(&mut queue, &world);
            scheduler.poll(Vec3::ZERO, &mut store, |coord, _| panic!("nothing to evict, got {coord:?}"));
            scheduler.advance(&mut store, |coord, anchor| {
                let built = builder.build_seeded(coord, anchor, Vec2::splat(20.0))?;
                Some(spawn_chunk(&mut commands, &mut meshes, root, &material, built))
            });
        }
        queue.apply(&mut world);

        let resident = store.get(&ChunkCoord::new(0, 0)).expect("origin chunk should be resident");
        let (entity, high, low) = (resident.entity, resident.high_detail.id(), resident.low_detail.id());
        assert!(meshes.contains(high) && meshes.contains(low));
        let children: Vec<Entity> = world
            .get::<Children>(entity)
            .expect("chunk should have LOD children")
            .iter()
            .collect();
        assert_eq!(children.len(), 2);
        assert!(world.get::<NotShadowCaster>(children[0]).is_some());
        assert_eq!(world.get::<Name>(entity).map(|n| n.as_str()), Some("Chunk_0_0"));

        // Viewer jumps five chunks away: the origin chunk is evicted on the next poll
        let mut evicted = 0;
        {
            let mut commands = Commands::new(&mut queue, &world);
            scheduler.poll(Vec3::new(100.0, 0.0, 0.0), &mut store, |_, chunk| {
                evicted += 1;
                destroy_chunk(&mut commands, &mut meshes, chunk);
            });
        }
        queue.apply(&mut world);

        assert_eq!(evicted, 1);
        assert!(store.is_empty());
        assert!(!meshes.contains(high));
        assert!(!meshes.contains(low));
        assert!(world.get_entity(entity).is_err());
        assert!(children.iter().all(|child| world.get_entity(*child).is_err()));
        assert!(world.get_entity(root).is_ok());
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let config = load_grass_config(Path::new("does/not/exist/grass.ron"));
        assert_eq!(config, GrassConfig::default());
    }
}
