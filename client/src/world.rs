//! Demo world
//!
//! Heightfield ground, a handful of crates/walls for the grass to avoid, lights,
//! and the procedural blade tuft used as the grass template.

use bevy::asset::RenderAssetUsages;
use bevy::light::{light_consts::lux, CascadeShadowConfigBuilder};
use bevy::mesh::{Indices, VertexAttributeValues};
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use shared::terrain::{MAX_HEIGHT, WORLD_SEED};
use shared::{
    GrassTemplate, HeightfieldProbe, MapBounds, ObstacleEntry, SpatialObstacleGrid, TemplatePart,
    WorldTerrain,
};

use crate::grass::{GrassGround, GrassTemplateRes};

/// Side length of the square demo map, centered on the origin
pub const MAP_SIZE: f32 = 400.0;
/// Ground mesh patch size
const PATCH_SIZE: f32 = 50.0;
const PATCH_RESOLUTION: usize = 33;
const OBSTACLE_COUNT: usize = 40;

/// Root entity for all demo world visuals
#[derive(Component)]
pub struct ClientWorldRoot;

pub fn map_bounds() -> MapBounds {
    MapBounds::from_center_size(Vec3::ZERO, Vec3::new(MAP_SIZE, 2.0 * (MAX_HEIGHT + 1.0), MAP_SIZE))
}

pub fn spawn_world(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut obstacles: ResMut<SpatialObstacleGrid>,
    world_terrain: Res<WorldTerrain>,
) {
    let root = commands
        .spawn((
            ClientWorldRoot,
            Transform::default(),
            GlobalTransform::default(),
            Visibility::default(),
            InheritedVisibility::default(),
        ))
        .id();

    let sun = commands
        .spawn((
            DirectionalLight {
                illuminance: lux::AMBIENT_DAYLIGHT,
                shadows_enabled: true,
                color: Color::srgb(1.0, 0.97, 0.9),
                ..default()
            },
            CascadeShadowConfigBuilder {
                num_cascades: 3,
                maximum_distance: 120.0,
                first_cascade_far_bound: 12.0,
                ..default()
            }
            .build(),
            Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.8, 0.4, 0.0)),
        ))
        .id();
    commands.entity(root).add_child(sun);

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.8, 0.88, 1.0),
        brightness: 300.0,
        affects_lightmapped_meshes: true,
    });
    commands.insert_resource(ClearColor(Color::srgb(0.62, 0.76, 0.92)));

    let terrain = world_terrain.generator.clone();
    let bounds = map_bounds();

    // --- Ground patches ---
    let ground_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.33, 0.42, 0.2),
        perceptual_roughness: 0.95,
        metallic: 0.0,
        ..default()
    });
    let patches = (MAP_SIZE / PATCH_SIZE).ceil() as i32;
    for pz in 0..patches {
        for px in 0..patches {
            let origin = Vec2::new(
                bounds.min.x + px as f32 * PATCH_SIZE,
                bounds.min.z + pz as f32 * PATCH_SIZE,
            );
            let data = terrain.generate_patch_vertices(origin, PATCH_SIZE, PATCH_RESOLUTION);

            let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
            mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, VertexAttributeValues::Float32x3(data.positions));
            mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, VertexAttributeValues::Float32x3(data.normals));
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, VertexAttributeValues::Float32x2(data.uvs));
            mesh.insert_indices(Indices::U32(data.indices));

            let patch = commands
                .spawn((
                    Mesh3d(meshes.add(mesh)),
                    MeshMaterial3d(ground_material.clone()),
                    Transform::from_translation(Vec3::new(origin.x, 0.0, origin.y)),
                ))
                .id();
            commands.entity(root).add_child(patch);
        }
    }

    // --- Obstacles ---
    // Deterministic layout so the grass holes line up run to run
    let mut rng = StdRng::seed_from_u64(WORLD_SEED as u64);
    let obstacle_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.55, 0.5, 0.45),
        perceptual_roughness: 0.85,
        ..default()
    });
    obstacles.clear();
    let half_map = MAP_SIZE * 0.5 - 10.0;
    for _ in 0..OBSTACLE_COUNT {
        let center = Vec2::new(rng.gen_range(-half_map..half_map), rng.gen_range(-half_map..half_map));
        let half_extents = Vec2::new(rng.gen_range(1.0..6.0), rng.gen_range(1.0..4.0));
        let height = rng.gen_range(1.5..5.0);
        let yaw = rng.gen_range(0.0..std::f32::consts::TAU);
        let ground_y = terrain.get_height(center.x, center.y);

        let (entry, cuboid, transform) = obstacle_box(center, half_extents, height, yaw, ground_y);
        obstacles.insert(entry);

        let obstacle = commands
            .spawn((
                Mesh3d(meshes.add(cuboid)),
                MeshMaterial3d(obstacle_material.clone()),
                transform,
            ))
            .id();
        commands.entity(root).add_child(obstacle);
    }

    // --- Grass inputs ---
    commands.insert_resource(GrassGround {
        probe: Arc::new(HeightfieldProbe::new(terrain, bounds)),
        bounds,
    });

    let grass_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.36, 0.62, 0.2),
        perceptual_roughness: 0.8,
        double_sided: true,
        cull_mode: None,
        ..default()
    });
    commands.insert_resource(GrassTemplateRes(Arc::new(blade_tuft(grass_material))));

    info!(
        "Demo world ready: {}m map, {} obstacles",
        MAP_SIZE,
        obstacles.len()
    );
}

/// Grid entry plus the drawn box for one obstacle. The box sinks 1m into the ground.
fn obstacle_box(
    center: Vec2,
    half_extents: Vec2,
    height: f32,
    yaw: f32,
    ground_y: f32,
) -> (ObstacleEntry, Cuboid, Transform) {
    let entry = ObstacleEntry {
        center,
        half_extents,
        rotation: yaw,
        min_y: ground_y - 1.0,
        max_y: ground_y + height,
    };
    let cuboid = Cuboid::new(half_extents.x * 2.0, height + 1.0, half_extents.y * 2.0);
    let transform = Transform::from_translation(Vec3::new(center.x, ground_y + (height - 1.0) * 0.5, center.y))
        .with_rotation(Quat::from_rotation_y(yaw));
    (entry, cuboid, transform)
}

/// Three crossed blades around the instance origin.
pub fn blade_tuft(material: Handle<StandardMaterial>) -> GrassTemplate {
    let parts = [(0.0_f32, 1.0_f32), (2.1, 0.8), (4.2, 0.9)]
        .into_iter()
        .map(|(yaw, height)| {
            TemplatePart::new(
                blade_mesh(0.08, height),
                Transform::from_rotation(Quat::from_rotation_y(yaw) * Quat::from_rotation_x(0.12))
                    .with_translation(Vec3::new(yaw.cos() * 0.04, 0.0, yaw.sin() * 0.04)),
            )
        })
        .collect();
    GrassTemplate::new(parts, material)
}

/// A single tapered blade in the XY plane: two quads and a tip.
pub fn blade_mesh(half_width: f32, height: f32) -> Mesh {
    let mid = height * 0.55;
    let positions = vec![
        [-half_width, 0.0, 0.0],
        [half_width, 0.0, 0.0],
        [-half_width * 0.6, mid, 0.0],
        [half_width * 0.6, mid, 0.0],
        [0.0, height, 0.0],
    ];
    let normals = vec![[0.0_f32, 0.0, 1.0]; 5];
    let uvs = vec![[0.0_f32, 1.0], [1.0, 1.0], [0.2, 0.45], [0.8, 0.45], [0.5, 0.0]];

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
        .with_inserted_indices(Indices::U16(vec![0, 1, 3, 0, 3, 2, 2, 3, 4]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{SurfaceProbe, TerrainGenerator};

    #[test]
    fn test_blade_tuft_is_a_valid_template() {
        let tuft = blade_tuft(Handle::default());
        assert_eq!(tuft.parts.len(), 3);
        assert!(tuft.validate().is_ok());
        assert_eq!(tuft.parts[0].mesh.count_vertices(), 5);
    }

    #[test]
    fn test_obstacle_grid_matches_drawn_box() {
        let yaw = std::f32::consts::FRAC_PI_4;
        let (entry, cuboid, transform) = obstacle_box(Vec2::new(10.0, -5.0), Vec2::new(4.0, 0.5), 3.0, yaw, 2.0);
        let mut grid = SpatialObstacleGrid::new();
        grid.insert(entry);

        // Points inside the drawn box along its long axis, near both ends
        for end in [-1.0, 1.0] {
            let local = Vec3::new(end * (cuboid.half_size.x - 0.3), 0.0, 0.0);
            let world = transform.transform_point(local);
            assert!(grid.sphere_blocked(world, 0.1), "drawn point {world} not blocked");
        }

        // The same offsets mirrored across the box's center line are open ground
        let tip = transform.rotation * Vec3::X * 3.5;
        let mirrored = transform.translation + Vec3::new(tip.x, 0.0, -tip.z);
        assert!(!grid.sphere_blocked(mirrored, 0.1));
    }

    #[test]
    fn test_map_bounds_cover_terrain_heights() {
        let bounds = map_bounds();
        let probe = HeightfieldProbe::new(TerrainGenerator::new(WORLD_SEED), bounds);
        let origin = Vec3::new(35.0, bounds.center().y + 50.0, -120.0);
        assert!(probe.cast_down(origin, 100.0).is_some());
        assert!(probe.cast_down(Vec3::new(MAP_SIZE, 50.0, 0.0), 100.0).is_none());
    }
}
