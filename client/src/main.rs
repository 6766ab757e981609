//! Grass demo client - streams (or statically fills) a grass field over a
//! procedural heightfield and lets you fly around it.
//!
//! Bevy 0.17

mod camera;
mod grass;
mod lod;
mod states;
mod world;

use bevy::asset::AssetPlugin;
use bevy::diagnostic::{EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::window::WindowResolution;
use std::path::Path;

use shared::{SpatialObstacleGrid, WorldTerrain};

/// Get the asset path - for bundled apps, use path relative to executable
fn get_asset_path() -> String {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled_assets = exe_dir.join("assets");
            if bundled_assets.exists() {
                info!("Using bundled assets at: {:?}", bundled_assets);
                return bundled_assets.to_string_lossy().to_string();
            }
        }
    }
    // Fall back to default "assets" folder (for development)
    "assets".to_string()
}

fn main() {
    let asset_path = get_asset_path();
    let config_path = Path::new(&asset_path).join("grass.ron");

    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Grass Streaming".to_string(),
                    resolution: WindowResolution::new(1280, 720),
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: asset_path,
                ..default()
            }),
    );

    // FPS + entity count, handy for watching chunks come and go
    app.add_plugins(FrameTimeDiagnosticsPlugin::default());
    app.add_plugins(EntityCountDiagnosticsPlugin::default());

    app.init_resource::<WorldTerrain>();
    app.init_resource::<SpatialObstacleGrid>();

    app.add_plugins(grass::GrassPlugin { config_path });

    // World and viewer must exist before the grass startup checks run
    app.add_systems(
        Startup,
        ((world::spawn_world, camera::spawn_camera), grass::init_grass).chain(),
    );

    app.add_systems(Update, (camera::grab_cursor, camera::fly_camera));

    app.run();
}
