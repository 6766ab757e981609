//! Free-fly camera that doubles as the grass viewer
//!
//! WASD to move, Space/Shift for up/down, Ctrl to go fast. Left click grabs the
//! cursor for mouse look, Escape releases it.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions, PrimaryWindow};
use std::f32::consts::FRAC_PI_2;

use shared::WorldTerrain;

use crate::grass::GrassViewer;

const MOUSE_SENSITIVITY: f32 = 0.002;
const FLY_SPEED: f32 = 12.0;
const FAST_MULTIPLIER: f32 = 4.0;
/// Keep the eye at least this far above the ground
const MIN_EYE_HEIGHT: f32 = 1.2;
const FOV: f32 = 70.0_f32.to_radians();

#[derive(Component, Default)]
pub struct FlyCamera {
    pub yaw: f32,
    pub pitch: f32,
}

pub fn spawn_camera(mut commands: Commands, terrain: Res<WorldTerrain>) {
    let ground = terrain.get_height(0.0, 0.0);
    let camera = FlyCamera {
        yaw: 0.0,
        pitch: -0.25,
    };
    let rotation = Quat::from_euler(EulerRot::YXZ, camera.yaw, camera.pitch, 0.0);

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: FOV,
            ..default()
        }),
        Transform::from_translation(Vec3::new(0.0, ground + 6.0, 0.0)).with_rotation(rotation),
        camera,
        GrassViewer,
    ));
}

pub fn fly_camera(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut mouse_motion: MessageReader<MouseMotion>,
    cursor: Query<&CursorOptions, With<PrimaryWindow>>,
    terrain: Res<WorldTerrain>,
    time: Res<Time>,
    mut camera_query: Query<(&mut FlyCamera, &mut Transform)>,
) {
    let Ok((mut camera, mut transform)) = camera_query.single_mut() else {
        return;
    };

    let grabbed = cursor
        .single()
        .map(|c| c.grab_mode != CursorGrabMode::None)
        .unwrap_or(false);

    let mut delta = Vec2::ZERO;
    for motion in mouse_motion.read() {
        delta += motion.delta;
    }
    if grabbed && delta != Vec2::ZERO {
        camera.yaw -= delta.x * MOUSE_SENSITIVITY;
        camera.pitch = (camera.pitch - delta.y * MOUSE_SENSITIVITY).clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01);
    }
    transform.rotation = Quat::from_euler(EulerRot::YXZ, camera.yaw, camera.pitch, 0.0);

    let mut direction = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        direction += *transform.forward();
    }
    if keyboard.pressed(KeyCode::KeyS) {
        direction -= *transform.forward();
    }
    if keyboard.pressed(KeyCode::KeyD) {
        direction += *transform.right();
    }
    if keyboard.pressed(KeyCode::KeyA) {
        direction -= *transform.right();
    }
    if keyboard.pressed(KeyCode::Space) {
        direction += Vec3::Y;
    }
    if keyboard.pressed(KeyCode::ShiftLeft) {
        direction -= Vec3::Y;
    }

    let mut speed = FLY_SPEED;
    if keyboard.pressed(KeyCode::ControlLeft) {
        speed *= FAST_MULTIPLIER;
    }
    transform.translation += direction.normalize_or_zero() * speed * time.delta_secs();

    let floor = terrain.get_height(transform.translation.x, transform.translation.z) + MIN_EYE_HEIGHT;
    transform.translation.y = transform.translation.y.max(floor);
}

/// Grab the cursor on left click, release it on Escape
pub fn grab_cursor(
    windows: Query<Entity, With<PrimaryWindow>>,
    mut cursor_opts: Query<&mut CursorOptions>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
) {
    let Ok(window_entity) = windows.single() else {
        return;
    };
    let Ok(mut cursor) = cursor_opts.get_mut(window_entity) else {
        return;
    };

    if mouse_button.just_pressed(MouseButton::Left) {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
    }
    if keyboard.just_pressed(KeyCode::Escape) {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    }
}
