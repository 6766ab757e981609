//! Grass lifecycle state machine

use bevy::prelude::*;

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GrassState {
    /// Waiting for the template, ground and viewer to be checked.
    #[default]
    Setup,
    Running,
    /// A required input was missing; nothing is ever generated.
    Aborted,
}
