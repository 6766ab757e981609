//! Grass configuration, loaded from RON at startup.

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid grass config: {0}")]
    Invalid(String),
}

/// Which generator drives chunk creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrassMode {
    /// Fill the whole map once at startup.
    Static,
    /// Keep a square of chunks resident around the viewer.
    #[default]
    Streaming,
}

/// Knobs that only apply to the one-shot generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticSettings {
    pub obstacle_check_radius: f32,
    pub lod_cutoff: f32,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            obstacle_check_radius: 0.5,
            lod_cutoff: 0.05,
        }
    }
}

/// Knobs that only apply to the streaming scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    pub obstacle_check_radius: f32,
    pub lod_cutoff: f32,
    /// Chebyshev radius, in chunks, kept resident around the viewer.
    pub render_radius: i32,
    /// Creation budget per tick.
    pub max_chunks_per_tick: usize,
    /// Seconds between viewer position polls.
    pub poll_interval_secs: f32,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            obstacle_check_radius: 0.4,
            lod_cutoff: 0.02,
            render_radius: 3,
            max_chunks_per_tick: 2,
            poll_interval_secs: 0.25,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassConfig {
    pub mode: GrassMode,
    /// Mixed with each chunk coordinate to seed its RNG.
    pub seed: u64,
    pub chunk_size: f32,
    /// Candidate samples per square meter.
    pub density: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Screen coverage where LOD 0 hands over to LOD 1.
    pub lod_transition: f32,
    /// Probability that an accepted instance also lands in the coarse LOD.
    pub low_quality_percentage: f32,
    /// Probe rays start this far above the chunk anchor...
    pub probe_height: f32,
    /// ...and reach this far below it.
    pub probe_depth: f32,
    pub static_mode: StaticSettings,
    pub streaming: StreamingSettings,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            mode: GrassMode::default(),
            seed: 0x6772_6173_73,
            chunk_size: 20.0,
            density: 0.8,
            min_scale: 0.8,
            max_scale: 1.2,
            lod_transition: 0.3,
            low_quality_percentage: 0.25,
            probe_height: 50.0,
            probe_depth: 50.0,
            static_mode: StaticSettings::default(),
            streaming: StreamingSettings::default(),
        }
    }
}

/// Everything the chunk builder needs, resolved for one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub seed: u64,
    pub density: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub lod_transition: f32,
    pub lod_cutoff: f32,
    pub low_quality_percentage: f32,
    pub obstacle_check_radius: f32,
    pub probe_height: f32,
    pub probe_depth: f32,
}

impl GrassConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg.into()))
        }

        if !(self.chunk_size.is_finite() && self.chunk_size > 0.0) {
            return invalid(format!("chunk_size must be positive, got {}", self.chunk_size));
        }
        if !(self.density.is_finite() && self.density >= 0.0) {
            return invalid(format!("density must be >= 0, got {}", self.density));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale && self.max_scale.is_finite()) {
            return invalid(format!(
                "scale range must satisfy 0 < min <= max, got [{}, {}]",
                self.min_scale, self.max_scale
            ));
        }
        if !(self.lod_transition > 0.0 && self.lod_transition <= 1.0) {
            return invalid(format!("lod_transition must be in (0, 1], got {}", self.lod_transition));
        }
        for (name, cutoff) in [
            ("static_mode.lod_cutoff", self.static_mode.lod_cutoff),
            ("streaming.lod_cutoff", self.streaming.lod_cutoff),
        ] {
            if !(cutoff > 0.0 && cutoff < self.lod_transition) {
                return invalid(format!("{name} must be in (0, lod_transition), got {cutoff}"));
            }
        }
        if !(0.0..=1.0).contains(&self.low_quality_percentage) {
            return invalid(format!(
                "low_quality_percentage must be in [0, 1], got {}",
                self.low_quality_percentage
            ));
        }
        if !(self.probe_height > 0.0 && self.probe_depth >= 0.0) {
            return invalid("probe_height must be positive and probe_depth non-negative");
        }
        for (name, radius) in [
            ("static_mode.obstacle_check_radius", self.static_mode.obstacle_check_radius),
            ("streaming.obstacle_check_radius", self.streaming.obstacle_check_radius),
        ] {
            if !(radius.is_finite() && radius >= 0.0) {
                return invalid(format!("{name} must be >= 0, got {radius}"));
            }
        }
        if self.streaming.render_radius < 0 {
            return invalid(format!(
                "streaming.render_radius must be >= 0, got {}",
                self.streaming.render_radius
            ));
        }
        if self.streaming.max_chunks_per_tick == 0 {
            return invalid("streaming.max_chunks_per_tick must be at least 1");
        }
        if !(self.streaming.poll_interval_secs > 0.0) {
            return invalid(format!(
                "streaming.poll_interval_secs must be positive, got {}",
                self.streaming.poll_interval_secs
            ));
        }
        Ok(())
    }

    /// Builder settings for `mode`, picking up that mode's cutoff and obstacle radius.
    pub fn build_settings(&self, mode: GrassMode) -> BuildSettings {
        let (obstacle_check_radius, lod_cutoff) = match mode {
            GrassMode::Static => (self.static_mode.obstacle_check_radius, self.static_mode.lod_cutoff),
            GrassMode::Streaming => (self.streaming.obstacle_check_radius, self.streaming.lod_cutoff),
        };
        BuildSettings {
            seed: self.seed,
            density: self.density,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            lod_transition: self.lod_transition,
            lod_cutoff,
            low_quality_percentage: self.low_quality_percentage,
            obstacle_check_radius,
            probe_height: self.probe_height,
            probe_depth: self.probe_depth,
        }
    }
}

pub fn parse_config(text: &str) -> Result<GrassConfig, ConfigError> {
    let config: GrassConfig = ron::from_str(text)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GrassConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}
