//! Simulation settings persistence - save/load config to JSON file.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{GRID_WIDTH, MAX_GRID_WIDTH, SYNC_INTERVAL};

/// Tunables for the slot grid, the sync cadence and the enemy spawner.
/// Saved to `Documents/Seedstorm/settings.json`.
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimSettings {
    // Grid
    #[serde(default = "default_width")]
    pub grid_width: usize,
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,
    /// Put units that found no slot back in the queue instead of dropping them.
    #[serde(default)]
    pub retain_unplaced_units: bool,
    // Reference kernels
    #[serde(default = "default_unit_speed")]
    pub unit_speed: f32,
    #[serde(default = "default_steer")]
    pub steer: f32,
    #[serde(default = "default_hit_radius")]
    pub hit_radius: f32,
    /// Frames between a read-back request and its delivery (CPU executor only).
    #[serde(default)]
    pub readback_latency: u32,
    // Enemy spawner
    #[serde(default = "default_spawn_chance")]
    pub enemy_spawn_chance: f64,
    #[serde(default = "default_max_enemies")]
    pub max_enemy_targets: usize,
    #[serde(default = "default_enemy_lives")]
    pub enemy_lives: i32,
    #[serde(default = "default_spawn_radius")]
    pub enemy_spawn_radius: f32,
}

fn default_width() -> usize { GRID_WIDTH }
fn default_sync_interval() -> u64 { SYNC_INTERVAL }
fn default_unit_speed() -> f32 { 0.05 }
fn default_steer() -> f32 { 0.1 }
fn default_hit_radius() -> f32 { 0.5 }
fn default_spawn_chance() -> f64 { 0.02 }
fn default_max_enemies() -> usize { 20 }
fn default_enemy_lives() -> i32 { 6 }
fn default_spawn_radius() -> f32 { 25.0 }

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            grid_width: GRID_WIDTH,
            sync_interval: SYNC_INTERVAL,
            retain_unplaced_units: false,
            unit_speed: 0.05,
            steer: 0.1,
            hit_radius: 0.5,
            readback_latency: 0,
            enemy_spawn_chance: 0.02,
            max_enemy_targets: 20,
            enemy_lives: 6,
            enemy_spawn_radius: 25.0,
        }
    }
}

impl SimSettings {
    /// Clamp values the packing scheme and scheduler cannot handle.
    pub fn validate(mut self) -> Self {
        self.grid_width = self.grid_width.clamp(2, MAX_GRID_WIDTH);
        self.sync_interval = self.sync_interval.max(1);
        self.enemy_spawn_chance = self.enemy_spawn_chance.clamp(0.0, 1.0);
        self
    }
}

pub fn settings_path() -> Option<PathBuf> {
    let home = std::env::var("USERPROFILE")
        .or_else(|_| std::env::var("HOME"))
        .ok()?;
    let dir = PathBuf::from(home).join("Documents").join("Seedstorm");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join("settings.json"))
}

pub fn save_settings(path: &Path, settings: &SimSettings) {
    match serde_json::to_string_pretty(settings) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!("Failed to save settings: {}", e);
            }
        }
        Err(e) => warn!("Failed to serialize settings: {}", e),
    }
}

pub fn load_settings(path: &Path) -> SimSettings {
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str::<SimSettings>(&json)
            .unwrap_or_default()
            .validate(),
        Err(_) => SimSettings::default(),
    }
}
