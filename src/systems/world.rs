//! World systems - Enemy spawner, enemy drift, flower fade, frame clock

use bevy::prelude::*;
use rand::Rng;

use crate::flowers::FlowerRemoval;
use crate::resources::*;
use crate::settings::SimSettings;
use crate::targets::{TargetKind, drift_enemies};

/// Occasionally spawn an enemy target while under the cap.
pub fn enemy_spawn_system(settings: Res<SimSettings>, mut state: ResMut<SimulationState>) {
    if settings.enemy_spawn_chance <= 0.0 {
        return;
    }
    let mut rng = rand::rng();
    if !rng.random_bool(settings.enemy_spawn_chance.clamp(0.0, 1.0)) {
        return;
    }
    if state.targets.count_kind(TargetKind::Drifting) >= settings.max_enemy_targets {
        return;
    }
    if let Some(slot) = state.targets.spawn_enemy(&mut rng, &settings) {
        info!("Enemy spawned at slot {}", slot);
    }
}

/// Enemies that reach the centre are removed, but not while a sync round is
/// open: the round may already have aimed units at their slots.
pub fn enemy_drift_system(mut state: ResMut<SimulationState>) {
    let remove_arrived = !state.sync.is_syncing();
    for slot in drift_enemies(&mut state.targets, remove_arrived) {
        info!("Enemy {} reached the centre", slot);
    }
}

pub fn flower_fade_system(delta: Res<DeltaTime>, mut removal: ResMut<FlowerRemoval>) {
    if let Some(id) = removal.tick(delta.0) {
        debug!("Flower {} faded out", id);
    }
}

pub fn tick_clock_system(mut clock: ResMut<GameClock>) {
    clock.frame += 1;
}

/// Run condition: the game has been started and is not paused.
pub fn game_active(clock: Res<GameClock>) -> bool {
    clock.active
}
