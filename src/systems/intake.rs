//! Intake systems - Move producer requests into the simulation state

use bevy::prelude::*;

use crate::constants::HOME_SLOT;
use crate::flowers::FlowerRemoval;
use crate::messages::*;
use crate::queue::Owner;
use crate::resources::*;

/// Frame delta in milliseconds. Left untouched when the app has no clock.
pub fn update_delta_system(time: Option<Res<Time>>, mut delta: ResMut<DeltaTime>) {
    if let Some(time) = time {
        delta.0 = time.delta_secs() * 1000.0;
    }
}

/// Place requested targets into their reserved slots.
/// They reach the grid buffers on the next sync round.
pub fn spawn_target_system(mut events: MessageReader<SpawnTargetMsg>, mut state: ResMut<SimulationState>) {
    for event in events.read() {
        let slot = event.target.slot;
        if state.targets.spawn_at(event.target.clone()) {
            info!("Target spawned at slot {}", slot);
        } else {
            warn!("Target slot {} is occupied or out of range", slot);
        }
    }
}

pub fn enqueue_units_system(mut events: MessageReader<EnqueueUnitsMsg>, mut state: ResMut<SimulationState>) {
    for event in events.read() {
        state.enqueue_units(event.units.iter().cloned());
        info!("Added {} units to queue (now {})", event.units.len(), state.queue.len());
    }
}

/// Blown flowers become player units launched from the home slot.
pub fn blow_flower_system(
    mut events: MessageReader<BlowFlowerMsg>,
    mut state: ResMut<SimulationState>,
    mut removal: ResMut<FlowerRemoval>,
) {
    for event in events.read() {
        let mut flower = event.flower.clone();
        let seeds = flower.seeds.len();
        let units = flower.blow(event.target_slot, HOME_SLOT, Owner::Player);
        state.enqueue_units(units);
        removal.start(flower.id, seeds);
        info!("Flower {} blown at slot {}: {} seeds", flower.id, event.target_slot, seeds);
    }
}
