//! Seedstorm - GPU particle unit simulation with CPU↔GPU slot synchronization.
//!
//! Seeds blown from flowers become units in a fixed `W × W` slot grid that a
//! compute pipeline advances every frame. The CPU side queues new units,
//! periodically reads the grid back to place them, and decodes per-frame
//! collision signals into target hits.

// ============================================================================
// MODULES
// ============================================================================

pub mod arrivals;
pub mod constants;
pub mod encoding;
pub mod flowers;
pub mod gpu;
pub mod grid;
pub mod messages;
pub mod queue;
pub mod resources;
pub mod settings;
pub mod sync;
pub mod systems;
pub mod targets;

#[cfg(test)]
mod tests;

// ============================================================================
// IMPORTS
// ============================================================================

use bevy::prelude::*;
use std::marker::PhantomData;

use flowers::FlowerRemoval;
use gpu::{ComputeExecutor, SimPipeline};
use messages::*;
use resources::*;
use settings::SimSettings;
use systems::*;

// ============================================================================
// PLUGIN
// ============================================================================

/// System execution phases. Chained so each frame runs them in order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Intake,  // Drain producer messages into the state
    Sync,    // Idle-state sync trigger
    Compute, // Advance pipeline, route read-backs, inject
    Decode,  // Arrival decoder
    World,   // Enemy spawner/drift, flower fade
    Clock,   // Frame counter
}

/// Registers the simulation for executor `E`.
///
/// The caller inserts a [`SimPipeline<E>`] (whose construction may fail) and
/// sets [`GameClock::active`]; until both hold, only intake runs.
pub struct SimulationPlugin<E> {
    _executor: PhantomData<fn() -> E>,
}

impl<E> Default for SimulationPlugin<E> {
    fn default() -> Self {
        Self { _executor: PhantomData }
    }
}

impl<E: ComputeExecutor> Plugin for SimulationPlugin<E> {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<SimSettings>()
            .cloned()
            .unwrap_or_default()
            .validate();
        if !app.world().contains_resource::<SimulationState>() {
            app.insert_resource(SimulationState::from_settings(&settings));
        }
        info!("Simulation plugin: {}x{} grid, sync every {} frames",
            settings.grid_width, settings.grid_width, settings.sync_interval);

        app.insert_resource(settings)
           .add_message::<EnqueueUnitsMsg>()
           .add_message::<BlowFlowerMsg>()
           .add_message::<SpawnTargetMsg>()
           .add_message::<ArrivalMsg>()
           .add_message::<UnitTallyMsg>()
           .add_message::<RoundCompleteMsg>()
           .init_resource::<GameClock>()
           .init_resource::<DeltaTime>()
           .init_resource::<FrameReadback>()
           .init_resource::<SyncReadbacks>()
           .init_resource::<SyncDebug>()
           .init_resource::<ArrivalDebug>()
           .init_resource::<FlowerRemoval>()
           .configure_sets(Update, (
               Step::Intake,
               Step::Sync,
               Step::Compute,
               Step::Decode,
               Step::World,
               Step::Clock,
           ).chain());

        // Everything after intake needs a running game and a pipeline
        for step in [Step::Sync, Step::Compute, Step::Decode, Step::World, Step::Clock] {
            app.configure_sets(Update, step
                .run_if(game_active)
                .run_if(resource_exists::<SimPipeline<E>>));
        }

        app.add_systems(Update, (
               update_delta_system,
               spawn_target_system,
               enqueue_units_system,
               blow_flower_system,
           ).chain().in_set(Step::Intake))
           .add_systems(Update, schedule_sync_system.in_set(Step::Sync))
           .add_systems(Update, advance_pipeline_system::<E>.in_set(Step::Compute))
           .add_systems(Update, decode_arrivals_system.in_set(Step::Decode))
           .add_systems(Update, (
               enemy_spawn_system,
               enemy_drift_system,
               flower_fade_system,
           ).chain().in_set(Step::World))
           .add_systems(Update, tick_clock_system.in_set(Step::Clock));
    }
}
