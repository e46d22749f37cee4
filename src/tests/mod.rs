//! Scenario tests - Drive a real Bevy app with the CPU executor frame by frame.
//!
//! Timeline with the default 10-frame interval and no read-back latency:
//! update 1 (frame 0) requests and receives the velocity buffer, update 2
//! receives positions and injects. Units injected on update 2 move one step
//! per update from update 3 on.

mod latency;
mod redirect;

use bevy::prelude::*;

use crate::SimulationPlugin;
use crate::gpu::SimPipeline;
use crate::gpu::cpu::CpuExecutor;
use crate::gpu::kernels::reference_programs;
use crate::grid::TexelBuffer;
use crate::messages::EnqueueUnitsMsg;
use crate::queue::{Owner, Unit};
use crate::resources::{GameClock, SimulationState};
use crate::settings::SimSettings;
use crate::targets::{Target, TargetKind};

pub const W: usize = 4;

/// Small grid, straight-line units moving one world unit per frame, no enemy spawner.
pub fn small_settings() -> SimSettings {
    SimSettings {
        grid_width: W,
        unit_speed: 1.0,
        steer: 0.0,
        hit_radius: 0.75,
        enemy_spawn_chance: 0.0,
        ..default()
    }
}

pub fn fixed_target(slot: usize, position: Vec3, lives: i32) -> Target {
    Target::new(slot, position, Owner::Enemy, TargetKind::Fixed, lives)
}

/// Player unit launched at `z` on the Z axis, heading +Z.
pub fn unit_at_z(z: f32, target_slot: usize) -> Unit {
    Unit {
        position: Vec3::new(0.0, 0.0, z),
        direction: Vec3::Z,
        owner: Owner::Player,
        start_slot: 0,
        target_slot,
    }
}

/// App with the simulation plugin, a CPU pipeline and the game started.
pub fn test_app(settings: SimSettings, targets: &[Target]) -> App {
    let settings = settings.validate();
    let mut state = SimulationState::from_settings(&settings);
    for target in targets {
        assert!(state.targets.spawn_at(target.clone()));
    }
    let executor = CpuExecutor::new(settings.grid_width).with_readback_latency(settings.readback_latency);
    let pipeline = SimPipeline::new(executor, reference_programs(&settings), &state.targets).unwrap();

    let mut app = App::new();
    app.insert_resource(settings)
        .insert_resource(state)
        .insert_resource(pipeline)
        .insert_resource(GameClock { active: true, frame: 0 })
        .add_plugins(SimulationPlugin::<CpuExecutor>::default());
    app
}

pub fn enqueue(app: &mut App, units: Vec<Unit>) {
    app.world_mut().write_message(EnqueueUnitsMsg { units });
}

pub fn run(app: &mut App, updates: usize) {
    for _ in 0..updates {
        app.update();
    }
}

/// Current `(positions, velocities)` inside the pipeline.
pub fn grid(app: &App) -> (TexelBuffer, TexelBuffer) {
    let pipeline = app.world().resource::<SimPipeline<CpuExecutor>>();
    let exec = pipeline.executor();
    (
        exec.read_current(pipeline.position).unwrap().clone(),
        exec.read_current(pipeline.velocity).unwrap().clone(),
    )
}

pub fn state(app: &App) -> &SimulationState {
    app.world().resource::<SimulationState>()
}

// ============================================================================
// MESSAGE CAPTURE
// ============================================================================

/// Every message of type `M` seen since capture started.
#[derive(Resource)]
pub struct Captured<M: Message>(pub Vec<M>);

impl<M: Message> Default for Captured<M> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

fn capture_system<M: Message + Clone>(mut reader: MessageReader<M>, mut out: ResMut<Captured<M>>) {
    out.0.extend(reader.read().cloned());
}

pub fn capture<M: Message + Clone>(app: &mut App) {
    app.init_resource::<Captured<M>>().add_systems(Last, capture_system::<M>);
}

pub fn captured<M: Message>(app: &App) -> &[M] {
    &app.world().resource::<Captured<M>>().0
}
