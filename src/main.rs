//! Seedstorm - Headless demo: blows flowers at enemy targets on the CPU executor.

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::time::Duration;

use seedstorm::constants::HOME_SLOT;
use seedstorm::flowers::{Flower, SeedInstance};
use seedstorm::gpu::SimPipeline;
use seedstorm::gpu::cpu::CpuExecutor;
use seedstorm::gpu::kernels::reference_programs;
use seedstorm::messages::{ArrivalMsg, BlowFlowerMsg, RoundCompleteMsg};
use seedstorm::queue::Owner;
use seedstorm::resources::{GameClock, SimulationState, SyncDebug};
use seedstorm::settings::{load_settings, settings_path};
use seedstorm::targets::{Target, TargetKind};
use seedstorm::SimulationPlugin;

/// Frames the demo runs before exiting.
const DEMO_FRAMES: u64 = 3000;
/// Frames between flower blows.
const BLOW_EVERY: u64 = 240;

fn main() -> AppExit {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0))),
        LogPlugin::default(),
    ));

    info!("Seedstorm build {} ({})", env!("BUILD_TIMESTAMP"), env!("BUILD_COMMIT"));

    let settings = settings_path()
        .map(|path| load_settings(&path))
        .unwrap_or_default()
        .validate();

    let mut state = SimulationState::from_settings(&settings);
    state.targets.spawn_at(Target::new(HOME_SLOT, Vec3::ZERO, Owner::Player, TargetKind::Fixed, 10));

    let executor = CpuExecutor::new(settings.grid_width).with_readback_latency(settings.readback_latency);
    let pipeline = match SimPipeline::new(executor, reference_programs(&settings), &state.targets) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Compute pipeline failed to initialize: {}", e);
            return AppExit::error();
        }
    };

    app.insert_resource(settings)
       .insert_resource(state)
       .insert_resource(pipeline)
       .insert_resource(GameClock { active: true, frame: 0 })
       .add_plugins(SimulationPlugin::<CpuExecutor>::default())
       .add_systems(Update, (demo_blow_system, demo_report_system, demo_exit_system));

    app.run()
}

/// Blow a fresh flower at the nearest enemy now and then.
fn demo_blow_system(
    clock: Res<GameClock>,
    state: Res<SimulationState>,
    mut blows: MessageWriter<BlowFlowerMsg>,
) {
    if clock.frame == 0 || clock.frame % BLOW_EVERY != 0 {
        return;
    }
    let origin = Vec3::new(0.0, 1.5, 0.0);
    let Some(target) = state
        .targets
        .live()
        .filter(|t| t.kind == TargetKind::Drifting)
        .min_by(|a, b| a.position.distance(origin).total_cmp(&b.position.distance(origin)))
    else {
        return;
    };
    let aim = target.position - origin;
    let Some(slot) = state.targets.pick_target(origin, aim) else { return };

    let rotation = Quat::from_rotation_arc(Vec3::Y, aim.normalize_or_zero());
    let seeds = (0..24)
        .map(|i| {
            let angle = i as f32 / 24.0 * std::f32::consts::TAU;
            let offset = Vec3::new(angle.cos() * 0.1, 0.1, angle.sin() * 0.1);
            SeedInstance { position: origin + offset, rotation }
        })
        .collect();
    blows.write(BlowFlowerMsg { flower: Flower { id: clock.frame, seeds }, target_slot: slot });
}

fn demo_report_system(mut arrivals: MessageReader<ArrivalMsg>, mut rounds: MessageReader<RoundCompleteMsg>) {
    for hit in arrivals.read() {
        info!("Target {} hit by {:?}: {} lives left", hit.target_slot, hit.attacker, hit.lives_left);
    }
    for RoundCompleteMsg(report) in rounds.read() {
        if report.allocated > 0 || report.redirected > 0 {
            info!("Round at frame {}: {} launched, {} redirected", report.frame, report.allocated, report.redirected);
        }
    }
}

fn demo_exit_system(clock: Res<GameClock>, sync_debug: Res<SyncDebug>, mut exit: MessageWriter<AppExit>) {
    if clock.frame >= DEMO_FRAMES {
        info!("Demo finished: {:?}", *sync_debug);
        exit.write(AppExit::Success);
    }
}
