//! Sync systems - Drive the sync coordinator and the compute pipeline

use bevy::prelude::*;

use crate::flowers::FlowerRemoval;
use crate::gpu::{ComputeExecutor, ReadbackRequest, SimPipeline};
use crate::messages::RoundCompleteMsg;
use crate::resources::*;
use crate::settings::SimSettings;
use crate::sync::{SyncAction, SyncEvent};

/// Read-backs the coordinator asked for, sent with the next pipeline advance.
#[derive(Resource, Default, Debug)]
pub struct SyncReadbacks {
    pub velocity: bool,
    pub position: bool,
}

/// Idle-state trigger: every `sync_interval` frames or when units are queued.
pub fn schedule_sync_system(
    clock: Res<GameClock>,
    settings: Res<SimSettings>,
    mut state: ResMut<SimulationState>,
    mut pending: ResMut<SyncReadbacks>,
    mut debug: ResMut<SyncDebug>,
) {
    let state = &mut *state;
    let event = SyncEvent::Tick { frame: clock.frame };
    match state.sync.advance_sync(event, &state.targets, &mut state.queue, &settings) {
        SyncAction::RequestVelocityReadback => pending.velocity = true,
        SyncAction::Redundant => debug.redundant_requests += 1,
        _ => {}
    }
}

/// Advance the pipeline one frame and route delivered read-backs.
pub fn advance_pipeline_system<E: ComputeExecutor>(
    mut pipeline: ResMut<SimPipeline<E>>,
    settings: Res<SimSettings>,
    mut state: ResMut<SimulationState>,
    mut pending: ResMut<SyncReadbacks>,
    mut frame: ResMut<FrameReadback>,
    mut removal: ResMut<FlowerRemoval>,
    mut debug: ResMut<SyncDebug>,
    mut rounds: MessageWriter<RoundCompleteMsg>,
) {
    let state = &mut *state;

    // Aggregate every frame; sync read-backs once each.
    let mut request = ReadbackRequest::new().with(pipeline.aggregate);
    if pending.velocity {
        request.add(pipeline.velocity);
    }
    if pending.position {
        request.add(pipeline.position);
    }
    *pending = SyncReadbacks::default();

    let mut readbacks = pipeline.advance(&request);

    let events = [
        readbacks.take(pipeline.velocity).map(SyncEvent::VelocityReadback),
        readbacks.take(pipeline.position).map(SyncEvent::PositionReadback),
    ];
    for event in events.into_iter().flatten() {
        match state.sync.advance_sync(event, &state.targets, &mut state.queue, &settings) {
            SyncAction::RequestVelocityReadback => pending.velocity = true,
            SyncAction::RequestPositionReadback => pending.position = true,
            SyncAction::Inject { patch, report } => {
                pipeline.inject(&patch);
                if removal.clear_instances() {
                    info!("Flower seed instances cleared");
                }
                debug.rounds_completed += 1;
                debug.units_launched += report.allocated;
                debug.units_dropped += report.dropped;
                debug.units_requeued += report.requeued;
                debug.units_rejected += report.rejected;
                debug.redirects += report.redirected;
                state.last_round = Some(report.clone());
                rounds.write(RoundCompleteMsg(report));
            }
            SyncAction::Redundant | SyncAction::None => {}
        }
    }

    if let Some(aggregate) = readbacks.take(pipeline.aggregate) {
        frame.aggregate = Some(aggregate);
    }
}
