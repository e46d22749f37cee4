//! Arrival systems - Decode the aggregate output into hits and tallies

use bevy::prelude::*;

use crate::messages::*;
use crate::resources::*;

/// Apply this frame's collisions to targets and publish unit counts.
/// Skipped entirely while a sync round is open.
pub fn decode_arrivals_system(
    mut state: ResMut<SimulationState>,
    mut frame: ResMut<FrameReadback>,
    mut debug: ResMut<ArrivalDebug>,
    mut arrivals: MessageWriter<ArrivalMsg>,
    mut tallies: MessageWriter<UnitTallyMsg>,
) {
    let Some(aggregate) = frame.aggregate.take() else { return };
    let state = &mut *state;
    let Some(permit) = state.sync.decode_permit() else {
        debug.decodes_skipped += 1;
        return;
    };

    let report = state.decoder.decode(&permit, &aggregate, &mut state.targets);

    debug.collisions += report.collisions;
    debug.vacant_hits += report.vacant_hits;
    for event in &report.events {
        debug.hits_applied += 1;
        if event.destroyed {
            debug.targets_destroyed += 1;
        }
        arrivals.write(ArrivalMsg {
            target_slot: event.target_slot,
            attacker: event.attacker,
            lives_left: event.lives_left,
            destroyed: event.destroyed,
        });
    }
    state.tally = report.tally;
    tallies.write(UnitTallyMsg { player: report.tally.player, enemy: report.tally.enemy });
}
