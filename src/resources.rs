//! ECS Resources - Shared simulation state accessible by all systems

use bevy::prelude::*;

use crate::arrivals::{ArrivalDecoder, OwnerTally};
use crate::grid::TexelBuffer;
use crate::queue::{Unit, UnitSpawnQueue};
use crate::settings::SimSettings;
use crate::sync::{RoundReport, SyncCoordinator};
use crate::targets::{Target, TargetTable};

/// Everything the sync coordinator and the arrival decoder share.
/// Owned by the ECS world; systems borrow it instead of touching globals.
#[derive(Resource, Debug)]
pub struct SimulationState {
    pub targets: TargetTable,
    pub queue: UnitSpawnQueue,
    pub sync: SyncCoordinator,
    pub decoder: ArrivalDecoder,
    /// Unit counts from the last decoded frame.
    pub tally: OwnerTally,
    pub last_round: Option<RoundReport>,
}

impl SimulationState {
    pub fn new(width: usize) -> Self {
        Self {
            targets: TargetTable::new(width),
            queue: UnitSpawnQueue::default(),
            sync: SyncCoordinator::new(width),
            decoder: ArrivalDecoder::new(width),
            tally: OwnerTally::default(),
            last_round: None,
        }
    }

    pub fn from_settings(settings: &SimSettings) -> Self {
        Self::new(settings.grid_width)
    }

    pub fn enqueue_units(&mut self, units: impl IntoIterator<Item = Unit>) {
        self.queue.enqueue(units);
    }

    /// Live target occupying a reserved slot.
    pub fn target_at(&self, slot: usize) -> Option<&Target> {
        self.targets.get(slot)
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::from_settings(&SimSettings::default())
    }
}

/// Frame counter and the game-started switch.
#[derive(Resource, Default, Debug)]
pub struct GameClock {
    pub active: bool,
    pub frame: u64,
}

/// Delta time for the current frame (milliseconds).
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Aggregate buffer delivered this frame, waiting for the decoder.
#[derive(Resource, Default)]
pub struct FrameReadback {
    pub aggregate: Option<TexelBuffer>,
}

/// Sync round counters.
#[derive(Resource, Default, Debug)]
pub struct SyncDebug {
    pub rounds_completed: usize,
    pub units_launched: usize,
    pub units_dropped: usize,
    pub units_requeued: usize,
    pub units_rejected: usize,
    pub redirects: usize,
    pub redundant_requests: usize,
}

/// Arrival decoder counters.
#[derive(Resource, Default, Debug)]
pub struct ArrivalDebug {
    pub collisions: usize,
    pub hits_applied: usize,
    pub vacant_hits: usize,
    pub targets_destroyed: usize,
    pub decodes_skipped: usize,
}
