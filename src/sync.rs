//! Sync Coordinator - Moves queued units into free grid slots.
//!
//! One round is two read-backs long:
//! 1. velocity buffer arrives: allocate free slots to queued units, redirect
//!    units whose target is gone
//! 2. position buffer arrives: refresh the reserved row, write launch
//!    positions, hand the changed texels back as a [`GridPatch`]
//!
//! Read-backs may be several frames old by the time they land. Only the
//! patched texels are written back; every other slot keeps the pipeline's
//! newer output, so a unit that arrives mid-round stays cleared.
//!
//! While a round is open the arrival decoder is locked out: a `DecodePermit`
//! can only be borrowed from an idle coordinator.

use bevy::prelude::*;
use std::marker::PhantomData;

use crate::constants::*;
use crate::encoding::{decode_target_slot, encode_slots};
use crate::grid::{SlotGrid, Texel, TexelBuffer};
use crate::queue::{Unit, UnitSpawnQueue};
use crate::settings::SimSettings;
use crate::targets::TargetTable;

// ============================================================================
// STATE MACHINE TYPES
// ============================================================================

/// Where the coordinator is in its round.
#[derive(Debug, Default)]
pub enum SyncState {
    #[default]
    Idle,
    AwaitingVelocityReadback { frame: u64 },
    AwaitingPositionReadback(Box<PendingRound>),
}

/// Work carried from the velocity step to the position step.
#[derive(Debug)]
pub struct PendingRound {
    pub frame: u64,
    pub grid: SlotGrid,
    /// Slots filled this round (ascending) with the unit placed in each.
    pub allocated: Vec<(usize, Unit)>,
    /// Live units re-aimed at a new target, with their rewritten velocity.
    pub redirects: Vec<(usize, Texel)>,
    /// Units launched this round whose target was already gone.
    pub redirected_launches: usize,
    pub dropped: usize,
    pub requeued: usize,
    pub rejected: usize,
}

/// Input to [`SyncCoordinator::advance_sync`].
#[derive(Debug)]
pub enum SyncEvent {
    /// Start-of-frame check for the Idle trigger.
    Tick { frame: u64 },
    VelocityReadback(TexelBuffer),
    PositionReadback(TexelBuffer),
}

/// What the caller must do with the pipeline after an event.
#[derive(Debug, PartialEq)]
pub enum SyncAction {
    None,
    /// Trigger fired while a round was already open. Nothing requested.
    Redundant,
    RequestVelocityReadback,
    RequestPositionReadback,
    /// Write the patch over the pipeline's current render targets.
    Inject { patch: GridPatch, report: RoundReport },
}

/// Texels a round writes back into the pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridPatch {
    pub positions: Vec<(usize, Texel)>,
    pub velocities: Vec<(usize, Texel)>,
}

impl GridPatch {
    /// Last position written to `slot`, if any.
    pub fn position(&self, slot: usize) -> Option<Texel> {
        self.positions.iter().rev().find(|(s, _)| *s == slot).map(|(_, t)| *t)
    }

    /// Last velocity written to `slot`, if any.
    pub fn velocity(&self, slot: usize) -> Option<Texel> {
        self.velocities.iter().rev().find(|(s, _)| *s == slot).map(|(_, t)| *t)
    }

    pub fn touches(&self, slot: usize) -> bool {
        self.positions.iter().chain(&self.velocities).any(|(s, _)| *s == slot)
    }
}

/// Outcome of one completed round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Frame the round was triggered on.
    pub frame: u64,
    pub allocated: usize,
    /// Units that found no slot and were discarded.
    pub dropped: usize,
    /// Units that found no slot and went back to the queue.
    pub requeued: usize,
    /// Units whose start or target slot lies outside the reserved row.
    pub rejected: usize,
    pub redirected: usize,
}

/// Proof that no round is open. Borrowing it freezes the coordinator.
pub struct DecodePermit<'a> {
    _coordinator: PhantomData<&'a SyncCoordinator>,
}

// ============================================================================
// COORDINATOR
// ============================================================================

#[derive(Debug)]
pub struct SyncCoordinator {
    state: SyncState,
    width: usize,
}

impl SyncCoordinator {
    pub fn new(width: usize) -> Self {
        Self { state: SyncState::Idle, width }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// The synchronization flag: true from the velocity request until injection.
    pub fn is_syncing(&self) -> bool {
        !matches!(self.state, SyncState::Idle)
    }

    pub fn decode_permit(&self) -> Option<DecodePermit<'_>> {
        match self.state {
            SyncState::Idle => Some(DecodePermit { _coordinator: PhantomData }),
            _ => None,
        }
    }

    /// Single entry point of the state machine.
    pub fn advance_sync(
        &mut self,
        event: SyncEvent,
        targets: &TargetTable,
        queue: &mut UnitSpawnQueue,
        settings: &SimSettings,
    ) -> SyncAction {
        let state = std::mem::take(&mut self.state);
        let (next, action) = match (state, event) {
            (SyncState::Idle, SyncEvent::Tick { frame }) => {
                if should_trigger(frame, queue, settings) {
                    (SyncState::AwaitingVelocityReadback { frame }, SyncAction::RequestVelocityReadback)
                } else {
                    (SyncState::Idle, SyncAction::None)
                }
            }
            (busy, SyncEvent::Tick { frame }) => {
                if should_trigger(frame, queue, settings) {
                    debug!("Sync in progress, request at frame {} ignored", frame);
                    (busy, SyncAction::Redundant)
                } else {
                    (busy, SyncAction::None)
                }
            }
            (SyncState::AwaitingVelocityReadback { frame }, SyncEvent::VelocityReadback(buffer)) => {
                let round = self.velocity_step(frame, buffer, targets, queue, settings);
                (SyncState::AwaitingPositionReadback(Box::new(round)), SyncAction::RequestPositionReadback)
            }
            (SyncState::AwaitingPositionReadback(round), SyncEvent::PositionReadback(buffer)) => {
                (SyncState::Idle, self.position_step(*round, buffer, targets))
            }
            (state, event) => {
                warn!("Sync: unexpected {} while {}", event_name(&event), state_name(&state));
                (state, SyncAction::None)
            }
        };
        self.state = next;
        action
    }

    fn velocity_step(
        &self,
        frame: u64,
        velocities: TexelBuffer,
        targets: &TargetTable,
        queue: &mut UnitSpawnQueue,
        settings: &SimSettings,
    ) -> PendingRound {
        let width = self.width;
        let mut grid = SlotGrid::from_buffers(TexelBuffer::filled(width, Texel::empty_position()), velocities);

        let (units, invalid): (Vec<Unit>, Vec<Unit>) =
            queue.drain().into_iter().partition(|u| u.start_slot < width && u.target_slot < width);
        let rejected = invalid.len();
        if rejected > 0 {
            warn!("Rejected {} units with slots outside the reserved row (width {})", rejected, width);
        }

        let needed = units.len();
        let mut pending = units.into_iter();
        let mut allocated = Vec::new();
        let mut redirects = Vec::new();
        let mut redirected_launches = 0;
        let fallback = targets.closest_to_origin().map(|t| t.slot);

        for slot in grid.reserved()..grid.capacity() {
            let mut launched = false;
            if grid.is_free(slot) {
                if let Some(unit) = pending.next() {
                    let payload = encode_slots(unit.start_slot, unit.target_slot, width);
                    grid.set_velocity(slot, Texel::from_vec3(unit.direction, payload));
                    allocated.push((slot, unit));
                    launched = true;
                }
            }

            // A payload pointing at a vacated reserved slot gets a new target.
            let payload = grid.payload(slot);
            if payload > 0.0 {
                let orphaned = decode_target_slot(payload, width).is_none_or(|t| !targets.is_live(t));
                if let (true, Some(new_target)) = (orphaned, fallback) {
                    let mut velocity = grid.velocity(slot).unwrap_or_default();
                    velocity.w = encode_slots(HOME_SLOT, new_target, width);
                    grid.set_velocity(slot, velocity);
                    if launched {
                        redirected_launches += 1;
                    } else {
                        redirects.push((slot, velocity));
                    }
                }
            }
        }

        let leftovers: Vec<Unit> = pending.collect();
        if !allocated.is_empty() {
            info!("Launched {} units", allocated.len());
        }
        if !leftovers.is_empty() {
            warn!("Only {} slots were found (needed {})", allocated.len(), needed);
        }
        let (dropped, requeued) = if settings.retain_unplaced_units {
            let n = leftovers.len();
            queue.requeue_front(leftovers);
            (0, n)
        } else {
            (leftovers.len(), 0)
        };

        PendingRound { frame, grid, allocated, redirects, redirected_launches, dropped, requeued, rejected }
    }

    fn position_step(&self, round: PendingRound, positions: TexelBuffer, targets: &TargetTable) -> SyncAction {
        let PendingRound { frame, mut grid, allocated, redirects, redirected_launches, dropped, requeued, rejected } =
            round;
        grid.load_positions(positions);
        let mut patch = GridPatch::default();

        // Reserved row mirrors the target table.
        for slot in 0..grid.reserved() {
            let (position, velocity) = match targets.get(slot) {
                Some(target) => (
                    Texel::from_vec3(target.position, KIND_TARGET),
                    Texel::new(0.0, 0.0, 0.0, TARGET_MASS),
                ),
                None => (Texel::empty_position(), Texel::ZERO),
            };
            patch.positions.push((slot, position));
            patch.velocities.push((slot, velocity));
        }

        for (slot, unit) in &allocated {
            patch.positions.push((*slot, Texel::from_vec3(unit.position, unit.owner.unit_kind())));
            if let Some(velocity) = grid.velocity(*slot) {
                patch.velocities.push((*slot, velocity));
            }
        }

        // A unit that arrived after the velocity read-back is already cleared
        // in the pipeline; rewriting its payload would bring it back.
        let mut redirected = redirected_launches;
        for (slot, velocity) in redirects {
            if grid.position(slot).is_some_and(|p| p.w == KIND_EMPTY) {
                continue;
            }
            patch.velocities.push((slot, velocity));
            redirected += 1;
        }

        if !allocated.is_empty() {
            info!("Unit launch done");
        }

        let report = RoundReport { frame, allocated: allocated.len(), dropped, requeued, rejected, redirected };
        SyncAction::Inject { patch, report }
    }
}

fn should_trigger(frame: u64, queue: &UnitSpawnQueue, settings: &SimSettings) -> bool {
    frame % settings.sync_interval.max(1) == 0 || !queue.is_empty()
}

fn event_name(event: &SyncEvent) -> &'static str {
    match event {
        SyncEvent::Tick { .. } => "tick",
        SyncEvent::VelocityReadback(_) => "velocity read-back",
        SyncEvent::PositionReadback(_) => "position read-back",
    }
}

fn state_name(state: &SyncState) -> &'static str {
    match state {
        SyncState::Idle => "Idle",
        SyncState::AwaitingVelocityReadback { .. } => "AwaitingVelocityReadback",
        SyncState::AwaitingPositionReadback(_) => "AwaitingPositionReadback",
    }
}
