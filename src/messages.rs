//! ECS Messages - Requests from game logic into the simulation, and its events back out.

use bevy::prelude::*;

use crate::flowers::Flower;
use crate::queue::{Owner, Unit};
use crate::sync::RoundReport;
use crate::targets::Target;

// ============================================================================
// INPUT
// ============================================================================

/// Queue units for the next sync round.
#[derive(Message, Clone)]
pub struct EnqueueUnitsMsg {
    pub units: Vec<Unit>,
}

/// Blow every seed of a flower at a target.
#[derive(Message, Clone)]
pub struct BlowFlowerMsg {
    pub flower: Flower,
    pub target_slot: usize,
}

/// Place a target into its reserved slot.
#[derive(Message, Clone)]
pub struct SpawnTargetMsg {
    pub target: Target,
}

// ============================================================================
// OUTPUT
// ============================================================================

/// A unit hit a live target.
#[derive(Message, Clone, Debug, PartialEq)]
pub struct ArrivalMsg {
    pub target_slot: usize,
    pub attacker: Owner,
    pub lives_left: i32,
    pub destroyed: bool,
}

/// Live unit counts, once per decoded frame.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitTallyMsg {
    pub player: usize,
    pub enemy: usize,
}

#[derive(Message, Clone, Debug, PartialEq)]
pub struct RoundCompleteMsg(pub RoundReport);
