//! Unit Spawn Queue - Pending launches waiting for a free grid slot.

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::constants::{KIND_ENEMY_UNIT, KIND_PLAYER_UNIT};

/// Side a unit or target belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    Player,
    Enemy,
}

impl Owner {
    /// Position-record kind for a unit of this owner.
    pub fn unit_kind(self) -> f32 {
        match self {
            Owner::Player => KIND_PLAYER_UNIT,
            Owner::Enemy => KIND_ENEMY_UNIT,
        }
    }
}

/// One seed in flight, before it is placed into the grid.
/// Once allocated its identity lives only in the slot records.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    /// World-space launch position.
    pub position: Vec3,
    /// Launch direction.
    pub direction: Vec3,
    pub owner: Owner,
    /// Reserved slot of the target the unit leaves from.
    pub start_slot: usize,
    /// Reserved slot of the destination target.
    pub target_slot: usize,
}

/// FIFO of units awaiting allocation.
#[derive(Default, Debug)]
pub struct UnitSpawnQueue {
    units: VecDeque<Unit>,
}

impl UnitSpawnQueue {
    pub fn enqueue(&mut self, units: impl IntoIterator<Item = Unit>) {
        self.units.extend(units);
    }

    /// Take every pending unit in FIFO order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Unit> {
        self.units.drain(..).collect()
    }

    /// Put units back at the front, keeping their relative order.
    pub fn requeue_front(&mut self, units: Vec<Unit>) {
        for unit in units.into_iter().rev() {
            self.units.push_front(unit);
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
