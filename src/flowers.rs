//! Flowers - Seed-bearing flowers that turn into unit launches when blown.

use bevy::prelude::*;

use crate::constants::FLOWER_FADE_MS;
use crate::queue::{Owner, Unit};

/// World transform of one seed instance on a flower head.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeedInstance {
    pub position: Vec3,
    pub rotation: Quat,
}

/// A picked-up flower.
#[derive(Clone, Debug, Default)]
pub struct Flower {
    pub id: u64,
    pub seeds: Vec<SeedInstance>,
}

impl Flower {
    /// One unit per seed, all heading for `target_slot`. Leaves the flower bare.
    pub fn blow(&mut self, target_slot: usize, start_slot: usize, owner: Owner) -> Vec<Unit> {
        self.seeds
            .drain(..)
            .map(|seed| Unit {
                position: seed.position,
                direction: seed.rotation * seed.position.normalize_or_zero(),
                owner,
                start_slot,
                target_slot,
            })
            .collect()
    }
}

/// The flower currently fading out after a blow.
/// Its seed instances stay visible until the launch round has placed them in the grid.
#[derive(Resource, Default, Debug)]
pub struct FlowerRemoval {
    pub current: Option<FadingFlower>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FadingFlower {
    pub id: u64,
    /// Seed instances still drawn on the flower head.
    pub instance_count: usize,
    /// Remaining fade time (ms).
    pub remove_in: f32,
}

impl FadingFlower {
    pub fn new(id: u64, instance_count: usize) -> Self {
        Self { id, instance_count, remove_in: FLOWER_FADE_MS }
    }

    pub fn opacity(&self) -> f32 {
        (self.remove_in / FLOWER_FADE_MS).max(0.0)
    }
}

impl FlowerRemoval {
    pub fn start(&mut self, id: u64, instance_count: usize) {
        self.current = Some(FadingFlower::new(id, instance_count));
    }

    /// Advance the fade. Returns the id of a flower that finished fading.
    pub fn tick(&mut self, delta_ms: f32) -> Option<u64> {
        let flower = self.current.as_mut()?;
        flower.remove_in -= delta_ms;
        if flower.remove_in <= 0.0 {
            return self.current.take().map(|f| f.id);
        }
        None
    }

    /// Called when a sync round completes: the seeds now live in the grid.
    pub fn clear_instances(&mut self) -> bool {
        match self.current.as_mut() {
            Some(flower) if flower.instance_count > 0 => {
                flower.instance_count = 0;
                true
            }
            _ => false,
        }
    }
}
