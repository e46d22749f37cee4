//! Targets - Capturable structures occupying the reserved grid row.

use bevy::prelude::*;
use rand::Rng;

use crate::constants::*;
use crate::queue::Owner;
use crate::settings::SimSettings;

/// How a target moves. Spawned enemies drift toward the centre; everything else stays put.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Fixed,
    Drifting,
}

/// Text label mirroring a target's remaining lives ("0" per life).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LifeLabel(pub String);

impl LifeLabel {
    pub fn for_lives(lives: i32) -> Self {
        Self("0".repeat(lives.max(0) as usize))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A structure with hit points bound to one reserved slot for its whole life.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub slot: usize,
    pub position: Vec3,
    pub owner: Owner,
    pub kind: TargetKind,
    pub lives: i32,
    pub label: LifeLabel,
}

impl Target {
    pub fn new(slot: usize, position: Vec3, owner: Owner, kind: TargetKind, lives: i32) -> Self {
        Self { slot, position, owner, kind, lives, label: LifeLabel::for_lives(lives) }
    }

    /// Take one hit. Returns true when no lives remain.
    pub fn hit(&mut self) -> bool {
        self.lives -= 1;
        self.refresh_label();
        self.lives <= 0
    }

    pub fn refresh_label(&mut self) {
        self.label = LifeLabel::for_lives(self.lives);
    }
}

/// The reserved row: slot index → live target.
#[derive(Debug)]
pub struct TargetTable {
    slots: Vec<Option<Target>>,
}

impl TargetTable {
    pub fn new(width: usize) -> Self {
        Self { slots: vec![None; width] }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&Target> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Target> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn is_live(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Place a target into a vacant reserved slot. Returns false if occupied or out of range.
    pub fn spawn_at(&mut self, target: Target) -> bool {
        match self.slots.get_mut(target.slot) {
            Some(entry) if entry.is_none() => {
                *entry = Some(target);
                true
            }
            _ => false,
        }
    }

    /// Vacate a reserved slot.
    pub fn remove(&mut self, slot: usize) -> Option<Target> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn live(&self) -> impl Iterator<Item = &Target> {
        self.slots.iter().flatten()
    }

    pub fn live_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.slots.iter_mut().flatten()
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    pub fn count_kind(&self, kind: TargetKind) -> usize {
        self.live().filter(|t| t.kind == kind).count()
    }

    /// Live target nearest the world origin. Ties go to the lower slot.
    pub fn closest_to_origin(&self) -> Option<&Target> {
        self.live().min_by(|a, b| {
            a.position
                .length()
                .total_cmp(&b.position.length())
                .then(a.slot.cmp(&b.slot))
        })
    }

    /// Vacant reserved slots, excluding the player's home slot.
    pub fn vacant_enemy_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != HOME_SLOT && t.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Spawn an enemy on the spawn circle, below ground, in a random vacant slot.
    pub fn spawn_enemy(&mut self, rng: &mut impl Rng, settings: &SimSettings) -> Option<usize> {
        let vacant = self.vacant_enemy_slots();
        if vacant.is_empty() {
            info!("No empty spots for enemy");
            return None;
        }
        let slot = vacant[rng.random_range(0..vacant.len())];
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let radius = settings.enemy_spawn_radius;
        let position = Vec3::new(angle.cos() * radius, ENEMY_SPAWN_DEPTH, angle.sin() * radius);
        self.spawn_at(Target::new(slot, position, Owner::Enemy, TargetKind::Drifting, settings.enemy_lives));
        Some(slot)
    }

    /// Live target closest to a ray (flower → aim direction).
    pub fn pick_target(&self, origin: Vec3, direction: Vec3) -> Option<usize> {
        let direction = direction.try_normalize()?;
        let mut best = None;
        let mut min_dist = PICK_MAX_DISTANCE;
        for target in self.live() {
            let d = ray_distance(origin, direction, target.position);
            if d < min_dist {
                min_dist = d;
                best = Some(target.slot);
            }
        }
        best
    }
}

/// Distance from a point to a ray. Points behind the origin measure to the origin.
fn ray_distance(origin: Vec3, direction: Vec3, point: Vec3) -> f32 {
    let t = (point - origin).dot(direction).max(0.0);
    (origin + direction * t - point).length()
}

/// One frame of enemy drift. Returns the slots of enemies removed at the centre.
/// With `remove_arrived` unset they keep their slot until a later frame.
pub fn drift_enemies(targets: &mut TargetTable, remove_arrived: bool) -> Vec<usize> {
    let mut arrived = Vec::new();
    for enemy in targets.live_mut().filter(|t| t.kind == TargetKind::Drifting) {
        let p = &mut enemy.position;
        // Rise slowly
        if p.y < ENEMY_CRUISE_HEIGHT {
            p.y += (ENEMY_CRUISE_HEIGHT - p.y) * 0.01;
        }
        // Move towards the vertical axis
        let to_center = Vec3::new(-p.x, 0.0, -p.z).normalize_or_zero();
        *p += to_center * ENEMY_DRIFT_SPEED;

        if remove_arrived && Vec2::new(p.x, p.z).length() < ENEMY_REMOVE_RADIUS {
            arrived.push(enemy.slot);
        }
    }
    for &slot in &arrived {
        targets.remove(slot);
    }
    arrived
}
