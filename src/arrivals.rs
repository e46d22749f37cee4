//! Arrival Decoder - Turns the aggregate pass output into hits and unit counts.
//!
//! Aggregate texel per slot: `(unused, owner_marker, unused, signal)`.
//! - `signal < 0`: a unit reached the target encoded in `-signal`
//! - `signal > 0`: live unit, counted by owner band
//! - `signal == 0`: nothing

use bevy::prelude::*;

use crate::constants::{ENEMY_BAND, PLAYER_BAND};
use crate::encoding::decode_signal_slot;
use crate::grid::TexelBuffer;
use crate::queue::Owner;
use crate::sync::DecodePermit;
use crate::targets::TargetTable;

/// Live units per owner for one decoded frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OwnerTally {
    pub player: usize,
    pub enemy: usize,
}

/// One hit applied to a live target.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrivalEvent {
    pub target_slot: usize,
    pub attacker: Owner,
    pub lives_left: i32,
    pub destroyed: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrivalReport {
    pub events: Vec<ArrivalEvent>,
    pub tally: OwnerTally,
    /// Negative signals seen, including ones for vacant slots.
    pub collisions: usize,
    /// Collisions whose target was already gone.
    pub vacant_hits: usize,
}

/// Owner of a live unit by its marker, or None outside both bands.
pub fn unit_owner(marker: f32) -> Option<Owner> {
    if marker > PLAYER_BAND.0 && marker < PLAYER_BAND.1 {
        Some(Owner::Player)
    } else if marker > ENEMY_BAND.0 && marker < ENEMY_BAND.1 {
        Some(Owner::Enemy)
    } else {
        None
    }
}

/// Owner credited with a collision. Anything below the player band's top is the player.
pub fn attacker(marker: f32) -> Owner {
    if marker < PLAYER_BAND.1 { Owner::Player } else { Owner::Enemy }
}

#[derive(Clone, Copy, Debug)]
pub struct ArrivalDecoder {
    width: usize,
}

impl ArrivalDecoder {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Decode one aggregate buffer. Requires proof that no sync round is open.
    pub fn decode(
        &self,
        _permit: &DecodePermit<'_>,
        aggregate: &TexelBuffer,
        targets: &mut TargetTable,
    ) -> ArrivalReport {
        let mut report = ArrivalReport::default();
        for texel in aggregate.texels() {
            let signal = texel.w;
            let marker = texel.y;
            if signal < 0.0 {
                report.collisions += 1;
                let Some(slot) = decode_signal_slot(signal, self.width) else { continue };
                let Some(target) = targets.get_mut(slot) else {
                    report.vacant_hits += 1;
                    continue;
                };
                let destroyed = target.hit();
                let lives_left = target.lives;
                if destroyed {
                    targets.remove(slot);
                    info!("Target {} destroyed", slot);
                }
                report.events.push(ArrivalEvent {
                    target_slot: slot,
                    attacker: attacker(marker),
                    lives_left,
                    destroyed,
                });
            } else if signal > 0.0 {
                match unit_owner(marker) {
                    Some(Owner::Player) => report.tally.player += 1,
                    Some(Owner::Enemy) => report.tally.enemy += 1,
                    None => {}
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::encoding::slot_coord;
    use crate::grid::Texel;
    use crate::queue::UnitSpawnQueue;
    use crate::settings::SimSettings;
    use crate::sync::{SyncCoordinator, SyncEvent};
    use crate::targets::{Target, TargetKind};

    const W: usize = 4;

    fn table(lives: i32) -> TargetTable {
        let mut t = TargetTable::new(W);
        t.spawn_at(Target::new(2, Vec3::ZERO, Owner::Enemy, TargetKind::Drifting, lives));
        t
    }

    fn hit(target: usize, marker: f32) -> Texel {
        Texel::new(0.0, marker, 0.0, -slot_coord(target, W))
    }

    #[test]
    fn owner_bands() {
        assert_eq!(unit_owner(KIND_PLAYER_UNIT), Some(Owner::Player));
        assert_eq!(unit_owner(KIND_ENEMY_UNIT), Some(Owner::Enemy));
        assert_eq!(unit_owner(KIND_TARGET), None);
        assert_eq!(unit_owner(KIND_EMPTY), None);
        assert_eq!(attacker(KIND_PLAYER_UNIT), Owner::Player);
        assert_eq!(attacker(KIND_ENEMY_UNIT), Owner::Enemy);
    }

    #[test]
    fn counts_live_units_per_owner() {
        let mut agg = TexelBuffer::new(W);
        agg.set(4, Texel::new(0.0, KIND_PLAYER_UNIT, 0.0, 1.0));
        agg.set(5, Texel::new(0.0, KIND_PLAYER_UNIT, 0.0, 1.0));
        agg.set(6, Texel::new(0.0, KIND_ENEMY_UNIT, 0.0, 1.0));
        agg.set(7, Texel::new(0.0, 0.3, 0.0, 1.0));
        let sync = SyncCoordinator::new(W);
        let permit = sync.decode_permit().unwrap();
        let mut targets = table(3);
        let report = ArrivalDecoder::new(W).decode(&permit, &agg, &mut targets);
        assert_eq!(report.tally, OwnerTally { player: 2, enemy: 1 });
        assert!(report.events.is_empty());
    }

    #[test]
    fn lives_hits_destroy_target() {
        let sync = SyncCoordinator::new(W);
        let decoder = ArrivalDecoder::new(W);
        let mut targets = table(2);
        let mut agg = TexelBuffer::new(W);
        agg.set(9, hit(2, KIND_PLAYER_UNIT));

        let permit = sync.decode_permit().unwrap();
        let first = decoder.decode(&permit, &agg, &mut targets);
        assert_eq!(
            first.events,
            vec![ArrivalEvent { target_slot: 2, attacker: Owner::Player, lives_left: 1, destroyed: false }]
        );
        assert_eq!(targets.get(2).unwrap().label.as_str(), "0");

        let second = decoder.decode(&permit, &agg, &mut targets);
        assert!(second.events[0].destroyed);
        assert!(!targets.is_live(2));

        // Late arrivals on the vacated slot are only counted.
        let third = decoder.decode(&permit, &agg, &mut targets);
        assert!(third.events.is_empty());
        assert_eq!((third.collisions, third.vacant_hits), (1, 1));
    }

    #[test]
    fn several_hits_in_one_frame() {
        let sync = SyncCoordinator::new(W);
        let mut targets = table(2);
        let mut agg = TexelBuffer::new(W);
        agg.set(5, hit(2, KIND_ENEMY_UNIT));
        agg.set(6, hit(2, KIND_ENEMY_UNIT));
        agg.set(7, hit(2, KIND_ENEMY_UNIT));
        let permit = sync.decode_permit().unwrap();
        let report = ArrivalDecoder::new(W).decode(&permit, &agg, &mut targets);
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.vacant_hits, 1);
        assert!(report.events.iter().all(|e| e.attacker == Owner::Enemy));
    }

    #[test]
    fn no_permit_while_round_is_open() {
        let mut sync = SyncCoordinator::new(W);
        let targets = table(2);
        let mut queue = UnitSpawnQueue::default();
        let s = SimSettings { grid_width: W, ..default() };
        sync.advance_sync(SyncEvent::Tick { frame: 0 }, &targets, &mut queue, &s);
        assert!(sync.decode_permit().is_none());
        sync.advance_sync(SyncEvent::VelocityReadback(TexelBuffer::new(W)), &targets, &mut queue, &s);
        assert!(sync.decode_permit().is_none());
        sync.advance_sync(
            SyncEvent::PositionReadback(TexelBuffer::filled(W, Texel::empty_position())),
            &targets,
            &mut queue,
            &s,
        );
        assert!(sync.decode_permit().is_some());
    }
}
