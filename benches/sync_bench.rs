//! Sync round and arrival decode over a full 64x64 grid.

use bevy::prelude::*;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use seedstorm::constants::*;
use seedstorm::encoding::{encode_slots, slot_coord};
use seedstorm::grid::{Texel, TexelBuffer};
use seedstorm::queue::{Owner, Unit, UnitSpawnQueue};
use seedstorm::settings::SimSettings;
use seedstorm::sync::{SyncAction, SyncCoordinator, SyncEvent};
use seedstorm::targets::{Target, TargetKind, TargetTable};

const W: usize = GRID_WIDTH;

fn targets() -> TargetTable {
    let mut table = TargetTable::new(W);
    for slot in (0..W).step_by(3) {
        let position = Vec3::new(slot as f32, 0.0, 10.0);
        table.spawn_at(Target::new(slot, position, Owner::Enemy, TargetKind::Fixed, 6));
    }
    table
}

/// Half the unit slots busy, a quarter of them heading for vacant targets.
fn busy_velocities() -> TexelBuffer {
    let mut v = TexelBuffer::new(W);
    for slot in (W..W * W).step_by(2) {
        let target = if slot % 4 == 0 { (slot % W) | 1 } else { (slot % W) / 3 * 3 };
        v.set(slot, Texel::new(0.0, 0.0, 1.0, encode_slots(0, target, W)));
    }
    v
}

fn units(n: usize) -> Vec<Unit> {
    (0..n)
        .map(|i| Unit {
            position: Vec3::new(i as f32 * 0.01, 1.0, 0.0),
            direction: Vec3::Z,
            owner: Owner::Player,
            start_slot: 0,
            target_slot: 3,
        })
        .collect()
}

fn sync_round(c: &mut Criterion) {
    let settings = SimSettings::default();
    let table = targets();
    let velocities = busy_velocities();
    let positions = TexelBuffer::filled(W, Texel::new(0.0, 0.0, 0.0, KIND_PLAYER_UNIT));

    c.bench_function("sync_round_500_units", |b| {
        b.iter_batched(
            || {
                let mut queue = UnitSpawnQueue::default();
                queue.enqueue(units(500));
                (SyncCoordinator::new(W), queue, velocities.clone(), positions.clone())
            },
            |(mut sync, mut queue, v, p)| {
                sync.advance_sync(SyncEvent::Tick { frame: 0 }, &table, &mut queue, &settings);
                sync.advance_sync(SyncEvent::VelocityReadback(v), &table, &mut queue, &settings);
                let action = sync.advance_sync(SyncEvent::PositionReadback(p), &table, &mut queue, &settings);
                assert!(matches!(action, SyncAction::Inject { .. }));
                black_box(action)
            },
            BatchSize::SmallInput,
        )
    });
}

fn decode_pass(c: &mut Criterion) {
    let mut aggregate = TexelBuffer::new(W);
    for slot in W..W * W {
        let texel = match slot % 50 {
            0 => Texel::new(0.0, KIND_ENEMY_UNIT, 0.0, -slot_coord(3, W)),
            n if n % 2 == 0 => Texel::new(0.0, KIND_PLAYER_UNIT, 0.0, 1.0),
            _ => Texel::new(0.0, KIND_ENEMY_UNIT, 0.0, 1.0),
        };
        aggregate.set(slot, texel);
    }
    let sync = SyncCoordinator::new(W);
    let decoder = seedstorm::arrivals::ArrivalDecoder::new(W);

    c.bench_function("decode_64x64", |b| {
        b.iter_batched(
            targets,
            |mut table| {
                let Some(permit) = sync.decode_permit() else { return None };
                Some(black_box(decoder.decode(&permit, &aggregate, &mut table)))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, sync_round, decode_pass);
criterion_main!(benches);
