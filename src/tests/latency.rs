//! Latency - a round stretches over delayed read-backs without overlapping itself.

use bevy::prelude::*;

use super::*;
use crate::constants::KIND_EMPTY;
use crate::encoding::decode_target_slot;
use crate::messages::ArrivalMsg;
use crate::resources::{ArrivalDebug, SyncDebug};

#[test]
fn delayed_readbacks_still_complete_one_round() {
    let settings = SimSettings { readback_latency: 2, ..small_settings() };
    let mut app = test_app(settings, &[fixed_target(1, Vec3::new(0.0, 0.0, 100.0), 3)]);

    run(&mut app, 1);
    assert!(state(&app).sync.is_syncing());

    // Queued mid-round: the trigger fires again but is ignored.
    enqueue(&mut app, (0..3).map(|_| unit_at_z(0.0, 1)).collect());
    run(&mut app, 4);
    assert!(state(&app).sync.is_syncing());
    assert_eq!(app.world().resource::<SyncDebug>().rounds_completed, 0);

    run(&mut app, 1);
    assert!(!state(&app).sync.is_syncing());
    let sync = app.world().resource::<SyncDebug>();
    assert_eq!((sync.rounds_completed, sync.units_launched, sync.redundant_requests), (1, 3, 2));
    assert_eq!(app.world().resource::<ArrivalDebug>().decodes_skipped, 3);

    let (_, velocities) = grid(&app);
    for slot in 4..7 {
        assert_eq!(decode_target_slot(velocities.get(slot).unwrap().w, W), Some(1));
    }
}

#[test]
fn unit_arriving_mid_round_hits_once() {
    let settings = SimSettings { readback_latency: 2, ..small_settings() };
    let mut app = test_app(settings, &[fixed_target(1, Vec3::new(0.0, 0.0, 5.0), 10)]);
    capture::<ArrivalMsg>(&mut app);
    // Injected on update 6, it reaches the target on update 15: after the
    // frame-10 round read positions back (update 14), before it injects (update 16).
    enqueue(&mut app, vec![unit_at_z(-3.0, 1)]);

    run(&mut app, 14);
    assert!(state(&app).sync.is_syncing());
    run(&mut app, 2);
    assert!(!state(&app).sync.is_syncing());
    let (positions, velocities) = grid(&app);
    assert_eq!(positions.get(4).unwrap().w, KIND_EMPTY);
    assert_eq!(velocities.get(4).unwrap().w, 0.0);

    run(&mut app, 24);
    assert_eq!(captured::<ArrivalMsg>(&app).len(), 1);
    assert_eq!(state(&app).target_at(1).unwrap().lives, 9);
}
