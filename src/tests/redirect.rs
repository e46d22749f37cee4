//! Redirect - units bound for a destroyed target are sent to the closest survivor.

use bevy::prelude::*;

use super::*;
use crate::constants::*;
use crate::encoding::{decode_start_slot, decode_target_slot};
use crate::messages::RoundCompleteMsg;

#[test]
fn orphaned_unit_is_redirected_next_round() {
    let targets = [
        fixed_target(1, Vec3::new(0.0, 0.0, 5.0), 1),
        fixed_target(3, Vec3::new(3.0, 0.0, 0.0), 9),
    ];
    let mut app = test_app(small_settings(), &targets);
    capture::<RoundCompleteMsg>(&mut app);
    // Slot 4 arrives on update 8, slot 5 is still far away then.
    enqueue(&mut app, vec![unit_at_z(0.0, 1), unit_at_z(-20.0, 1)]);

    run(&mut app, 8);
    assert!(state(&app).target_at(1).is_none());
    let (_, velocities) = grid(&app);
    assert_eq!(decode_target_slot(velocities.get(5).unwrap().w, W), Some(1));

    // Round triggered on frame 10 completes on update 12.
    run(&mut app, 4);
    let (positions, velocities) = grid(&app);
    let payload = velocities.get(5).unwrap().w;
    assert_eq!(decode_target_slot(payload, W), Some(3));
    assert_eq!(decode_start_slot(payload, W), Some(HOME_SLOT));
    assert_eq!(velocities.get(5).unwrap().xyz(), Vec3::Z);

    // Vacated reserved slot is empty in both records.
    assert_eq!(positions.get(1).unwrap().w, KIND_EMPTY);
    assert_eq!(velocities.get(1).unwrap().w, 0.0);

    let rounds = captured::<RoundCompleteMsg>(&app);
    assert_eq!(rounds.len(), 2);
    assert_eq!((rounds[1].0.frame, rounds[1].0.redirected), (10, 1));
}

#[test]
fn enemy_at_centre_keeps_its_slot_until_the_round_closes() {
    // Crosses the removal radius on update 11, while the frame-10 round is open.
    let enemy = Target::new(2, Vec3::new(0.605, 10.0, 0.0), Owner::Enemy, TargetKind::Drifting, 3);
    let mut app = test_app(small_settings(), &[enemy]);

    run(&mut app, 11);
    assert!(state(&app).sync.is_syncing());
    assert!(state(&app).target_at(2).is_some());

    run(&mut app, 1);
    assert!(!state(&app).sync.is_syncing());
    assert!(state(&app).target_at(2).is_none());
    let (positions, _) = grid(&app);
    // Injected as live; the next round vacates it.
    assert_eq!(positions.get(2).unwrap().w, KIND_TARGET);
}
