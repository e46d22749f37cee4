//! Field Encoder - Packs two slot identifiers into one f32 channel.
//!
//! Slot indices are first mapped to a normalized coordinate in `[0.5, 1.5)`
//! (`(index + 0.5) / width + 0.5`), which keeps the packed magnitude away from
//! zero so its sign stays meaningful. The start coordinate is quantized to
//! 1/1000 and shifted one decimal digit left; the target coordinate occupies
//! that last digit:
//!
//! `encode(a, b) = sign(b) * (floor(a * 1000) * 10 + |b|)`
//!
//! The low field must stay below one decimal digit (`|b| < 10`), otherwise it
//! bleeds into the high field. Slot coordinates never exceed 1.5, so the
//! grid never produces such a value.

use crate::constants::{HIGH_FIELD_SCALE, LOW_FIELD_BASE};

/// Normalized coordinate of a slot index.
pub fn slot_coord(index: usize, width: usize) -> f32 {
    (index as f32 + 0.5) / width as f32 + 0.5
}

/// Inverse of [`slot_coord`]. Negative results (coordinates below 0.5) map to `None`.
pub fn coord_slot(coord: f32, width: usize) -> Option<usize> {
    let idx = ((coord - 0.5) * width as f32).floor();
    if idx < 0.0 || !idx.is_finite() {
        return None;
    }
    Some(idx as usize)
}

/// Pack `(start, target)` coordinates into one payload value.
pub fn encode(start: f32, target: f32) -> f32 {
    debug_assert!(target.abs() < LOW_FIELD_BASE, "low field overflows its digit");
    let high = (start * HIGH_FIELD_SCALE).floor();
    target.signum() * (high * LOW_FIELD_BASE + target.abs())
}

/// Unpack a payload into `(start, target)` coordinates.
/// The start coordinate comes back quantized to 1/1000.
pub fn decode(payload: f32) -> (f32, f32) {
    let magnitude = payload.abs();
    let target = payload.signum() * (magnitude % LOW_FIELD_BASE);
    let start = (magnitude / LOW_FIELD_BASE).floor() / HIGH_FIELD_SCALE;
    (start, target)
}

/// Pack a `(start_slot, target_slot)` pair.
pub fn encode_slots(start_slot: usize, target_slot: usize, width: usize) -> f32 {
    encode(slot_coord(start_slot, width), slot_coord(target_slot, width))
}

/// Target slot referenced by a packed payload. `None` for empty payloads.
pub fn decode_target_slot(payload: f32, width: usize) -> Option<usize> {
    if payload <= 0.0 {
        return None;
    }
    let (_, target) = decode(payload);
    coord_slot(target, width)
}

/// Start slot referenced by a packed payload.
pub fn decode_start_slot(payload: f32, width: usize) -> Option<usize> {
    if payload <= 0.0 {
        return None;
    }
    let (start, _) = decode(payload);
    coord_slot(start, width)
}

/// Target slot carried by a negative collision signal of the aggregate pass.
pub fn decode_signal_slot(signal: f32, width: usize) -> Option<usize> {
    if signal >= 0.0 {
        return None;
    }
    coord_slot(-signal, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_example_pair() {
        // floor(1.23 * 1000) * 10 + 2.34
        let p = encode(1.23, 2.34);
        assert!((p - 12302.34).abs() < 1e-2);
        let (a, b) = decode(p);
        assert!((a - 1.23).abs() < 1e-3);
        assert!((b - 2.34).abs() < 1e-2);
    }

    #[test]
    fn sign_follows_low_field() {
        let p = encode(0.75, -0.9);
        assert!(p < 0.0);
        let (a, b) = decode(p);
        assert!((a - 0.75).abs() < 1e-3);
        assert!((b + 0.9).abs() < 1e-2);
    }

    #[test]
    fn every_slot_pair_survives_packing_at_full_width() {
        let w = 64;
        for start in [0usize, 1, 31, 63] {
            for target in 0..w {
                let p = encode_slots(start, target, w);
                assert!(p > 0.0);
                assert_eq!(decode_target_slot(p, w), Some(target), "target {target}");
                assert_eq!(decode_start_slot(p, w), Some(start), "start {start}");
            }
        }
    }

    #[test]
    fn coordinates_stay_in_half_open_range() {
        for w in [4usize, 16, 64] {
            assert!(slot_coord(0, w) >= 0.5);
            assert!(slot_coord(w - 1, w) < 1.5);
        }
    }

    #[test]
    fn collision_signal_maps_back_to_slot() {
        let w = 4;
        for slot in 0..w {
            assert_eq!(decode_signal_slot(-slot_coord(slot, w), w), Some(slot));
        }
        assert_eq!(decode_signal_slot(1.0, w), None);
        assert_eq!(decode_signal_slot(0.0, w), None);
    }

    #[test]
    fn empty_payload_has_no_target() {
        assert_eq!(decode_target_slot(0.0, 64), None);
    }
}
