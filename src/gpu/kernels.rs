//! Reference kernels - CPU versions of the three simulation passes.
//!
//! Inputs are `[position, velocity]` from the previous frame. A unit has
//! "arrived" when it is within `hit_radius` of its target's position. Units
//! whose target slot is vacant keep their heading until redirected.

use bevy::prelude::*;

use super::PassPrograms;
use super::cpu::{Kernel, PassContext};
use crate::constants::*;
use crate::encoding::{decode_target_slot, slot_coord};
use crate::grid::Texel;
use crate::settings::SimSettings;

const POSITION: usize = 0;
const VELOCITY: usize = 1;

/// What a slot holds this frame, as seen from last frame's buffers.
enum SlotState {
    Reserved,
    Empty,
    Arrived { target: usize, kind: f32 },
    Flying { position: Texel, velocity: Texel, goal: Option<Vec3> },
}

fn classify(ctx: &PassContext<'_>, slot: usize, hit_radius: f32) -> SlotState {
    let width = ctx.width;
    if slot < width {
        return SlotState::Reserved;
    }
    let position = ctx.texel(POSITION, slot);
    let velocity = ctx.texel(VELOCITY, slot);
    let Some(target) = decode_target_slot(velocity.w, width).filter(|&t| t < width) else {
        return SlotState::Empty;
    };
    let target_texel = ctx.texel(POSITION, target);
    if target_texel.w != KIND_TARGET {
        return SlotState::Flying { position, velocity, goal: None };
    }
    let goal = target_texel.xyz();
    if position.xyz().distance(goal) < hit_radius {
        SlotState::Arrived { target, kind: position.w }
    } else {
        SlotState::Flying { position, velocity, goal: Some(goal) }
    }
}

/// Programs for the velocity, position and aggregate passes.
pub fn reference_programs(settings: &SimSettings) -> PassPrograms<Kernel> {
    let hit_radius = settings.hit_radius;
    let steer = settings.steer;
    let speed = settings.unit_speed;

    let velocity: Kernel = Box::new(move |ctx, slot| match classify(ctx, slot, hit_radius) {
        SlotState::Reserved | SlotState::Empty => ctx.texel(VELOCITY, slot),
        SlotState::Arrived { .. } => Texel::ZERO,
        SlotState::Flying { position, velocity, goal } => {
            let dir = match goal {
                Some(goal) => {
                    let to_goal = (goal - position.xyz()).normalize_or_zero();
                    (velocity.xyz() * (1.0 - steer) + to_goal * steer).normalize_or_zero()
                }
                None => velocity.xyz().normalize_or_zero(),
            };
            Texel::from_vec3(dir, velocity.w)
        }
    });

    let position: Kernel = Box::new(move |ctx, slot| match classify(ctx, slot, hit_radius) {
        SlotState::Reserved | SlotState::Empty => ctx.texel(POSITION, slot),
        SlotState::Arrived { .. } => Texel::empty_position(),
        SlotState::Flying { position, velocity, .. } => {
            let step = velocity.xyz().normalize_or_zero() * speed;
            Texel::from_vec3(position.xyz() + step, position.w)
        }
    });

    let aggregate: Kernel = Box::new(move |ctx, slot| match classify(ctx, slot, hit_radius) {
        SlotState::Reserved | SlotState::Empty => Texel::ZERO,
        SlotState::Arrived { target, kind } => Texel::new(0.0, kind, 0.0, -slot_coord(target, ctx.width)),
        SlotState::Flying { position, .. } => Texel::new(0.0, position.w, 0.0, 1.0),
    });

    PassPrograms { velocity, position, aggregate }
}
