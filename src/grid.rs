//! Slot Grid - Fixed-capacity texel buffers backing every simulated agent.
//!
//! Each slot owns two parallel records at the same index:
//! - position `(x, y, z, kind)`
//! - velocity `(dx, dy, dz, payload)`
//!
//! The first grid row (`width` slots) is reserved for targets. A slot is free
//! iff its velocity payload is exactly `0.0`.

use bevy::prelude::*;
use bytemuck::{Pod, Zeroable};

use crate::constants::*;

// ============================================================================
// TEXELS
// ============================================================================

/// One RGBA32F texel of a pipeline buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Texel {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Texel {
    pub const ZERO: Texel = Texel { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_vec3(v: Vec3, w: f32) -> Self {
        Self { x: v.x, y: v.y, z: v.z, w }
    }

    pub fn xyz(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Empty position record.
    pub const fn empty_position() -> Self {
        Self::new(0.0, 0.0, 0.0, KIND_EMPTY)
    }
}

/// A `width × width` buffer of texels (one logical pipeline variable).
#[derive(Clone, Debug, PartialEq)]
pub struct TexelBuffer {
    width: usize,
    texels: Vec<Texel>,
}

impl TexelBuffer {
    /// Zero-filled buffer.
    pub fn new(width: usize) -> Self {
        Self { width, texels: vec![Texel::ZERO; width * width] }
    }

    /// Buffer filled with one texel.
    pub fn filled(width: usize, texel: Texel) -> Self {
        Self { width, texels: vec![texel; width * width] }
    }

    /// Wrap raw RGBA floats. Returns `None` when the length does not match the grid.
    pub fn from_floats(width: usize, floats: &[f32]) -> Option<Self> {
        if floats.len() != width * width * 4 {
            return None;
        }
        let texels: &[Texel] = bytemuck::cast_slice(floats);
        Some(Self { width, texels: texels.to_vec() })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.texels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [Texel] {
        &mut self.texels
    }

    /// Flat RGBA view, 4 floats per slot.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Raw bytes, as uploaded to a render target.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn get(&self, i: usize) -> Option<Texel> {
        self.texels.get(i).copied()
    }

    pub fn set(&mut self, i: usize, texel: Texel) {
        if let Some(t) = self.texels.get_mut(i) {
            *t = texel;
        }
    }
}

// ============================================================================
// SLOT GRID
// ============================================================================

/// CPU-side copy of the position + velocity buffers, staged during a sync round.
/// No locking: the sync coordinator is the only writer while a round is open.
#[derive(Clone, Debug)]
pub struct SlotGrid {
    width: usize,
    positions: TexelBuffer,
    velocities: TexelBuffer,
}

impl SlotGrid {
    /// All slots free, all positions empty.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            positions: TexelBuffer::filled(width, Texel::empty_position()),
            velocities: TexelBuffer::new(width),
        }
    }

    pub fn from_buffers(positions: TexelBuffer, velocities: TexelBuffer) -> Self {
        Self { width: positions.width(), positions, velocities }
    }

    pub fn capacity(&self) -> usize {
        self.width * self.width
    }

    /// Number of leading slots reserved for targets.
    pub fn reserved(&self) -> usize {
        self.width
    }

    /// Write both records of a slot together.
    pub fn set(&mut self, i: usize, position: Texel, velocity: Texel) {
        self.positions.set(i, position);
        self.velocities.set(i, velocity);
    }

    pub fn set_velocity(&mut self, i: usize, velocity: Texel) {
        self.velocities.set(i, velocity);
    }

    pub fn position(&self, i: usize) -> Option<Texel> {
        self.positions.get(i)
    }

    pub fn velocity(&self, i: usize) -> Option<Texel> {
        self.velocities.get(i)
    }

    pub fn payload(&self, i: usize) -> f32 {
        self.velocities.get(i).map_or(0.0, |v| v.w)
    }

    pub fn is_free(&self, i: usize) -> bool {
        self.payload(i) == 0.0
    }

    /// First free unit slot at or after `start`. Reserved rows are never returned.
    pub fn find_first_free(&self, start: usize) -> Option<usize> {
        (start.max(self.reserved())..self.capacity()).find(|&i| self.is_free(i))
    }

    /// Free unit slots (reserved row excluded).
    pub fn free_count(&self) -> usize {
        (self.reserved()..self.capacity()).filter(|&i| self.is_free(i)).count()
    }

    /// Replace the whole position buffer (read-back from the pipeline).
    pub fn load_positions(&mut self, buffer: TexelBuffer) {
        self.positions = buffer;
    }
}
