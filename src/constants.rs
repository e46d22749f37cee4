//! Constants - Grid layout, slot kinds and packing parameters

/// Default grid width. The simulation grid is `GRID_WIDTH × GRID_WIDTH` slots.
pub const GRID_WIDTH: usize = 64;

/// Upper bound accepted for the grid width. Slot coordinates must stay
/// distinguishable after packing into one f32 payload.
pub const MAX_GRID_WIDTH: usize = 64;

// ============================================================================
// SLOT KINDS (position record .w)
// ============================================================================

/// Static target ("castle").
pub const KIND_TARGET: f32 = 0.1;

/// Unit launched by the player.
pub const KIND_PLAYER_UNIT: f32 = 0.6;

/// Unit launched by the enemy.
pub const KIND_ENEMY_UNIT: f32 = 0.601;

/// Empty / unused slot.
pub const KIND_EMPTY: f32 = 99.0;

// Owner marker bands used when classifying aggregate output.
// 0.6 is player, 0.601 is enemy.
pub const PLAYER_BAND: (f32, f32) = (0.5995, 0.6005);
pub const ENEMY_BAND: (f32, f32) = (0.6005, 0.6015);

/// Velocity payload of an occupied target slot.
pub const TARGET_MASS: f32 = 1.0;

// ============================================================================
// PAYLOAD PACKING
// ============================================================================

/// Quantization of the high (start) field.
pub const HIGH_FIELD_SCALE: f32 = 1000.0;

/// Digit budget reserved for the low (target) field.
pub const LOW_FIELD_BASE: f32 = 10.0;

// ============================================================================
// GAMEPLAY
// ============================================================================

/// Slot of the player's home target. Units launched by the player start here.
pub const HOME_SLOT: usize = 0;

/// Frames between periodic sync rounds.
pub const SYNC_INTERVAL: u64 = 10;

/// Flower fade-out after being blown (milliseconds).
pub const FLOWER_FADE_MS: f32 = 1000.0;

/// Enemies spawn below ground and rise to this height.
pub const ENEMY_CRUISE_HEIGHT: f32 = 10.0;
pub const ENEMY_SPAWN_DEPTH: f32 = -5.0;

/// Horizontal drift toward the centre per frame.
pub const ENEMY_DRIFT_SPEED: f32 = 0.01;

/// Enemies closer than this to the vertical axis are removed.
pub const ENEMY_REMOVE_RADIUS: f32 = 0.5;

/// Ray distance cutoff when picking a target for a flower.
pub const PICK_MAX_DISTANCE: f32 = 1000.0;
