//! Bevy ECS Systems - Per-frame simulation logic, one file per step

mod arrivals;
mod intake;
mod sync;
mod world;

pub use arrivals::*;
pub use intake::*;
pub use sync::*;
pub use world::*;
