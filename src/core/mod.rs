//! Core deterministic primitives.
//!
//! Grid coordinates, the seeded RNG used for dealing and dice, and the
//! state hasher. Nothing here knows about game rules.

pub mod coord;
pub mod rng;
pub mod hash;

// Re-export core types
pub use coord::{Coord, Direction, UnknownDirection};
pub use rng::DeterministicRng;
pub use hash::{StateHash, compute_state_hash};
