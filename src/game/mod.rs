//! Game Logic Module
//!
//! The rules engine. Deterministic: no I/O, no clocks, all randomness from
//! the session's seeded RNG.
//!
//! ## Module Structure
//!
//! - `board`: Grid cells, room and secret-passage registries
//! - `movement`: Single-step validation, doors, passages, occupancy
//! - `cards`: Card catalog, solution, dealing
//! - `player`: Per-player state
//! - `deduction`: Suggestion disproof, accusation, cheating claims
//! - `turn`: Turn state machine
//! - `events`: Outcome records
//! - `session`: One lobby's game, tying the above together
//! - `error`: Action errors

pub mod board;
pub mod movement;
pub mod cards;
pub mod player;
pub mod deduction;
pub mod turn;
pub mod events;
pub mod session;
pub mod error;

// Re-export key types
pub use board::{Board, CellType, RoomId};
pub use cards::{Card, CardCategory, Solution};
pub use player::{Player, PlayerColor, PlayerIndex, RosterEntry};
pub use deduction::CheatingReason;
pub use turn::TurnState;
pub use events::{GameEvent, GameEventData};
pub use session::{GameConfig, GameSession, SessionSnapshot};
pub use error::{ActionError, ErrorKind};
