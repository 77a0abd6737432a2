//! # Cluedo Game Server
//!
//! Authoritative rules engine and lobby server for a multiplayer
//! murder-mystery deduction board game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLUEDO SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── coord.rs    - Grid coordinates and directions           │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for desync detection        │
//! │                                                              │
//! │  game/           - Rules engine (deterministic)              │
//! │  ├── board.rs    - 25x25 grid, rooms, secret passages        │
//! │  ├── movement.rs - Steps, doors, passages, occupancy         │
//! │  ├── cards.rs    - Catalog, solution, dealing                │
//! │  ├── player.rs   - Per-player state                          │
//! │  ├── deduction.rs- Disproof, accusation, cheating claims     │
//! │  ├── turn.rs     - Turn state machine                        │
//! │  ├── events.rs   - Sequenced outcome records                 │
//! │  └── session.rs  - One lobby's game                          │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── lobby.rs    - Lobby membership and arena                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness (deal, first dice) from the session's seeded Xorshift128+
//!
//! Given the same roster, seed and action sequence, a session produces the
//! same events and the same state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::coord::{Coord, Direction};
pub use core::rng::DeterministicRng;
pub use game::session::{GameConfig, GameSession};
pub use game::error::{ActionError, ErrorKind};
pub use game::turn::TurnState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fewest players a game can start with
pub const MIN_PLAYERS: usize = 3;

/// Most players a lobby can seat
pub const MAX_PLAYERS: usize = 6;
