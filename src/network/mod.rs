//! Network Layer
//!
//! WebSocket server and lobby management for multiplayer sessions.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod lobby;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, SessionEvent, ErrorCode, message_for_viewer};
pub use lobby::{Lobby, LobbyArena, LobbyError, LobbyId};
pub use server::{GameServer, ServerConfig, ServerState, GameServerError};
