//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are serialized as JSON; flat records also support
//! binary (bincode) encoding.

use serde::{Serialize, Deserialize};

use crate::game::deduction::CheatingReason;
use crate::game::error::ErrorKind;
use crate::game::events::{EliminationReason, GameEvent, GameEventData};
use crate::game::session::{PlayerView, SessionSnapshot};
use crate::game::turn::TurnState;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new lobby and join it as host.
    CreateLobby { player_name: String },

    /// Join an existing lobby.
    JoinLobby { lobby_id: String, player_name: String },

    /// List open lobbies.
    ListLobbies,

    /// Host starts the game.
    StartGame,

    /// Roll the dice.
    RollDice,

    /// Move along direction tokens (`up`, `south`, `l`, ...).
    Move { steps: Vec<String> },

    /// Suggest a suspect and weapon in the current room.
    Suggest { suspect: String, weapon: String },

    /// Binding accusation.
    Accuse {
        suspect: String,
        weapon: String,
        room: String,
    },

    /// Skip the optional suggestion.
    EndTurn,

    /// Report another player for cheating.
    ReportCheating { suspect: String },

    /// Admin: end the game with no winner.
    ForceEnd { token: String },

    /// Request the current state and own hand (e.g. after a missed update).
    SyncRequest,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },

    /// Leave the lobby.
    Leave,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the socket is accepted.
    Welcome {
        connection_id: String,
        server_version: String,
    },

    /// Lobby membership changed (sent to every member).
    Lobby(LobbyInfo),

    /// Reply to `ListLobbies`.
    LobbyList { lobbies: Vec<LobbySummary> },

    /// The game has started; includes the recipient's hand.
    GameStart(GameStartInfo),

    /// Full public state plus the recipient's hand.
    State(StateSync),

    /// Game event notification.
    Event(SessionEvent),

    /// Game over; reveals the solution.
    GameEnd(GameEndInfo),

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Lobby membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyInfo {
    /// Lobby identifier (hex).
    pub lobby_id: String,
    /// Current host.
    pub host: Option<String>,
    /// Members in join order.
    pub members: Vec<String>,
    /// Turn state tag (`WAITING_FOR_PLAYERS` until started).
    pub state: TurnState,
}

/// Lobby list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    /// Lobby identifier (hex).
    pub lobby_id: String,
    /// Member count.
    pub players: u32,
    /// Seats available.
    pub max_players: u32,
    /// True once the game has started.
    pub started: bool,
}

/// Game start information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartInfo {
    /// Lobby identifier (hex).
    pub lobby_id: String,
    /// Seated players.
    pub players: Vec<PlayerView>,
    /// Recipient's cards.
    pub hand: Vec<String>,
    /// First player to roll.
    pub first_player: String,
}

/// State resync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSync {
    /// Public snapshot.
    pub snapshot: SessionSnapshot,
    /// Recipient's cards (empty for spectators or before start).
    pub hand: Vec<String>,
}

/// Cards in the solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionInfo {
    /// Suspect.
    pub suspect: String,
    /// Weapon.
    pub weapon: String,
    /// Room.
    pub room: String,
}

/// Game end information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEndInfo {
    /// Sequence number of the ending event.
    pub sequence: u32,
    /// Winner (None if nobody solved it or the game was force-ended).
    pub winner: Option<String>,
    /// The hidden cards.
    pub solution: Option<SolutionInfo>,
}

/// Game events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Cards dealt.
    GameStarted {
        sequence: u32,
        players: Vec<String>,
        first_player: String,
    },

    /// Phase or current player changed.
    TurnChanged {
        sequence: u32,
        state: TurnState,
        current_player: Option<String>,
    },

    /// Dice result.
    DiceRolled {
        sequence: u32,
        player: String,
        value: u8,
    },

    /// Movement applied.
    PlayerMoved {
        sequence: u32,
        player: String,
        from: [i32; 2],
        to: [i32; 2],
        room: Option<String>,
        via_passage: bool,
    },

    /// Suggestion resolved. `shown_card` is only ever set for the suggester.
    SuggestionResult {
        sequence: u32,
        suggester: String,
        suspect: String,
        weapon: String,
        room: String,
        disproved_by: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        shown_card: Option<String>,
    },

    /// Accusation resolved.
    AccusationResult {
        sequence: u32,
        player: String,
        suspect: String,
        weapon: String,
        room: String,
        correct: bool,
    },

    /// Player out of the rotation.
    PlayerEliminated {
        sequence: u32,
        player: String,
        reason: EliminationReason,
    },

    /// Cheating claim resolved.
    CheatingClaimResult {
        sequence: u32,
        accuser: String,
        suspect: String,
        valid: bool,
        reason: CheatingReason,
        reset_player: String,
        reset_position: [i32; 2],
    },
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Create an error payload.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed message or bad argument.
    InvalidInput,
    /// Action not allowed now or not by this player.
    IllegalState,
    /// Board or deck does not permit it.
    StructuralFailure,
    /// Lobby not found.
    LobbyNotFound,
    /// Lobby is full.
    LobbyFull,
    /// Game already started.
    GameInProgress,
    /// Name already used in the lobby.
    NameTaken,
    /// Not in a lobby.
    NotInLobby,
    /// Already in a lobby.
    AlreadyInLobby,
    /// Admin token rejected.
    Unauthorized,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidInput => ErrorCode::InvalidInput,
            ErrorKind::IllegalState => ErrorCode::IllegalState,
            ErrorKind::Structural => ErrorCode::StructuralFailure,
        }
    }
}

// =============================================================================
// EVENT CONVERSION
// =============================================================================

/// Convert a session event into what `viewer` is allowed to see.
///
/// Returns `ServerMessage::GameEnd` for the ending event and
/// `ServerMessage::Event` for everything else. The disproving card is kept
/// only when `viewer` is the suggester.
pub fn message_for_viewer(event: &GameEvent, viewer: Option<&str>) -> ServerMessage {
    let visible = match (event.data.private_to(), viewer) {
        (Some(owner), Some(viewer)) if owner.eq_ignore_ascii_case(viewer) => event.data.clone(),
        (Some(_), _) => event.data.redacted(),
        (None, _) => event.data.clone(),
    };
    let sequence = event.sequence;

    let wire = match visible {
        GameEventData::GameStarted { players, first_player } => SessionEvent::GameStarted {
            sequence,
            players,
            first_player,
        },
        GameEventData::TurnStateChanged { state, current_player } => SessionEvent::TurnChanged {
            sequence,
            state,
            current_player,
        },
        GameEventData::DiceRolled { player, value } => SessionEvent::DiceRolled {
            sequence,
            player,
            value,
        },
        GameEventData::PlayerMoved { player, from, to, room, via_passage } => SessionEvent::PlayerMoved {
            sequence,
            player,
            from: from.to_array(),
            to: to.to_array(),
            room,
            via_passage,
        },
        GameEventData::SuggestionMade {
            suggester,
            suspect,
            weapon,
            room,
            disproved_by,
            shown_card,
        } => SessionEvent::SuggestionResult {
            sequence,
            suggester,
            suspect,
            weapon,
            room,
            disproved_by,
            shown_card,
        },
        GameEventData::AccusationMade {
            player,
            suspect,
            weapon,
            room,
            correct,
        } => SessionEvent::AccusationResult {
            sequence,
            player,
            suspect,
            weapon,
            room,
            correct,
        },
        GameEventData::PlayerEliminated { player, reason } => SessionEvent::PlayerEliminated {
            sequence,
            player,
            reason,
        },
        GameEventData::CheatingClaimResolved {
            accuser,
            suspect,
            valid,
            reason,
            reset_player,
            reset_position,
        } => SessionEvent::CheatingClaimResult {
            sequence,
            accuser,
            suspect,
            valid,
            reason,
            reset_player,
            reset_position: reset_position.to_array(),
        },
        GameEventData::GameEnded { winner, solution } => {
            return ServerMessage::GameEnd(GameEndInfo {
                sequence,
                winner,
                solution: solution.map(|s| SolutionInfo {
                    suspect: s.suspect.name,
                    weapon: s.weapon.name,
                    room: s.room.name,
                }),
            });
        }
    };

    ServerMessage::Event(wire)
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Shorthand for an error reply.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError::new(code, message))
    }
}

impl LobbySummary {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
