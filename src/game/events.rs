//! Game Events
//!
//! Outcome records emitted by a session, in the order they happened.
//! Each carries the session's sequence number so observers can detect gaps.

use serde::{Serialize, Deserialize};

use crate::core::coord::Coord;
use crate::game::cards::Solution;
use crate::game::deduction::CheatingReason;
use crate::game::turn::TurnState;

/// Why a player left the rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationReason {
    /// Made an incorrect accusation
    WrongAccusation,
    /// Left or disconnected mid-game
    Forfeit,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Cards dealt, first player chosen
    GameStarted {
        players: Vec<String>,
        first_player: String,
    },

    /// Phase or current player changed
    TurnStateChanged {
        state: TurnState,
        current_player: Option<String>,
    },

    /// Dice result
    DiceRolled {
        player: String,
        value: u8,
    },

    /// Movement applied
    PlayerMoved {
        player: String,
        from: Coord,
        to: Coord,
        room: Option<String>,
        via_passage: bool,
    },

    /// Suggestion resolved.
    ///
    /// `shown_card` is only for the suggester; see [`GameEventData::redacted`].
    SuggestionMade {
        suggester: String,
        suspect: String,
        weapon: String,
        room: String,
        disproved_by: Option<String>,
        shown_card: Option<String>,
    },

    /// Accusation resolved
    AccusationMade {
        player: String,
        suspect: String,
        weapon: String,
        room: String,
        correct: bool,
    },

    /// Player out of the rotation
    PlayerEliminated {
        player: String,
        reason: EliminationReason,
    },

    /// Cheating claim resolved; `reset_player` was sent back to `reset_position`
    CheatingClaimResolved {
        accuser: String,
        suspect: String,
        valid: bool,
        reason: CheatingReason,
        reset_player: String,
        reset_position: Coord,
    },

    /// Terminal state reached
    GameEnded {
        winner: Option<String>,
        solution: Option<Solution>,
    },
}

impl GameEventData {
    /// Copy safe to show every player: strips the card a suggestion was
    /// disproved with.
    pub fn redacted(&self) -> GameEventData {
        match self {
            GameEventData::SuggestionMade {
                suggester,
                suspect,
                weapon,
                room,
                disproved_by,
                ..
            } => GameEventData::SuggestionMade {
                suggester: suggester.clone(),
                suspect: suspect.clone(),
                weapon: weapon.clone(),
                room: room.clone(),
                disproved_by: disproved_by.clone(),
                shown_card: None,
            },
            other => other.clone(),
        }
    }

    /// The only player allowed to see the full record, if it is private.
    pub fn private_to(&self) -> Option<&str> {
        match self {
            GameEventData::SuggestionMade {
                suggester,
                shown_card: Some(_),
                ..
            } => Some(suggester),
            _ => None,
        }
    }
}

/// A game event with its sequence number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Per-session sequence number, starting at 1
    pub sequence: u32,

    /// Player the event is about (for routing and filtering)
    pub player: Option<String>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(sequence: u32, data: GameEventData) -> Self {
        let player = match &data {
            GameEventData::DiceRolled { player, .. }
            | GameEventData::PlayerMoved { player, .. }
            | GameEventData::AccusationMade { player, .. }
            | GameEventData::PlayerEliminated { player, .. } => Some(player.clone()),
            GameEventData::SuggestionMade { suggester, .. } => Some(suggester.clone()),
            GameEventData::CheatingClaimResolved { accuser, .. } => Some(accuser.clone()),
            GameEventData::TurnStateChanged { current_player, .. } => current_player.clone(),
            GameEventData::GameEnded { winner, .. } => winner.clone(),
            GameEventData::GameStarted { first_player, .. } => Some(first_player.clone()),
        };

        Self {
            sequence,
            player,
            data,
        }
    }

    /// Create turn state changed event.
    pub fn turn_state_changed(sequence: u32, state: TurnState, current_player: Option<String>) -> Self {
        Self::new(sequence, GameEventData::TurnStateChanged { state, current_player })
    }

    /// Create dice rolled event.
    pub fn dice_rolled(sequence: u32, player: String, value: u8) -> Self {
        Self::new(sequence, GameEventData::DiceRolled { player, value })
    }

    /// Create player eliminated event.
    pub fn player_eliminated(sequence: u32, player: String, reason: EliminationReason) -> Self {
        Self::new(sequence, GameEventData::PlayerEliminated { player, reason })
    }

    /// Create game ended event.
    pub fn game_ended(sequence: u32, winner: Option<String>, solution: Option<Solution>) -> Self {
        Self::new(sequence, GameEventData::GameEnded { winner, solution })
    }
}

// =============================================================================
// TESTS
// =============================================================================
