//! Session action errors.
//!
//! Every rejected action leaves the session untouched and the game running.

use serde::{Serialize, Deserialize};

use crate::core::coord::UnknownDirection;
use crate::game::cards::{CardCategory, DealError};
use crate::game::movement::MoveError;
use crate::game::turn::TurnState;

/// Coarse classification of a rejected action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range request
    InvalidInput,
    /// Wrong phase or wrong player
    IllegalState,
    /// The board or deck does not permit the request
    Structural,
}

/// Why a session action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Action not allowed in the current phase.
    #[error("cannot {action} during {state}")]
    WrongState {
        /// Attempted action
        action: &'static str,
        /// Phase at the time
        state: TurnState,
    },

    /// Actor is not the current player.
    #[error("it is not {0}'s turn")]
    NotYourTurn(String),

    /// Only the host may start.
    #[error("{0} is not the host")]
    NotHost(String),

    /// Name not seated in this session.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// Player was eliminated.
    #[error("{0} has been eliminated")]
    Eliminated(String),

    /// Roster size outside the allowed range.
    #[error("need {min} to {max} players, got {count}")]
    PlayerCount {
        /// Roster size
        count: usize,
        /// Minimum
        min: usize,
        /// Maximum
        max: usize,
    },

    /// Two roster entries share a name.
    #[error("duplicate player name: {0}")]
    DuplicateName(String),

    /// Card name not in the catalog.
    #[error("unknown {category} card: {name}")]
    UnknownCard {
        /// Category searched
        category: CardCategory,
        /// Name given
        name: String,
    },

    /// Movement token not understood.
    #[error(transparent)]
    BadDirection(#[from] UnknownDirection),

    /// More movement steps than the dice allow.
    #[error("{steps} steps requested but only {allowed} rolled")]
    TooManySteps {
        /// Steps requested
        steps: usize,
        /// Dice value
        allowed: u8,
    },

    /// Suggesting outside a room.
    #[error("suggestions can only be made inside a room")]
    NotInRoom,

    /// Reporting oneself.
    #[error("cannot report yourself")]
    SelfReport,

    /// Movement rule violation.
    #[error("illegal move: {0}")]
    Move(#[from] MoveError),

    /// Deck could not be dealt.
    #[error("deal failed: {0}")]
    Deal(#[from] DealError),
}

impl ActionError {
    /// Classification used by callers to pick a response code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::WrongState { .. }
            | ActionError::NotYourTurn(_)
            | ActionError::NotHost(_)
            | ActionError::Eliminated(_)
            | ActionError::NotInRoom => ErrorKind::IllegalState,

            ActionError::UnknownPlayer(_)
            | ActionError::PlayerCount { .. }
            | ActionError::DuplicateName(_)
            | ActionError::UnknownCard { .. }
            | ActionError::BadDirection(_)
            | ActionError::TooManySteps { .. }
            | ActionError::SelfReport => ErrorKind::InvalidInput,

            ActionError::Move(err) => match err {
                MoveError::OutOfBounds(_) | MoveError::Inaccessible(_) | MoveError::NotAdjacent { .. } => {
                    ErrorKind::InvalidInput
                }
                MoveError::IncompatibleCells { .. }
                | MoveError::NoDoorLanding(_)
                | MoveError::MissingPassage(_)
                | MoveError::NoPassageLanding(_) => ErrorKind::Structural,
            },

            ActionError::Deal(_) => ErrorKind::Structural,
        }
    }
}
