//! Player State
//!
//! Per-player data owned by a session: position, hand, lifecycle flags and
//! the bookkeeping the cheating check relies on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::coord::Coord;
use crate::core::hash::StateHasher;
use crate::game::board::{Board, RoomId};
use crate::game::cards::Card;

/// Position of a player in the roster (and in the session's player list).
pub type PlayerIndex = usize;

/// Token color, assigned in roster order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    /// Red
    Red,
    /// Yellow
    Yellow,
    /// White
    White,
    /// Green
    Green,
    /// Blue
    Blue,
    /// Purple
    Purple,
}

impl PlayerColor {
    /// Colors in seat order.
    pub const ALL: [PlayerColor; 6] = [
        PlayerColor::Red,
        PlayerColor::Yellow,
        PlayerColor::White,
        PlayerColor::Green,
        PlayerColor::Blue,
        PlayerColor::Purple,
    ];

    fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerColor::Red => "red",
            PlayerColor::Yellow => "yellow",
            PlayerColor::White => "white",
            PlayerColor::Green => "green",
            PlayerColor::Blue => "blue",
            PlayerColor::Purple => "purple",
        };
        f.write_str(name)
    }
}

/// One seat of the roster handed to a session at start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Unique player name
    pub name: String,
    /// Token color
    pub color: PlayerColor,
    /// Fixed start coordinate
    pub start: Coord,
}

/// Pair names with seat colors and the board's start positions.
///
/// Extra names beyond the available seats are ignored.
pub fn standard_roster<S: AsRef<str>>(names: &[S], board: &Board) -> Vec<RosterEntry> {
    names
        .iter()
        .zip(PlayerColor::ALL)
        .zip(board.start_positions())
        .map(|((name, color), start)| RosterEntry {
            name: name.as_ref().to_string(),
            color,
            start: *start,
        })
        .collect()
}

/// The three cards named by a player's latest suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    /// Suggested suspect
    pub suspect: Card,
    /// Suggested weapon
    pub weapon: Card,
    /// Room the suggestion was made in
    pub room: Card,
}

impl SuggestionRecord {
    fn cards(&self) -> [&Card; 3] {
        [&self.suspect, &self.weapon, &self.room]
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// A seated player.
#[derive(Clone, Debug)]
pub struct Player {
    /// Unique name (actor identity)
    pub name: String,
    /// Token color
    pub color: PlayerColor,
    /// Start coordinate (cheating resets return here)
    pub start: Coord,
    /// Current coordinate
    pub position: Coord,
    /// Dealt cards, in deal order
    pub hand: Vec<Card>,
    /// False once eliminated
    pub active: bool,
    /// True once the player made a correct accusation
    pub has_won: bool,
    /// True while it is this player's turn
    pub is_current: bool,
    /// Suggestions made per room since last entering it
    pub suggestion_counts: BTreeMap<RoomId, u32>,
    /// Whether a cheating report may still be filed this turn
    pub can_report: bool,
    /// Latest suggestion, if any
    pub last_suggestion: Option<SuggestionRecord>,
}

impl Player {
    /// Seat a player at their start coordinate.
    pub fn new(entry: RosterEntry) -> Self {
        Self {
            name: entry.name,
            color: entry.color,
            start: entry.start,
            position: entry.start,
            hand: Vec::new(),
            active: true,
            has_won: false,
            is_current: false,
            suggestion_counts: BTreeMap::new(),
            can_report: true,
            last_suggestion: None,
        }
    }

    /// Name comparison used for actor identity.
    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }

    /// True if `card` is in this player's hand.
    pub fn holds(&self, card: &Card) -> bool {
        self.hand.iter().any(|c| c == card)
    }

    /// Room the player currently stands in.
    pub fn room(&self, board: &Board) -> Option<RoomId> {
        board.room_at(self.position)
    }

    /// Suggestions made in `room` since the player last entered it.
    pub fn suggestion_count(&self, room: RoomId) -> u32 {
        self.suggestion_counts.get(&room).copied().unwrap_or(0)
    }

    /// Record a suggestion made in `room`.
    pub fn record_suggestion(&mut self, room: RoomId, record: SuggestionRecord) {
        *self.suggestion_counts.entry(room).or_insert(0) += 1;
        self.last_suggestion = Some(record);
    }

    /// Forget suggestions made in `room`.
    pub fn clear_suggestions_in(&mut self, room: RoomId) {
        self.suggestion_counts.remove(&room);
    }

    /// True if the latest suggestion named a card this player holds.
    pub fn suggested_own_card(&self) -> bool {
        self.last_suggestion
            .as_ref()
            .is_some_and(|s| s.cards().into_iter().any(|c| self.holds(c)))
    }

    /// Permanently remove from turn rotation.
    pub fn eliminate(&mut self) {
        self.active = false;
        self.is_current = false;
    }

    /// Add the public part of this player's state to a hash.
    ///
    /// The hand is excluded so the hash can be shared with everyone.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(&self.name);
        hasher.update_u8(self.color.tag());
        hasher.update_coord(self.position);
        hasher.update_bool(self.active);
        hasher.update_bool(self.has_won);
        hasher.update_bool(self.is_current);
        hasher.update_bool(self.can_report);
        hasher.update_u32(self.hand.len() as u32);
    }
}

// =============================================================================
// TESTS
// =============================================================================
