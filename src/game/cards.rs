//! Cards, Solution and Dealing
//!
//! Three categories (suspects, weapons, rooms). One card of each category is
//! withheld as the hidden solution; the rest are pooled, shuffled and dealt
//! round-robin.
//!
//! Card equality is by name only (ASCII case-insensitive). The `id` field
//! exists for display ordering and never participates in comparisons.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::board::Board;

/// Standard suspects, in card-id order.
pub const SUSPECTS: [&str; 6] = [
    "Miss Scarlet",
    "Colonel Mustard",
    "Mrs. White",
    "Reverend Green",
    "Mrs. Peacock",
    "Professor Plum",
];

/// Standard weapons, in card-id order.
pub const WEAPONS: [&str; 6] = [
    "Candlestick",
    "Dagger",
    "Lead Pipe",
    "Revolver",
    "Rope",
    "Wrench",
];

// =============================================================================
// CARD
// =============================================================================

/// Card category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardCategory {
    /// Who did it
    Suspect,
    /// With what
    Weapon,
    /// Where
    Room,
}

impl fmt::Display for CardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CardCategory::Suspect => "suspect",
            CardCategory::Weapon => "weapon",
            CardCategory::Room => "room",
        };
        f.write_str(label)
    }
}

/// A single card.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    /// Catalog identifier (ignored by equality)
    pub id: u8,
    /// Display name
    pub name: String,
    /// Category
    pub category: CardCategory,
}

impl Card {
    /// Create a card.
    pub fn new(id: u8, name: impl Into<String>, category: CardCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
        }
    }

    /// Name comparison used everywhere cards are matched.
    #[inline]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.matches_name(&other.name)
    }
}

impl Eq for Card {}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Every card in play, grouped by category.
#[derive(Clone, Debug)]
pub struct CardCatalog {
    suspects: Vec<Card>,
    weapons: Vec<Card>,
    rooms: Vec<Card>,
}

impl CardCatalog {
    /// Build a catalog from explicit name lists.
    pub fn new<S: AsRef<str>>(suspects: &[S], weapons: &[S], rooms: &[S]) -> Self {
        let mut next_id = 0u8;
        let mut build = |names: &[S], category: CardCategory| -> Vec<Card> {
            names
                .iter()
                .map(|name| {
                    let card = Card::new(next_id, name.as_ref(), category);
                    next_id = next_id.wrapping_add(1);
                    card
                })
                .collect()
        };

        let suspects = build(suspects, CardCategory::Suspect);
        let weapons = build(weapons, CardCategory::Weapon);
        let rooms = build(rooms, CardCategory::Room);

        Self { suspects, weapons, rooms }
    }

    /// Standard suspects and weapons plus one room card per board room.
    pub fn for_board(board: &Board) -> Self {
        let rooms: Vec<&str> = board.rooms().iter().map(|r| r.name.as_str()).collect();
        Self::new(&SUSPECTS[..], &WEAPONS[..], &rooms[..])
    }

    /// Cards in one category.
    pub fn category(&self, category: CardCategory) -> &[Card] {
        match category {
            CardCategory::Suspect => &self.suspects,
            CardCategory::Weapon => &self.weapons,
            CardCategory::Room => &self.rooms,
        }
    }

    /// Find a card by category and name.
    pub fn lookup(&self, category: CardCategory, name: &str) -> Option<&Card> {
        self.category(category).iter().find(|c| c.matches_name(name))
    }

    /// All cards, suspects first.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.suspects.iter().chain(&self.weapons).chain(&self.rooms)
    }

    /// Total number of cards.
    pub fn len(&self) -> usize {
        self.suspects.len() + self.weapons.len() + self.rooms.len()
    }

    /// True if there are no cards at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// SOLUTION & DEAL
// =============================================================================

/// The hidden answer: one card per category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    /// Withheld suspect
    pub suspect: Card,
    /// Withheld weapon
    pub weapon: Card,
    /// Withheld room
    pub room: Card,
}

impl Solution {
    /// Exact three-way name match.
    pub fn matches(&self, suspect: &str, weapon: &str, room: &str) -> bool {
        self.suspect.matches_name(suspect)
            && self.weapon.matches_name(weapon)
            && self.room.matches_name(room)
    }

    /// True if `card` is one of the three withheld cards.
    pub fn contains(&self, card: &Card) -> bool {
        self.suspect == *card || self.weapon == *card || self.room == *card
    }

    /// The three cards in category order.
    pub fn cards(&self) -> [&Card; 3] {
        [&self.suspect, &self.weapon, &self.room]
    }
}

/// Result of dealing a fresh deck.
#[derive(Clone, Debug)]
pub struct Deal {
    /// Withheld cards
    pub solution: Solution,
    /// One hand per player, in roster order
    pub hands: Vec<Vec<Card>>,
}

/// Dealing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DealError {
    /// Nobody to deal to.
    #[error("cannot deal to zero players")]
    NoPlayers,

    /// A category has no card to withhold.
    #[error("no {0} cards to choose a solution from")]
    EmptyCategory(CardCategory),
}

/// Withhold the solution and deal the rest.
///
/// Each category is shuffled independently and its first card withheld.
/// The remainder is pooled, shuffled again and dealt one card per player
/// per round starting at player 0, so hand sizes differ by at most one.
pub fn deal(catalog: &CardCatalog, players: usize, rng: &mut DeterministicRng) -> Result<Deal, DealError> {
    if players == 0 {
        return Err(DealError::NoPlayers);
    }

    let mut deck = Vec::with_capacity(catalog.len());
    let mut withhold = |category: CardCategory| -> Result<Card, DealError> {
        let mut cards = catalog.category(category).to_vec();
        if cards.is_empty() {
            return Err(DealError::EmptyCategory(category));
        }
        rng.shuffle(&mut cards);
        let hidden = cards.remove(0);
        deck.extend(cards);
        Ok(hidden)
    };

    let suspect = withhold(CardCategory::Suspect)?;
    let weapon = withhold(CardCategory::Weapon)?;
    let room = withhold(CardCategory::Room)?;

    rng.shuffle(&mut deck);

    let mut hands = vec![Vec::with_capacity(deck.len() / players + 1); players];
    for (i, card) in deck.into_iter().enumerate() {
        hands[i % players].push(card);
    }

    Ok(Deal {
        solution: Solution { suspect, weapon, room },
        hands,
    })
}

// =============================================================================
// TESTS
// =============================================================================
