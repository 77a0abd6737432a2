//! Deduction Engine
//!
//! Suggestion disproof search, accusation check and cheating-claim
//! validation. All three are pure functions over the session's players;
//! the session applies the consequences.

use serde::{Serialize, Deserialize};

use crate::game::board::Board;
use crate::game::cards::{Card, Solution};
use crate::game::player::{Player, PlayerIndex};

/// A card shown to refute a suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disproof {
    /// Player who holds the card
    pub player: PlayerIndex,
    /// The card shown
    pub card: Card,
}

/// First card held by another player that matches any of the three names.
///
/// Other players are scanned in roster order, each hand in deal order.
/// Eliminated players still show cards.
pub fn find_disproof(
    players: &[Player],
    suggester: PlayerIndex,
    suspect: &Card,
    weapon: &Card,
    room: &Card,
) -> Option<Disproof> {
    players
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != suggester)
        .find_map(|(index, player)| {
            player
                .hand
                .iter()
                .find(|card| *card == suspect || *card == weapon || *card == room)
                .map(|card| Disproof {
                    player: index,
                    card: card.clone(),
                })
        })
}

/// Exact category-wise comparison against the solution.
pub fn check_accusation(solution: &Solution, suspect: &Card, weapon: &Card, room: &Card) -> bool {
    solution.suspect == *suspect && solution.weapon == *weapon && solution.room == *room
}

// =============================================================================
// CHEATING CLAIMS
// =============================================================================

/// Outcome reason of a cheating claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheatingReason {
    /// Claim upheld
    Success,
    /// Accuser and suspect are not in the same room
    NotInSameRoom,
    /// Suspect's behavior does not support the claim
    NoEvidence,
    /// Accuser already used their report this turn
    AlreadyReported,
}

impl CheatingReason {
    /// True only for [`CheatingReason::Success`].
    pub fn is_valid(self) -> bool {
        matches!(self, CheatingReason::Success)
    }
}

/// Decide a cheating claim without applying any consequence.
///
/// Checks run in a fixed order: report capability, shared room, evidence.
/// Evidence is either a last suggestion naming one of the suspect's own
/// cards, or more than one suggestion in the current room since entering it.
pub fn evaluate_cheating_claim(board: &Board, accuser: &Player, suspect: &Player) -> CheatingReason {
    if !accuser.can_report {
        return CheatingReason::AlreadyReported;
    }

    let room = match (accuser.room(board), suspect.room(board)) {
        (Some(a), Some(s)) if a == s => a,
        _ => return CheatingReason::NotInSameRoom,
    };

    if suspect.suggested_own_card() || suspect.suggestion_count(room) > 1 {
        CheatingReason::Success
    } else {
        CheatingReason::NoEvidence
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Coord;
    use crate::game::cards::CardCategory;
    use crate::game::player::{PlayerColor, RosterEntry, SuggestionRecord};

    fn suspect(name: &str) -> Card {
        Card::new(0, name, CardCategory::Suspect)
    }

    fn weapon(name: &str) -> Card {
        Card::new(6, name, CardCategory::Weapon)
    }

    fn room(name: &str) -> Card {
        Card::new(12, name, CardCategory::Room)
    }

    fn player(name: &str, position: Coord, hand: Vec<Card>) -> Player {
        let mut p = Player::new(RosterEntry {
            name: name.into(),
            color: PlayerColor::Red,
            start: Coord::new(16, 1),
        });
        p.position = position;
        p.hand = hand;
        p
    }

    fn table() -> Vec<Player> {
        vec![
            player("a", Coord::new(3, 3), vec![weapon("Rope")]),
            player("b", Coord::new(7, 7), vec![suspect("Mrs. White"), room("Study")]),
            player("c", Coord::new(7, 8), vec![room("Kitchen"), weapon("Dagger")]),
        ]
    }

    #[test]
    fn test_disproof_first_player_in_roster_order() {
        let players = table();
        let found = find_disproof(&players, 0, &suspect("Mrs. White"), &weapon("Dagger"), &room("Study")).unwrap();
        assert_eq!(found.player, 1);
        assert_eq!(found.card.name, "Mrs. White");
    }

    #[test]
    fn test_disproof_first_card_in_hand_order() {
        let players = table();
        let found = find_disproof(&players, 0, &suspect("Miss Scarlet"), &weapon("Candlestick"), &room("Study")).unwrap();
        assert_eq!(found.player, 1);
        assert_eq!(found.card.name, "Study");
    }

    #[test]
    fn test_disproof_skips_suggester() {
        let players = table();
        let found = find_disproof(&players, 1, &suspect("Mrs. White"), &weapon("Rope"), &room("Study")).unwrap();
        assert_eq!(found.player, 0);
        assert_eq!(found.card.name, "Rope");
    }

    #[test]
    fn test_no_disproof() {
        let players = table();
        assert!(find_disproof(&players, 0, &suspect("Professor Plum"), &weapon("Wrench"), &room("Hall")).is_none());
    }

    #[test]
    fn test_disproof_is_deterministic() {
        let players = table();
        let s = suspect("Mrs. White");
        let w = weapon("Dagger");
        let r = room("Kitchen");
        let first = find_disproof(&players, 0, &s, &w, &r);
        for _ in 0..10 {
            assert_eq!(find_disproof(&players, 0, &s, &w, &r), first);
        }
    }

    #[test]
    fn test_accusation_exact_match() {
        let solution = Solution {
            suspect: suspect("Mrs. White"),
            weapon: weapon("Rope"),
            room: room("Kitchen"),
        };
        assert!(check_accusation(&solution, &suspect("mrs. white"), &weapon("rope"), &room("KITCHEN")));
        assert!(!check_accusation(&solution, &suspect("Mrs. White"), &weapon("Rope"), &room("Study")));
        assert!(!check_accusation(&solution, &suspect("Mrs. White"), &weapon("Dagger"), &room("Kitchen")));
    }

    #[test]
    fn test_cheating_already_reported_checked_first() {
        let board = Board::standard();
        let mut accuser = player("a", Coord::new(7, 7), vec![]);
        accuser.can_report = false;
        let suspect_player = player("b", Coord::new(20, 20), vec![]);
        assert_eq!(
            evaluate_cheating_claim(&board, &accuser, &suspect_player),
            CheatingReason::AlreadyReported
        );
    }

    #[test]
    fn test_cheating_requires_same_room() {
        let board = Board::standard();
        let accuser = player("a", Coord::new(3, 3), vec![]);
        let hallway = player("b", Coord::new(7, 7), vec![]);
        let kitchen = player("c", Coord::new(20, 20), vec![]);
        assert_eq!(evaluate_cheating_claim(&board, &accuser, &hallway), CheatingReason::NotInSameRoom);
        assert_eq!(evaluate_cheating_claim(&board, &accuser, &kitchen), CheatingReason::NotInSameRoom);

        let outside = player("d", Coord::new(7, 7), vec![]);
        assert_eq!(evaluate_cheating_claim(&board, &outside, &hallway), CheatingReason::NotInSameRoom);
    }

    #[test]
    fn test_cheating_evidence() {
        let board = Board::standard();
        let study = board.room_by_name("Study").unwrap().id;
        let accuser = player("a", Coord::new(3, 3), vec![]);

        let mut innocent = player("b", Coord::new(2, 2), vec![weapon("Rope")]);
        innocent.record_suggestion(study, SuggestionRecord {
            suspect: suspect("Mrs. White"),
            weapon: weapon("Dagger"),
            room: room("Study"),
        });
        assert_eq!(evaluate_cheating_claim(&board, &accuser, &innocent), CheatingReason::NoEvidence);

        let mut own_card = innocent.clone();
        own_card.last_suggestion = Some(SuggestionRecord {
            suspect: suspect("Mrs. White"),
            weapon: weapon("Rope"),
            room: room("Study"),
        });
        assert_eq!(evaluate_cheating_claim(&board, &accuser, &own_card), CheatingReason::Success);

        let mut repeat = innocent.clone();
        repeat.suggestion_counts.insert(study, 2);
        assert_eq!(evaluate_cheating_claim(&board, &accuser, &repeat), CheatingReason::Success);
    }

    #[test]
    fn test_reason_validity() {
        assert!(CheatingReason::Success.is_valid());
        assert!(!CheatingReason::NoEvidence.is_valid());
        assert!(!CheatingReason::NotInSameRoom.is_valid());
        assert!(!CheatingReason::AlreadyReported.is_valid());
    }
}
