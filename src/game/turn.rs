//! Turn State Machine
//!
//! ```text
//! WAITING_FOR_PLAYERS ⇄ WAITING_FOR_START → ROLL_DICE → MOVE ─┬→ SUGGEST → END
//!                                              ↑              └→ END      │
//!                                              └──── next active player ──┘
//!
//! accusation from ROLL_DICE / MOVE / SUGGEST:
//!   correct   → PLAYER_HAS_WON
//!   incorrect → eliminate, then END → next (or PLAYER_HAS_WON without winner)
//! ```

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::game::error::ActionError;
use crate::game::player::{Player, PlayerIndex};

/// Session phase tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    /// Fewer than the minimum number of players have joined
    WaitingForPlayers,
    /// Enough players; waiting for the host
    WaitingForStart,
    /// Current player must roll
    PlayersTurnRollDice,
    /// Current player must move
    PlayersTurnMove,
    /// Current player may suggest (inside a room)
    PlayersTurnSuggest,
    /// Transient: the turn is being handed on
    PlayersTurnEnd,
    /// Terminal
    PlayerHasWon,
}

impl TurnState {
    /// Stable numeric tag (state hashing).
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// True once the game is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::PlayerHasWon)
    }

    /// True before the game has started.
    pub fn is_lobby(self) -> bool {
        matches!(self, TurnState::WaitingForPlayers | TurnState::WaitingForStart)
    }

    /// States in which the current player may accuse.
    pub fn accepts_accusation(self) -> bool {
        matches!(
            self,
            TurnState::PlayersTurnRollDice | TurnState::PlayersTurnMove | TurnState::PlayersTurnSuggest
        )
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::WaitingForPlayers => "WAITING_FOR_PLAYERS",
            TurnState::WaitingForStart => "WAITING_FOR_START",
            TurnState::PlayersTurnRollDice => "PLAYERS_TURN_ROLL_DICE",
            TurnState::PlayersTurnMove => "PLAYERS_TURN_MOVE",
            TurnState::PlayersTurnSuggest => "PLAYERS_TURN_SUGGEST",
            TurnState::PlayersTurnEnd => "PLAYERS_TURN_END",
            TurnState::PlayerHasWon => "PLAYER_HAS_WON",
        };
        f.write_str(name)
    }
}

/// Session turn bookkeeping: phase, whose turn, last dice value, winner.
#[derive(Clone, Debug)]
pub struct TurnStateMachine {
    state: TurnState,
    current: PlayerIndex,
    last_dice: Option<u8>,
    winner: Option<PlayerIndex>,
    min_players: usize,
}

impl TurnStateMachine {
    /// Fresh machine waiting for players.
    pub fn new(min_players: usize) -> Self {
        Self {
            state: TurnState::WaitingForPlayers,
            current: 0,
            last_dice: None,
            winner: None,
            min_players,
        }
    }

    /// Current phase.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Index of the player whose turn it is.
    pub fn current(&self) -> PlayerIndex {
        self.current
    }

    /// Value of the latest roll this turn.
    pub fn last_dice(&self) -> Option<u8> {
        self.last_dice
    }

    /// Winner, once a correct accusation was made.
    pub fn winner(&self) -> Option<PlayerIndex> {
        self.winner
    }

    /// Reject `action` unless the machine is in one of `allowed`.
    pub fn require(&self, action: &'static str, allowed: &[TurnState]) -> Result<(), ActionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ActionError::WrongState {
                action,
                state: self.state,
            })
        }
    }

    /// Track lobby size before the game starts.
    ///
    /// Returns the new state if it changed.
    pub fn update_player_count(&mut self, count: usize) -> Option<TurnState> {
        if !self.state.is_lobby() {
            return None;
        }
        let next = if count >= self.min_players {
            TurnState::WaitingForStart
        } else {
            TurnState::WaitingForPlayers
        };
        if next == self.state {
            None
        } else {
            self.state = next;
            Some(next)
        }
    }

    /// Game starts with `first` to roll.
    pub fn begin(&mut self, first: PlayerIndex) {
        self.current = first;
        self.last_dice = None;
        self.state = TurnState::PlayersTurnRollDice;
    }

    /// Dice rolled; movement comes next.
    pub fn record_roll(&mut self, value: u8) {
        self.last_dice = Some(value);
        self.state = TurnState::PlayersTurnMove;
    }

    /// Movement done; suggest if standing in a room, otherwise end the turn.
    pub fn finish_move(&mut self, in_room: bool) {
        self.state = if in_room {
            TurnState::PlayersTurnSuggest
        } else {
            TurnState::PlayersTurnEnd
        };
    }

    /// Hand the turn to the next active player after the current one.
    ///
    /// Updates `is_current` flags and restores the new player's report
    /// capability. With nobody left to play the game ends without a winner.
    pub fn advance(&mut self, players: &mut [Player]) -> Option<PlayerIndex> {
        self.state = TurnState::PlayersTurnEnd;
        self.last_dice = None;

        if let Some(player) = players.get_mut(self.current) {
            player.is_current = false;
        }

        match Self::next_active(players, self.current) {
            Some(next) => {
                self.current = next;
                let player = &mut players[next];
                player.is_current = true;
                player.can_report = true;
                self.state = TurnState::PlayersTurnRollDice;
                Some(next)
            }
            None => {
                self.end_without_winner();
                None
            }
        }
    }

    /// A correct accusation ends the game.
    pub fn declare_winner(&mut self, winner: PlayerIndex) {
        self.winner = Some(winner);
        self.last_dice = None;
        self.state = TurnState::PlayerHasWon;
    }

    /// Terminal state with no winner.
    pub fn end_without_winner(&mut self) {
        self.winner = None;
        self.last_dice = None;
        self.state = TurnState::PlayerHasWon;
    }

    /// Next active player strictly after `from`, wrapping around.
    ///
    /// `from` itself is considered last, so a lone active player gets the
    /// turn back.
    pub fn next_active(players: &[Player], from: PlayerIndex) -> Option<PlayerIndex> {
        let n = players.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .find(|&idx| players[idx].active)
    }

    /// Number of players still in the game.
    pub fn active_count(players: &[Player]) -> usize {
        players.iter().filter(|p| p.active).count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Coord;
    use crate::game::player::{PlayerColor, RosterEntry};

    fn players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| {
                Player::new(RosterEntry {
                    name: format!("p{}", i),
                    color: PlayerColor::ALL[i],
                    start: Coord::new(1, 7),
                })
            })
            .collect()
    }

    #[test]
    fn test_lobby_transitions() {
        let mut turn = TurnStateMachine::new(3);
        assert_eq!(turn.state(), TurnState::WaitingForPlayers);

        assert_eq!(turn.update_player_count(2), None);
        assert_eq!(turn.update_player_count(3), Some(TurnState::WaitingForStart));
        assert_eq!(turn.update_player_count(4), None);
        assert_eq!(turn.update_player_count(2), Some(TurnState::WaitingForPlayers));
    }

    #[test]
    fn test_player_count_ignored_in_game() {
        let mut turn = TurnStateMachine::new(3);
        turn.update_player_count(3);
        turn.begin(0);
        assert_eq!(turn.update_player_count(1), None);
        assert_eq!(turn.state(), TurnState::PlayersTurnRollDice);
    }

    #[test]
    fn test_full_turn_cycle() {
        let mut ps = players(3);
        let mut turn = TurnStateMachine::new(3);
        turn.begin(0);
        ps[0].is_current = true;

        turn.record_roll(7);
        assert_eq!(turn.state(), TurnState::PlayersTurnMove);
        assert_eq!(turn.last_dice(), Some(7));

        turn.finish_move(true);
        assert_eq!(turn.state(), TurnState::PlayersTurnSuggest);

        ps[1].can_report = false;
        assert_eq!(turn.advance(&mut ps), Some(1));
        assert_eq!(turn.state(), TurnState::PlayersTurnRollDice);
        assert_eq!(turn.last_dice(), None);
        assert!(!ps[0].is_current);
        assert!(ps[1].is_current);
        assert!(ps[1].can_report);
    }

    #[test]
    fn test_move_outside_room_ends_turn() {
        let mut turn = TurnStateMachine::new(3);
        turn.begin(0);
        turn.record_roll(4);
        turn.finish_move(false);
        assert_eq!(turn.state(), TurnState::PlayersTurnEnd);
    }

    #[test]
    fn test_advance_skips_eliminated_and_wraps() {
        let mut ps = players(4);
        ps[2].active = false;
        ps[3].active = false;

        let mut turn = TurnStateMachine::new(3);
        turn.begin(1);
        assert_eq!(turn.advance(&mut ps), Some(0));
        assert_eq!(turn.advance(&mut ps), Some(1));
    }

    #[test]
    fn test_advance_with_nobody_left() {
        let mut ps = players(3);
        for p in &mut ps {
            p.active = false;
        }
        let mut turn = TurnStateMachine::new(3);
        turn.begin(0);
        assert_eq!(turn.advance(&mut ps), None);
        assert_eq!(turn.state(), TurnState::PlayerHasWon);
        assert_eq!(turn.winner(), None);
    }

    #[test]
    fn test_require() {
        let turn = TurnStateMachine::new(3);
        assert!(turn.require("start", &[TurnState::WaitingForPlayers]).is_ok());
        let err = turn.require("roll", &[TurnState::PlayersTurnRollDice]).unwrap_err();
        assert_eq!(
            err,
            ActionError::WrongState {
                action: "roll",
                state: TurnState::WaitingForPlayers,
            }
        );
    }

    #[test]
    fn test_declare_winner() {
        let mut turn = TurnStateMachine::new(3);
        turn.begin(2);
        turn.declare_winner(2);
        assert!(turn.state().is_terminal());
        assert_eq!(turn.winner(), Some(2));
    }

    #[test]
    fn test_state_display_matches_wire_name() {
        for state in [
            TurnState::WaitingForPlayers,
            TurnState::PlayersTurnRollDice,
            TurnState::PlayerHasWon,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }
}
