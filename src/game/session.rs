//! Game Session
//!
//! Composition root for one lobby's game: board, catalog, players, solution,
//! turn machine, RNG and the pending event buffer. Every public action runs
//! validate → mutate → record events, and returns before anything else can
//! touch the session (callers hold the lobby lock around each call).
//!
//! # Determinism
//!
//! Given the same seed, roster and sequence of actions, a session produces
//! identical deals, dice, events and state hashes.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::coord::{Coord, Direction};
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::game::board::Board;
use crate::game::cards::{self, Card, CardCatalog, CardCategory, Solution};
use crate::game::deduction::{self, CheatingReason};
use crate::game::error::ActionError;
use crate::game::events::{EliminationReason, GameEvent, GameEventData};
use crate::game::movement::{self, PathOutcome, RoomOccupancy};
use crate::game::player::{Player, PlayerColor, PlayerIndex, RosterEntry, SuggestionRecord};
use crate::game::turn::{TurnState, TurnStateMachine};
use crate::{MAX_PLAYERS, MIN_PLAYERS};

/// Session rules configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Players required before the host can start
    pub min_players: usize,
    /// Seats available
    pub max_players: usize,
    /// Dice rolled per turn
    pub dice_count: u8,
    /// Faces per die
    pub dice_sides: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            dice_count: 2,
            dice_sides: 6,
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of a suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionOutcome {
    /// Suggested suspect
    pub suspect: Card,
    /// Suggested weapon
    pub weapon: Card,
    /// The suggester's room
    pub room: Card,
    /// Player who disproved, if anyone could
    pub disproved_by: Option<String>,
    /// Card shown to the suggester
    pub shown_card: Option<Card>,
}

/// Result of an accusation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccusationOutcome {
    /// True if all three cards matched
    pub correct: bool,
    /// True if the game is now over
    pub game_over: bool,
    /// Winner, if any
    pub winner: Option<String>,
}

/// Result of a cheating claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheatingOutcome {
    /// True if the claim was upheld
    pub valid: bool,
    /// Reason code
    pub reason: CheatingReason,
    /// Player sent back to their start
    pub reset_player: String,
    /// Where they were sent
    pub reset_position: Coord,
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Public per-player view (no hand contents).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Player name
    pub name: String,
    /// Token color
    pub color: PlayerColor,
    /// Current coordinate
    pub position: Coord,
    /// Room name, if inside one
    pub room: Option<String>,
    /// Still in the game
    pub active: bool,
    /// Made a correct accusation
    pub has_won: bool,
    /// Holds the turn
    pub is_current: bool,
    /// Can still file a cheating report
    pub can_report: bool,
    /// Number of cards held
    pub hand_size: usize,
}

/// Public view of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Sequence number of the latest event
    pub sequence: u32,
    /// Current phase
    pub state: TurnState,
    /// Whose turn it is
    pub current_player: Option<String>,
    /// Latest dice value this turn
    pub last_dice: Option<u8>,
    /// Winner, once decided
    pub winner: Option<String>,
    /// Seated players in roster order
    pub players: Vec<PlayerView>,
    /// Hex-encoded state hash
    pub state_hash: String,
}

// =============================================================================
// SESSION
// =============================================================================

/// One lobby's game.
pub struct GameSession {
    config: GameConfig,
    board: Board,
    catalog: CardCatalog,
    players: Vec<Player>,
    occupancy: RoomOccupancy,
    solution: Option<Solution>,
    turn: TurnStateMachine,
    rng: DeterministicRng,
    rng_seed: u64,
    sequence: u32,
    pending_events: Vec<GameEvent>,
}

impl GameSession {
    /// Session on the standard board.
    pub fn new(config: GameConfig) -> Self {
        Self::with_board(config, Board::standard())
    }

    /// Session on a custom board.
    pub fn with_board(config: GameConfig, board: Board) -> Self {
        let catalog = CardCatalog::for_board(&board);
        let turn = TurnStateMachine::new(config.min_players);
        Self {
            config,
            board,
            catalog,
            players: Vec::new(),
            occupancy: RoomOccupancy::new(),
            solution: None,
            turn,
            rng: DeterministicRng::new(0),
            rng_seed: 0,
            sequence: 0,
            pending_events: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Rules configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Card catalog.
    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    /// Seated players in roster order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Current phase.
    pub fn state(&self) -> TurnState {
        self.turn.state()
    }

    /// Latest event sequence number.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Player whose turn it is while a game is running.
    pub fn current_player(&self) -> Option<&Player> {
        let state = self.turn.state();
        if state.is_lobby() || state.is_terminal() {
            return None;
        }
        self.players.get(self.turn.current())
    }

    /// Latest dice value this turn.
    pub fn last_dice(&self) -> Option<u8> {
        self.turn.last_dice()
    }

    /// Winner, once decided.
    pub fn winner(&self) -> Option<&Player> {
        self.turn.winner().and_then(|idx| self.players.get(idx))
    }

    /// The hidden solution. Authoritative copy; never expose before the end.
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// Player by name.
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.is_named(name))
    }

    /// Cards dealt to `name`.
    pub fn hand_of(&self, name: &str) -> Option<&[Card]> {
        self.player(name).map(|p| p.hand.as_slice())
    }

    /// Drain buffered events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // -------------------------------------------------------------------------
    // Lobby phase
    // -------------------------------------------------------------------------

    /// Track how many players are waiting in the lobby.
    pub fn set_player_count(&mut self, count: usize) {
        if let Some(state) = self.turn.update_player_count(count) {
            debug!(count, %state, "lobby player count changed");
            self.emit(GameEventData::TurnStateChanged {
                state,
                current_player: None,
            });
        }
    }

    /// Deal and hand the first turn to roster index 0.
    ///
    /// Only `host` may start; the roster order fixes seats and start
    /// coordinates.
    pub fn start(&mut self, actor: &str, host: &str, roster: Vec<RosterEntry>, seed: u64) -> Result<(), ActionError> {
        self.turn.require("start the game", &[TurnState::WaitingForStart])?;

        if !actor.trim().eq_ignore_ascii_case(host.trim()) {
            return Err(ActionError::NotHost(actor.to_string()));
        }

        let count = roster.len();
        if count < self.config.min_players || count > self.config.max_players {
            return Err(ActionError::PlayerCount {
                count,
                min: self.config.min_players,
                max: self.config.max_players,
            });
        }

        for (i, entry) in roster.iter().enumerate() {
            if roster[..i].iter().any(|other| other.name.eq_ignore_ascii_case(&entry.name)) {
                return Err(ActionError::DuplicateName(entry.name.clone()));
            }
        }

        let mut rng = DeterministicRng::new(seed);
        let deal = cards::deal(&self.catalog, count, &mut rng)?;

        let mut players: Vec<Player> = roster.into_iter().map(Player::new).collect();
        for (player, hand) in players.iter_mut().zip(deal.hands) {
            player.hand = hand;
        }

        self.occupancy = RoomOccupancy::from_players(&self.board, &players);
        self.players = players;
        self.solution = Some(deal.solution);
        self.rng = rng;
        self.rng_seed = seed;

        self.turn.begin(0);
        self.players[0].is_current = true;

        info!(players = count, seed, "game started");

        self.emit(GameEventData::GameStarted {
            players: self.players.iter().map(|p| p.name.clone()).collect(),
            first_player: self.players[0].name.clone(),
        });
        self.emit_turn_state();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Turn actions
    // -------------------------------------------------------------------------

    /// Roll the dice for the current player.
    pub fn roll_dice(&mut self, actor: &str) -> Result<u8, ActionError> {
        self.turn.require("roll the dice", &[TurnState::PlayersTurnRollDice])?;
        let idx = self.current_actor(actor)?;

        let value = self.rng.roll_dice(self.config.dice_count, self.config.dice_sides);
        self.turn.record_roll(value);

        debug!(player = %self.players[idx].name, value, "dice rolled");
        self.emit(GameEventData::DiceRolled {
            player: self.players[idx].name.clone(),
            value,
        });
        self.emit_turn_state();
        Ok(value)
    }

    /// Move the current player along movement tokens.
    ///
    /// Every token is parsed before anything moves; see
    /// [`GameSession::move_directions`] for the rest.
    pub fn move_player<S: AsRef<str>>(&mut self, actor: &str, tokens: &[S]) -> Result<PathOutcome, ActionError> {
        self.turn.require("move", &[TurnState::PlayersTurnMove])?;
        self.current_actor(actor)?;

        let path = tokens
            .iter()
            .map(|t| t.as_ref().parse::<Direction>())
            .collect::<Result<Vec<_>, _>>()?;

        self.move_directions(actor, &path)
    }

    /// Move the current player step by step.
    ///
    /// At most the rolled value of steps; entering a room ends movement
    /// early. An empty path stays put. Afterwards the turn moves to the
    /// suggestion phase when standing in a room, otherwise it ends.
    pub fn move_directions(&mut self, actor: &str, path: &[Direction]) -> Result<PathOutcome, ActionError> {
        self.turn.require("move", &[TurnState::PlayersTurnMove])?;
        let idx = self.current_actor(actor)?;

        let allowed = self.turn.last_dice().unwrap_or(0);
        if path.len() > allowed as usize {
            return Err(ActionError::TooManySteps {
                steps: path.len(),
                allowed,
            });
        }

        let outcome = movement::walk_path(
            &self.board,
            &mut self.players[idx],
            idx,
            &mut self.occupancy,
            path,
        )?;

        let room = self.players[idx].room(&self.board);
        let room_name = room.and_then(|id| self.board.room(id)).map(|r| r.name.clone());

        self.emit(GameEventData::PlayerMoved {
            player: self.players[idx].name.clone(),
            from: outcome.from,
            to: outcome.to,
            room: room_name,
            via_passage: outcome.via_passage,
        });

        self.turn.finish_move(room.is_some());
        if self.turn.state() == TurnState::PlayersTurnEnd {
            self.advance_turn();
        } else {
            self.emit_turn_state();
        }
        Ok(outcome)
    }

    /// Suggest a suspect and weapon in the current room, then end the turn.
    pub fn suggest(&mut self, actor: &str, suspect: &str, weapon: &str) -> Result<SuggestionOutcome, ActionError> {
        self.turn.require("suggest", &[TurnState::PlayersTurnSuggest])?;
        let idx = self.current_actor(actor)?;

        let suspect = self.card(CardCategory::Suspect, suspect)?;
        let weapon = self.card(CardCategory::Weapon, weapon)?;

        let room_id = self.players[idx].room(&self.board).ok_or(ActionError::NotInRoom)?;
        let room_name = self
            .board
            .room(room_id)
            .map(|r| r.name.clone())
            .ok_or(ActionError::NotInRoom)?;
        let room = self.card(CardCategory::Room, &room_name)?;

        let disproof = deduction::find_disproof(&self.players, idx, &suspect, &weapon, &room);
        let disproved_by = disproof.as_ref().map(|d| self.players[d.player].name.clone());
        let shown_card = disproof.map(|d| d.card);

        self.players[idx].record_suggestion(room_id, SuggestionRecord {
            suspect: suspect.clone(),
            weapon: weapon.clone(),
            room: room.clone(),
        });

        debug!(
            player = %self.players[idx].name,
            %suspect, %weapon, %room,
            disproved = disproved_by.is_some(),
            "suggestion made"
        );

        self.emit(GameEventData::SuggestionMade {
            suggester: self.players[idx].name.clone(),
            suspect: suspect.name.clone(),
            weapon: weapon.name.clone(),
            room: room.name.clone(),
            disproved_by: disproved_by.clone(),
            shown_card: shown_card.as_ref().map(|c| c.name.clone()),
        });

        self.advance_turn();

        Ok(SuggestionOutcome {
            suspect,
            weapon,
            room,
            disproved_by,
            shown_card,
        })
    }

    /// Skip the optional suggestion.
    pub fn end_turn(&mut self, actor: &str) -> Result<(), ActionError> {
        self.turn.require("end the turn", &[TurnState::PlayersTurnSuggest])?;
        self.current_actor(actor)?;
        self.advance_turn();
        Ok(())
    }

    /// Accuse; a correct accusation wins, a wrong one eliminates.
    pub fn accuse(&mut self, actor: &str, suspect: &str, weapon: &str, room: &str) -> Result<AccusationOutcome, ActionError> {
        if !self.turn.state().accepts_accusation() {
            return Err(ActionError::WrongState {
                action: "accuse",
                state: self.turn.state(),
            });
        }
        let idx = self.current_actor(actor)?;

        let suspect = self.card(CardCategory::Suspect, suspect)?;
        let weapon = self.card(CardCategory::Weapon, weapon)?;
        let room = self.card(CardCategory::Room, room)?;

        let correct = self
            .solution
            .as_ref()
            .is_some_and(|s| deduction::check_accusation(s, &suspect, &weapon, &room));

        let name = self.players[idx].name.clone();
        info!(player = %name, correct, "accusation");

        self.emit(GameEventData::AccusationMade {
            player: name.clone(),
            suspect: suspect.name,
            weapon: weapon.name,
            room: room.name,
            correct,
        });

        if correct {
            self.players[idx].has_won = true;
            self.turn.declare_winner(idx);
            self.finish_game();
            return Ok(AccusationOutcome {
                correct,
                game_over: true,
                winner: Some(name),
            });
        }

        self.eliminate(idx, EliminationReason::WrongAccusation);
        Ok(AccusationOutcome {
            correct,
            game_over: self.turn.state().is_terminal(),
            winner: None,
        })
    }

    /// Claim that `suspect` is cheating.
    ///
    /// Any active player may report while a game is running, once per own
    /// turn. A rejected claim sends the accuser back to their start; an
    /// upheld one sends the suspect back and clears their counter for the
    /// room.
    pub fn report_cheating(&mut self, accuser: &str, suspect: &str) -> Result<CheatingOutcome, ActionError> {
        if !self.turn.state().accepts_accusation() {
            return Err(ActionError::WrongState {
                action: "report cheating",
                state: self.turn.state(),
            });
        }

        let accuser_idx = self.index_of(accuser)?;
        let suspect_idx = self.index_of(suspect)?;
        if accuser_idx == suspect_idx {
            return Err(ActionError::SelfReport);
        }
        if !self.players[accuser_idx].active {
            return Err(ActionError::Eliminated(self.players[accuser_idx].name.clone()));
        }

        let reason = deduction::evaluate_cheating_claim(
            &self.board,
            &self.players[accuser_idx],
            &self.players[suspect_idx],
        );
        let valid = reason.is_valid();

        let reset_idx = if valid {
            if let Some(room) = self.players[suspect_idx].room(&self.board) {
                self.players[suspect_idx].clear_suggestions_in(room);
            }
            suspect_idx
        } else {
            accuser_idx
        };

        let reset_position = self.players[reset_idx].start;
        movement::relocate(
            &self.board,
            &mut self.players[reset_idx],
            reset_idx,
            &mut self.occupancy,
            reset_position,
        );
        self.players[accuser_idx].can_report = false;

        let outcome = CheatingOutcome {
            valid,
            reason,
            reset_player: self.players[reset_idx].name.clone(),
            reset_position,
        };

        info!(
            accuser = %self.players[accuser_idx].name,
            suspect = %self.players[suspect_idx].name,
            ?reason,
            "cheating claim resolved"
        );

        self.emit(GameEventData::CheatingClaimResolved {
            accuser: self.players[accuser_idx].name.clone(),
            suspect: self.players[suspect_idx].name.clone(),
            valid,
            reason,
            reset_player: outcome.reset_player.clone(),
            reset_position,
        });

        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Administrative
    // -------------------------------------------------------------------------

    /// End the game immediately with no winner.
    pub fn force_end(&mut self) -> Result<(), ActionError> {
        if self.turn.state().is_terminal() {
            return Err(ActionError::WrongState {
                action: "force end",
                state: self.turn.state(),
            });
        }
        for player in &mut self.players {
            player.is_current = false;
        }
        self.turn.end_without_winner();
        info!("game force-ended");
        self.finish_game();
        Ok(())
    }

    /// Remove a player who left mid-game, as if they had accused wrongly.
    pub fn forfeit(&mut self, name: &str) -> Result<(), ActionError> {
        let state = self.turn.state();
        if state.is_lobby() || state.is_terminal() {
            return Err(ActionError::WrongState {
                action: "forfeit",
                state,
            });
        }
        let idx = self.index_of(name)?;
        if !self.players[idx].active {
            return Err(ActionError::Eliminated(self.players[idx].name.clone()));
        }
        self.eliminate(idx, EliminationReason::Forfeit);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    /// Hash of the public state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.sequence, self.rng_seed, |h| {
            h.update_u8(self.turn.state().tag());
            h.update_u32(self.turn.current() as u32);
            h.update_u8(self.turn.last_dice().unwrap_or(0));
            h.update_u32(self.turn.winner().map_or(u32::MAX, |w| w as u32));
            h.update_u32(self.players.len() as u32);
            for player in &self.players {
                player.hash_into(h);
            }
        })
    }

    /// Public snapshot for clients.
    pub fn snapshot(&self) -> SessionSnapshot {
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(idx, p)| PlayerView {
                name: p.name.clone(),
                color: p.color,
                position: p.position,
                room: self.room_name_of(idx),
                active: p.active,
                has_won: p.has_won,
                is_current: p.is_current,
                can_report: p.can_report,
                hand_size: p.hand.len(),
            })
            .collect();

        SessionSnapshot {
            sequence: self.sequence,
            state: self.turn.state(),
            current_player: self.current_player().map(|p| p.name.clone()),
            last_dice: self.turn.last_dice(),
            winner: self.winner().map(|p| p.name.clone()),
            players,
            state_hash: hex::encode(self.compute_hash()),
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn index_of(&self, name: &str) -> Result<PlayerIndex, ActionError> {
        self.players
            .iter()
            .position(|p| p.is_named(name))
            .ok_or_else(|| ActionError::UnknownPlayer(name.to_string()))
    }

    /// Room the occupancy table places `idx` in.
    fn room_name_of(&self, idx: PlayerIndex) -> Option<String> {
        self.board
            .rooms()
            .iter()
            .find(|room| self.occupancy.occupants(room.id).any(|p| p == idx))
            .map(|room| room.name.clone())
    }

    fn current_actor(&self, actor: &str) -> Result<PlayerIndex, ActionError> {
        let idx = self.index_of(actor)?;
        if idx != self.turn.current() {
            return Err(ActionError::NotYourTurn(self.players[idx].name.clone()));
        }
        Ok(idx)
    }

    fn card(&self, category: CardCategory, name: &str) -> Result<Card, ActionError> {
        self.catalog
            .lookup(category, name)
            .cloned()
            .ok_or_else(|| ActionError::UnknownCard {
                category,
                name: name.to_string(),
            })
    }

    fn eliminate(&mut self, idx: PlayerIndex, reason: EliminationReason) {
        let was_current = self.turn.current() == idx;
        self.players[idx].eliminate();

        info!(player = %self.players[idx].name, ?reason, "player eliminated");
        self.emit(GameEventData::PlayerEliminated {
            player: self.players[idx].name.clone(),
            reason,
        });

        if TurnStateMachine::active_count(&self.players) <= 1 {
            for player in &mut self.players {
                player.is_current = false;
            }
            self.turn.end_without_winner();
            self.finish_game();
        } else if was_current {
            self.advance_turn();
        }
    }

    fn advance_turn(&mut self) {
        if self.turn.advance(&mut self.players).is_some() {
            self.emit_turn_state();
        } else {
            self.finish_game();
        }
    }

    fn finish_game(&mut self) {
        self.emit_turn_state();
        let winner = self.winner().map(|p| p.name.clone());
        let solution = self.solution.clone();
        self.emit(GameEventData::GameEnded { winner, solution });
    }

    fn emit_turn_state(&mut self) {
        let state = self.turn.state();
        let current_player = self.current_player().map(|p| p.name.clone());
        self.emit(GameEventData::TurnStateChanged { state, current_player });
    }

    fn emit(&mut self, data: GameEventData) {
        self.sequence += 1;
        self.pending_events.push(GameEvent::new(self.sequence, data));
    }
}

// =============================================================================
// TESTS
// =============================================================================
