//! Movement Engine
//!
//! Validates and applies single-cell steps on the board:
//!
//! 1. The target must be on the grid, accessible and orthogonally adjacent.
//! 2. Differing cell types may only meet across a door or secret passage.
//! 3. Stepping onto a door carries the player through it, to the first
//!    neighbor of the door (in a fixed order depending on the move axis)
//!    whose type differs from where the player came from.
//! 4. Landing on a secret-passage anchor teleports beside the paired anchor.
//! 5. Room occupancy and per-room suggestion counters follow the result.
//!
//! A rejected step leaves every piece of state untouched.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::core::coord::{Coord, Direction};
use crate::game::board::{Board, CellType, RoomId};
use crate::game::player::{Player, PlayerIndex};

/// Door exit order for a primarily horizontal step.
const HORIZONTAL_DOOR_ORDER: [Direction; 4] =
    [Direction::Right, Direction::Left, Direction::Down, Direction::Up];

/// Door exit order for a vertical step.
const VERTICAL_DOOR_ORDER: [Direction; 4] =
    [Direction::Down, Direction::Up, Direction::Right, Direction::Left];

/// Search order around a secret-passage anchor.
const PASSAGE_EXIT_ORDER: [Direction; 4] =
    [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons a step is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// Coordinate is off the grid.
    #[error("{0} is outside the board")]
    OutOfBounds(Coord),

    /// Target is a wall.
    #[error("{0} is not accessible")]
    Inaccessible(Coord),

    /// Target is not one orthogonal step away.
    #[error("{to} is not adjacent to {from}")]
    NotAdjacent { from: Coord, to: Coord },

    /// Different cell types without a door or passage between them.
    #[error("cannot move from {from:?} to {to:?} directly")]
    IncompatibleCells { from: CellType, to: CellType },

    /// No valid cell on the far side of the door.
    #[error("no landing cell beyond door at {0}")]
    NoDoorLanding(Coord),

    /// Passage anchor not registered.
    #[error("room {0} has no secret passage")]
    MissingPassage(RoomId),

    /// Paired anchor has no free cell of its room around it.
    #[error("no landing cell beside passage anchor in room {0}")]
    NoPassageLanding(RoomId),
}

// =============================================================================
// OCCUPANCY
// =============================================================================

/// Which players stand in which room.
///
/// Derived from positions; kept alongside them so occupant queries don't
/// scan the roster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomOccupancy {
    rooms: BTreeMap<RoomId, BTreeSet<PlayerIndex>>,
}

impl RoomOccupancy {
    /// Empty occupancy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from current positions.
    pub fn from_players(board: &Board, players: &[Player]) -> Self {
        let mut occupancy = Self::new();
        for (index, player) in players.iter().enumerate() {
            if let Some(room) = player.room(board) {
                occupancy.enter(room, index);
            }
        }
        occupancy
    }

    /// Add a player to a room.
    pub fn enter(&mut self, room: RoomId, player: PlayerIndex) {
        self.rooms.entry(room).or_default().insert(player);
    }

    /// Remove a player from a room.
    pub fn leave(&mut self, room: RoomId, player: PlayerIndex) {
        if let Some(set) = self.rooms.get_mut(&room) {
            set.remove(&player);
            if set.is_empty() {
                self.rooms.remove(&room);
            }
        }
    }

    /// Occupants of a room in roster order.
    pub fn occupants(&self, room: RoomId) -> impl Iterator<Item = PlayerIndex> + '_ {
        self.rooms.get(&room).into_iter().flatten().copied()
    }

    /// True if `player` is recorded in `room`.
    pub fn contains(&self, room: RoomId, player: PlayerIndex) -> bool {
        self.rooms.get(&room).is_some_and(|set| set.contains(&player))
    }
}

// =============================================================================
// SINGLE STEP
// =============================================================================

/// Where a validated step ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Landing {
    /// Final coordinate
    pub position: Coord,
    /// True if a secret passage was taken
    pub via_passage: bool,
}

/// Result of an applied step or path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Coordinate before the move
    pub from: Coord,
    /// Coordinate after the move
    pub to: Coord,
    /// Room left, if the move crossed out of one
    pub left_room: Option<RoomId>,
    /// Room entered, if the move crossed into one
    pub entered_room: Option<RoomId>,
    /// True if a secret passage was taken
    pub via_passage: bool,
}

/// Compute where a step from `from` onto `target` lands, without applying it.
pub fn resolve_step(board: &Board, from: Coord, target: Coord) -> Result<Landing, MoveError> {
    let current = board.cell(from).ok_or(MoveError::OutOfBounds(from))?;
    let next = board.cell(target).ok_or(MoveError::OutOfBounds(target))?;

    if !next.is_accessible() {
        return Err(MoveError::Inaccessible(target));
    }
    if !from.is_adjacent(target) {
        return Err(MoveError::NotAdjacent { from, to: target });
    }
    if current.cell_type != next.cell_type
        && !current.cell_type.is_transition()
        && !next.cell_type.is_transition()
    {
        return Err(MoveError::IncompatibleCells {
            from: current.cell_type,
            to: next.cell_type,
        });
    }

    let mut landing = *next;

    if next.cell_type == CellType::Door {
        let order = if from.x != target.x {
            &HORIZONTAL_DOOR_ORDER
        } else {
            &VERTICAL_DOOR_ORDER
        };
        landing = order
            .iter()
            .filter_map(|dir| board.neighbor(target, *dir))
            .find(|cell| {
                cell.is_accessible()
                    && cell.cell_type != current.cell_type
                    && cell.cell_type != CellType::Door
            })
            .copied()
            .ok_or(MoveError::NoDoorLanding(target))?;
    }

    if landing.cell_type != CellType::SecretPassage {
        return Ok(Landing {
            position: landing.coord,
            via_passage: false,
        });
    }

    let Some(room) = landing.room else {
        return Err(MoveError::Inaccessible(landing.coord));
    };
    let (dest_room, anchor) = board.passage_from(room).ok_or(MoveError::MissingPassage(room))?;

    let exit = PASSAGE_EXIT_ORDER
        .iter()
        .filter_map(|dir| board.neighbor(anchor, *dir))
        .find(|cell| cell.is_accessible() && cell.room == Some(dest_room))
        .ok_or(MoveError::NoPassageLanding(dest_room))?;

    Ok(Landing {
        position: exit.coord,
        via_passage: true,
    })
}

/// Put a player at `to`, updating occupancy and room counters.
///
/// No movement rules are checked; used for validated steps and for
/// returning a player to their start coordinate.
pub fn relocate(
    board: &Board,
    player: &mut Player,
    index: PlayerIndex,
    occupancy: &mut RoomOccupancy,
    to: Coord,
) -> MoveOutcome {
    let from = player.position;
    let left = board.room_at(from);
    let entered = board.room_at(to);

    let (left_room, entered_room) = if left == entered {
        (None, None)
    } else {
        if let Some(room) = left {
            occupancy.leave(room, index);
            player.clear_suggestions_in(room);
        }
        if let Some(room) = entered {
            occupancy.enter(room, index);
        }
        (left, entered)
    };

    player.position = to;

    MoveOutcome {
        from,
        to,
        left_room,
        entered_room,
        via_passage: false,
    }
}

/// Validate and apply one step toward `target`.
pub fn move_player(
    board: &Board,
    player: &mut Player,
    index: PlayerIndex,
    occupancy: &mut RoomOccupancy,
    target: Coord,
) -> Result<MoveOutcome, MoveError> {
    let landing = resolve_step(board, player.position, target)?;
    let mut outcome = relocate(board, player, index, occupancy, landing.position);
    outcome.via_passage = landing.via_passage;
    debug!(player = %player.name, from = %outcome.from, to = %outcome.to, "step applied");
    Ok(outcome)
}

// =============================================================================
// PATHS
// =============================================================================

/// Result of walking a list of directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathOutcome {
    /// Coordinate before the first step
    pub from: Coord,
    /// Final coordinate
    pub to: Coord,
    /// Steps actually applied
    pub steps_taken: usize,
    /// Room the path ended in, if it ended by entering one
    pub entered_room: Option<RoomId>,
    /// True if any step took a secret passage
    pub via_passage: bool,
}

/// Walk `path` one step at a time.
///
/// Steps apply to scratch copies; the player and occupancy are only updated
/// if every step succeeds. Entering a room ends the walk and discards any
/// remaining steps.
pub fn walk_path(
    board: &Board,
    player: &mut Player,
    index: PlayerIndex,
    occupancy: &mut RoomOccupancy,
    path: &[Direction],
) -> Result<PathOutcome, MoveError> {
    let mut scratch = player.clone();
    let mut scratch_occupancy = occupancy.clone();

    let mut outcome = PathOutcome {
        from: player.position,
        to: player.position,
        steps_taken: 0,
        entered_room: None,
        via_passage: false,
    };

    for dir in path {
        let target = scratch.position.step(*dir);
        let step = move_player(board, &mut scratch, index, &mut scratch_occupancy, target)?;

        outcome.to = step.to;
        outcome.steps_taken += 1;
        outcome.via_passage |= step.via_passage;

        if step.entered_room.is_some() {
            outcome.entered_room = step.entered_room;
            break;
        }
    }

    *player = scratch;
    *occupancy = scratch_occupancy;
    Ok(outcome)
}

// =============================================================================
// TESTS
// =============================================================================
