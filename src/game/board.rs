//! Mansion Board Topology
//!
//! Immutable grid of hallway, room, wall, door and secret-passage cells,
//! plus the room and secret-passage registries. Built once per session
//! and never mutated afterwards; who stands where lives in the session.

use serde::{Serialize, Deserialize};

use crate::core::coord::{Coord, Direction};

/// Standard board width in cells.
pub const BOARD_WIDTH: i32 = 25;

/// Standard board height in cells.
pub const BOARD_HEIGHT: i32 = 25;

/// Index into the board's room registry.
pub type RoomId = u8;

// =============================================================================
// CELLS
// =============================================================================

/// Classification of a board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellType {
    /// Open corridor
    Hallway,
    /// Interior of a room
    Room,
    /// Impassable
    Wall,
    /// Thin boundary between a room and a hallway
    Door,
    /// Room cell linked to another room's anchor
    SecretPassage,
}

impl CellType {
    /// Every type except `Wall` can be stepped on.
    #[inline]
    pub fn is_accessible(self) -> bool {
        !matches!(self, CellType::Wall)
    }

    /// Cells of this type may border a different type in a single move.
    #[inline]
    pub fn is_transition(self) -> bool {
        matches!(self, CellType::Door | CellType::SecretPassage)
    }
}

/// A single board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Position on the grid
    pub coord: Coord,
    /// Classification
    pub cell_type: CellType,
    /// Owning room; set exactly for `Room` and `SecretPassage` cells
    pub room: Option<RoomId>,
}

impl Cell {
    /// See [`CellType::is_accessible`].
    #[inline]
    pub fn is_accessible(&self) -> bool {
        self.cell_type.is_accessible()
    }
}

// =============================================================================
// REGISTRIES
// =============================================================================

/// A named room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Registry index
    pub id: RoomId,
    /// Unique display name (also the room card's name)
    pub name: String,
    /// Door cells leading into this room
    pub doors: Vec<Coord>,
}

/// Symmetric link between two rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecretPassage {
    /// First room and its anchor cell
    pub a: (RoomId, Coord),
    /// Second room and its anchor cell
    pub b: (RoomId, Coord),
}

impl SecretPassage {
    /// Given one side's room, return the other side.
    pub fn other_side(&self, room: RoomId) -> Option<(RoomId, Coord)> {
        if self.a.0 == room {
            Some(self.b)
        } else if self.b.0 == room {
            Some(self.a)
        } else {
            None
        }
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Static description of one room.
#[derive(Clone, Copy, Debug)]
pub struct RoomSpec {
    /// Room name
    pub name: &'static str,
    /// Inclusive top-left corner
    pub top_left: Coord,
    /// Inclusive bottom-right corner
    pub bottom_right: Coord,
    /// Door cells (outside the rectangle, adjacent to it)
    pub doors: &'static [Coord],
}

/// Static description of a full board.
#[derive(Clone, Copy, Debug)]
pub struct BoardLayout {
    /// Width in cells
    pub width: i32,
    /// Height in cells
    pub height: i32,
    /// Inclusive wall rectangles in addition to the border
    pub wall_blocks: &'static [(Coord, Coord)],
    /// Rooms in registry order
    pub rooms: &'static [RoomSpec],
    /// Paired passage anchors; each anchor must lie inside a room
    pub passages: &'static [(Coord, Coord)],
    /// Starting coordinates in roster order
    pub start_positions: &'static [Coord],
}

/// The classic nine-room mansion.
pub const STANDARD_LAYOUT: BoardLayout = BoardLayout {
    width: BOARD_WIDTH,
    height: BOARD_HEIGHT,
    wall_blocks: &[(Coord::new(10, 10), Coord::new(14, 14))],
    rooms: &[
        RoomSpec {
            name: "Study",
            top_left: Coord::new(1, 1),
            bottom_right: Coord::new(5, 5),
            doors: &[Coord::new(4, 6)],
        },
        RoomSpec {
            name: "Hall",
            top_left: Coord::new(9, 1),
            bottom_right: Coord::new(15, 6),
            doors: &[Coord::new(12, 7), Coord::new(8, 3)],
        },
        RoomSpec {
            name: "Lounge",
            top_left: Coord::new(19, 1),
            bottom_right: Coord::new(23, 5),
            doors: &[Coord::new(20, 6)],
        },
        RoomSpec {
            name: "Library",
            top_left: Coord::new(1, 9),
            bottom_right: Coord::new(5, 12),
            doors: &[Coord::new(3, 8), Coord::new(6, 10)],
        },
        RoomSpec {
            name: "Dining Room",
            top_left: Coord::new(18, 9),
            bottom_right: Coord::new(23, 14),
            doors: &[Coord::new(17, 11), Coord::new(20, 8)],
        },
        RoomSpec {
            name: "Billiard Room",
            top_left: Coord::new(1, 15),
            bottom_right: Coord::new(5, 18),
            doors: &[Coord::new(3, 14), Coord::new(6, 16)],
        },
        RoomSpec {
            name: "Conservatory",
            top_left: Coord::new(1, 21),
            bottom_right: Coord::new(5, 23),
            doors: &[Coord::new(5, 20)],
        },
        RoomSpec {
            name: "Ballroom",
            top_left: Coord::new(9, 18),
            bottom_right: Coord::new(15, 23),
            doors: &[Coord::new(12, 17), Coord::new(8, 20), Coord::new(16, 20)],
        },
        RoomSpec {
            name: "Kitchen",
            top_left: Coord::new(19, 19),
            bottom_right: Coord::new(23, 23),
            doors: &[Coord::new(20, 18)],
        },
    ],
    passages: &[
        // Study <-> Kitchen
        (Coord::new(1, 1), Coord::new(23, 23)),
        // Lounge <-> Conservatory
        (Coord::new(23, 1), Coord::new(1, 23)),
    ],
    start_positions: &[
        Coord::new(16, 1),
        Coord::new(23, 7),
        Coord::new(16, 23),
        Coord::new(8, 23),
        Coord::new(1, 20),
        Coord::new(1, 7),
    ],
};

/// Small board whose door and passage both lead nowhere.
///
/// The Cellar's passage pairs with the one-cell Attic, which has no room
/// cell beside its anchor; the Cellar door only touches hallway and wall.
#[cfg(test)]
pub(crate) const DEAD_END_LAYOUT: BoardLayout = BoardLayout {
    width: 9,
    height: 7,
    wall_blocks: &[],
    rooms: &[
        RoomSpec {
            name: "Cellar",
            top_left: Coord::new(1, 1),
            bottom_right: Coord::new(3, 3),
            doors: &[Coord::new(1, 5)],
        },
        RoomSpec {
            name: "Attic",
            top_left: Coord::new(6, 1),
            bottom_right: Coord::new(6, 1),
            doors: &[],
        },
    ],
    passages: &[(Coord::new(1, 1), Coord::new(6, 1))],
    start_positions: &[Coord::new(4, 4), Coord::new(5, 4), Coord::new(7, 4)],
};

/// Board construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Two rooms share a name.
    #[error("duplicate room name: {0}")]
    DuplicateRoom(String),

    /// A room, door or anchor lies outside the grid.
    #[error("coordinate {0} is outside the board")]
    OutOfBounds(Coord),

    /// A passage anchor is not a room cell.
    #[error("secret passage anchor {0} is not inside a room")]
    AnchorOutsideRoom(Coord),

    /// Both anchors of a passage are in the same room.
    #[error("secret passage at {0} links a room to itself")]
    PassageToSelf(Coord),

    /// More rooms than `RoomId` can index.
    #[error("too many rooms")]
    TooManyRooms,
}

// =============================================================================
// BOARD
// =============================================================================

/// The immutable board.
#[derive(Clone, Debug)]
pub struct Board {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    rooms: Vec<Room>,
    passages: Vec<SecretPassage>,
    start_positions: Vec<Coord>,
}

impl Board {
    /// Build the classic mansion.
    pub fn standard() -> Self {
        Self::from_layout(&STANDARD_LAYOUT).expect("standard layout is valid")
    }

    /// Build a board from a layout.
    ///
    /// Order matters: hallway fill, border and wall blocks, rooms, doors,
    /// then passage anchors (which keep their room reference).
    pub fn from_layout(layout: &BoardLayout) -> Result<Self, BoardError> {
        if layout.rooms.len() > RoomId::MAX as usize {
            return Err(BoardError::TooManyRooms);
        }

        let mut board = Self {
            width: layout.width,
            height: layout.height,
            cells: Vec::with_capacity((layout.width * layout.height).max(0) as usize),
            rooms: Vec::with_capacity(layout.rooms.len()),
            passages: Vec::with_capacity(layout.passages.len()),
            start_positions: layout.start_positions.to_vec(),
        };

        for y in 0..layout.height {
            for x in 0..layout.width {
                let on_border = x == 0 || y == 0 || x == layout.width - 1 || y == layout.height - 1;
                board.cells.push(Cell {
                    coord: Coord::new(x, y),
                    cell_type: if on_border { CellType::Wall } else { CellType::Hallway },
                    room: None,
                });
            }
        }

        for (top_left, bottom_right) in layout.wall_blocks {
            board.fill_rect(*top_left, *bottom_right, CellType::Wall, None)?;
        }

        for (idx, spec) in layout.rooms.iter().enumerate() {
            if board.rooms.iter().any(|r| r.name.eq_ignore_ascii_case(spec.name)) {
                return Err(BoardError::DuplicateRoom(spec.name.to_string()));
            }
            let id = idx as RoomId;
            board.fill_rect(spec.top_left, spec.bottom_right, CellType::Room, Some(id))?;
            board.rooms.push(Room {
                id,
                name: spec.name.to_string(),
                doors: spec.doors.to_vec(),
            });
        }

        for spec in layout.rooms {
            for door in spec.doors {
                let cell = board.cell_mut(*door).ok_or(BoardError::OutOfBounds(*door))?;
                cell.cell_type = CellType::Door;
                cell.room = None;
            }
        }

        for (first, second) in layout.passages {
            let room_a = board.mark_anchor(*first)?;
            let room_b = board.mark_anchor(*second)?;
            if room_a == room_b {
                return Err(BoardError::PassageToSelf(*first));
            }
            board.passages.push(SecretPassage {
                a: (room_a, *first),
                b: (room_b, *second),
            });
        }

        for start in &board.start_positions {
            if !board.in_bounds(*start) {
                return Err(BoardError::OutOfBounds(*start));
            }
        }

        Ok(board)
    }

    fn fill_rect(
        &mut self,
        top_left: Coord,
        bottom_right: Coord,
        cell_type: CellType,
        room: Option<RoomId>,
    ) -> Result<(), BoardError> {
        for corner in [top_left, bottom_right] {
            if !self.in_bounds(corner) {
                return Err(BoardError::OutOfBounds(corner));
            }
        }
        for y in top_left.y..=bottom_right.y {
            for x in top_left.x..=bottom_right.x {
                if let Some(cell) = self.cell_mut(Coord::new(x, y)) {
                    cell.cell_type = cell_type;
                    cell.room = room;
                }
            }
        }
        Ok(())
    }

    fn mark_anchor(&mut self, coord: Coord) -> Result<RoomId, BoardError> {
        let cell = self.cell_mut(coord).ok_or(BoardError::OutOfBounds(coord))?;
        match (cell.cell_type, cell.room) {
            (CellType::Room, Some(room)) => {
                cell.cell_type = CellType::SecretPassage;
                Ok(room)
            }
            _ => Err(BoardError::AnchorOutsideRoom(coord)),
        }
    }

    #[inline]
    fn index(&self, coord: Coord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some((coord.y * self.width + coord.x) as usize)
        } else {
            None
        }
    }

    fn cell_mut(&mut self, coord: Coord) -> Option<&mut Cell> {
        let idx = self.index(coord)?;
        self.cells.get_mut(idx)
    }

    /// Width in cells.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// True if `coord` lies on the grid.
    #[inline]
    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    /// The cell at `coord`, or `None` when out of bounds.
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.index(coord).and_then(|idx| self.cells.get(idx))
    }

    /// The cell at `(x, y)`.
    pub fn cell_at(&self, x: i32, y: i32) -> Option<&Cell> {
        self.cell(Coord::new(x, y))
    }

    /// Accessibility of the cell at `coord`; out of bounds is inaccessible.
    pub fn is_accessible(&self, coord: Coord) -> bool {
        self.cell(coord).is_some_and(Cell::is_accessible)
    }

    /// Neighbor of `coord` in `dir`, if on the grid.
    pub fn neighbor(&self, coord: Coord, dir: Direction) -> Option<&Cell> {
        self.cell(coord.step(dir))
    }

    /// Iterate all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Room registry.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Room by id.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id as usize)
    }

    /// Room by name (ASCII case-insensitive).
    pub fn room_by_name(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Room containing `coord`, if any.
    pub fn room_at(&self, coord: Coord) -> Option<RoomId> {
        self.cell(coord).and_then(|c| c.room)
    }

    /// Secret-passage registry.
    pub fn passages(&self) -> &[SecretPassage] {
        &self.passages
    }

    /// Destination room and anchor for the passage leaving `room`.
    pub fn passage_from(&self, room: RoomId) -> Option<(RoomId, Coord)> {
        self.passages.iter().find_map(|p| p.other_side(room))
    }

    /// Starting coordinates in roster order.
    pub fn start_positions(&self) -> &[Coord] {
        &self.start_positions
    }

    /// One character per cell, rows separated by newlines.
    ///
    /// `#` wall, `.` hallway, `D` door, `*` passage, room cells use the
    /// first letter of the room name.
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for row in self.cells.chunks(self.width as usize) {
            for cell in row {
                let glyph = match cell.cell_type {
                    CellType::Wall => '#',
                    CellType::Hallway => '.',
                    CellType::Door => 'D',
                    CellType::SecretPassage => '*',
                    CellType::Room => cell
                        .room
                        .and_then(|id| self.room(id))
                        .and_then(|r| r.name.chars().next())
                        .unwrap_or('?'),
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_end_layout() {
        let board = Board::from_layout(&DEAD_END_LAYOUT).unwrap();
        let expected = [
            "#########",
            "#*CC..*.#",
            "#CCC....#",
            "#CCC....#",
            "#.......#",
            "#D......#",
            "#########",
        ]
        .join("\n");
        assert_eq!(board.render_ascii().trim_end(), expected);
        assert_eq!(board.passage_from(0), Some((1, Coord::new(6, 1))));
    }

    #[test]
    fn test_standard_board_dimensions() {
        let board = Board::standard();
        assert_eq!(board.width(), BOARD_WIDTH);
        assert_eq!(board.height(), BOARD_HEIGHT);
        assert_eq!(board.cells().count(), (BOARD_WIDTH * BOARD_HEIGHT) as usize);
        assert_eq!(board.rooms().len(), 9);
        assert_eq!(board.passages().len(), 2);
    }

    #[test]
    fn test_room_cells_have_room_reference() {
        let board = Board::standard();
        for cell in board.cells() {
            match cell.cell_type {
                CellType::Room | CellType::SecretPassage => {
                    assert!(cell.room.is_some(), "{} has no room", cell.coord);
                }
                _ => assert!(cell.room.is_none(), "{} should not have a room", cell.coord),
            }
        }
    }

    #[test]
    fn test_walls_never_accessible() {
        let board = Board::standard();
        for cell in board.cells() {
            assert_eq!(cell.is_accessible(), cell.cell_type != CellType::Wall);
        }
        assert!(!board.is_accessible(Coord::new(0, 0)));
        assert!(!board.is_accessible(Coord::new(12, 12)));
        assert!(!board.is_accessible(Coord::new(-1, 3)));
        assert!(!board.is_accessible(Coord::new(BOARD_WIDTH, 3)));
    }

    #[test]
    fn test_out_of_bounds_lookup() {
        let board = Board::standard();
        assert!(board.cell_at(-1, 0).is_none());
        assert!(board.cell_at(0, BOARD_HEIGHT).is_none());
        assert!(board.cell_at(BOARD_WIDTH - 1, BOARD_HEIGHT - 1).is_some());
    }

    #[test]
    fn test_doors_border_a_room_and_a_hallway() {
        let board = Board::standard();
        for room in board.rooms() {
            for door in &room.doors {
                let cell = board.cell(*door).unwrap();
                assert_eq!(cell.cell_type, CellType::Door);

                let neighbors: Vec<_> = [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
                    .into_iter()
                    .filter_map(|d| board.neighbor(*door, d))
                    .collect();
                assert!(neighbors.iter().any(|c| c.room == Some(room.id)), "door {} of {}", door, room.name);
                assert!(neighbors.iter().any(|c| c.cell_type == CellType::Hallway), "door {} of {}", door, room.name);
            }
        }
    }

    #[test]
    fn test_reference_door_cell() {
        let board = Board::standard();
        let study = board.room_by_name("study").unwrap().id;
        assert_eq!(board.cell_at(4, 6).unwrap().cell_type, CellType::Door);
        assert_eq!(board.cell_at(4, 5).unwrap().room, Some(study));
        assert_eq!(board.cell_at(4, 7).unwrap().cell_type, CellType::Hallway);
    }

    #[test]
    fn test_secret_passages_are_symmetric() {
        let board = Board::standard();
        let study = board.room_by_name("Study").unwrap().id;
        let kitchen = board.room_by_name("Kitchen").unwrap().id;
        let lounge = board.room_by_name("Lounge").unwrap().id;
        let conservatory = board.room_by_name("Conservatory").unwrap().id;

        assert_eq!(board.passage_from(kitchen), Some((study, Coord::new(1, 1))));
        assert_eq!(board.passage_from(study), Some((kitchen, Coord::new(23, 23))));
        assert_eq!(board.passage_from(lounge), Some((conservatory, Coord::new(1, 23))));
        assert_eq!(board.passage_from(conservatory), Some((lounge, Coord::new(23, 1))));

        let hall = board.room_by_name("Hall").unwrap().id;
        assert_eq!(board.passage_from(hall), None);

        let anchor = board.cell_at(23, 23).unwrap();
        assert_eq!(anchor.cell_type, CellType::SecretPassage);
        assert_eq!(anchor.room, Some(kitchen));
    }

    #[test]
    fn test_start_positions_are_hallways() {
        let board = Board::standard();
        assert_eq!(board.start_positions().len(), 6);
        for start in board.start_positions() {
            assert_eq!(board.cell(*start).unwrap().cell_type, CellType::Hallway, "start {}", start);
        }
    }

    #[test]
    fn test_room_lookup_is_case_insensitive() {
        let board = Board::standard();
        assert_eq!(board.room_by_name("DINING ROOM").unwrap().name, "Dining Room");
        assert!(board.room_by_name("Cellar").is_none());
    }

    #[test]
    fn test_invalid_layouts_rejected() {
        const OUTSIDE_ANCHOR: BoardLayout = BoardLayout {
            width: 8,
            height: 8,
            wall_blocks: &[],
            rooms: &[RoomSpec {
                name: "Den",
                top_left: Coord::new(1, 1),
                bottom_right: Coord::new(2, 2),
                doors: &[Coord::new(3, 1)],
            }],
            passages: &[(Coord::new(1, 1), Coord::new(5, 5))],
            start_positions: &[],
        };
        assert_eq!(
            Board::from_layout(&OUTSIDE_ANCHOR).unwrap_err(),
            BoardError::AnchorOutsideRoom(Coord::new(5, 5))
        );

        const DUPLICATE: BoardLayout = BoardLayout {
            width: 8,
            height: 8,
            wall_blocks: &[],
            rooms: &[
                RoomSpec { name: "Den", top_left: Coord::new(1, 1), bottom_right: Coord::new(2, 2), doors: &[] },
                RoomSpec { name: "den", top_left: Coord::new(4, 4), bottom_right: Coord::new(5, 5), doors: &[] },
            ],
            passages: &[],
            start_positions: &[],
        };
        assert!(matches!(Board::from_layout(&DUPLICATE), Err(BoardError::DuplicateRoom(_))));
    }

    #[test]
    fn test_render_ascii() {
        let board = Board::standard();
        let ascii = board.render_ascii();
        let rows: Vec<&str> = ascii.lines().collect();
        assert_eq!(rows.len(), BOARD_HEIGHT as usize);
        assert!(rows[0].chars().all(|c| c == '#'));
        assert_eq!(rows[1].chars().nth(1), Some('*'));
        assert_eq!(rows[6].chars().nth(4), Some('D'));
        assert_eq!(rows[3].chars().nth(3), Some('S'));
    }
}
