use serde::{Deserialize, Serialize};
use std::fmt;

use super::rules::RuleError;

/// 棋盘边长。
pub const BOARD_SIZE: usize = 3;
/// 棋盘格子总数。
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE * BOARD_SIZE;

/// 玩家标识，序列化为 `1` / `2`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn id(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = RuleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            _ => Err(RuleError::InvalidPlayer { value }),
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> Self {
        player.id()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// 单个格子：空，或某位玩家的棋子。
pub type Cell = Option<Player>;

/// 三维坐标。越界坐标可以构造，但永远不是合法落子。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn in_bounds(&self) -> bool {
        let limit = BOARD_SIZE as i32;
        (0..limit).contains(&self.x) && (0..limit).contains(&self.y) && (0..limit).contains(&self.z)
    }

    /// 按 z-y-x 顺序展开后的下标，越界时返回 `None`。
    pub fn index(&self) -> Option<usize> {
        if !self.in_bounds() {
            return None;
        }
        let (x, y, z) = (self.x as usize, self.y as usize, self.z as usize);
        Some((z * BOARD_SIZE + y) * BOARD_SIZE + x)
    }

    pub fn from_index(index: usize) -> Self {
        let x = index % BOARD_SIZE;
        let y = (index / BOARD_SIZE) % BOARD_SIZE;
        let z = index / (BOARD_SIZE * BOARD_SIZE);
        Self::new(x as i32, y as i32, z as i32)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// 与前端一致的嵌套表示：`board[z][y][x]`。
pub type NestedBoard = Vec<Vec<Vec<Cell>>>;

/// 3×3×3 棋盘。对外是不可变值，落子总是返回新棋盘。
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "NestedBoard", into = "NestedBoard")]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [None; CELL_COUNT],
        }
    }

    /// 读取格子；越界返回 `None`，空格返回 `Some(None)`。
    pub fn get(&self, position: Position) -> Option<Cell> {
        position.index().map(|index| self.cells[index])
    }

    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn empty_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.is_none().then_some(index))
    }

    pub(crate) fn cell(&self, index: usize) -> Cell {
        self.cells[index]
    }

    // 仅供 RuleEngine 与搜索内部的 apply/undo 使用，调用方负责下标合法。
    pub(crate) fn set(&mut self, index: usize, cell: Cell) {
        self.cells[index] = cell;
    }

    pub fn to_nested(&self) -> NestedBoard {
        (0..BOARD_SIZE)
            .map(|z| {
                (0..BOARD_SIZE)
                    .map(|y| {
                        (0..BOARD_SIZE)
                            .map(|x| self.cells[(z * BOARD_SIZE + y) * BOARD_SIZE + x])
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<NestedBoard> for Board {
    type Error = RuleError;

    fn try_from(nested: NestedBoard) -> Result<Self, Self::Error> {
        if nested.len() != BOARD_SIZE {
            return Err(RuleError::MalformedBoard {
                reason: format!("expected {BOARD_SIZE} layers, got {}", nested.len()),
            });
        }

        let mut board = Board::empty();
        for (z, layer) in nested.into_iter().enumerate() {
            if layer.len() != BOARD_SIZE {
                return Err(RuleError::MalformedBoard {
                    reason: format!("layer {z} has {} rows", layer.len()),
                });
            }
            for (y, row) in layer.into_iter().enumerate() {
                if row.len() != BOARD_SIZE {
                    return Err(RuleError::MalformedBoard {
                        reason: format!("row {y} of layer {z} has {} cells", row.len()),
                    });
                }
                for (x, cell) in row.into_iter().enumerate() {
                    board.cells[(z * BOARD_SIZE + y) * BOARD_SIZE + x] = cell;
                }
            }
        }
        Ok(board)
    }
}

impl From<Board> for NestedBoard {
    fn from(board: Board) -> Self {
        board.to_nested()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({self})")
    }
}

/// 逐层输出，例如 `1.. .2. ... | ... ... ... | ...`。
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, cell) in self.cells.iter().enumerate() {
            if index > 0 {
                if index % (BOARD_SIZE * BOARD_SIZE) == 0 {
                    f.write_str(" | ")?;
                } else if index % BOARD_SIZE == 0 {
                    f.write_str(" ")?;
                }
            }
            match cell {
                Some(player) => write!(f, "{player}")?,
                None => f.write_str(".")?,
            }
        }
        Ok(())
    }
}

/// 一条获胜线：按顺序排列的 `N` 个坐标。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WinLine(Vec<Position>);

impl WinLine {
    pub fn new(positions: Vec<Position>) -> Self {
        Self(positions)
    }

    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.0.contains(position)
    }
}

/// 被同一玩家占满的获胜线。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinningLine {
    pub positions: WinLine,
    pub player: Player,
}

/// 对局判定。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum GameOutcome {
    Ongoing,
    Won(WinningLine),
    Draw,
}

impl GameOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameOutcome::Ongoing)
    }

    pub fn winner(&self) -> Option<Player> {
        match self {
            GameOutcome::Won(line) => Some(line.player),
            _ => None,
        }
    }
}

impl Default for GameOutcome {
    fn default() -> Self {
        GameOutcome::Ongoing
    }
}

/// 落子记录，用于对局历史。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRecord {
    pub player: Player,
    pub position: Position,
}
