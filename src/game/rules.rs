use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    lines::{line_indices, win_lines},
    state::{Board, GameOutcome, Player, Position, WinLine, WinningLine},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("position {position} is outside the board")]
    OutOfRange { position: Position },
    #[error("cell {position} is already occupied")]
    CellOccupied { position: Position },
    #[error("the game is already finished")]
    GameFinished,
    #[error("it is player {expected}'s turn, not player {actual}'s")]
    NotPlayerTurn { expected: Player, actual: Player },
    #[error("{value} is not a player identifier")]
    InvalidPlayer { value: u8 },
    #[error("malformed board: {reason}")]
    MalformedBoard { reason: String },
}

/// 规则引擎。所有操作都是参数的纯函数，不持有状态。
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn create_empty_board() -> Board {
        Board::empty()
    }

    /// 坐标在界内且格子为空时为真；越界返回 false，而不是报错。
    pub fn is_valid_move(board: &Board, position: Position) -> bool {
        matches!(board.get(position), Some(None))
    }

    /// 返回落子后的新棋盘，原棋盘不变。越界或已占用的格子直接拒绝。
    pub fn place_marker(
        board: &Board,
        position: Position,
        player: Player,
    ) -> Result<Board, RuleError> {
        let index = position
            .index()
            .ok_or(RuleError::OutOfRange { position })?;
        if board.cell(index).is_some() {
            return Err(RuleError::CellOccupied { position });
        }

        let mut next = *board;
        next.set(index, Some(player));
        Ok(next)
    }

    pub fn win_lines() -> &'static [WinLine] {
        win_lines()
    }

    /// 按获胜线的固定顺序返回第一条被占满的线。
    pub fn check_for_win(board: &Board) -> Option<WinningLine> {
        let (line_index, player) = Self::first_completed_line(board)?;
        Some(WinningLine {
            positions: win_lines()[line_index].clone(),
            player,
        })
    }

    /// `check_for_win` 的无分配版本，只返回胜者。
    pub(crate) fn winner_of(board: &Board) -> Option<Player> {
        Self::first_completed_line(board).map(|(_, player)| player)
    }

    fn first_completed_line(board: &Board) -> Option<(usize, Player)> {
        line_indices()
            .iter()
            .enumerate()
            .find_map(|(line_index, cells)| {
                let owner = board.cell(cells[0])?;
                cells[1..]
                    .iter()
                    .all(|&index| board.cell(index) == Some(owner))
                    .then_some((line_index, owner))
            })
    }

    pub fn is_board_full(board: &Board) -> bool {
        board.is_full()
    }

    /// 所有空格，按 z 外层、y 中层、x 内层升序排列。
    pub fn available_moves(board: &Board) -> Vec<Position> {
        board.empty_indices().map(Position::from_index).collect()
    }

    pub fn evaluate_outcome(board: &Board) -> GameOutcome {
        if let Some(line) = Self::check_for_win(board) {
            return GameOutcome::Won(line);
        }
        if Self::is_board_full(board) {
            GameOutcome::Draw
        } else {
            GameOutcome::Ongoing
        }
    }
}
