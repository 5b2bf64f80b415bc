#![allow(dead_code)]

use cube_tictactoe::{Board, GameOutcome, Player, Position, RuleEngine};
use proptest::prelude::*;

pub fn board_with(moves: &[((i32, i32, i32), Player)]) -> Board {
    moves.iter().fold(Board::empty(), |board, &((x, y, z), player)| {
        RuleEngine::place_marker(&board, Position::new(x, y, z), player)
            .expect("test move should be legal")
    })
}

/// 交替落子得到的棋盘。每个 pick 选择当前空格中的第 `pick % len` 个，
/// 一旦出现终局就停止。返回棋盘与下一个该走的玩家。
pub fn play_out(picks: &[usize]) -> (Board, Player) {
    let mut board = Board::empty();
    let mut player = Player::One;
    for &pick in picks {
        if RuleEngine::evaluate_outcome(&board).is_terminal() {
            break;
        }
        let moves = RuleEngine::available_moves(&board);
        let position = moves[pick % moves.len()];
        board = RuleEngine::place_marker(&board, position, player)
            .expect("available move should be legal");
        player = player.opponent();
    }
    (board, player)
}

pub fn reachable_board(max_moves: usize) -> impl Strategy<Value = (Board, Player)> {
    prop::collection::vec(any::<usize>(), 0..=max_moves).prop_map(|picks| play_out(&picks))
}

pub fn ongoing_board(max_moves: usize) -> impl Strategy<Value = (Board, Player)> {
    reachable_board(max_moves)
        .prop_filter("game must still be running", |(board, _)| {
            RuleEngine::evaluate_outcome(board) == GameOutcome::Ongoing
        })
}
