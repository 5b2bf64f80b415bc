//! 棋盘与规则引擎（棋盘表示、获胜线、落子校验、终局判定）。

pub mod lines;
pub mod rules;
pub mod session;
pub mod state;

pub(crate) use lines::line_indices;
pub use lines::{generate_win_lines, win_lines};
pub use rules::{RuleEngine, RuleError};
pub use session::{GameSession, GameSettings, Opponent};
pub use state::{
    Board,
    Cell,
    GameOutcome,
    MoveRecord,
    NestedBoard,
    Player,
    Position,
    WinLine,
    WinningLine,
    BOARD_SIZE,
    CELL_COUNT,
};
