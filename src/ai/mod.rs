//! AI 对手：带 alpha-beta 剪枝的极小极大搜索与难度混合。

pub mod minimax;

pub use minimax::{
    evaluate_board, find_best_move, AiAgent, AiConfig, AiDecision, AiDifficulty, DecisionKind,
    DEFAULT_LEVEL, DEPTH_CAP, DEPTH_DIVISOR, MAX_LEVEL, MIN_LEVEL,
};
