use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::game::{line_indices, Board, Player, Position, RuleEngine};

/// 难度刻度的下限与上限。
pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 50;
pub const DEFAULT_LEVEL: i32 = 25;
/// 搜索深度上限，决定最坏情况下的耗时。
pub const DEPTH_CAP: u8 = 4;
/// 每提升多少级难度增加一层搜索。
pub const DEPTH_DIVISOR: i32 = 10;

const WIN_SCORE: i32 = 1_000;
const DRAW_SCORE: i32 = 0;
const NEAR_WIN_WEIGHT: i32 = 10;
const POTENTIAL_WEIGHT: i32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl AiDifficulty {
    pub fn level(self) -> i32 {
        match self {
            AiDifficulty::Easy => 5,
            AiDifficulty::Normal => 20,
            AiDifficulty::Hard => 35,
            AiDifficulty::Expert => MAX_LEVEL,
        }
    }
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "normal" | "medium" => Ok(AiDifficulty::Normal),
            "hard" => Ok(AiDifficulty::Hard),
            "expert" | "extreme" | "perfect" => Ok(AiDifficulty::Expert),
            _ => Err(()),
        }
    }
}

/// 由难度等级推导出的搜索参数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub level: i32,
    pub max_depth: u8,
    pub random_chance: f64,
}

impl AiConfig {
    /// 等级先被限制在 `MIN_LEVEL..=MAX_LEVEL`。
    pub fn from_level(level: i32) -> Self {
        let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
        let max_depth = (level / DEPTH_DIVISOR + 1).min(DEPTH_CAP as i32) as u8;
        let random_chance = (1.0 - f64::from(level) / f64::from(MAX_LEVEL)).max(0.0);
        Self {
            level,
            max_depth,
            random_chance,
        }
    }

    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        Self::from_level(difficulty.level())
    }

    /// 接受命名难度（"hard"）或数字等级（"35"），都无法解析时返回 `None`。
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(level) = value.parse::<i32>() {
            return Some(Self::from_level(level));
        }
        AiDifficulty::from_str(value).ok().map(Self::from_difficulty)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_level(DEFAULT_LEVEL)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    /// 随机门限命中，跳过搜索。
    Random,
    /// 只剩一个空格。
    Forced,
    Search,
    /// 棋盘已满，没有可走的位置。
    Exhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub kind: DecisionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<i32>,
    pub depth_reached: u8,
    pub nodes: u64,
    pub level: i32,
}

struct SearchStats {
    nodes: u64,
    depth_reached: u8,
}

impl SearchStats {
    fn new() -> Self {
        Self {
            nodes: 0,
            depth_reached: 0,
        }
    }
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn decision(&self, position: Option<Position>, kind: DecisionKind) -> AiDecision {
        AiDecision {
            position,
            kind,
            evaluation: None,
            depth_reached: 0,
            nodes: 0,
            level: self.config.level,
        }
    }

    pub fn best_move(&mut self, board: &Board, ai_player: Player) -> AiDecision {
        let moves = RuleEngine::available_moves(board);

        // 每次决策都抽一次随机数，难度越低越可能直接随机落子
        let roll: f64 = self.rng.gen();
        if roll < self.config.random_chance {
            let decision = match moves.choose(&mut self.rng) {
                Some(&position) => self.decision(Some(position), DecisionKind::Random),
                None => self.decision(None, DecisionKind::Exhausted),
            };
            debug!(level = self.config.level, position = ?decision.position, "random move");
            return decision;
        }

        match moves.as_slice() {
            [] => return self.decision(None, DecisionKind::Exhausted),
            [only] => return self.decision(Some(*only), DecisionKind::Forced),
            _ => {}
        }

        let mut stats = SearchStats::new();
        let mut scratch = *board;
        let depth = self.config.max_depth.saturating_sub(1);
        let mut best: Option<(Position, i32)> = None;

        for position in moves {
            let Some(index) = position.index() else {
                continue;
            };
            scratch.set(index, Some(ai_player));
            let score = self.minimax(
                &mut scratch,
                depth,
                false,
                ai_player,
                i32::MIN,
                i32::MAX,
                &mut stats,
            );
            scratch.set(index, None);
            trace!(%position, score, "root move scored");

            // 严格大于：分数相同时保留先枚举到的位置
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((position, score));
            }
        }

        let decision = AiDecision {
            position: best.map(|(position, _)| position),
            kind: DecisionKind::Search,
            evaluation: best.map(|(_, score)| score),
            depth_reached: stats.depth_reached,
            nodes: stats.nodes,
            level: self.config.level,
        };
        debug!(
            level = self.config.level,
            position = ?decision.position,
            evaluation = ?decision.evaluation,
            nodes = decision.nodes,
            "search move"
        );
        decision
    }

    /// 带 alpha-beta 剪枝的极小极大搜索，在同一块草稿棋盘上 apply/undo。
    #[allow(clippy::too_many_arguments)]
    fn minimax(
        &self,
        board: &mut Board,
        depth_remaining: u8,
        maximizing: bool,
        ai_player: Player,
        mut alpha: i32,
        mut beta: i32,
        stats: &mut SearchStats,
    ) -> i32 {
        stats.nodes += 1;
        let depth_explored = self.config.max_depth.saturating_sub(depth_remaining);
        if depth_explored > stats.depth_reached {
            stats.depth_reached = depth_explored;
        }

        if let Some(winner) = RuleEngine::winner_of(board) {
            // 剩余深度越大说明胜负来得越早
            let magnitude = WIN_SCORE + i32::from(depth_remaining);
            return if winner == ai_player {
                magnitude
            } else {
                -magnitude
            };
        }

        if depth_remaining == 0 {
            return evaluate_board(board, ai_player);
        }

        let moves: Vec<usize> = board.empty_indices().collect();
        if moves.is_empty() {
            return DRAW_SCORE;
        }

        let mover = if maximizing {
            ai_player
        } else {
            ai_player.opponent()
        };

        if maximizing {
            let mut value = i32::MIN;
            for index in moves {
                board.set(index, Some(mover));
                let score = self.minimax(
                    board,
                    depth_remaining - 1,
                    false,
                    ai_player,
                    alpha,
                    beta,
                    stats,
                );
                board.set(index, None);
                value = value.max(score);
                alpha = alpha.max(value);
                if beta <= alpha {
                    break;
                }
            }
            value
        } else {
            let mut value = i32::MAX;
            for index in moves {
                board.set(index, Some(mover));
                let score = self.minimax(
                    board,
                    depth_remaining - 1,
                    true,
                    ai_player,
                    alpha,
                    beta,
                    stats,
                );
                board.set(index, None);
                value = value.min(score);
                beta = beta.min(value);
                if beta <= alpha {
                    break;
                }
            }
            value
        }
    }
}

impl Default for AiAgent {
    fn default() -> Self {
        AiAgent::new(AiConfig::default())
    }
}

/// 静态评估：逐条获胜线统计双方棋子，只用于搜索边界上的非终局棋盘。
pub fn evaluate_board(board: &Board, ai_player: Player) -> i32 {
    line_indices()
        .iter()
        .map(|cells| {
            let (mut mine, mut theirs, mut empty) = (0, 0, 0);
            for &index in cells {
                match board.cell(index) {
                    Some(player) if player == ai_player => mine += 1,
                    Some(_) => theirs += 1,
                    None => empty += 1,
                }
            }
            line_score(mine, empty) - line_score(theirs, empty)
        })
        .sum()
}

fn line_score(owned: u8, empty: u8) -> i32 {
    match (owned, empty) {
        (2, 1) => NEAR_WIN_WEIGHT,
        (1, 2) => POTENTIAL_WEIGHT,
        _ => 0,
    }
}

/// 为 `ai_player` 选一步棋；只有棋盘已满时返回 `None`。
pub fn find_best_move(board: &Board, ai_player: Player, difficulty_level: i32) -> Option<Position> {
    AiAgent::new(AiConfig::from_level(difficulty_level))
        .best_move(board, ai_player)
        .position
}
