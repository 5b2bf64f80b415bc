use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    rules::{RuleEngine, RuleError},
    state::{Board, GameOutcome, MoveRecord, Player, Position},
};
use crate::ai::{AiAgent, AiConfig, AiDecision, DEFAULT_LEVEL};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Opponent {
    Human,
    Ai,
}

impl Default for Opponent {
    fn default() -> Self {
        Opponent::Ai
    }
}

/// 对局设置，可由前端以 JSON 传入，缺省字段取默认值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    pub opponent: Opponent,
    pub ai_player: Player,
    pub difficulty: i32,
}

impl GameSettings {
    pub fn ai_config(&self) -> AiConfig {
        AiConfig::from_level(self.difficulty)
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            opponent: Opponent::Ai,
            ai_player: Player::Two,
            difficulty: DEFAULT_LEVEL,
        }
    }
}

/// 一局游戏的内存状态：棋盘、轮次、历史与结果。
///
/// 反序列化时不信任传入的结果字段，而是从棋盘重新推导，并校验轮次与历史。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "SessionSnapshot")]
pub struct GameSession {
    board: Board,
    current_player: Player,
    moves: Vec<MoveRecord>,
    outcome: GameOutcome,
    settings: GameSettings,
}

/// 前端保存的对局状态，校验通过后才成为 `GameSession`。
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot {
    board: Board,
    current_player: Player,
    #[serde(default)]
    moves: Vec<MoveRecord>,
    #[serde(default)]
    settings: GameSettings,
}

fn malformed(reason: String) -> RuleError {
    RuleError::MalformedBoard { reason }
}

fn markers_of(board: &Board, player: Player) -> usize {
    board
        .cells()
        .iter()
        .filter(|cell| **cell == Some(player))
        .count()
}

impl TryFrom<SessionSnapshot> for GameSession {
    type Error = RuleError;

    fn try_from(snapshot: SessionSnapshot) -> Result<Self, Self::Error> {
        let SessionSnapshot {
            board,
            current_player,
            moves,
            settings,
        } = snapshot;

        let ones = markers_of(&board, Player::One);
        let twos = markers_of(&board, Player::Two);
        if ones != twos && ones != twos + 1 {
            return Err(malformed(format!(
                "player 1 has {ones} markers but player 2 has {twos}"
            )));
        }

        // 历史可以缺省；给出时必须与棋盘逐步对应
        if !moves.is_empty() {
            if moves.len() != board.occupied_count() {
                return Err(malformed(format!(
                    "history has {} moves but the board has {} markers",
                    moves.len(),
                    board.occupied_count()
                )));
            }
            let mut seen = HashSet::new();
            for (turn, record) in moves.iter().enumerate() {
                let expected = if turn % 2 == 0 { Player::One } else { Player::Two };
                if record.player != expected
                    || board.get(record.position) != Some(Some(record.player))
                    || !seen.insert(record.position)
                {
                    return Err(malformed(format!(
                        "move {turn} ({} at {}) does not match the board",
                        record.player, record.position
                    )));
                }
            }
        }

        let outcome = RuleEngine::evaluate_outcome(&board);
        let last_mover = if ones > twos { Player::One } else { Player::Two };
        if let Some(winner) = outcome.winner() {
            if winner != last_mover {
                return Err(malformed(format!(
                    "player {winner} has a line but player {last_mover} moved last"
                )));
            }
        }

        // 终局后轮次停在最后落子的一方
        let expected = if outcome.is_terminal() {
            last_mover
        } else {
            last_mover.opponent()
        };
        if current_player != expected {
            return Err(malformed(format!(
                "player {current_player} is to move but the board says player {expected}"
            )));
        }

        Ok(Self {
            board,
            current_player,
            moves,
            outcome,
            settings,
        })
    }
}

impl GameSession {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            board: RuleEngine::create_empty_board(),
            current_player: Player::One,
            moves: Vec::new(),
            outcome: GameOutcome::Ongoing,
            settings,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn outcome(&self) -> &GameOutcome {
        &self.outcome
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// 立即生效，不重置棋盘。
    pub fn set_settings(&mut self, settings: GameSettings) {
        self.settings = settings;
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_terminal()
    }

    pub fn is_ai_turn(&self) -> bool {
        self.settings.opponent == Opponent::Ai && self.current_player == self.settings.ai_player
    }

    /// 对局未结束且轮到 AI 时返回 `Ok`。
    pub fn ensure_ai_turn(&self) -> Result<(), RuleError> {
        if self.is_finished() {
            return Err(RuleError::GameFinished);
        }
        if !self.is_ai_turn() {
            return Err(RuleError::NotPlayerTurn {
                expected: self.current_player,
                actual: self.settings.ai_player,
            });
        }
        Ok(())
    }

    pub fn restart(&mut self) {
        *self = Self::new(self.settings.clone());
        debug!("session restarted");
    }

    /// 人类玩家落子。
    pub fn play(&mut self, position: Position) -> Result<GameOutcome, RuleError> {
        if self.is_finished() {
            return Err(RuleError::GameFinished);
        }
        if self.is_ai_turn() {
            return Err(RuleError::NotPlayerTurn {
                expected: self.settings.ai_player,
                actual: self.settings.ai_player.opponent(),
            });
        }
        self.apply(position)
    }

    /// 轮到 AI 时由 `agent` 选点并落子；AI 无子可下时返回 `None`。
    pub fn play_ai(&mut self, agent: &mut AiAgent) -> Result<Option<AiDecision>, RuleError> {
        self.ensure_ai_turn()?;
        let decision = agent.best_move(&self.board, self.current_player);
        match decision.position {
            Some(position) => {
                self.apply(position)?;
                Ok(Some(decision))
            }
            None => Ok(None),
        }
    }

    fn apply(&mut self, position: Position) -> Result<GameOutcome, RuleError> {
        if self.is_finished() {
            return Err(RuleError::GameFinished);
        }

        let player = self.current_player;
        self.board = RuleEngine::place_marker(&self.board, position, player)?;
        self.moves.push(MoveRecord { player, position });
        self.outcome = RuleEngine::evaluate_outcome(&self.board);
        debug!(%player, %position, moves = self.moves.len(), "move applied");

        match &self.outcome {
            GameOutcome::Ongoing => self.current_player = player.opponent(),
            GameOutcome::Won(line) => info!(winner = %line.player, "game won"),
            GameOutcome::Draw => info!("game drawn"),
        }
        Ok(self.outcome.clone())
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(GameSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn human_vs_human() -> GameSession {
        GameSession::new(GameSettings {
            opponent: Opponent::Human,
            ..GameSettings::default()
        })
    }

    #[test]
    fn players_alternate_and_history_is_recorded() {
        let mut session = human_vs_human();
        session
            .play(Position::new(0, 0, 0))
            .expect("first move should be legal");
        session
            .play(Position::new(1, 0, 0))
            .expect("second move should be legal");

        assert_eq!(session.current_player(), Player::One);
        assert_eq!(
            session.moves(),
            &[
                MoveRecord {
                    player: Player::One,
                    position: Position::new(0, 0, 0)
                },
                MoveRecord {
                    player: Player::Two,
                    position: Position::new(1, 0, 0)
                },
            ]
        );
    }

    #[test]
    fn occupied_cell_is_rejected_without_changing_turn() {
        let mut session = human_vs_human();
        session
            .play(Position::new(1, 1, 1))
            .expect("first move should be legal");
        let result = session.play(Position::new(1, 1, 1));

        assert!(matches!(result, Err(RuleError::CellOccupied { .. })));
        assert_eq!(session.current_player(), Player::Two);
        assert_eq!(session.moves().len(), 1);
    }

    #[test]
    fn finished_game_rejects_further_moves() {
        let mut session = human_vs_human();
        let script = [
            Position::new(0, 0, 0),
            Position::new(0, 1, 0),
            Position::new(1, 1, 1),
            Position::new(0, 2, 0),
            Position::new(2, 2, 2),
        ];
        let mut outcome = GameOutcome::Ongoing;
        for position in script {
            outcome = session.play(position).expect("scripted move should be legal");
        }

        assert_eq!(outcome.winner(), Some(Player::One));
        assert!(session.is_finished());
        assert_eq!(session.current_player(), Player::One);
        assert_eq!(
            session.play(Position::new(2, 0, 0)),
            Err(RuleError::GameFinished)
        );
    }

    #[test]
    fn ai_replies_on_its_turn() {
        let mut session = GameSession::new(GameSettings {
            difficulty: 50,
            ..GameSettings::default()
        });
        let mut agent = AiAgent::with_seed(session.settings().ai_config(), 7);

        assert!(matches!(
            session.play_ai(&mut agent),
            Err(RuleError::NotPlayerTurn { .. })
        ));

        session
            .play(Position::new(1, 1, 1))
            .expect("human move should be legal");
        assert!(session.is_ai_turn());
        assert!(matches!(
            session.play(Position::new(0, 0, 0)),
            Err(RuleError::NotPlayerTurn { .. })
        ));

        let decision = session
            .play_ai(&mut agent)
            .expect("ai move should be legal")
            .expect("board has free cells");
        let position = decision.position.expect("decision carries a position");
        assert_eq!(session.moves().len(), 2);
        assert_eq!(session.board().get(position), Some(Some(Player::Two)));
        assert_eq!(session.current_player(), Player::One);
    }

    #[test]
    fn restart_keeps_settings() {
        let settings = GameSettings {
            opponent: Opponent::Human,
            ai_player: Player::One,
            difficulty: 12,
        };
        let mut session = GameSession::new(settings.clone());
        session
            .play(Position::new(2, 2, 2))
            .expect("move should be legal");
        session.restart();

        assert_eq!(session.board().occupied_count(), 0);
        assert!(session.moves().is_empty());
        assert_eq!(session.current_player(), Player::One);
        assert_eq!(session.settings(), &settings);
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: GameSettings =
            serde_json::from_str(r#"{ "opponent": "human" }"#).expect("settings should parse");
        assert_eq!(settings.opponent, Opponent::Human);
        assert_eq!(settings.ai_player, Player::Two);
        assert_eq!(settings.difficulty, DEFAULT_LEVEL);

        let settings: GameSettings =
            serde_json::from_str(r#"{ "aiPlayer": 1, "difficulty": 40 }"#)
                .expect("settings should parse");
        assert_eq!(settings.ai_player, Player::One);
        assert_eq!(settings.ai_config().max_depth, 4);
    }

    fn won_board_json(current_player: u8) -> serde_json::Value {
        serde_json::json!({
            "board": [
                [[1, 1, 1], [2, 2, null], [null, null, null]],
                [[null, null, null], [null, null, null], [null, null, null]],
                [[null, null, null], [null, null, null], [null, null, null]]
            ],
            "currentPlayer": current_player,
            "outcome": { "state": "ongoing" }
        })
    }

    #[test]
    fn loaded_session_derives_outcome_from_board() {
        let mut session: GameSession =
            serde_json::from_value(won_board_json(1)).expect("consistent state should load");

        assert_eq!(session.outcome().winner(), Some(Player::One));
        assert!(session.is_finished());
        assert_eq!(
            session.play(Position::new(2, 1, 0)),
            Err(RuleError::GameFinished)
        );
        assert_eq!(session.board().occupied_count(), 5);
        assert!(session.moves().is_empty());
    }

    #[test]
    fn loaded_session_rejects_turn_after_a_win() {
        let error = serde_json::from_value::<GameSession>(won_board_json(2))
            .expect_err("player 2 cannot move after player 1 won");
        assert!(error.to_string().contains("malformed board"), "{error}");
    }

    #[test]
    fn loaded_session_rejects_inconsistent_history_and_counts() {
        let wrong_history = serde_json::json!({
            "board": [
                [[1, null, null], [null, null, null], [null, null, null]],
                [[null, null, null], [null, null, null], [null, null, null]],
                [[null, null, null], [null, null, null], [null, null, null]]
            ],
            "currentPlayer": 2,
            "moves": [{ "player": 2, "position": { "x": 0, "y": 0, "z": 0 } }]
        });
        assert!(serde_json::from_value::<GameSession>(wrong_history).is_err());

        let too_many_twos = serde_json::json!({
            "board": [
                [[2, 2, null], [null, null, null], [null, null, null]],
                [[null, null, null], [null, null, null], [null, null, null]],
                [[null, null, null], [null, null, null], [null, null, null]]
            ],
            "currentPlayer": 1
        });
        assert!(serde_json::from_value::<GameSession>(too_many_twos).is_err());
    }

    #[test]
    fn played_session_survives_a_json_round_trip() {
        let mut session = human_vs_human();
        for position in [
            Position::new(1, 1, 1),
            Position::new(0, 0, 0),
            Position::new(2, 0, 1),
        ] {
            session.play(position).expect("move should be legal");
        }

        let json = serde_json::to_string(&session).expect("session should serialize");
        let restored: GameSession = serde_json::from_str(&json).expect("session should load");
        assert_eq!(restored, session);
        assert_eq!(restored.current_player(), Player::Two);
    }

    #[test]
    fn ai_turn_is_checked_before_thinking() {
        let session = GameSession::default();
        assert_eq!(
            session.ensure_ai_turn(),
            Err(RuleError::NotPlayerTurn {
                expected: Player::One,
                actual: Player::Two,
            })
        );

        let finished: GameSession =
            serde_json::from_value(won_board_json(1)).expect("consistent state should load");
        assert_eq!(finished.ensure_ai_turn(), Err(RuleError::GameFinished));
    }
}
