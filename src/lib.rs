pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{
    evaluate_board, find_best_move, AiAgent, AiConfig, AiDecision, AiDifficulty, DecisionKind,
    MAX_LEVEL, MIN_LEVEL,
};
pub use game::{
    generate_win_lines, win_lines, Board, Cell, GameOutcome, GameSession, GameSettings,
    MoveRecord, Opponent, Player, Position, RuleEngine, RuleError, WinLine, WinningLine,
    BOARD_SIZE, CELL_COUNT,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_js(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

// `None` 需要序列化为 `null`，与前端原有的数据形状一致
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    from_value(value).map_err(JsValue::from)
}

fn player_from_js(id: u8) -> Result<Player, JsValue> {
    Player::try_from(id).map_err(to_js_error)
}

fn config_from_js(difficulty: Option<String>) -> AiConfig {
    match difficulty.as_deref() {
        Some(value) => AiConfig::parse(value).unwrap_or_else(|| {
            web_sys::console::warn_1(&format!("未知难度 {value}，使用默认难度").into());
            AiConfig::default()
        }),
        None => AiConfig::default(),
    }
}

#[derive(Serialize)]
struct AiMoveResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<AiDecision>,
    outcome: &'a GameOutcome,
}

#[wasm_bindgen]
pub struct GameEngine {
    session: GameSession,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<GameEngine, JsValue> {
        let settings = match settings_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => GameSettings::default(),
        };
        Ok(GameEngine {
            session: GameSession::new(settings),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.session = serde_json::from_str(json).map_err(serde_to_js_error)?;
        Ok(())
    }

    pub fn set_settings_json(&mut self, json: &str) -> Result<(), JsValue> {
        let settings: GameSettings = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.session.set_settings(settings);
        Ok(())
    }

    pub fn is_ai_turn(&self) -> bool {
        self.session.is_ai_turn()
    }

    pub fn play(&mut self, x: i32, y: i32, z: i32) -> Result<String, JsValue> {
        let outcome = self
            .session
            .play(Position::new(x, y, z))
            .map_err(to_js_error)?;
        serde_json::to_string(&outcome).map_err(serde_to_js_error)
    }

    pub fn apply_ai_move(&mut self) -> Result<String, JsValue> {
        let mut agent = AiAgent::new(self.session.settings().ai_config());
        let decision = self.session.play_ai(&mut agent).map_err(to_js_error)?;
        let response = AiMoveResponse {
            decision,
            outcome: self.session.outcome(),
        };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 在可选的延迟之后给出 AI 的选择，但不落子。
    /// 对局已结束或未轮到 AI 时返回被拒绝的 Promise。
    pub fn think_ai(&self, delay_ms: Option<u32>) -> Promise {
        if let Err(error) = self.session.ensure_ai_turn() {
            return Promise::reject(&to_js_error(error));
        }
        let board = *self.session.board();
        let player = self.session.current_player();
        let config = self.session.settings().ai_config();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config);
            let decision = agent.best_move(&board, player);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn restart(&mut self) {
        self.session.restart();
    }
}

#[wasm_bindgen(js_name = "createEmptyBoard")]
pub fn create_empty_board() -> Result<JsValue, JsValue> {
    to_js(&RuleEngine::create_empty_board())
}

#[wasm_bindgen(js_name = "isValidMove")]
pub fn is_valid_move(board: JsValue, position: JsValue) -> Result<bool, JsValue> {
    let board: Board = from_js(board)?;
    let position: Position = from_js(position)?;
    Ok(RuleEngine::is_valid_move(&board, position))
}

#[wasm_bindgen(js_name = "placeMarker")]
pub fn place_marker(board: JsValue, position: JsValue, player: u8) -> Result<JsValue, JsValue> {
    let board: Board = from_js(board)?;
    let position: Position = from_js(position)?;
    let player = player_from_js(player)?;
    let next = RuleEngine::place_marker(&board, position, player).map_err(to_js_error)?;
    to_js(&next)
}

#[wasm_bindgen(js_name = "getAllWinLines")]
pub fn get_all_win_lines() -> Result<JsValue, JsValue> {
    to_js(RuleEngine::win_lines())
}

#[wasm_bindgen(js_name = "checkForWin")]
pub fn check_for_win(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_js(board)?;
    to_js(&RuleEngine::check_for_win(&board))
}

#[wasm_bindgen(js_name = "isBoardFull")]
pub fn is_board_full(board: JsValue) -> Result<bool, JsValue> {
    let board: Board = from_js(board)?;
    Ok(RuleEngine::is_board_full(&board))
}

#[wasm_bindgen(js_name = "getAvailableMoves")]
pub fn get_available_moves(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_js(board)?;
    to_js(&RuleEngine::available_moves(&board))
}

#[wasm_bindgen(js_name = "evaluateOutcome")]
pub fn evaluate_outcome(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_js(board)?;
    to_js(&RuleEngine::evaluate_outcome(&board))
}

/// 返回 `{x, y, z}`，棋盘已满时返回 `null`。
#[wasm_bindgen(js_name = "findBestMove")]
pub fn find_best_move_js(
    board: JsValue,
    ai_player: u8,
    difficulty: i32,
) -> Result<JsValue, JsValue> {
    let board: Board = from_js(board)?;
    let player = player_from_js(ai_player)?;
    to_js(&find_best_move(&board, player, difficulty))
}

/// 与 `findBestMove` 相同，但接受命名难度并返回完整的决策信息。
#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    board: JsValue,
    ai_player: u8,
    difficulty: Option<String>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_js(board)?;
    let player = player_from_js(ai_player)?;
    let mut agent = AiAgent::new(config_from_js(difficulty));
    to_js(&agent.best_move(&board, player))
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
