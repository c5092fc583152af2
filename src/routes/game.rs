use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        AnswerView, ClearSessionRequest, ClearSessionResponse, DemoPuzzleRequest, DemoPuzzleView,
        NextPuzzleRequest, PuzzleView, StartSessionRequest, StartSessionResponse,
        ValidateAnswerRequest, ValidationResult,
    },
    error::AppError,
    services::{game_service, verifier},
    state::SharedState,
};

/// Routes handling game sessions, puzzle delivery, and answer checks.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/game/start_session", post(start_session))
        .route("/api/game/next_puzzle", post(next_puzzle))
        .route("/api/game/clear_session", post(clear_session))
        .route("/api/game/validate", post(validate_answer))
        .route("/api/game/check_answer", post(check_answer))
        .route("/api/game/demo_puzzle", post(demo_puzzle))
        .route("/api/game/answer/{puzzle_id}", get(puzzle_answer))
}

/// Start a game session: the first puzzle comes back immediately while a
/// background burst buffers the following ones.
#[utoipa::path(
    post,
    path = "/api/game/start_session",
    tag = "game",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = StartSessionResponse),
        (status = 503, description = "Puzzle generation failed")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartSessionRequest>>,
) -> Result<Json<StartSessionResponse>, AppError> {
    let response = game_service::start_session(&state, payload).await?;
    Ok(Json(response))
}

/// Deliver the next puzzle from the session's buffered queue.
#[utoipa::path(
    post,
    path = "/api/game/next_puzzle",
    tag = "game",
    request_body = NextPuzzleRequest,
    responses(
        (status = 200, description = "Next puzzle", body = PuzzleView),
        (status = 404, description = "Session not found")
    )
)]
pub async fn next_puzzle(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<NextPuzzleRequest>>,
) -> Result<Json<PuzzleView>, AppError> {
    let puzzle = game_service::next_puzzle(&state, payload).await?;
    Ok(Json(puzzle))
}

/// Tear a session down at the end of a round.
#[utoipa::path(
    post,
    path = "/api/game/clear_session",
    tag = "game",
    request_body = ClearSessionRequest,
    responses((status = 200, description = "Session cleared", body = ClearSessionResponse))
)]
pub async fn clear_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ClearSessionRequest>>,
) -> Result<Json<ClearSessionResponse>, AppError> {
    Ok(Json(game_service::clear_session(&state, &payload.session_id)))
}

/// Verify an answer: exact match first, semantic check second.
#[utoipa::path(
    post,
    path = "/api/game/validate",
    tag = "game",
    request_body = ValidateAnswerRequest,
    responses(
        (status = 200, description = "Verification verdict", body = ValidationResult),
        (status = 404, description = "Puzzle not found")
    )
)]
pub async fn validate_answer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ValidateAnswerRequest>>,
) -> Result<Json<ValidationResult>, AppError> {
    let result = verifier::validate_answer(&state, payload).await?;
    Ok(Json(result))
}

/// Alias of [`validate_answer`] kept for older clients.
#[utoipa::path(
    post,
    path = "/api/game/check_answer",
    tag = "game",
    request_body = ValidateAnswerRequest,
    responses((status = 200, description = "Verification verdict", body = ValidationResult))
)]
pub async fn check_answer(
    state: State<SharedState>,
    payload: Valid<Json<ValidateAnswerRequest>>,
) -> Result<Json<ValidationResult>, AppError> {
    validate_answer(state, payload).await
}

/// Produce a one-off demo puzzle, answer included.
#[utoipa::path(
    post,
    path = "/api/game/demo_puzzle",
    tag = "game",
    request_body = DemoPuzzleRequest,
    responses(
        (status = 200, description = "Demo puzzle with answer", body = DemoPuzzleView),
        (status = 503, description = "Puzzle generation failed")
    )
)]
pub async fn demo_puzzle(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<DemoPuzzleRequest>>,
) -> Result<Json<DemoPuzzleView>, AppError> {
    let view = game_service::demo_puzzle(&state, payload).await?;
    Ok(Json(view))
}

/// Reveal the canonical answer of a cached puzzle (skip flow).
#[utoipa::path(
    get,
    path = "/api/game/answer/{puzzle_id}",
    tag = "game",
    params(("puzzle_id" = String, Path, description = "Identifier of the puzzle")),
    responses(
        (status = 200, description = "Canonical answer", body = AnswerView),
        (status = 404, description = "Puzzle not found")
    )
)]
pub async fn puzzle_answer(
    State(state): State<SharedState>,
    Path(puzzle_id): Path<String>,
) -> Result<Json<AnswerView>, AppError> {
    let view = game_service::puzzle_answer(&state, &puzzle_id)?;
    Ok(Json(view))
}
