use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Word Rally Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::start_session,
        crate::routes::game::next_puzzle,
        crate::routes::game::clear_session,
        crate::routes::game::validate_answer,
        crate::routes::game::check_answer,
        crate::routes::game::demo_puzzle,
        crate::routes::game::puzzle_answer,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::StartSessionRequest,
            crate::dto::game::NextPuzzleRequest,
            crate::dto::game::ClearSessionRequest,
            crate::dto::game::ValidateAnswerRequest,
            crate::dto::game::DemoPuzzleRequest,
            crate::dto::game::StartSessionResponse,
            crate::dto::game::ClearSessionResponse,
            crate::dto::game::PuzzleView,
            crate::dto::game::PuzzleFace,
            crate::dto::game::DemoPuzzleView,
            crate::dto::game::DemoPuzzleDetail,
            crate::dto::game::AnswerView,
            crate::dto::game::ValidationResult,
            crate::dto::game::MatchType,
            crate::state::puzzle::Difficulty,
            crate::state::puzzle::Language,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game session and puzzle endpoints"),
    )
)]
pub struct ApiDoc;
