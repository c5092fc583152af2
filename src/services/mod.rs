/// OpenAPI documentation generation.
pub mod documentation;
/// Session registry operations.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Background queue refill bursts.
pub mod prefetch;
/// Prompt builders for generation and verification.
pub mod prompts;
/// Repository-first puzzle production with generative fallback.
pub mod puzzle_source;
/// Idle-session and cache eviction loop.
pub mod reaper;
/// Puzzle repository supervisor with reconnect and degraded mode.
pub mod storage_supervisor;
/// Two-phase answer verification.
pub mod verifier;
