//! Library crate for word-rally-back, exposing modules for the binary and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Puzzle repository access.
pub mod dao;
/// HTTP request/response schemas.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Generative chat backend adapters.
pub mod llm;
/// HTTP route trees.
pub mod routes;
/// Core game services.
pub mod services;
/// Process-wide shared state.
pub mod state;
