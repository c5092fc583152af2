//! Request and response schemas exposed over HTTP.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Game session and puzzle schemas.
pub mod game;
/// Health check schema.
pub mod health;
/// Validation helpers for DTOs.
pub mod validation;

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
