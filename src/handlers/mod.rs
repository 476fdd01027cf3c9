//! HTTP handlers, one module per resource.
//!
//! Every handler follows the same shape: parse the path id, bind the JSON body,
//! check referenced rows and uniqueness against the repository, persist, and
//! answer with the refreshed entity.

use crate::error::{AppError, AppResult};

pub mod categories;
pub mod menus;
pub mod options;
pub mod products;
pub mod roles;
pub mod users;

/// Parses a numeric path identifier. Anything else is `400 Invalid ID`.
pub(crate) fn parse_id(raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(AppError::InvalidId)
}

// Column widths of the VARCHAR fields, in characters.
pub(crate) const ROLE_NAME_MAX_LEN: usize = 50;
pub(crate) const NAME_MAX_LEN: usize = 100;
pub(crate) const LONG_TEXT_MAX_LEN: usize = 255;

/// Rejects blank required text fields and values wider than their column.
pub(crate) fn require_text(value: &str, max_len: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation("Invalid data"));
    }
    limit_text(value, max_len)
}

/// Rejects optional text wider than its column.
pub(crate) fn limit_text(value: &str, max_len: usize) -> AppResult<()> {
    if value.chars().count() > max_len {
        return Err(AppError::validation("Invalid data"));
    }
    Ok(())
}

/// Rejects negative prices or quantities.
pub(crate) fn require_non_negative(value: f64) -> AppResult<()> {
    if value.is_nan() || value < 0.0 {
        return Err(AppError::validation("Invalid data"));
    }
    Ok(())
}

