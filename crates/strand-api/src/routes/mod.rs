pub mod health;
pub mod messages;
pub mod streams;
pub mod threads;

use strand_types::PaginationOpts;

use crate::error::{ApiError, ApiResult};

/// Comma-separated query value into typed items
pub(crate) fn parse_list<T>(raw: Option<&str>, parse: fn(&str) -> Option<T>) -> ApiResult<Vec<T>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse(s).ok_or_else(|| ApiError::BadRequest(format!("unknown value: {}", s))))
        .collect()
}

pub(crate) fn pagination(num_items: Option<usize>, cursor: Option<String>, default_size: usize) -> PaginationOpts {
    PaginationOpts {
        num_items: num_items.unwrap_or(default_size),
        cursor,
    }
}
