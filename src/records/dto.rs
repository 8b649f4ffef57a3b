use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RecordRequest {
    pub product_id: i64,
    pub weight: i32,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

/// Parses a `YYYY-MM-DD` path segment.
pub fn parse_date(raw: &str) -> AppResult<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::BadRequest(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}
