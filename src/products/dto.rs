use serde::{Deserialize, Serialize};

/// Scalar product fields, sent as query parameters next to an optional multipart image.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductQuery {
    pub name: String,
    pub category: String,
    pub calories_per_100g: i32,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}
