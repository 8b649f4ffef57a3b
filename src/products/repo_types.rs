use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry; `image_url` is an image store reference such as `static/apple.png`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub calories_per_100g: i32,
    pub image_url: Option<String>,
}
