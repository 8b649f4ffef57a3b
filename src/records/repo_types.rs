use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::products::repo_types::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Record {
    pub id: i64,
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

/// One product row joined through `recordproduct`.
#[derive(Debug, FromRow)]
pub struct RecordItemRow {
    pub records_id: i64,
    pub weight: i32,
    pub id: i64,
    pub name: String,
    pub category: String,
    pub calories_per_100g: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordItem {
    pub product: Product,
    pub weight: i32, // grams
}

impl RecordItemRow {
    /// Splits the row into the owning record id and the item.
    pub fn into_item(self) -> (i64, RecordItem) {
        let r = self;
        (
            r.records_id,
            RecordItem {
                product: Product {
                    id: r.id,
                    name: r.name,
                    category: r.category,
                    calories_per_100g: r.calories_per_100g,
                    image_url: r.image_url,
                },
                weight: r.weight,
            },
        )
    }
}

/// A record with its products loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDetails {
    #[serde(flatten)]
    pub record: Record,
    pub products: Vec<RecordItem>,
}

/// Flattened row for the per-day listing.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct RecordView {
    pub name: String,
    pub image: Option<String>,
    pub product_calory: i32,
    pub weight: i32,
    pub record_id: i64,
}
